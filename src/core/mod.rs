//! Driver logic: state machine, scanner, poller and the public facade

pub mod driver;
pub mod error;
pub mod poller;
pub mod scanner;
pub mod state;
pub mod types;
