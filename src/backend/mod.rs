//! Control channel layer: transport, protocol codec and request serialization

pub mod channel;
pub mod codec;
pub mod event;
pub mod mock_backend;
pub mod power;
pub mod serializer;
pub mod wpa_ctrl;

pub use channel::{ControlChannel, DEFAULT_RESPONSE_CAPACITY};
pub use mock_backend::MockControlChannel;
pub use power::{NoopPowerControl, PowerControl, ShellPowerControl};
pub use serializer::RequestSerializer;
pub use wpa_ctrl::WpaCtrlChannel;
