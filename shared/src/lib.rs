pub mod config;
pub mod mqtt;
pub mod telemetry;
pub mod types;

pub use config::{load_config, validate_config, AppConfig, ConfigError, ServerConfig, UsersConfig};
pub use mqtt::{DeviceCommand, LinkState, MqttConfig};
pub use telemetry::{parse_sensor_message, ParseError};
pub use types::*;
