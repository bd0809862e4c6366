use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ThresholdKind;

pub const DEFAULT_TELEMETRY_TOPIC: &str = "iot/pi/data";
pub const DEFAULT_COMMAND_TOPIC: &str = "iot/pi/command";

// MQTT 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub telemetry_topic: String,
    pub command_topic: String,
    pub client_id: String,
    pub use_tls: bool,
    pub keep_alive_secs: u64,
    pub clean_session: bool,
    pub reconnect_interval_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 8883,
            username: None,
            password: None,
            telemetry_topic: DEFAULT_TELEMETRY_TOPIC.to_string(),
            command_topic: DEFAULT_COMMAND_TOPIC.to_string(),
            client_id: format!("fieldlink-{}", uuid::Uuid::new_v4()),
            use_tls: true,
            keep_alive_secs: 60,
            clean_session: true,
            reconnect_interval_ms: 5000,
        }
    }
}

/// MQTT 连接状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

impl LinkState {
    /// 是否允许下发命令
    pub fn can_publish(self) -> bool {
        matches!(self, LinkState::Connected | LinkState::Subscribed)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Subscribed => "subscribed",
        };
        f.write_str(name)
    }
}

// 下发到设备的命令
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// 自定义动作，例如 `LIGHT_ON`
    Action { device: String, action: String },
    /// 阈值下发
    Threshold {
        device: String,
        kind: ThresholdKind,
        value: f64,
    },
}

impl DeviceCommand {
    pub fn action(device: impl Into<String>, action: impl Into<String>) -> Self {
        DeviceCommand::Action {
            device: device.into(),
            action: action.into(),
        }
    }

    pub fn threshold(device: impl Into<String>, kind: ThresholdKind, value: f64) -> Self {
        DeviceCommand::Threshold {
            device: device.into(),
            kind,
            value,
        }
    }

    /// 发布到命令主题的消息内容
    pub fn payload(&self) -> String {
        match self {
            DeviceCommand::Action { device, action } => {
                format!("{}:{}", device, action.replace('_', " "))
            }
            DeviceCommand::Threshold { device, kind, value } => {
                let label = match kind {
                    ThresholdKind::Temperature => "TEMP",
                    ThresholdKind::Gas => "GAS",
                };
                format!("{}:{}={}", device, label, format_threshold(*value))
            }
        }
    }
}

// `{:?}` 保留整数值的 `.0` 后缀（30.0 而不是 30）
fn format_threshold(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_payload_replaces_underscores() {
        let command = DeviceCommand::action("N2", "turn_on");
        assert_eq!(command.payload(), "N2:turn on");

        let command = DeviceCommand::action("N1", "LIGHT_OFF_NOW");
        assert_eq!(command.payload(), "N1:LIGHT OFF NOW");
    }

    #[test]
    fn test_threshold_payloads() {
        let temp = DeviceCommand::threshold("N1", ThresholdKind::Temperature, 31.0);
        assert_eq!(temp.payload(), "N1:TEMP=31.0");

        let gas = DeviceCommand::threshold("N1", ThresholdKind::Gas, 1.5);
        assert_eq!(gas.payload(), "N1:GAS=1.5");
    }

    #[test]
    fn test_link_state_publish_gate() {
        assert!(!LinkState::Disconnected.can_publish());
        assert!(!LinkState::Connecting.can_publish());
        assert!(LinkState::Connected.can_publish());
        assert!(LinkState::Subscribed.can_publish());
        assert_eq!(LinkState::Subscribed.to_string(), "subscribed");
    }

    #[test]
    fn test_default_topics() {
        let config = MqttConfig::default();
        assert_eq!(config.telemetry_topic, "iot/pi/data");
        assert_eq!(config.command_topic, "iot/pi/command");
        assert!(config.client_id.starts_with("fieldlink-"));
        assert!(config.use_tls);
    }
}
