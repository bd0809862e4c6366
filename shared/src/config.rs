use crate::mqtt::MqttConfig;
use anyhow::Result;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mqtt: MqttConfig,
    pub users: UsersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 为空时允许任意来源，不携带凭据
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub file: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            file: "users.json".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MQTT broker host cannot be empty")]
    EmptyBrokerHost,

    #[error("MQTT broker port cannot be 0")]
    InvalidBrokerPort,

    #[error("{0} topic cannot be empty")]
    EmptyTopic(&'static str),

    #[error("command topic must not contain wildcards: {0}")]
    WildcardCommandTopic(String),

    #[error("telemetry and command topics must differ")]
    SharedTopic,

    #[error("MQTT username and password must be set together")]
    PartialCredentials,
}

pub fn load_config() -> Result<AppConfig> {
    // 加载 .env 文件
    dotenv().ok();

    let settings = Config::builder()
        // 添加默认配置文件
        .add_source(File::with_name("config/default").required(false))
        // 添加环境特定配置文件
        .add_source(
            File::with_name(&format!(
                "config/{}",
                env::var("ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        // 环境变量覆盖，例如 APP_MQTT__BROKER_HOST、APP_SERVER__CORS_ORIGINS=a,b
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let mqtt = &config.mqtt;

    if mqtt.broker_host.trim().is_empty() {
        return Err(ConfigError::EmptyBrokerHost);
    }

    if mqtt.broker_port == 0 {
        return Err(ConfigError::InvalidBrokerPort);
    }

    if mqtt.telemetry_topic.is_empty() {
        return Err(ConfigError::EmptyTopic("telemetry"));
    }

    if mqtt.command_topic.is_empty() {
        return Err(ConfigError::EmptyTopic("command"));
    }

    if mqtt.command_topic.contains(['+', '#']) {
        return Err(ConfigError::WildcardCommandTopic(mqtt.command_topic.clone()));
    }

    if mqtt.telemetry_topic == mqtt.command_topic {
        return Err(ConfigError::SharedTopic);
    }

    if mqtt.username.is_some() != mqtt.password.is_some() {
        return Err(ConfigError::PartialCredentials);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(validate_config(&config), Ok(()));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.users.file, "users.json");
    }

    #[test]
    fn test_rejects_wildcard_command_topic() {
        let mut config = AppConfig::default();
        config.mqtt.command_topic = "iot/+/command".to_string();

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::WildcardCommandTopic(_))
        ));
    }

    #[test]
    fn test_accepts_wildcard_telemetry_filter() {
        let mut config = AppConfig::default();
        config.mqtt.telemetry_topic = "iot/+/data".to_string();

        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_rejects_shared_topic() {
        let mut config = AppConfig::default();
        config.mqtt.command_topic = config.mqtt.telemetry_topic.clone();

        assert_eq!(validate_config(&config), Err(ConfigError::SharedTopic));
    }

    #[test]
    fn test_rejects_partial_credentials() {
        let mut config = AppConfig::default();
        config.mqtt.username = Some("p_user".to_string());

        assert_eq!(validate_config(&config), Err(ConfigError::PartialCredentials));

        config.mqtt.password = Some("secret".to_string());
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_partial_file_config_keeps_defaults() {
        let settings = Config::builder()
            .add_source(File::from_str(
                "[mqtt]\nbroker_host = \"broker.example\"\nbroker_port = 1883\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.mqtt.broker_host, "broker.example");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.telemetry_topic, "iot/pi/data");
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
