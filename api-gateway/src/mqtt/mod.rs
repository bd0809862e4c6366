// MQTT 集成模块：遥测订阅、入库和命令下发

pub mod client;
pub mod ingest;

pub use client::{decode_telemetry, CommandPublisher, GatewayMqttClient, MqttPublisher, PublishError};
pub use ingest::spawn_ingest_worker;
