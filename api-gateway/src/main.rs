use anyhow::Result;
use fieldlink_gateway::{
    app_state::AppState,
    command_relay::CommandRelay,
    create_app,
    mqtt::{spawn_ingest_worker, GatewayMqttClient},
    node_store::NodeStore,
    user_store::UserStore,
};
use fieldlink_shared::load_config;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 加载配置
    let config = load_config()?;
    info!("Configuration loaded successfully");

    let store = NodeStore::new();
    let users = Arc::new(UserStore::load(&config.users.file).await);

    // 创建 MQTT 客户端
    let (mqtt_client, event_loop) = GatewayMqttClient::new(config.mqtt.clone());
    let publisher = Arc::new(mqtt_client.publisher());
    let link = mqtt_client.link_state();

    let (reading_tx, reading_rx) = mpsc::unbounded_channel();
    spawn_ingest_worker(store.clone(), reading_rx);
    mqtt_client.start(event_loop, reading_tx);

    let relay = CommandRelay::new(store.clone(), publisher, config.mqtt.command_topic.clone());
    let app_state = AppState::new(store, relay, users, link);

    let app = create_app(&config.server, app_state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
