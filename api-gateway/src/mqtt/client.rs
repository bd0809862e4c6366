use fieldlink_shared::{parse_sensor_message, LinkState, MqttConfig, SensorReading};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, Incoming, Outgoing, Publish, QoS, Transport,
};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("MQTT link is {0}")]
    NotConnected(LinkState),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// 设备命令下发通道，只负责入队，不等待 broker 确认
pub trait CommandPublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

// 网关 MQTT 客户端
pub struct GatewayMqttClient {
    client: AsyncClient,
    config: MqttConfig,
    link_tx: watch::Sender<LinkState>,
    subscribe_pending: AtomicBool,
}

impl GatewayMqttClient {
    pub fn new(config: MqttConfig) -> (Self, EventLoop) {
        let mut mqtt_options = rumqttc::MqttOptions::new(
            config.client_id.clone(),
            &config.broker_host,
            config.broker_port,
        );

        // 设置认证信息
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username, password);
        }

        if config.use_tls {
            mqtt_options.set_transport(Transport::tls_with_default_config());
        }

        mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        mqtt_options.set_clean_session(config.clean_session);

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (link_tx, _) = watch::channel(LinkState::Disconnected);

        (
            Self {
                client,
                config,
                link_tx,
                subscribe_pending: AtomicBool::new(false),
            },
            event_loop,
        )
    }

    pub fn link_state(&self) -> watch::Receiver<LinkState> {
        self.link_tx.subscribe()
    }

    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
            link: self.link_tx.subscribe(),
        }
    }

    /// 启动网络循环，解析后的遥测数据发送到 `readings`
    pub fn start(
        self,
        mut event_loop: EventLoop,
        readings: mpsc::UnboundedSender<SensorReading>,
    ) -> JoinHandle<()> {
        info!(
            "Starting MQTT listener for {}:{} (tls: {})",
            self.config.broker_host, self.config.broker_port, self.config.use_tls
        );

        tokio::spawn(async move {
            self.run_event_loop(&mut event_loop, &readings).await;
        })
    }

    // 运行事件循环
    async fn run_event_loop(
        &self,
        event_loop: &mut EventLoop,
        readings: &mpsc::UnboundedSender<SensorReading>,
    ) {
        let reconnect_delay = Duration::from_millis(self.config.reconnect_interval_ms);
        self.set_link(LinkState::Connecting);

        loop {
            match event_loop.poll().await {
                Ok(event) => {
                    if self.handle_event(event, readings).is_break() {
                        return;
                    }
                }
                Err(e) => {
                    self.handle_connection_error(&e);
                    tokio::time::sleep(reconnect_delay).await;
                    self.set_link(LinkState::Connecting);
                }
            }
        }
    }

    // 处理单个 MQTT 事件，接收端关闭时返回 Break
    fn handle_event(
        &self,
        event: Event,
        readings: &mpsc::UnboundedSender<SensorReading>,
    ) -> ControlFlow<()> {
        match event {
            Event::Incoming(Incoming::ConnAck(connack)) => {
                info!("MQTT connection established: {:?}", connack.code);
                self.set_link(LinkState::Connected);
                self.subscribe_pending.store(true, Ordering::SeqCst);
            }
            Event::Incoming(Incoming::SubAck(suback)) => {
                info!(
                    "Subscribed to telemetry topic {} ({:?})",
                    self.config.telemetry_topic, suback.return_codes
                );
                self.set_link(LinkState::Subscribed);
            }
            Event::Incoming(Incoming::Publish(publish)) => {
                if let Some(reading) = decode_telemetry(&publish, &self.config.telemetry_topic) {
                    if readings.send(reading).is_err() {
                        error!("Ingest worker stopped, MQTT listener exiting");
                        self.set_link(LinkState::Disconnected);
                        return ControlFlow::Break(());
                    }
                }
            }
            Event::Incoming(Incoming::Disconnect) => {
                warn!("MQTT broker initiated disconnect");
                self.set_link(LinkState::Disconnected);
                self.subscribe_pending.store(false, Ordering::SeqCst);
            }
            Event::Incoming(other) => {
                debug!("Received MQTT packet: {:?}", other);
            }
            Event::Outgoing(Outgoing::Publish(pkid)) => {
                debug!("Message published to MQTT broker (pkid {})", pkid);
            }
            Event::Outgoing(_) => {}
        }

        self.flush_subscribe();
        ControlFlow::Continue(())
    }

    fn handle_connection_error(&self, e: &ConnectionError) {
        error!(
            "MQTT connection error: {}, retrying in {}ms",
            e, self.config.reconnect_interval_ms
        );
        self.set_link(LinkState::Disconnected);
        self.subscribe_pending.store(false, Ordering::SeqCst);
    }

    // 请求队列已满时订阅失败，下一个事件时重试
    fn flush_subscribe(&self) {
        if !self.subscribe_pending.load(Ordering::SeqCst) {
            return;
        }

        match self
            .client
            .try_subscribe(self.config.telemetry_topic.as_str(), QoS::AtMostOnce)
        {
            Ok(()) => {
                debug!("Subscription to {} queued", self.config.telemetry_topic);
                self.subscribe_pending.store(false, Ordering::SeqCst);
            }
            Err(e) => {
                warn!(
                    "Failed to subscribe to {}, will retry: {}",
                    self.config.telemetry_topic, e
                );
            }
        }
    }

    fn set_link(&self, state: LinkState) {
        self.link_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            info!("MQTT link {} -> {}", current, state);
            *current = state;
            true
        });
    }
}

/// 将入站消息解析为读数。主题不匹配订阅过滤器、非 UTF-8 或无法解析的消息返回 `None`
pub fn decode_telemetry(publish: &Publish, telemetry_topic: &str) -> Option<SensorReading> {
    if !rumqttc::matches(&publish.topic, telemetry_topic) {
        debug!("Ignoring MQTT message on topic {}", publish.topic);
        return None;
    }

    let raw = match std::str::from_utf8(&publish.payload) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Dropping non UTF-8 telemetry payload: {}", e);
            return None;
        }
    };

    match parse_sensor_message(raw) {
        Ok(reading) => {
            debug!("Telemetry from {}: {} fields", reading.node, reading.fields.len());
            Some(reading)
        }
        Err(e) => {
            warn!("Dropping telemetry {:?}: {}", raw, e);
            None
        }
    }
}

// 命令发布器
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    link: watch::Receiver<LinkState>,
}

impl CommandPublisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        let state = *self.link.borrow();
        if !state.can_publish() {
            return Err(PublishError::NotConnected(state));
        }

        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())?;

        Ok(())
    }
}
