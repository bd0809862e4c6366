use crate::mqtt::CommandPublisher;
use crate::node_store::NodeStore;
use fieldlink_shared::{DeviceCommand, ThresholdKind, Thresholds};
use std::sync::Arc;
use tracing::{info, warn};

/// 命令中继：发布设备命令并同步节点阈值。发布失败只记录日志，不影响返回结果
#[derive(Clone)]
pub struct CommandRelay {
    store: NodeStore,
    publisher: Arc<dyn CommandPublisher>,
    command_topic: String,
}

impl CommandRelay {
    pub fn new(
        store: NodeStore,
        publisher: Arc<dyn CommandPublisher>,
        command_topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            publisher,
            command_topic: command_topic.into(),
        }
    }

    /// 返回已交给 MQTT 客户端的消息内容
    pub fn send_command(&self, device: &str, action: &str) -> String {
        let payload = DeviceCommand::action(device, action).payload();
        self.dispatch(&payload);
        payload
    }

    /// 先温度后气体，每更新一个阈值发布一条命令。未知设备从默认阈值开始
    pub async fn set_limit(
        &self,
        device: &str,
        temp_th: Option<f64>,
        gas_th: Option<f64>,
    ) -> Thresholds {
        let mut thresholds = self.store.get_or_create_thresholds(device).await;

        let updates = [
            (ThresholdKind::Temperature, temp_th),
            (ThresholdKind::Gas, gas_th),
        ];

        for (kind, value) in updates {
            let Some(value) = value else { continue };

            thresholds = self.store.set_threshold(device, kind, value).await;
            self.dispatch(&DeviceCommand::threshold(device, kind, value).payload());
        }

        thresholds
    }

    fn dispatch(&self, payload: &str) {
        match self.publisher.publish(&self.command_topic, payload) {
            Ok(()) => info!("Sent command {:?} on {}", payload, self.command_topic),
            Err(e) => warn!("Command {:?} not delivered: {}", payload, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::PublishError;
    use fieldlink_shared::LinkState;
    use std::sync::Mutex;

    /// 记录发布内容，不连接 broker
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub sent: Mutex<Vec<(String, String)>>,
        pub offline: bool,
    }

    impl RecordingPublisher {
        pub fn payloads(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, payload)| payload.clone())
                .collect()
        }
    }

    impl CommandPublisher for RecordingPublisher {
        fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
            if self.offline {
                return Err(PublishError::NotConnected(LinkState::Disconnected));
            }
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn relay(publisher: Arc<RecordingPublisher>) -> (CommandRelay, NodeStore) {
        let store = NodeStore::new();
        (CommandRelay::new(store.clone(), publisher, "iot/pi/command"), store)
    }

    #[test]
    fn test_send_command_formats_and_publishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (relay, _) = relay(publisher.clone());

        let sent = relay.send_command("N2", "turn_on");

        assert_eq!(sent, "N2:turn on");
        assert_eq!(
            publisher.sent.lock().unwrap().as_slice(),
            &[("iot/pi/command".to_string(), "N2:turn on".to_string())]
        );
    }

    #[test]
    fn test_send_command_reports_payload_when_offline() {
        let publisher = Arc::new(RecordingPublisher {
            offline: true,
            ..Default::default()
        });
        let (relay, _) = relay(publisher.clone());

        assert_eq!(relay.send_command("N9", "LIGHT_ON"), "N9:LIGHT ON");
        assert!(publisher.payloads().is_empty());
    }

    #[tokio::test]
    async fn test_set_limit_partial_updates() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (relay, store) = relay(publisher.clone());

        let after_temp = relay.set_limit("N1", Some(31.0), None).await;
        assert_eq!(after_temp, Thresholds { temp_th: 31.0, gas_th: 1.2 });

        let after_gas = relay.set_limit("N1", None, Some(1.5)).await;
        assert_eq!(after_gas, Thresholds { temp_th: 31.0, gas_th: 1.5 });

        assert_eq!(store.thresholds("N1").await, Some(after_gas));
        assert_eq!(publisher.payloads(), vec!["N1:TEMP=31.0", "N1:GAS=1.5"]);
    }

    #[tokio::test]
    async fn test_set_limit_both_publishes_twice() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (relay, _) = relay(publisher.clone());

        let limits = relay.set_limit("N3", Some(28.5), Some(0.7)).await;

        assert_eq!(limits, Thresholds { temp_th: 28.5, gas_th: 0.7 });
        assert_eq!(publisher.payloads(), vec!["N3:TEMP=28.5", "N3:GAS=0.7"]);
    }

    #[tokio::test]
    async fn test_set_limit_without_values_registers_defaults() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (relay, store) = relay(publisher.clone());

        let limits = relay.set_limit("fresh", None, None).await;

        assert_eq!(limits, Thresholds::default());
        assert_eq!(store.thresholds("fresh").await, Some(Thresholds::default()));
        assert!(publisher.payloads().is_empty());
    }

    #[tokio::test]
    async fn test_set_limit_updates_store_when_offline() {
        let publisher = Arc::new(RecordingPublisher {
            offline: true,
            ..Default::default()
        });
        let (relay, store) = relay(publisher);

        relay.set_limit("N1", Some(45.0), None).await;

        assert_eq!(store.thresholds("N1").await.map(|t| t.temp_th), Some(45.0));
    }
}
