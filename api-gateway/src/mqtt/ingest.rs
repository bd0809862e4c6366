use crate::node_store::NodeStore;
use fieldlink_shared::SensorReading;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 遥测入库任务：按到达顺序逐条写入节点存储，所有发送端关闭后退出
pub fn spawn_ingest_worker(
    store: NodeStore,
    mut readings: mpsc::UnboundedReceiver<SensorReading>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(reading) = readings.recv().await {
            debug!("Applying reading from node {}", reading.node);
            store.ingest(reading).await;
        }
        info!("Telemetry channel closed, ingest worker stopping");
    })
}
