use fieldlink_shared::{LatestRecord, SensorReading, ThresholdKind, Thresholds};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 节点状态：阈值和最新合并读数（节点上报过遥测后才有）
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub thresholds: Thresholds,
    pub latest: Option<LatestRecord>,
}

/// 内存节点存储，由遥测入库任务和 HTTP 处理器共享，克隆后指向同一份数据
///
/// 节点不会被淘汰
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Arc<RwLock<HashMap<String, NodeState>>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // 获取或创建节点阈值
    pub async fn get_or_create_thresholds(&self, node: &str) -> Thresholds {
        if let Some(state) = self.nodes.read().await.get(node) {
            return state.thresholds;
        }

        let mut nodes = self.nodes.write().await;
        nodes
            .entry(node.to_string())
            .or_insert_with(|| {
                debug!("Registering node {} with default thresholds", node);
                NodeState::default()
            })
            .thresholds
    }

    // 记录最新读数
    pub async fn record_reading(&self, node: &str, reading: SensorReading, thresholds: Thresholds) {
        let mut nodes = self.nodes.write().await;
        let state = nodes.entry(node.to_string()).or_default();
        state.latest = Some(LatestRecord::merge(reading, thresholds));
    }

    /// 更新单个阈值，节点不存在时先以默认值创建，同时刷新最新记录中的阈值
    pub async fn set_threshold(&self, node: &str, kind: ThresholdKind, value: f64) -> Thresholds {
        let mut nodes = self.nodes.write().await;
        let state = nodes.entry(node.to_string()).or_default();

        state.thresholds.set(kind, value);
        if let Some(latest) = state.latest.as_mut() {
            latest.thresholds = state.thresholds;
        }

        state.thresholds
    }

    /// 写入一条遥测：获取阈值、合并、记录在同一个写锁内完成，不修改阈值
    pub async fn ingest(&self, reading: SensorReading) {
        let mut nodes = self.nodes.write().await;
        let state = nodes.entry(reading.node.clone()).or_default();
        let thresholds = state.thresholds;
        state.latest = Some(LatestRecord::merge(reading, thresholds));
    }

    /// 所有已上报遥测节点的最新记录
    pub async fn snapshot(&self) -> HashMap<String, LatestRecord> {
        self.nodes
            .read()
            .await
            .iter()
            .filter_map(|(node, state)| state.latest.clone().map(|latest| (node.clone(), latest)))
            .collect()
    }

    pub async fn thresholds(&self, node: &str) -> Option<Thresholds> {
        self.nodes.read().await.get(node).map(|state| state.thresholds)
    }

    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }
}
