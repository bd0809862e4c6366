use crate::command_relay::CommandRelay;
use crate::node_store::NodeStore;
use crate::user_store::UserStore;
use chrono::{DateTime, Utc};
use fieldlink_shared::LinkState;
use std::sync::Arc;
use tokio::sync::watch;

/// 应用程序状态
#[derive(Clone)]
pub struct AppState {
    /// 节点状态
    pub store: NodeStore,
    /// 命令下发
    pub relay: CommandRelay,
    /// 用户账户
    pub users: Arc<UserStore>,
    /// MQTT 连接状态
    pub link: watch::Receiver<LinkState>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: NodeStore,
        relay: CommandRelay,
        users: Arc<UserStore>,
        link: watch::Receiver<LinkState>,
    ) -> Self {
        Self {
            store,
            relay,
            users,
            link,
            start_time: Utc::now(),
        }
    }

    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
