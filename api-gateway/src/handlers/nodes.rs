use axum::{extract::State, response::Json, routing::{get, post}, Router};
use fieldlink_shared::{CommandRequest, CommandResponse, LatestRecord, LimitUpdateRequest, LimitsResponse};
use std::collections::HashMap;
use tracing::info;
use crate::app_state::AppState;

// 获取所有节点的最新数据
pub async fn realtime(State(app_state): State<AppState>) -> Json<HashMap<String, LatestRecord>> {
    Json(app_state.store.snapshot().await)
}

// 下发设备命令
pub async fn send_command(
    State(app_state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let sent = app_state.relay.send_command(&request.device, &request.action);

    Json(CommandResponse {
        status: "ok".to_string(),
        sent,
    })
}

// 更新节点阈值
pub async fn set_limits(
    State(app_state): State<AppState>,
    Json(request): Json<LimitUpdateRequest>,
) -> Json<LimitsResponse> {
    info!(
        "Limit update for {}: temp_th={:?} gas_th={:?}",
        request.device, request.temp_th, request.gas_th
    );

    let limits = app_state
        .relay
        .set_limit(&request.device, request.temp_th, request.gas_th)
        .await;

    Json(LimitsResponse {
        status: "ok".to_string(),
        limits,
    })
}

pub fn node_routes() -> Router<AppState> {
    Router::new()
        .route("/realtime", get(realtime))
        .route("/command", post(send_command))
        .route("/set_limits", post(set_limits))
}
