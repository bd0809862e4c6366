use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use crate::app_state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Backend working!" }))
}

// 健康检查
pub async fn health_check(State(app_state): State<AppState>) -> Json<Value> {
    let node_count = app_state.store.node_count().await;

    Json(json!({
        "status": "healthy",
        "service": "fieldlink-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "mqtt": app_state.link_state(),
        "nodes": node_count,
        "uptime_seconds": app_state.uptime_seconds(),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
