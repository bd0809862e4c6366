use axum::{extract::State, response::Json, routing::{get, post}, Router};
use fieldlink_shared::{StatusReply, UserCreate, UserDelete, UserLogin, UserUpdate};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};
use crate::app_state::AppState;
use crate::user_store::{RoleView, UserStoreError};

pub async fn login(
    State(app_state): State<AppState>,
    Json(request): Json<UserLogin>,
) -> Json<Value> {
    match app_state.users.login(&request.username, &request.password).await {
        Some(user) => {
            info!("User {} logged in", user.username);
            Json(json!({ "status": "ok", "user": user }))
        }
        None => {
            warn!("Rejected login for {}", request.username);
            Json(json!(StatusReply::error_msg("Invalid credentials")))
        }
    }
}

pub async fn list_users(State(app_state): State<AppState>) -> Json<BTreeMap<String, RoleView>> {
    Json(app_state.users.list().await)
}

pub async fn add_user(
    State(app_state): State<AppState>,
    Json(request): Json<UserCreate>,
) -> Json<StatusReply> {
    Json(reply(app_state.users.add(request).await))
}

pub async fn update_user(
    State(app_state): State<AppState>,
    Json(request): Json<UserUpdate>,
) -> Json<StatusReply> {
    Json(reply(app_state.users.update(request).await))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    Json(request): Json<UserDelete>,
) -> Json<StatusReply> {
    Json(reply(app_state.users.delete(&request.username).await))
}

fn reply(result: Result<(), UserStoreError>) -> StatusReply {
    match result {
        Ok(()) => StatusReply::ok(),
        // 用户不存在时只返回 status: error
        Err(UserStoreError::UserNotFound) => StatusReply::error(),
        Err(e) => StatusReply::error_msg(e.to_string()),
    }
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route("/add_user", post(add_user))
        .route("/update_user", post(update_user))
        .route("/delete_user", post(delete_user))
}
