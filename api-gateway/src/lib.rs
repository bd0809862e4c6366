// Fieldlink 网关：MQTT 遥测入库 + HTTP 查询与命令下发

pub mod app_state;
pub mod command_relay;
pub mod handlers;
pub mod middleware;
pub mod mqtt;
pub mod node_store;
pub mod user_store;

use axum::{http::HeaderValue, Router};
use fieldlink_shared::ServerConfig;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use app_state::AppState;
use handlers::{health::health_routes, nodes::node_routes, users::user_routes};
use middleware::request_logging;

pub fn create_app(server: &ServerConfig, app_state: AppState) -> Router {
    // 创建中间件层
    let middleware_layer = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_origins))
        .layer(axum::middleware::from_fn(request_logging))
        .into_inner();

    Router::new()
        .merge(health_routes())
        .merge(node_routes())
        .merge(user_routes())
        .layer(middleware_layer)
        .with_state(app_state)
}

/// 未配置来源时允许任意来源且不带凭据，否则只允许列出的来源并携带凭据
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
