//! HTTP lookup surface for the offline index / 离线索引HTTP接口

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::offline::OfflineIndex;

/// Shared state for handlers / 处理器共享状态
pub struct AppState {
    pub offline: Arc<OfflineIndex>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn unavailable(message: &str) -> Self {
        Self {
            code: 503,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn accepted(message: &str) -> Self {
        Self {
            code: 202,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Build the API router / 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/offline/search", get(handlers::search))
        .route("/api/offline/status", get(handlers::status))
        .route("/api/offline/refresh", post(handlers::refresh))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
