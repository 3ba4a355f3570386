use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ApiResponse, AppState};
use crate::offline::{DatasetEntry, SyncStatus};

/// GET /api/health - 健康检查
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build_time": env!("BUILD_TIME"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<DatasetEntry>,
}

/// GET /api/offline/search?q= - 离线检索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<ApiResponse<SearchResponse>> {
    let results = state.offline.query(&params.q);
    Json(ApiResponse::success(SearchResponse {
        query: params.q,
        results,
    }))
}

#[derive(Debug, Serialize)]
pub struct IndexStatus {
    pub entries: usize,
    pub repository: String,
    pub last_update: String,
    pub built_at: Option<String>,
    pub version: String,
    pub publish_count: u64,
    pub refresh_interval_secs: Option<u64>,
    pub sync: SyncStatus,
}

/// GET /api/offline/status - 索引状态
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<IndexStatus>> {
    let snapshot = state.offline.engine().snapshot();
    let version = match state.offline.store().read_marker().await {
        Ok(marker) => marker,
        Err(e) => {
            tracing::warn!("Failed to read version marker: {}", e);
            String::new()
        }
    };

    Json(ApiResponse::success(IndexStatus {
        entries: snapshot.len(),
        repository: snapshot.source_repository().to_string(),
        last_update: snapshot.last_update().to_string(),
        built_at: snapshot.built_at().map(|t| t.to_rfc3339()),
        version,
        publish_count: state.offline.engine().stats().publish_count,
        refresh_interval_secs: state
            .offline
            .scheduler()
            .map(|scheduler| scheduler.interval().as_secs()),
        sync: state.offline.status(),
    }))
}

/// POST /api/offline/refresh - 手动触发刷新
pub async fn refresh(State(state): State<Arc<AppState>>) -> Json<ApiResponse<()>> {
    let Some(scheduler) = state.offline.scheduler().cloned() else {
        return Json(ApiResponse::unavailable("refresh disabled"));
    };
    tokio::spawn(async move {
        let outcome = scheduler.run_cycle().await;
        tracing::info!("AnimeOffline: Manual refresh finished: {:?}", outcome);
    });
    Json(ApiResponse::accepted("refresh started"))
}
