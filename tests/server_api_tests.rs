use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

use saika_index::offline::{
    DatasetEntry, DatasetStore, Downloader, IndexSnapshot, OfflineIndex, VersionChecker,
};
use saika_index::server::{router, AppState};

/// Index with an unreachable remote and a couple of published entries
fn app(dir: &TempDir) -> axum::Router {
    let store = Arc::new(DatasetStore::in_dir(dir.path()));
    let client = reqwest::Client::new();
    let checker = VersionChecker::new(
        client.clone(),
        "http://127.0.0.1:1/version",
        Duration::from_secs(1),
        store.clone(),
    );
    let downloader = Downloader::new(client, "http://127.0.0.1:1/dataset.json", Duration::from_secs(1));
    let offline = Arc::new(OfflineIndex::with_parts(store, checker, downloader, Duration::from_secs(3600), false));

    offline.engine().publish(IndexSnapshot::from_entries(vec![
        DatasetEntry::new("Great Naruto Bridge", vec!["naruto-extra".to_string()]),
        DatasetEntry::new("Naruto", vec!["ナルト".to_string()]),
        DatasetEntry::new("Bleach", vec![]),
    ]));

    router(Arc::new(AppState { offline }))
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload = serde_json::from_slice(&bytes).expect("response should be valid json");
    (status, payload)
}

#[tokio::test]
async fn health_endpoint_returns_ok_json() {
    let dir = TempDir::new().unwrap();
    let (status, payload) = get_json(app(&dir), "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
}

#[tokio::test]
async fn search_endpoint_returns_ranked_entries() {
    let dir = TempDir::new().unwrap();
    let (status, payload) = get_json(app(&dir), "/api/offline/search?q=NARUTO").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["code"], 200);
    assert_eq!(payload["data"]["query"], "NARUTO");

    let results = payload["data"]["results"]
        .as_array()
        .expect("results should be an array");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "Naruto");
    assert_eq!(results[0]["synonyms"][0], "ナルト");
    assert_eq!(results[0]["fingerprint"].as_str().map(str::len), Some(64));
    assert_eq!(results[1]["title"], "Great Naruto Bridge");
}

#[tokio::test]
async fn search_without_query_lists_first_entries() {
    let dir = TempDir::new().unwrap();
    let (_, payload) = get_json(app(&dir), "/api/offline/search").await;

    let results = payload["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[2]["title"], "Bleach");
}

#[tokio::test]
async fn status_endpoint_reports_index_state() {
    let dir = TempDir::new().unwrap();
    let (status, payload) = get_json(app(&dir), "/api/offline/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["entries"], 3);
    assert_eq!(payload["data"]["version"], "");
    assert_eq!(payload["data"]["publish_count"], 1);
    assert_eq!(payload["data"]["refresh_interval_secs"], 3600);
    assert_eq!(payload["data"]["sync"]["is_running"], false);
    assert_eq!(payload["data"]["sync"]["cycle_count"], 0);
}

#[tokio::test]
async fn refresh_endpoint_accepts_request() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/offline/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["code"], 202);
}

#[tokio::test]
async fn refresh_without_http_client_reports_unavailable() {
    let dir = TempDir::new().unwrap();
    let offline = Arc::new(OfflineIndex::local_only(Arc::new(DatasetStore::in_dir(dir.path()))));
    let app = router(Arc::new(AppState { offline }));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/offline/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["code"], 503);
}
