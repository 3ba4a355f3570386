//! Process-wide index entry points. Kept in their own test binary so the
//! global index starts uninitialized.

use std::sync::Arc;

use tempfile::TempDir;

use saika_index::config::AppConfig;
use saika_index::offline::get_offline_index;
use saika_index::{initialize_index, search};

const DATASET: &str = r#"{
    "repository": "https://github.com/manami-project/anime-offline-database",
    "lastUpdate": "2024-01-06",
    "data": [
        {"title": "Naruto", "synonyms": ["ナルト"]},
        {"title": "Bleach", "synonyms": []}
    ]
}"#;

#[tokio::test]
async fn global_index_serves_cache_after_initialization() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("CACHE_DIR", dir.path());

    let mut config = AppConfig::default();
    config.offline.enabled = false;
    std::fs::write(config.get_dataset_path(), DATASET).unwrap();

    assert!(get_offline_index().is_none());
    assert!(search("naruto").is_empty());

    let first = initialize_index(&config).await;
    let results = search("naruto");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title(), "Naruto");

    let second = initialize_index(&config).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.engine().stats().publish_count, 1);
}
