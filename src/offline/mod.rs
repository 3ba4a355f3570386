//! Offline title index / 离线作品索引
//!
//! Keeps a local mirror of the anime offline database and answers ranked
//! title lookups without any per-query network call.
//!
//! Components / 组件:
//! - `store`: dataset blob + version marker on disk
//! - `version`: remote change detection
//! - `downloader`: streaming fetch of the blob
//! - `schema`: parsing, fingerprints, immutable snapshots
//! - `engine`: published snapshot + ranked search
//! - `scheduler`: serialized refresh cycles on startup and on a timer

pub mod downloader;
pub mod engine;
pub mod scheduler;
pub mod schema;
pub mod store;
pub mod version;

pub use downloader::Downloader;
pub use engine::{SearchEngine, MAX_RESULTS};
pub use scheduler::{CycleOutcome, RefreshScheduler, SyncStatus};
pub use schema::{Dataset, DatasetEntry, IndexSnapshot};
pub use store::DatasetStore;
pub use version::{VersionCheck, VersionChecker};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::{AppConfig, OfflineConfig};
use crate::error::{OfflineError, Result};

/// Read and parse the stored blob into a fresh snapshot / 从本地加载快照
///
/// Parsing runs on the blocking pool; nothing already published is touched.
pub async fn load_snapshot(store: &DatasetStore) -> Result<IndexSnapshot> {
    let bytes = store.read_dataset().await?;
    tokio::task::spawn_blocking(move || IndexSnapshot::from_slice(&bytes)).await?
}

/// Shared HTTP client for version checks and downloads / 共享HTTP客户端
pub fn build_http_client(config: &OfflineConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Offline index: engine plus its refresh machinery / 离线索引
pub struct OfflineIndex {
    store: Arc<DatasetStore>,
    engine: Arc<SearchEngine>,
    /// `None` when no HTTP client could be built; the engine still serves the cache
    scheduler: Option<Arc<RefreshScheduler>>,
    run_scheduler: bool,
    initialized: AtomicBool,
}

impl OfflineIndex {
    /// Build from configuration; a client build failure disables refresh / 按配置构建
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(DatasetStore::from_config(config)), config)
    }

    /// Same as [`from_config`](Self::from_config) over an explicit store
    pub fn with_store(store: impl Into<Arc<DatasetStore>>, config: &AppConfig) -> Self {
        let store = store.into();
        let client = match build_http_client(&config.offline) {
            Ok(client) => client,
            Err(e) => {
                error!("AnimeOffline: Failed to build HTTP client, refresh disabled: {}", e);
                return Self::local_only(store);
            }
        };
        let checker = VersionChecker::new(
            client.clone(),
            config.offline.version_url.clone(),
            config.offline.request_timeout(),
            store.clone(),
        );
        let downloader = Downloader::new(
            client,
            config.offline.dataset_url.clone(),
            config.offline.download_timeout(),
        );
        Self::with_parts(
            store,
            checker,
            downloader,
            config.offline.refresh_interval(),
            config.offline.enabled,
        )
    }

    pub fn with_parts(
        store: Arc<DatasetStore>,
        checker: VersionChecker,
        downloader: Downloader,
        interval: Duration,
        run_scheduler: bool,
    ) -> Self {
        let engine = Arc::new(SearchEngine::new());
        let scheduler = Arc::new(RefreshScheduler::new(
            store.clone(),
            checker,
            downloader,
            engine.clone(),
            interval,
        ));
        Self {
            store,
            engine,
            scheduler: Some(scheduler),
            run_scheduler,
            initialized: AtomicBool::new(false),
        }
    }

    /// Index that only serves what is already on disk / 仅使用本地缓存
    pub fn local_only(store: Arc<DatasetStore>) -> Self {
        Self {
            store,
            engine: Arc::new(SearchEngine::new()),
            scheduler: None,
            run_scheduler: false,
            initialized: AtomicBool::new(false),
        }
    }

    /// Load from disk and start refreshing; later calls are no-ops / 初始化索引
    ///
    /// Returns `false` when already initialized.
    pub async fn initialize(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("AnimeOffline: Initializing database");

        if let Err(e) = self.store.ensure_dirs().await {
            warn!("AnimeOffline: Failed to create cache directory: {}", e);
        }

        match load_snapshot(&self.store).await {
            Ok(snapshot) => {
                info!("AnimeOffline: Loaded {} anime entries from cache", snapshot.len());
                self.engine.publish(snapshot);
            }
            Err(OfflineError::DatasetMissing(path)) => {
                info!("AnimeOffline: No cached database at {:?}, starting empty", path);
            }
            Err(e) => {
                warn!("AnimeOffline: Failed to load cached database: {}", e);
            }
        }

        match &self.scheduler {
            Some(scheduler) if self.run_scheduler => {
                scheduler.clone().start();
            }
            _ => info!("AnimeOffline: Background refresh disabled"),
        }
        true
    }

    /// Ranked lookup against the current snapshot / 检索
    pub fn query(&self, text: &str) -> Vec<DatasetEntry> {
        self.engine.query(text)
    }

    pub fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    pub fn scheduler(&self) -> Option<&Arc<RefreshScheduler>> {
        self.scheduler.as_ref()
    }

    pub fn status(&self) -> SyncStatus {
        self.scheduler
            .as_ref()
            .map(|scheduler| scheduler.status())
            .unwrap_or_default()
    }
}

static OFFLINE_INDEX: OnceCell<Arc<OfflineIndex>> = OnceCell::new();

/// Initialize the process-wide index (idempotent) / 初始化全局离线索引
pub async fn initialize_index(config: &AppConfig) -> Arc<OfflineIndex> {
    let index = OFFLINE_INDEX
        .get_or_init(|| Arc::new(OfflineIndex::from_config(config)))
        .clone();
    index.initialize().await;
    index
}

pub fn get_offline_index() -> Option<Arc<OfflineIndex>> {
    OFFLINE_INDEX.get().cloned()
}

/// Query the process-wide index; empty before initialization / 全局检索
pub fn search(text: &str) -> Vec<DatasetEntry> {
    get_offline_index()
        .map(|index| index.query(text))
        .unwrap_or_default()
}
