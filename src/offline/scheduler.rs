//! Refresh scheduler / 刷新调度器
//!
//! Drives the refresh cycle: once at startup and then on a fixed interval.
//! A cycle is check → download → load → publish. Cycles never overlap; a
//! trigger that arrives while one is running waits for it to finish.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use super::downloader::Downloader;
use super::engine::SearchEngine;
use super::load_snapshot;
use super::store::DatasetStore;
use super::version::{VersionCheck, VersionChecker};

/// How a refresh cycle ended / 刷新周期结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CycleOutcome {
    /// Remote version unchanged / 远程版本未变化
    UpToDate,
    /// New snapshot published / 已发布新快照
    Refreshed { entries: usize },
    /// Version endpoint unreachable or unreadable
    CheckFailed,
    /// Download failed, previous blob kept
    FetchFailed,
    /// Blob could not be parsed, previous snapshot kept
    LoadFailed,
}

/// Sync progress reported to callers / 同步状态
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub is_running: bool,
    pub cycle_count: u64,
    pub refresh_count: u64,
    pub last_checked_at: Option<i64>,
    pub last_refreshed_at: Option<i64>,
    pub last_outcome: Option<CycleOutcome>,
    pub last_error: Option<String>,
}

pub struct RefreshScheduler {
    store: Arc<DatasetStore>,
    checker: VersionChecker,
    downloader: Downloader,
    engine: Arc<SearchEngine>,
    interval: Duration,
    cycle_lock: Mutex<()>,
    status: RwLock<SyncStatus>,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<DatasetStore>,
        checker: VersionChecker,
        downloader: Downloader,
        engine: Arc<SearchEngine>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            checker,
            downloader,
            engine,
            interval,
            cycle_lock: Mutex::new(()),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    /// Run one refresh cycle, waiting for any cycle already in flight / 执行一次刷新
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.cycle_lock.lock().await;
        self.status.write().is_running = true;

        let (outcome, failure) = self.refresh().await;

        let now = Utc::now().timestamp();
        let mut status = self.status.write();
        status.is_running = false;
        status.cycle_count += 1;
        status.last_checked_at = Some(now);
        status.last_outcome = Some(outcome);
        if let CycleOutcome::Refreshed { .. } = outcome {
            status.refresh_count += 1;
            status.last_refreshed_at = Some(now);
        }
        status.last_error = failure;
        outcome
    }

    async fn refresh(&self) -> (CycleOutcome, Option<String>) {
        // A marker without a blob would report "up to date" forever
        if !self.store.has_dataset().await {
            if let Err(e) = self.store.clear_marker().await {
                warn!("AnimeOffline: Failed to clear stale version marker: {}", e);
            }
        }

        let check = match self.checker.check().await {
            Some(check) => check,
            None => return (CycleOutcome::CheckFailed, Some("version check failed".to_string())),
        };
        if !check.is_stale() {
            return (CycleOutcome::UpToDate, None);
        }

        if let Err(e) = self.downloader.fetch_into(&self.store).await {
            let origin = if e.is_remote() { "remote" } else { "local" };
            error!("AnimeOffline: Failed to download database ({}): {}", origin, e);
            self.rollback_marker(&check).await;
            return (CycleOutcome::FetchFailed, Some(e.to_string()));
        }

        match load_snapshot(&self.store).await {
            Ok(snapshot) => {
                let entries = snapshot.len();
                self.engine.publish(snapshot);
                info!("AnimeOffline: Loaded {} anime entries", entries);
                (CycleOutcome::Refreshed { entries }, None)
            }
            Err(e) => {
                error!("AnimeOffline: Failed to load downloaded database: {}", e);
                self.rollback_marker(&check).await;
                (CycleOutcome::LoadFailed, Some(e.to_string()))
            }
        }
    }

    /// Restore the pre-check marker so the next cycle tries again
    async fn rollback_marker(&self, check: &VersionCheck) {
        let result = if check.previous.is_empty() {
            self.store.clear_marker().await
        } else {
            self.store.write_marker(&check.previous).await
        };
        if let Err(e) = result {
            warn!("AnimeOffline: Failed to restore version marker: {}", e);
        }
    }

    /// Spawn the startup cycle and the periodic loop / 启动调度
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let startup = self.clone();
        tokio::spawn(async move {
            let outcome = startup.run_cycle().await;
            info!("AnimeOffline: Startup refresh finished: {:?}", outcome);
        });

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("AnimeOffline: Refresh scheduled every {:?}", self.interval);

            loop {
                ticker.tick().await;
                let outcome = self.run_cycle().await;
                info!("AnimeOffline: Scheduled refresh finished: {:?}", outcome);
            }
        })
    }
}
