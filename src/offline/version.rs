//! Remote version check / 远程版本检查
//!
//! Compares the remote commit sha with the locally persisted marker. The
//! marker is rewritten after every successful check, even when unchanged.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::store::DatasetStore;
use crate::error::{OfflineError, Result};

#[derive(Deserialize)]
struct BranchInfo {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    sha: String,
}

/// Result of one successful check / 一次版本检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    /// Marker found on disk before the check (empty on first run)
    pub previous: String,
    /// Token reported by the remote
    pub observed: String,
}

impl VersionCheck {
    pub fn is_stale(&self) -> bool {
        self.previous != self.observed
    }
}

pub struct VersionChecker {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    store: Arc<DatasetStore>,
}

impl VersionChecker {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration, store: Arc<DatasetStore>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
            store,
        }
    }

    /// Fetch the current remote token / 获取远程版本号
    pub async fn fetch_remote_version(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OfflineError::UnexpectedStatus {
                status,
                url: self.url.clone(),
            });
        }

        let body = response.bytes().await?;
        let info: BranchInfo = serde_json::from_slice(&body)?;
        Ok(info.commit.sha)
    }

    /// Check the remote and persist what was seen / 检查远程版本并写入标记
    ///
    /// `None` when the remote could not be reached or parsed, or the marker
    /// could not be read; callers treat that as "no refresh needed".
    pub async fn check(&self) -> Option<VersionCheck> {
        info!("AnimeOffline: Checking if database is out of date");

        let observed = match self.fetch_remote_version().await {
            Ok(sha) => sha,
            Err(e) => {
                warn!("AnimeOffline: Version check against {} failed: {}", self.url, e);
                return None;
            }
        };

        let previous = match self.store.read_marker().await {
            Ok(marker) => marker,
            Err(e) => {
                warn!("AnimeOffline: Failed to read version marker {:?}: {}", self.store.version_path(), e);
                return None;
            }
        };

        if let Err(e) = self.store.write_marker(&observed).await {
            warn!("AnimeOffline: Failed to write version marker {:?}: {}", self.store.version_path(), e);
        }

        let check = VersionCheck { previous, observed };
        if check.is_stale() {
            info!("AnimeOffline: Database is out of date ({:?} -> {})", check.previous, check.observed);
        } else {
            info!("AnimeOffline: Database is up to date ({})", check.observed);
        }
        Some(check)
    }

    /// True iff the remote token differs from the persisted one / 是否需要刷新
    pub async fn needs_refresh(&self) -> bool {
        self.check().await.map(|c| c.is_stale()).unwrap_or(false)
    }
}
