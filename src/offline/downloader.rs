//! Dataset download / 数据集下载
//!
//! Streams the remote blob chunk by chunk into the store's staging file, so
//! the full body never sits in memory and the old blob survives any failure.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info};

use super::store::DatasetStore;
use crate::error::{OfflineError, Result};

pub struct Downloader {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    /// Download the dataset into `store`, returns bytes written / 下载数据集到本地
    pub async fn fetch_into(&self, store: &DatasetStore) -> Result<u64> {
        info!("AnimeOffline: Downloading database from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OfflineError::UnexpectedStatus {
                status,
                url: self.url.clone(),
            });
        }

        if let Some(len) = response.content_length() {
            debug!("AnimeOffline: Expecting {} bytes", len);
        }

        let mut writer = store.begin_write().await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk?;
            writer.write_chunk(&chunk).await?;
        }
        let written = writer.commit().await?;

        info!("AnimeOffline: Downloaded {} bytes to {:?}", written, store.dataset_path());
        Ok(written)
    }
}
