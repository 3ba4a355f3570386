//! Local persistence for the dataset blob and version marker / 数据集与版本标记的本地存储
//!
//! Two artifacts live under the cache directory:
//! - the raw dataset blob, written through a staging file and renamed into place
//! - a plain-text version marker (absent on first run)

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::config::AppConfig;
use crate::error::{OfflineError, Result};

pub struct DatasetStore {
    dataset_path: PathBuf,
    version_path: PathBuf,
}

impl DatasetStore {
    pub fn new(dataset_path: impl Into<PathBuf>, version_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            version_path: version_path.into(),
        }
    }

    /// Store rooted in a directory with the default file names / 使用默认文件名
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let defaults = AppConfig::default();
        let dir = dir.as_ref();
        Self::new(
            dir.join(&defaults.cache.dataset_file),
            dir.join(&defaults.cache.version_file),
        )
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.get_dataset_path(), config.get_version_path())
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn version_path(&self) -> &Path {
        &self.version_path
    }

    /// Create the parent directories of both artifacts / 创建缓存目录
    pub async fn ensure_dirs(&self) -> Result<()> {
        for path in [&self.dataset_path, &self.version_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn has_dataset(&self) -> bool {
        tokio::fs::try_exists(&self.dataset_path).await.unwrap_or(false)
    }

    /// Read the raw dataset blob / 读取数据集原始内容
    pub async fn read_dataset(&self) -> Result<Vec<u8>> {
        match tokio::fs::read(&self.dataset_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(OfflineError::DatasetMissing(self.dataset_path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a staged writer for a new blob / 打开暂存写入器
    ///
    /// The canonical file is only replaced by [`DatasetWriter::commit`].
    pub async fn begin_write(&self) -> Result<DatasetWriter> {
        self.ensure_dirs().await?;
        let staging_path = staging_path(&self.dataset_path);
        let file = tokio::fs::File::create(&staging_path).await?;
        Ok(DatasetWriter {
            file: Some(file),
            staging_path,
            target_path: self.dataset_path.clone(),
            written: 0,
        })
    }

    /// Read the last persisted version marker, empty when absent / 读取版本标记
    pub async fn read_marker(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.version_path).await {
            Ok(marker) => Ok(marker.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the version marker / 写入版本标记
    pub async fn write_marker(&self, marker: &str) -> Result<()> {
        self.ensure_dirs().await?;
        tokio::fs::write(&self.version_path, marker.as_bytes()).await?;
        Ok(())
    }

    /// Remove the version marker; missing is fine / 删除版本标记
    pub async fn clear_marker(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.version_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Staged dataset write / 数据集暂存写入
///
/// Dropping without `commit` discards the staging file.
pub struct DatasetWriter {
    file: Option<tokio::fs::File>,
    staging_path: PathBuf,
    target_path: PathBuf,
    written: u64,
}

impl DatasetWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
            self.written += chunk.len() as u64;
        }
        Ok(())
    }

    /// Flush and move the staged blob over the canonical path / 提交并替换正式文件
    pub async fn commit(mut self) -> Result<u64> {
        let file = self.file.take();
        let result = async {
            if let Some(mut file) = file {
                file.flush().await?;
                file.sync_all().await?;
            }
            tokio::fs::rename(&self.staging_path, &self.target_path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&self.staging_path).await;
            return Err(e.into());
        }
        Ok(self.written)
    }
}

impl Drop for DatasetWriter {
    fn drop(&mut self) {
        // Still holding the file means commit never ran
        if self.file.take().is_some() {
            let _ = std::fs::remove_file(&self.staging_path);
        }
    }
}
