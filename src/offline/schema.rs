//! Dataset schema and index snapshot / 数据集结构与索引快照

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// One media title with its alternate names / 单个作品条目
///
/// The fingerprint is derived from the title and synonyms when the entry is
/// built and is never read from the blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry")]
pub struct DatasetEntry {
    title: String,
    synonyms: Vec<String>,
    fingerprint: String,
}

/// Entry as it appears in the dataset file; extra fields are ignored
#[derive(Deserialize)]
struct RawEntry {
    title: String,
    #[serde(default)]
    synonyms: Vec<String>,
}

impl From<RawEntry> for DatasetEntry {
    fn from(raw: RawEntry) -> Self {
        Self::new(raw.title, raw.synonyms)
    }
}

impl DatasetEntry {
    pub fn new(title: impl Into<String>, synonyms: Vec<String>) -> Self {
        let title = title.into();
        let fingerprint = fingerprint(&title, &synonyms);
        Self {
            title,
            synonyms,
            fingerprint,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    /// Hex sha256 over title followed by every synonym, in order
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Content hash of an entry: sha256(title ++ synonyms[0] ++ synonyms[1] ++ ...)
pub fn fingerprint(title: &str, synonyms: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    for synonym in synonyms {
        hasher.update(synonym.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Parsed remote dataset / 解析后的远程数据集
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub license: BTreeMap<String, String>,
    #[serde(default, rename = "repository")]
    pub source_repository: String,
    #[serde(default, rename = "lastUpdate")]
    pub last_update: String,
    #[serde(rename = "data")]
    pub entries: Vec<DatasetEntry>,
}

impl Dataset {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Lower-cased copy of an entry's searchable text / 条目的小写检索文本
#[derive(Debug, Clone)]
pub(crate) struct FoldedEntry {
    pub(crate) title: String,
    pub(crate) synonyms: Vec<String>,
}

impl FoldedEntry {
    fn of(entry: &DatasetEntry) -> Self {
        Self {
            title: entry.title.to_lowercase(),
            synonyms: entry.synonyms.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

/// Immutable, searchable index state / 不可变的可检索索引快照
///
/// Built entirely off to the side and then published in one swap; never
/// edited after construction.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    entries: Vec<DatasetEntry>,
    folded: Vec<FoldedEntry>,
    source_repository: String,
    last_update: String,
    license: BTreeMap<String, String>,
    built_at: Option<DateTime<Utc>>,
}

impl IndexSnapshot {
    /// Snapshot served before the first successful load / 首次加载前的空快照
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            folded: Vec::new(),
            source_repository: String::new(),
            last_update: String::new(),
            license: BTreeMap::new(),
            built_at: None,
        }
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let folded = dataset.entries.iter().map(FoldedEntry::of).collect();
        Self {
            entries: dataset.entries,
            folded,
            source_repository: dataset.source_repository,
            last_update: dataset.last_update,
            license: dataset.license,
            built_at: Some(Utc::now()),
        }
    }

    /// Decode a raw dataset blob into a snapshot / 从原始数据构建快照
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Dataset::from_slice(bytes).map(Self::from_dataset)
    }

    pub fn from_entries(entries: Vec<DatasetEntry>) -> Self {
        Self::from_dataset(Dataset {
            entries,
            ..Dataset::default()
        })
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub(crate) fn folded(&self) -> &[FoldedEntry] {
        &self.folded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_repository(&self) -> &str {
        &self.source_repository
    }

    pub fn last_update(&self) -> &str {
        &self.last_update
    }

    pub fn license(&self) -> &BTreeMap<String, String> {
        &self.license
    }

    /// `None` for the empty startup snapshot
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }
}

impl Default for IndexSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
