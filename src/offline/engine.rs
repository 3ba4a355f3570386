//! Search engine - ranked lookups over the published snapshot / 搜索引擎
//!
//! Architecture principle / 架构原则:
//! - The published snapshot is an `Arc` swapped under a short write lock
//! - Queries clone the `Arc` and scan without holding any lock
//! - Snapshot construction never happens here

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::schema::{DatasetEntry, FoldedEntry, IndexSnapshot};

/// Maximum number of entries returned by one query / 单次查询最大结果数
pub const MAX_RESULTS: usize = 10;

/// Match tiers in priority order / 匹配等级（按优先级）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    TitlePrefix = 0,
    SynonymPrefix = 1,
    TitleContains = 2,
    SynonymContains = 3,
}

const TIER_COUNT: usize = 4;

impl FoldedEntry {
    /// Best tier this entry reaches, considering only the first `open` tiers
    fn classify(&self, needle: &str, open: usize) -> Option<MatchTier> {
        if open > 0 && self.title.starts_with(needle) {
            return Some(MatchTier::TitlePrefix);
        }
        if open > 1 && self.synonyms.iter().any(|s| s.starts_with(needle)) {
            return Some(MatchTier::SynonymPrefix);
        }
        if open > 2 && self.title.contains(needle) {
            return Some(MatchTier::TitleContains);
        }
        if open > 3 && self.synonyms.iter().any(|s| s.contains(needle)) {
            return Some(MatchTier::SynonymContains);
        }
        None
    }
}

/// Number of leading tiers that can still contribute a result.
///
/// A new hit in tier `t` lands after everything already in tiers `0..=t`, so
/// tier `t` stays open only while that count is below `limit`.
fn open_tiers(buckets: &[Vec<usize>; TIER_COUNT], limit: usize) -> usize {
    let mut filled = 0;
    for (tier, bucket) in buckets.iter().enumerate() {
        filled += bucket.len();
        if filled >= limit {
            return tier;
        }
    }
    TIER_COUNT
}

/// Rank `snapshot` against `text` / 对快照执行排序检索
///
/// One pass in snapshot order; every entry is placed in at most one tier, so
/// nothing is emitted twice. Output is tier order, then scan order.
pub fn rank(snapshot: &IndexSnapshot, text: &str, limit: usize) -> Vec<DatasetEntry> {
    let needle = text.to_lowercase();
    let mut buckets: [Vec<usize>; TIER_COUNT] = Default::default();

    for (idx, folded) in snapshot.folded().iter().enumerate() {
        let open = open_tiers(&buckets, limit);
        if open == 0 {
            break;
        }
        if let Some(tier) = folded.classify(&needle, open) {
            buckets[tier as usize].push(idx);
        }
    }

    let entries = snapshot.entries();
    buckets
        .iter()
        .flatten()
        .take(limit)
        .map(|&idx| entries[idx].clone())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub publish_count: u64,
    pub last_published: Option<i64>,
}

/// Search engine / 搜索引擎
pub struct SearchEngine {
    current: RwLock<Arc<IndexSnapshot>>,
    stats: Mutex<EngineStats>,
}

impl SearchEngine {
    /// Engine serving the empty snapshot / 创建空索引的搜索引擎
    pub fn new() -> Self {
        Self::with_snapshot(IndexSnapshot::empty())
    }

    pub fn with_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            stats: Mutex::new(EngineStats::default()),
        }
    }

    /// Currently published snapshot / 当前发布的快照
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    /// Ranked lookup, at most [`MAX_RESULTS`] entries / 检索
    pub fn query(&self, text: &str) -> Vec<DatasetEntry> {
        let snapshot = self.snapshot();
        rank(&snapshot, text, MAX_RESULTS)
    }

    /// Atomically replace the published snapshot / 原子替换快照
    pub fn publish(&self, snapshot: impl Into<Arc<IndexSnapshot>>) {
        let snapshot = snapshot.into();
        let entries = snapshot.len();
        let previous = std::mem::replace(&mut *self.current.write(), snapshot);

        {
            let mut stats = self.stats.lock();
            stats.publish_count += 1;
            stats.last_published = Some(chrono::Utc::now().timestamp());
        }

        tracing::debug!("AnimeOffline: Published snapshot ({} -> {} entries)", previous.len(), entries);
        // `previous` is freed here, outside the write lock, unless a reader still holds it
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.lock().clone()
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
