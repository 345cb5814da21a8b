//! Cache of per-container naming metadata.
//!
//! The cache maps container ids to [`ContainerMetadata`] records and tracks
//! when agent state was last fetched to repair it. One async mutex guards
//! both, so a gather cycle observes the entries and the refresh clock
//! consistently. Contention is negligible: the gather loop is the only
//! steady writer and cycles never overlap.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{ContainerMetadata, ContainerSample, StateSnapshot};

use super::reconcile;

/// Shared container metadata cache
pub struct MetadataCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, ContainerMetadata>,
    /// When a state refresh was last allowed to start. Recorded at
    /// issuance, so a refresh that then fails still holds the interval.
    last_state_refresh: Option<Instant>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                last_state_refresh: None,
            }),
        }
    }

    /// Look up the metadata record for one container.
    pub async fn get(&self, container_id: &str) -> Option<ContainerMetadata> {
        self.inner.lock().await.entries.get(container_id).cloned()
    }

    /// Insert a whole metadata record, replacing any previous one.
    pub async fn insert(&self, metadata: ContainerMetadata) {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(metadata.container_id.clone(), metadata);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// All cached records, ordered by container id.
    pub async fn snapshot(&self) -> Vec<ContainerMetadata> {
        let inner = self.inner.lock().await;
        let mut records: Vec<_> = inner.entries.values().cloned().collect();
        records.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        records
    }

    /// Drop every record whose container is no longer live. Returns the
    /// number of records removed; records for live containers are kept
    /// untouched.
    pub async fn prune(&self, live: &HashSet<String>) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|id, _| live.contains(id));
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(removed, remaining = inner.entries.len(), "Pruned stale cache entries");
        }
        removed
    }

    /// True when the cached ids and the live ids are exactly the same set.
    /// Trivially true when both are empty.
    pub async fn is_consistent(&self, live: &HashSet<String>) -> bool {
        let inner = self.inner.lock().await;
        inner.entries.len() == live.len() && live.iter().all(|id| inner.entries.contains_key(id))
    }

    /// Ask to start a state refresh. Returns true and records the attempt
    /// when no refresh started within the last `min_interval`; returns
    /// false otherwise. The attempt is recorded before its outcome is
    /// known, so failed refreshes are not retried any faster.
    pub async fn begin_state_refresh(&self, min_interval: Duration) -> bool {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let due = match inner.last_state_refresh {
            Some(last) => now.duration_since(last) >= min_interval,
            None => true,
        };
        if due {
            inner.last_state_refresh = Some(now);
        }
        due
    }

    /// Time elapsed since the last state refresh was issued, if any.
    pub async fn last_refresh_age(&self) -> Option<Duration> {
        let inner = self.inner.lock().await;
        inner.last_state_refresh.map(|last| last.elapsed())
    }

    /// Build metadata records for live containers that have none, matching
    /// them against a state snapshot. Existing records are never touched.
    /// Returns the number of records created.
    pub async fn reconcile(&self, live: &[ContainerSample], state: &StateSnapshot) -> usize {
        let mut inner = self.inner.lock().await;
        reconcile::reconcile_into(&mut inner.entries, live, state)
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn record(id: &str) -> ContainerMetadata {
        ContainerMetadata {
            container_id: id.to_string(),
            task_name: format!("task-{id}"),
            executor_name: String::new(),
            framework_name: String::new(),
            task_labels: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = MetadataCache::new();
        assert!(cache.is_empty().await);

        cache.insert(record("abc")).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("abc").await.unwrap().task_name, "task-abc");
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn snapshot_is_sorted_by_container_id() {
        let cache = MetadataCache::new();
        cache.insert(record("zed")).await;
        cache.insert(record("abc")).await;

        let ids: Vec<_> = cache
            .snapshot()
            .await
            .into_iter()
            .map(|r| r.container_id)
            .collect();
        assert_eq!(ids, vec!["abc", "zed"]);
    }

    #[tokio::test]
    async fn prune_removes_only_dead_entries() {
        let cache = MetadataCache::new();
        cache.insert(record("live")).await;
        cache.insert(record("dead")).await;

        let live: HashSet<String> = ["live".to_string()].into_iter().collect();
        assert_eq!(cache.prune(&live).await, 1);
        assert!(cache.get("live").await.is_some());
        assert!(cache.get("dead").await.is_none());

        // A second prune against the same set removes nothing.
        assert_eq!(cache.prune(&live).await, 0);
    }

    #[tokio::test]
    async fn consistency_requires_exact_id_match() {
        let cache = MetadataCache::new();
        let empty = HashSet::new();
        assert!(cache.is_consistent(&empty).await);

        cache.insert(record("abc")).await;
        let live: HashSet<String> = ["abc".to_string()].into_iter().collect();
        assert!(cache.is_consistent(&live).await);

        // Missing live container.
        let more: HashSet<String> =
            ["abc".to_string(), "new".to_string()].into_iter().collect();
        assert!(!cache.is_consistent(&more).await);

        // Orphan cache entry: same cardinality, different ids.
        cache.insert(record("orphan")).await;
        assert!(!cache.is_consistent(&more).await);
    }

    #[tokio::test(start_paused = true)]
    async fn state_refresh_honors_min_interval() {
        let cache = MetadataCache::new();
        let min = Duration::from_secs(60);

        assert!(cache.begin_state_refresh(min).await);
        assert!(!cache.begin_state_refresh(min).await);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!cache.begin_state_refresh(min).await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.begin_state_refresh(min).await);
    }
}
