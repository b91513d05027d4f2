// ── Queries registry ──
//
// Map from cache key to live query. Invariant: a query is present iff it
// has not been disposed. `delete` disposes before removing, and a query
// disposed directly evicts itself through its dispose hook.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::keys::CacheKey;
use crate::query::Query;

#[derive(Debug, Default)]
pub(crate) struct QueryRegistry {
    queries: DashMap<CacheKey, Arc<Query>>,
}

impl QueryRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lookup without creating.
    pub(crate) fn peek(&self, key: &CacheKey) -> Option<Arc<Query>> {
        self.queries.get(key).map(|entry| Arc::clone(&entry))
    }

    /// Get or create. `create` runs at most once per key even under
    /// concurrent callers; everyone receives the same instance. The
    /// shard lock of the underlying map provides the exclusion.
    pub(crate) fn get_or_create(
        &self,
        key: &CacheKey,
        create: impl FnOnce() -> Arc<Query>,
    ) -> Arc<Query> {
        let entry = self
            .queries
            .entry(key.clone())
            .or_insert_with(|| {
                trace!(key = %key, "creating query");
                create()
            });
        Arc::clone(&entry)
    }

    /// Dispose the query for `key` (if any), then remove it. No-op when
    /// absent.
    pub(crate) fn delete(&self, key: &CacheKey) {
        if let Some((_, query)) = self.queries.remove(key) {
            query.dispose();
        }
    }

    /// Drop a key without disposing. Called from a query's dispose hook,
    /// where disposal already happened.
    pub(crate) fn evict(&self, key: &CacheKey) {
        self.queries.remove(key);
    }

    /// Snapshot of the live keys, for bulk invalidation sweeps.
    pub(crate) fn keys(&self) -> Vec<CacheKey> {
        self.queries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.queries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
