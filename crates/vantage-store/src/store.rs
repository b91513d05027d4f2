// ── Store orchestration ──
//
// Wires the canonicalizers, the cache key interner, and the queries
// registry around one transport. Everything is instance-scoped: two
// stores never share keys, queries, or canonical forms, so independent
// clients and tests cannot cross-contaminate.

use std::sync::Arc;

use futures_util::future;
use serde_json::Value;
use tracing::{debug, warn};
use vantage_api::{PrimaryKey, SortDirection, Transport};

use crate::canon::{CanonicalWhere, Canonicalizer};
use crate::config::StoreConfig;
use crate::emission::{OptimisticId, QueryValue};
use crate::error::StoreError;
use crate::keys::{CacheKey, CacheKeys, KeySpec};
use crate::query::{FetchResult, Query};
use crate::registry::QueryRegistry;

/// The observable object cache.
///
/// Cheaply cloneable (`Arc` inside); all clones share one cache. Holds
/// no long-lived background tasks of its own (fetch drivers are spawned
/// per revalidation), so dropping the last clone tears everything down.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    transport: Arc<dyn Transport>,
    config: StoreConfig,
    canonicalizer: Canonicalizer,
    cache_keys: CacheKeys,
    registry: QueryRegistry,
}

impl Store {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, StoreConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                transport,
                config,
                canonicalizer: Canonicalizer::new(),
                cache_keys: CacheKeys::new(),
                registry: QueryRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ── Cache keys ───────────────────────────────────────────────────

    /// Canonical key for a single object. Identity-stable: deep-equal
    /// arguments always return the same interned key.
    pub fn object_key(&self, object_type: &str, primary_key: impl Into<PrimaryKey>) -> CacheKey {
        self.inner.cache_keys.get(KeySpec::Object {
            object_type: object_type.to_owned(),
            primary_key: primary_key.into(),
        })
    }

    /// Canonical key for a filtered, ordered list.
    ///
    /// The where clause is canonicalized first (field order collapses);
    /// the ordering clause preserves argument order. An empty where
    /// clause and `None` produce the same key.
    pub fn list_key(
        &self,
        object_type: &str,
        where_clause: Option<&Value>,
        order_by: &[(String, SortDirection)],
    ) -> Result<CacheKey, StoreError> {
        let spec = self.build_list_spec(object_type, where_clause, order_by)?;
        Ok(self.inner.cache_keys.get(spec))
    }

    /// Canonicalize a where clause without building a key. Exposed for
    /// callers that need clause identity on its own.
    pub fn canonicalize_where(&self, raw: &Value) -> Result<Arc<CanonicalWhere>, StoreError> {
        self.inner.canonicalizer.canonicalize_where(raw)
    }

    fn build_list_spec(
        &self,
        object_type: &str,
        where_clause: Option<&Value>,
        order_by: &[(String, SortDirection)],
    ) -> Result<KeySpec, StoreError> {
        // An omitted filter and an empty `{}` filter are the same request.
        let where_clause = match where_clause {
            Some(raw) if raw.as_object().is_none_or(|map| !map.is_empty()) => {
                Some(self.inner.canonicalizer.canonicalize_where(raw)?)
            }
            _ => None,
        };
        Ok(KeySpec::List {
            object_type: object_type.to_owned(),
            where_clause,
            order_by: self.inner.canonicalizer.canonicalize_order_by(order_by),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Get or create the query for `key`. Concurrent callers for the
    /// same key all receive the same instance.
    pub fn get_query(&self, key: &CacheKey) -> Arc<Query> {
        self.inner.registry.get_or_create(key, || {
            let query = Query::new(
                key.clone(),
                Arc::clone(&self.inner.transport),
                self.inner.config.clone(),
            );
            // On disposal the query evicts itself from the registry and
            // releases its interned key, however disposal was reached.
            let inner = Arc::downgrade(&self.inner);
            query.set_on_dispose(Box::new(move |key| {
                if let Some(inner) = inner.upgrade() {
                    inner.registry.evict(key);
                    inner.cache_keys.remove(key);
                }
            }));
            query
        })
    }

    /// Lookup without creating.
    pub fn peek_query(&self, key: &CacheKey) -> Option<Arc<Query>> {
        self.inner.registry.peek(key)
    }

    /// Dispose and evict the query for `key`. No-op when absent.
    pub fn remove_query(&self, key: &CacheKey) {
        self.inner.registry.delete(key);
    }

    pub fn query_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Dispose and evict every query with no subscribers and no fetch in
    /// flight. Returns how many were removed.
    pub fn sweep_idle(&self) -> usize {
        let mut removed = 0;
        for key in self.inner.registry.keys() {
            if let Some(query) = self.inner.registry.peek(&key) {
                if query.subscriber_count() == 0 && !query.has_inflight_fetch() {
                    self.inner.registry.delete(&key);
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            debug!(removed, "swept idle queries");
        }
        self.inner.canonicalizer.purge();
        removed
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Force-revalidate the live query for one object. Deliberately a
    /// no-op when nobody observes that object: unobserved data is not
    /// eagerly refetched. A fetch failure surfaces both as the query's
    /// `Error` emission and in the returned result; the store never
    /// retries.
    pub async fn invalidate_object(
        &self,
        object_type: &str,
        primary_key: impl Into<PrimaryKey>,
    ) -> FetchResult {
        let spec = KeySpec::Object {
            object_type: object_type.to_owned(),
            primary_key: primary_key.into(),
        };
        let Some(query) = self
            .inner
            .cache_keys
            .peek(&spec)
            .and_then(|key| self.inner.registry.peek(&key))
        else {
            debug!(object_type, "invalidate_object: no live query, skipping");
            return Ok(());
        };
        query.revalidate(true).await
    }

    /// Force-revalidate live list queries for a type.
    ///
    /// With a where clause this targets the single matching key and,
    /// like [`invalidate_object`](Self::invalidate_object), propagates
    /// that query's fetch result. Without one it sweeps every live list
    /// query of the type; sweep failures surface through each query's
    /// `Error` emission only.
    pub async fn invalidate_list(
        &self,
        object_type: &str,
        where_clause: Option<&Value>,
        order_by: Option<&[(String, SortDirection)]>,
    ) -> FetchResult {
        if let Some(raw) = where_clause {
            let spec = self
                .build_list_spec(object_type, Some(raw), order_by.unwrap_or(&[]))
                .map_err(Arc::new)?;
            let Some(query) = self
                .inner
                .cache_keys
                .peek(&spec)
                .and_then(|key| self.inner.registry.peek(&key))
            else {
                debug!(object_type, "invalidate_list: no live query, skipping");
                return Ok(());
            };
            return query.revalidate(true).await;
        }

        self.revalidate_matching(|key| key.is_list() && key.object_type() == object_type)
            .await;
        Ok(())
    }

    /// Force-revalidate everything live for a type: the objects and the
    /// lists.
    pub async fn invalidate_object_type(&self, object_type: &str) {
        self.revalidate_matching(|key| key.object_type() == object_type)
            .await;
    }

    /// Force-revalidate every live query. Expensive; use sparingly.
    pub async fn invalidate_all(&self) {
        self.revalidate_matching(|_| true).await;
    }

    async fn revalidate_matching(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let mut pending = Vec::new();
        for key in self.inner.registry.keys() {
            if !matches(&key) {
                continue;
            }
            if let Some(query) = self.inner.registry.peek(&key) {
                pending.push(query.revalidate(true));
            }
        }
        let count = pending.len();
        debug!(count, "invalidation sweep");
        for result in future::join_all(pending).await {
            if let Err(err) = result {
                warn!(error = %err, "revalidation failed during invalidation sweep");
            }
        }
        count
    }

    // ── Optimistic updates ───────────────────────────────────────────

    /// Push a locally-computed value into the live query for `key`,
    /// tagged with `id`. No-op when no query is live: an optimistic
    /// value nobody observes has nothing to update.
    pub fn apply_optimistic(
        &self,
        key: &CacheKey,
        value: QueryValue,
        id: OptimisticId,
    ) -> Result<(), StoreError> {
        match self.inner.registry.peek(key) {
            Some(query) => query.apply_optimistic(value, id),
            None => Ok(()),
        }
    }

    /// Confirm the optimistic update `id` with server data.
    pub fn confirm_optimistic(
        &self,
        key: &CacheKey,
        id: &OptimisticId,
        server_value: QueryValue,
    ) -> Result<(), StoreError> {
        match self.inner.registry.peek(key) {
            Some(query) => query.confirm_optimistic(id, server_value),
            None => Ok(()),
        }
    }

    /// Roll the optimistic update `id` back to the last non-optimistic
    /// value.
    pub fn rollback_optimistic(&self, key: &CacheKey, id: &OptimisticId) -> Result<(), StoreError> {
        match self.inner.registry.peek(key) {
            Some(query) => query.rollback_optimistic(id),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("queries", &self.inner.registry.len())
            .field("keys", &self.inner.cache_keys.len())
            .finish_non_exhaustive()
    }
}
