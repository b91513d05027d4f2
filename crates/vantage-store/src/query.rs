// ── Query state machine ──
//
// One cached, subscribable unit of work bound to a single cache key.
// Owns the current value and status, fetch coalescing, the optimistic
// overlay, and ordered emission to subscribers.
//
// Invariants:
//   - at most one in-flight fetch at a time (forced refetches supersede
//     by epoch, they never run the state machine backwards)
//   - emissions are strictly ordered by sequence number
//   - once disposed, nothing is emitted again

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, Shared};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use vantage_api::{Transport, TransportError};

use crate::canon::CanonicalWhere;
use crate::config::{DisposedBehavior, StoreConfig};
use crate::diagnostics::EmissionTracker;
use crate::emission::{ListData, OptimisticId, QuerySnapshot, QueryValue, Status};
use crate::error::StoreError;
use crate::keys::{CacheKey, KeySpec};
use crate::subscription::{ObserverFn, ObserverList, QuerySubscription, lock};

/// Result of awaiting a revalidation directly.
///
/// The error is `Arc`ed because a coalesced fetch has many awaiters; the
/// same failure also reaches every subscriber as an `Error` emission.
pub type FetchResult = Result<(), Arc<StoreError>>;

/// Future returned by [`Query::revalidate`] and [`Query::fetch_more`].
pub type RevalidateFuture = BoxFuture<'static, FetchResult>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

type DisposeHook = Box<dyn FnOnce(&CacheKey) + Send + Sync>;

enum Revalidation {
    /// Fresh data, or a lenient no-op on a disposed query.
    Noop,
    /// Strict-mode operation on a disposed query.
    Disposed,
    /// A started or joined fetch.
    Fetch(SharedFetch),
}

struct QueryState {
    status: Status,
    /// Last server-confirmed value.
    truth: Option<QueryValue>,
    /// Unconfirmed local overlays, oldest first. The topmost wins.
    optimistic: Vec<(OptimisticId, QueryValue)>,
    error: Option<Arc<StoreError>>,
    sequence: u64,
    last_updated: DateTime<Utc>,
    last_loaded: Option<Instant>,
    /// Lists only: continuation token for `fetch_more`.
    next_page_token: Option<String>,
}

impl QueryState {
    fn new() -> Self {
        Self {
            status: Status::Init,
            truth: None,
            optimistic: Vec::new(),
            error: None,
            sequence: 0,
            last_updated: Utc::now(),
            last_loaded: None,
            next_page_token: None,
        }
    }

    fn snapshot(&self, key: &CacheKey) -> QuerySnapshot {
        let (value, optimistic_id) = match self.optimistic.last() {
            Some((id, value)) => (Some(value.clone()), Some(id.clone())),
            None => (self.truth.clone(), None),
        };
        QuerySnapshot {
            key: key.clone(),
            status: self.status,
            value,
            error: self.error.clone(),
            is_optimistic: !self.optimistic.is_empty(),
            optimistic_id,
            sequence: self.sequence,
            last_updated: self.last_updated,
        }
    }
}

/// One cached, subscribable computation bound to one [`CacheKey`].
///
/// Created by the store's registry; shared as `Arc<Query>`. All methods
/// are callable from any task; a tokio runtime must be current when
/// starting fetches.
pub struct Query {
    cache_key: CacheKey,
    transport: Arc<dyn Transport>,
    config: StoreConfig,
    state: Mutex<QueryState>,
    observers: Arc<ObserverList>,
    /// Emissions awaiting delivery, drained in order by whoever holds
    /// `delivery`. Keeps reentrant emissions from recursing.
    pending: Mutex<VecDeque<QuerySnapshot>>,
    delivery: Mutex<()>,
    inflight: Mutex<Option<SharedFetch>>,
    page_fetch: Mutex<Option<SharedFetch>>,
    /// Bumped per full fetch; completions for stale epochs are discarded.
    fetch_epoch: AtomicU64,
    cancel: CancellationToken,
    disposed: AtomicBool,
    on_dispose: Mutex<Option<DisposeHook>>,
}

impl Query {
    pub(crate) fn new(
        cache_key: CacheKey,
        transport: Arc<dyn Transport>,
        config: StoreConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            cache_key,
            transport,
            config,
            state: Mutex::new(QueryState::new()),
            observers: Arc::new(ObserverList::new()),
            pending: Mutex::new(VecDeque::new()),
            delivery: Mutex::new(()),
            inflight: Mutex::new(None),
            page_fetch: Mutex::new(None),
            fetch_epoch: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            disposed: AtomicBool::new(false),
            on_dispose: Mutex::new(None),
        })
    }

    pub(crate) fn set_on_dispose(&self, hook: DisposeHook) {
        *lock(&self.on_dispose) = Some(hook);
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn cache_key(&self) -> &CacheKey {
        &self.cache_key
    }

    pub fn status(&self) -> Status {
        lock(&self.state).status
    }

    /// The current state without subscribing.
    pub fn snapshot(&self) -> QuerySnapshot {
        lock(&self.state).snapshot(&self.cache_key)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn has_inflight_fetch(&self) -> bool {
        lock(&self.inflight).is_some() || lock(&self.page_fetch).is_some()
    }

    // ── Subscription ─────────────────────────────────────────────────

    /// Attach an observer with replay-latest semantics: it receives the
    /// current snapshot synchronously, then every subsequent emission in
    /// sequence order.
    ///
    /// On a disposed query this fails with
    /// [`StoreError::DisposedQuery`] (strict) or returns an inert
    /// subscription (lenient).
    pub fn subscribe<F>(&self, observer: F) -> Result<QuerySubscription, StoreError>
    where
        F: Fn(&QuerySnapshot) + Send + Sync + 'static,
    {
        if !self.guard_disposed()? {
            return Ok(QuerySubscription::detached());
        }

        let tracker = self
            .config
            .track_emissions
            .then(|| Arc::new(EmissionTracker::new()));

        let wrapped: Arc<ObserverFn> = match &tracker {
            Some(tracker) => {
                let tracker = Arc::clone(tracker);
                Arc::new(move |snapshot: &QuerySnapshot| {
                    tracker.record(snapshot);
                    observer(snapshot);
                })
            }
            None => Arc::new(observer),
        };

        let id = self.observers.add(Arc::clone(&wrapped));
        let replay = lock(&self.state).snapshot(&self.cache_key);
        wrapped(&replay);

        Ok(QuerySubscription::new(id, &self.observers, tracker))
    }

    // ── Revalidation ─────────────────────────────────────────────────

    /// Trigger a fetch.
    ///
    /// `force = true` always starts a new fetch, superseding any fetch
    /// already in flight. `force = false` coalesces onto the in-flight
    /// fetch if there is one, and is a no-op when the data is fresh
    /// within the store's dedupe interval.
    ///
    /// The returned future resolves when the fetch settles; a fetch
    /// failure resolves it to `Err` and also reaches every subscriber as
    /// an `Error` emission. Nothing is thrown synchronously.
    pub fn revalidate(self: &Arc<Self>, force: bool) -> RevalidateFuture {
        match self.begin_revalidate(force) {
            Revalidation::Noop => future::ready(Ok(())).boxed(),
            Revalidation::Disposed => {
                future::ready(Err(Arc::new(StoreError::DisposedQuery))).boxed()
            }
            Revalidation::Fetch(shared) => shared.boxed(),
        }
    }

    fn begin_revalidate(self: &Arc<Self>, force: bool) -> Revalidation {
        if self.is_disposed() {
            return match self.config.disposed_behavior {
                DisposedBehavior::Strict => Revalidation::Disposed,
                DisposedBehavior::Lenient => {
                    trace!(key = %self.cache_key, "revalidate on disposed query ignored");
                    Revalidation::Noop
                }
            };
        }

        let shared = {
            let mut inflight = lock(&self.inflight);
            if !force {
                if let Some(existing) = inflight.as_ref() {
                    trace!(key = %self.cache_key, "coalescing into in-flight fetch");
                    return Revalidation::Fetch(existing.clone());
                }
                if self.is_fresh() {
                    trace!(key = %self.cache_key, "data fresh, skipping fetch");
                    return Revalidation::Noop;
                }
            }

            let epoch = self.fetch_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            let shared: SharedFetch = Arc::clone(self).run_fetch(epoch).boxed().shared();
            *inflight = Some(shared.clone());
            shared
        };

        self.mark_loading();
        // Detached driver: the fetch progresses even if every caller
        // drops the returned future.
        drop(tokio::spawn(shared.clone()));
        Revalidation::Fetch(shared)
    }

    fn is_fresh(&self) -> bool {
        let state = lock(&self.state);
        state.status == Status::Loaded
            && state
                .last_loaded
                .is_some_and(|at| at.elapsed() < self.config.dedupe_interval)
    }

    /// `Init -> Loading` is silent (visible via replay only); from
    /// `Loaded`/`Error` the transition emits, keeping the last value
    /// exposed (stale-while-revalidating).
    fn mark_loading(&self) {
        let needs_emission = {
            let mut state = lock(&self.state);
            match state.status {
                Status::Init => {
                    state.status = Status::Loading;
                    false
                }
                Status::Loaded | Status::Error => true,
                Status::Loading | Status::Disposed => false,
            }
        };
        if needs_emission {
            self.push_emission(|state| state.status = Status::Loading);
        }
    }

    async fn run_fetch(self: Arc<Self>, epoch: u64) -> FetchResult {
        debug!(key = %self.cache_key, epoch, "fetch start");
        let fetched = tokio::select! {
            () = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.fetch_by_spec(None) => result,
        };

        {
            let mut inflight = lock(&self.inflight);
            if self.fetch_epoch.load(Ordering::SeqCst) == epoch {
                *inflight = None;
            }
        }

        if self.is_disposed() {
            trace!(key = %self.cache_key, "discarding response for disposed query");
            return Err(Arc::new(StoreError::Transport(TransportError::Cancelled)));
        }

        if self.fetch_epoch.load(Ordering::SeqCst) != epoch {
            trace!(key = %self.cache_key, epoch, "fetch superseded by forced revalidation");
            return fetched
                .map(|_| ())
                .map_err(|err| Arc::new(StoreError::Transport(err)));
        }

        match fetched {
            Ok(value) => {
                debug!(key = %self.cache_key, "fetch complete");
                self.apply_loaded(value);
                Ok(())
            }
            Err(err) => {
                warn!(key = %self.cache_key, error = %err, "fetch failed");
                let err = Arc::new(StoreError::Transport(err));
                self.apply_error(Arc::clone(&err));
                Err(err)
            }
        }
    }

    async fn fetch_by_spec(&self, page_token: Option<String>) -> Result<QueryValue, TransportError> {
        match self.cache_key.spec() {
            KeySpec::Object {
                object_type,
                primary_key,
            } => {
                let data = self.transport.fetch_object(object_type, primary_key).await?;
                Ok(QueryValue::Object(Arc::new(data)))
            }
            KeySpec::List {
                object_type,
                where_clause,
                order_by,
            } => {
                let page = self
                    .transport
                    .fetch_list(
                        object_type,
                        where_clause.as_deref().map(CanonicalWhere::as_value),
                        order_by.clauses(),
                        page_token.as_deref(),
                    )
                    .await?;
                Ok(QueryValue::List(Arc::new(ListData {
                    items: page.data,
                    next_page_token: page.next_page_token,
                })))
            }
        }
    }

    fn apply_loaded(&self, value: QueryValue) {
        self.push_emission(|state| {
            if let QueryValue::List(list) = &value {
                state.next_page_token = list.next_page_token.clone();
            }
            state.truth = Some(value);
            state.error = None;
            state.status = Status::Loaded;
            state.last_loaded = Some(Instant::now());
        });
    }

    fn apply_error(&self, err: Arc<StoreError>) {
        self.push_emission(|state| {
            state.error = Some(err);
            state.status = Status::Error;
        });
    }

    // ── Pagination (lists) ───────────────────────────────────────────

    /// Fetch the next page of a list query and append it.
    ///
    /// Coalesces with a pending page fetch; a no-op on object queries,
    /// on exhausted lists, and under the lenient disposed behavior.
    pub fn fetch_more(self: &Arc<Self>) -> RevalidateFuture {
        match self.guard_disposed() {
            Ok(true) => {}
            Ok(false) => return future::ready(Ok(())).boxed(),
            Err(_) => return future::ready(Err(Arc::new(StoreError::DisposedQuery))).boxed(),
        }
        if !self.cache_key.is_list() {
            trace!(key = %self.cache_key, "fetch_more on object query ignored");
            return future::ready(Ok(())).boxed();
        }

        let shared = {
            let mut page_fetch = lock(&self.page_fetch);
            if let Some(existing) = page_fetch.as_ref() {
                return existing.clone().boxed();
            }
            let token = lock(&self.state).next_page_token.clone();
            let Some(token) = token else {
                trace!(key = %self.cache_key, "list exhausted, fetch_more is a no-op");
                return future::ready(Ok(())).boxed();
            };

            let epoch = self.fetch_epoch.load(Ordering::SeqCst);
            let shared: SharedFetch = Arc::clone(self)
                .run_page_fetch(token, epoch)
                .boxed()
                .shared();
            *page_fetch = Some(shared.clone());
            shared
        };

        drop(tokio::spawn(shared.clone()));
        shared.boxed()
    }

    async fn run_page_fetch(self: Arc<Self>, token: String, epoch: u64) -> FetchResult {
        debug!(key = %self.cache_key, "page fetch start");
        let fetched = tokio::select! {
            () = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.fetch_by_spec(Some(token)) => result,
        };

        lock(&self.page_fetch).take();

        if self.is_disposed() {
            return Err(Arc::new(StoreError::Transport(TransportError::Cancelled)));
        }
        if self.fetch_epoch.load(Ordering::SeqCst) != epoch {
            // The list was refetched wholesale while this page was in
            // flight; the fresh fetch wins and this page is dropped.
            trace!(key = %self.cache_key, "page fetch superseded");
            return Ok(());
        }

        match fetched {
            Ok(value) => {
                if let QueryValue::List(page) = value {
                    self.push_emission(|state| {
                        let mut items = state
                            .truth
                            .as_ref()
                            .and_then(QueryValue::as_list)
                            .map(|list| list.items.clone())
                            .unwrap_or_default();
                        items.extend(page.items.iter().cloned());
                        state.next_page_token = page.next_page_token.clone();
                        state.truth = Some(QueryValue::List(Arc::new(ListData {
                            items,
                            next_page_token: page.next_page_token.clone(),
                        })));
                        state.error = None;
                        state.status = Status::Loaded;
                        state.last_loaded = Some(Instant::now());
                    });
                }
                Ok(())
            }
            Err(err) => {
                warn!(key = %self.cache_key, error = %err, "page fetch failed");
                let err = Arc::new(StoreError::Transport(err));
                self.apply_error(Arc::clone(&err));
                Err(err)
            }
        }
    }

    // ── Optimistic overlay ───────────────────────────────────────────

    /// Push a locally-computed value tagged with `id`. Subscribers see
    /// it immediately with `is_optimistic = true`; it must eventually be
    /// confirmed or rolled back.
    pub fn apply_optimistic(&self, value: QueryValue, id: OptimisticId) -> Result<(), StoreError> {
        if !self.guard_disposed()? {
            return Ok(());
        }
        debug!(key = %self.cache_key, optimistic_id = %id, "optimistic update applied");
        self.push_emission(|state| {
            state.optimistic.push((id, value));
            if state.status == Status::Init {
                state.status = Status::Loaded;
            }
        });
        Ok(())
    }

    /// Replace the optimistic entry `id` with server-confirmed data.
    pub fn confirm_optimistic(
        &self,
        id: &OptimisticId,
        server_value: QueryValue,
    ) -> Result<(), StoreError> {
        if !self.guard_disposed()? {
            return Ok(());
        }
        debug!(key = %self.cache_key, optimistic_id = %id, "optimistic update confirmed");
        self.push_emission(|state| {
            state.optimistic.retain(|(existing, _)| existing != id);
            if let QueryValue::List(list) = &server_value {
                state.next_page_token = list.next_page_token.clone();
            }
            state.truth = Some(server_value);
            state.error = None;
            state.status = Status::Loaded;
            state.last_loaded = Some(Instant::now());
        });
        Ok(())
    }

    /// Drop the optimistic entry `id`, reverting subscribers to the last
    /// non-optimistic value. Unknown ids are ignored without emitting.
    pub fn rollback_optimistic(&self, id: &OptimisticId) -> Result<(), StoreError> {
        if !self.guard_disposed()? {
            return Ok(());
        }
        let present = lock(&self.state)
            .optimistic
            .iter()
            .any(|(existing, _)| existing == id);
        if !present {
            return Ok(());
        }
        debug!(key = %self.cache_key, optimistic_id = %id, "optimistic update rolled back");
        self.push_emission(|state| {
            state.optimistic.retain(|(existing, _)| existing != id);
            state.status = if state.truth.is_some() {
                Status::Loaded
            } else if state.error.is_some() {
                Status::Error
            } else {
                Status::Init
            };
        });
        Ok(())
    }

    // ── Disposal ─────────────────────────────────────────────────────

    /// Tear the query down: cancel any in-flight fetch (best effort),
    /// drop observers, mark terminal. Idempotent. A late-arriving
    /// response is discarded silently rather than emitted.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(key = %self.cache_key, "disposing query");
        self.cancel.cancel();
        lock(&self.inflight).take();
        lock(&self.page_fetch).take();
        lock(&self.state).status = Status::Disposed;
        lock(&self.pending).clear();
        self.observers.clear();
        if let Some(hook) = lock(&self.on_dispose).take() {
            hook(&self.cache_key);
        }
    }

    /// Whether the caller may proceed: `Ok(true)` on a live query,
    /// `Ok(false)` for a lenient no-op, `Err` under strict disposal.
    fn guard_disposed(&self) -> Result<bool, StoreError> {
        if !self.is_disposed() {
            return Ok(true);
        }
        match self.config.disposed_behavior {
            DisposedBehavior::Strict => Err(StoreError::DisposedQuery),
            DisposedBehavior::Lenient => Ok(false),
        }
    }

    // ── Emission plumbing ────────────────────────────────────────────

    /// Mutate state, bump the sequence, enqueue the resulting snapshot,
    /// and drain the queue. Mutation happens under the state lock;
    /// observers run outside every lock except the delivery guard.
    fn push_emission(&self, mutate: impl FnOnce(&mut QueryState)) {
        if self.is_disposed() {
            return;
        }
        {
            let mut state = lock(&self.state);
            mutate(&mut state);
            state.sequence += 1;
            state.last_updated = Utc::now();
            let snapshot = state.snapshot(&self.cache_key);
            lock(&self.pending).push_back(snapshot);
        }
        self.deliver();
    }

    /// Drain pending emissions in order. A single holder delivers at a
    /// time; reentrant emissions (an observer writing back into the
    /// query) enqueue and are picked up by the active drain instead of
    /// recursing.
    fn deliver(&self) {
        loop {
            if let Ok(_guard) = self.delivery.try_lock() {
                loop {
                    let next = lock(&self.pending).pop_front();
                    let Some(snapshot) = next else { break };
                    for observer in self.observers.current() {
                        observer(&snapshot);
                    }
                }
            } else {
                // The current holder's drain loop picks our entry up.
                return;
            }
            if lock(&self.pending).is_empty() {
                return;
            }
            // Queue refilled between the drain and the guard release.
        }
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("cache_key", &self.cache_key.to_string())
            .field("status", &self.status())
            .field("subscribers", &self.subscriber_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::CacheKeys;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use vantage_api::{ListPage, ObjectData, PrimaryKey, SortDirection};

    struct StaticTransport {
        object: ObjectData,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn fetch_object(
            &self,
            _object_type: &str,
            _primary_key: &PrimaryKey,
        ) -> Result<ObjectData, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.object.clone())
        }

        async fn fetch_list(
            &self,
            _object_type: &str,
            _where_clause: Option<&serde_json::Value>,
            _order_by: &[(String, SortDirection)],
            _page_token: Option<&str>,
        ) -> Result<ListPage, TransportError> {
            Ok(ListPage::new(vec![self.object.clone()]))
        }
    }

    fn object_key() -> CacheKey {
        CacheKeys::new().get(KeySpec::Object {
            object_type: "Employee".into(),
            primary_key: "42".into(),
        })
    }

    fn static_query() -> Arc<Query> {
        Query::new(
            object_key(),
            Arc::new(StaticTransport {
                object: json!({"name": "Ada"}),
                fetches: AtomicUsize::new(0),
            }),
            StoreConfig::default(),
        )
    }

    #[tokio::test]
    async fn starts_in_init_and_loads() {
        let query = static_query();
        assert_eq!(query.status(), Status::Init);

        query.revalidate(false).await.unwrap();
        let snapshot = query.snapshot();
        assert_eq!(snapshot.status, Status::Loaded);
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(
            snapshot.value.unwrap().as_object().unwrap()["name"],
            json!("Ada")
        );
    }

    #[tokio::test]
    async fn loaded_query_keeps_value_while_loading() {
        let query = static_query();
        query.revalidate(false).await.unwrap();

        let observed: Arc<Mutex<Vec<(Status, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let _subscription = query
            .subscribe(move |snapshot| {
                lock(&sink).push((snapshot.status, snapshot.has_data()));
            })
            .unwrap();

        query.revalidate(true).await.unwrap();

        let seen = lock(&observed).clone();
        assert_eq!(
            seen,
            vec![
                (Status::Loaded, true),  // replay
                (Status::Loading, true), // stale-while-revalidating
                (Status::Loaded, true),
            ]
        );
    }

    #[tokio::test]
    async fn dispose_is_terminal_and_idempotent() {
        let query = static_query();
        query.revalidate(false).await.unwrap();
        query.dispose();
        query.dispose();

        assert_eq!(query.status(), Status::Disposed);
        assert!(query.subscribe(|_| {}).is_err());
        assert!(query.revalidate(true).await.is_err());
    }

    #[tokio::test]
    async fn lenient_disposed_query_is_a_no_op() {
        let query = Query::new(
            object_key(),
            Arc::new(StaticTransport {
                object: json!({}),
                fetches: AtomicUsize::new(0),
            }),
            StoreConfig::default().with_disposed_behavior(DisposedBehavior::Lenient),
        );
        query.dispose();

        assert!(query.revalidate(true).await.is_ok());
        let subscription = query.subscribe(|_| {}).unwrap();
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn rollback_reverts_to_last_truth() {
        let query = static_query();
        query.revalidate(false).await.unwrap();

        let id = OptimisticId::from("op1");
        query
            .apply_optimistic(
                QueryValue::Object(Arc::new(json!({"name": "Ada (edited)"}))),
                id.clone(),
            )
            .unwrap();
        let optimistic = query.snapshot();
        assert!(optimistic.is_optimistic);
        assert_eq!(
            optimistic.value.unwrap().as_object().unwrap()["name"],
            json!("Ada (edited)")
        );

        query.rollback_optimistic(&id).unwrap();
        let reverted = query.snapshot();
        assert!(!reverted.is_optimistic);
        assert_eq!(
            reverted.value.unwrap().as_object().unwrap()["name"],
            json!("Ada")
        );
        assert_eq!(reverted.status, Status::Loaded);
    }

    #[tokio::test]
    async fn rollback_of_unknown_id_emits_nothing() {
        let query = static_query();
        query.revalidate(false).await.unwrap();
        let before = query.snapshot().sequence;

        query
            .rollback_optimistic(&OptimisticId::from("never-applied"))
            .unwrap();
        assert_eq!(query.snapshot().sequence, before);
    }
}
