//! Observable object cache between `vantage-api` and reactive consumers.
//!
//! This crate owns the client-side caching and subscription
//! infrastructure for the Vantage SDK workspace:
//!
//! - **[`Store`]** — Central facade owning the cache key interner, the
//!   canonicalizers, and the queries registry. Vends [`Query`] handles
//!   via [`get_query()`](Store::get_query), and drives bulk invalidation
//!   ([`invalidate_object()`](Store::invalidate_object),
//!   [`invalidate_list()`](Store::invalidate_list)) over whatever is
//!   currently live.
//!
//! - **[`CacheKey`]** — Interned, identity-stable key for one cacheable
//!   request (a single object, or a filtered/ordered list). Deep-equal
//!   requests always resolve to the same key, so keys compare by pointer
//!   and work as plain map keys.
//!
//! - **[`Query`]** — Per-key state machine (`Init → Loading → Loaded /
//!   Error → … → Disposed`) with coalesced revalidation, staleness-based
//!   deduplication, pagination, and an optimistic-update overlay.
//!   Subscribers get an immediate replay of the current
//!   [`QuerySnapshot`], then ordered emissions with strictly increasing
//!   sequence numbers.
//!
//! - **[`QuerySubscription`]** — Handle vended by
//!   [`Query::subscribe()`]; detaches its observer on
//!   [`unsubscribe()`](QuerySubscription::unsubscribe) or drop, and
//!   optionally carries an [`EmissionTracker`] diagnostic log.

pub mod canon;
pub mod config;
pub mod diagnostics;
pub mod emission;
pub mod error;
pub mod keys;
pub mod query;
mod registry;
pub mod store;
pub mod subscription;

// ── Primary re-exports ──────────────────────────────────────────────
pub use canon::{CanonicalWhere, OrderBy};
pub use config::{DisposedBehavior, StoreConfig};
pub use diagnostics::{EmissionRecord, EmissionTracker};
pub use emission::{ListData, OptimisticId, QuerySnapshot, QueryValue, Status};
pub use error::StoreError;
pub use keys::{CacheKey, KeySpec};
pub use query::{FetchResult, Query, RevalidateFuture};
pub use store::Store;
pub use subscription::QuerySubscription;
