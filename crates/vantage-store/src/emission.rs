// ── Emission payloads ──
//
// What subscribers see: a snapshot of the query's state, stamped with a
// per-query monotonically increasing sequence number. Strict ordering
// holds within one query only; nothing is guaranteed across queries.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use vantage_api::ObjectData;

use crate::error::StoreError;
use crate::keys::CacheKey;

/// Load state of a query.
///
/// `Init → Loading → Loaded | Error`; a query that has been `Loaded` or
/// `Error` never reverts to `Init`. `Disposed` is terminal and reachable
/// from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Init,
    Loading,
    Loaded,
    Error,
    Disposed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Error => "error",
            Self::Disposed => "disposed",
        })
    }
}

/// Tag for one optimistic update, chosen by the optimistic-edit caller.
/// Every optimistic emission carries it until confirmed or rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptimisticId(Arc<str>);

impl OptimisticId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OptimisticId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for OptimisticId {
    fn from(s: String) -> Self {
        Self(Arc::from(s.as_str()))
    }
}

impl fmt::Display for OptimisticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulated pages of a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListData {
    pub items: Vec<ObjectData>,
    /// Continuation token for `fetch_more`; `None` when exhausted.
    pub next_page_token: Option<String>,
}

/// A cached value: one object or one (possibly multi-page) list.
#[derive(Debug, Clone)]
pub enum QueryValue {
    Object(Arc<ObjectData>),
    List(Arc<ListData>),
}

impl QueryValue {
    pub fn as_object(&self) -> Option<&ObjectData> {
        match self {
            Self::Object(data) => Some(data),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListData> {
        match self {
            Self::List(data) => Some(data),
            Self::Object(_) => None,
        }
    }
}

/// One emission: the query's state at a point in its sequence.
///
/// Subscribing replays the current snapshot synchronously (sequence
/// unchanged); every state change afterwards bumps the sequence by one.
/// Overlapping revalidations cannot reorder deliveries within a query,
/// but a subscriber that fans snapshots out further can use `sequence`
/// to detect and drop duplicates.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub key: CacheKey,
    pub status: Status,
    /// Last-known value. Present during `Loading` and `Error` once the
    /// query has loaded at least once (stale-while-revalidating).
    pub value: Option<QueryValue>,
    /// Last fetch failure; cleared by the next successful load.
    pub error: Option<Arc<StoreError>>,
    /// True while any unconfirmed optimistic update overlays the value.
    pub is_optimistic: bool,
    /// Tag of the topmost optimistic update, when `is_optimistic`.
    pub optimistic_id: Option<OptimisticId>,
    pub sequence: u64,
    pub last_updated: DateTime<Utc>,
}

impl QuerySnapshot {
    pub fn has_data(&self) -> bool {
        self.value.is_some()
    }
}
