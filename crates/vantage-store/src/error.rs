// ── Cache-layer error taxonomy ──

use thiserror::Error;
use vantage_api::TransportError;

/// Errors surfaced by the observable cache.
///
/// Fetch failures never escape `revalidate()` synchronously; they arrive
/// as an `error` emission on the query, and the revalidation future
/// resolves to `Err` for direct awaiters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A transport failure, propagated verbatim from the platform client.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A cache key argument could not be canonicalized. Thrown
    /// synchronously at the call site; never reaches the registry.
    #[error("cannot canonicalize cache key argument: {reason}")]
    Canonicalization { reason: String },

    /// An operation was attempted on a disposed query.
    ///
    /// Only raised under [`DisposedBehavior::Strict`](crate::config::DisposedBehavior);
    /// the lenient configuration downgrades the operation to a no-op.
    #[error("operation on a disposed query")]
    DisposedQuery,
}

impl StoreError {
    pub(crate) fn canonicalization(reason: impl Into<String>) -> Self {
        Self::Canonicalization {
            reason: reason.into(),
        }
    }
}
