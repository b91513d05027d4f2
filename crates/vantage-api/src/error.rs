// ── Transport error taxonomy ──
//
// Normalized failure shape crossing the transport boundary. The cache
// layer propagates these verbatim into a query's `error` state; it never
// inspects them to decide on retries.

use thiserror::Error;

/// Error returned by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The platform API rejected the request.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never reached the platform (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The response arrived but could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The requested object does not exist.
    #[error("object not found: {object_type} {primary_key}")]
    NotFound {
        object_type: String,
        primary_key: String,
    },
}

impl TransportError {
    /// True when the failure means "the data is gone", as opposed to
    /// "the data could not be reached".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
