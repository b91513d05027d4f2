//! Transport boundary for the Vantage platform SDK.
//!
//! The observable cache in `vantage-store` never talks to the platform
//! directly; it goes through the [`Transport`] trait defined here. A real
//! deployment backs it with the generated REST client; tests back it with
//! an in-memory mock. The trait is intentionally small: two fetch verbs
//! with normalized errors. Retry, backoff, and auth all live behind it.

pub mod error;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use transport::{SortDirection, Transport};
pub use types::{ListPage, ObjectData, PrimaryKey};
