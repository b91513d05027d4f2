// ── Transport trait ──
//
// The seam between the observable cache and the platform. Implementations
// own retry/backoff and error normalization; the cache owns deduplication
// and revalidation. Signatures mirror the platform's object/list verbs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::types::{ListPage, ObjectData, PrimaryKey};

/// Sort direction for one ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Async data source for the cache layer.
///
/// Implementations must be cheap to share (`Arc<dyn Transport>`) and are
/// assumed to already normalize errors into [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a single object by type and primary key.
    async fn fetch_object(
        &self,
        object_type: &str,
        primary_key: &PrimaryKey,
    ) -> Result<ObjectData, TransportError>;

    /// Fetch one page of a filtered, ordered list of objects.
    ///
    /// `where_clause` is the platform's JSON filter shape (already
    /// canonicalized by the caller); `page_token` continues a previous
    /// page's [`ListPage::next_page_token`].
    async fn fetch_list(
        &self,
        object_type: &str,
        where_clause: Option<&serde_json::Value>,
        order_by: &[(String, SortDirection)],
        page_token: Option<&str>,
    ) -> Result<ListPage, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn fetch_object(
            &self,
            object_type: &str,
            primary_key: &PrimaryKey,
        ) -> Result<ObjectData, TransportError> {
            Ok(serde_json::json!({"type": object_type, "pk": primary_key.to_string()}))
        }

        async fn fetch_list(
            &self,
            _object_type: &str,
            _where_clause: Option<&serde_json::Value>,
            _order_by: &[(String, SortDirection)],
            _page_token: Option<&str>,
        ) -> Result<ListPage, TransportError> {
            Ok(ListPage::new(Vec::new()))
        }
    }

    #[tokio::test]
    async fn usable_as_a_shared_trait_object() {
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport);
        let object = transport
            .fetch_object("Employee", &PrimaryKey::from("42"))
            .await
            .unwrap();
        assert_eq!(object["pk"], serde_json::json!("42"));
    }
}
