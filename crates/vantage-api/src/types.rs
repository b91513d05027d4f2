// ── Value types crossing the transport boundary ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar primary key.
///
/// The platform allows string, integer, and boolean primary keys; no
/// compound keys. Keys arriving as JSON are normalized here so that
/// `42` and `"42"` stay distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PrimaryKey {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for PrimaryKey {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PrimaryKey {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

/// One object's properties as returned by the platform.
///
/// Property payloads are schema-driven and vary per object type, so the
/// transport hands them over as dynamic JSON; typed views are a generated-
/// surface concern above this layer.
pub type ObjectData = serde_json::Value;

/// One page of a list fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage {
    pub data: Vec<ObjectData>,
    /// Opaque continuation token; `None` means the list is exhausted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ListPage {
    pub fn new(data: Vec<ObjectData>) -> Self {
        Self {
            data,
            next_page_token: None,
        }
    }

    pub fn with_next_page(data: Vec<ObjectData>, token: impl Into<String>) -> Self {
        Self {
            data,
            next_page_token: Some(token.into()),
        }
    }
}
