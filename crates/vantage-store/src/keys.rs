// ── Cache key canonicalization and interning ──
//
// A cache key is a structurally-derived identity: same type tag plus
// deep-equal arguments means the same `Arc` allocation, so repeated
// requests dedupe onto one query. The interner is store-scoped, never
// process-global, and holds weak references; a key is evicted explicitly
// when its query is disposed.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use vantage_api::PrimaryKey;

use crate::canon::{CanonicalWhere, OrderBy};

/// The type tag plus argument tuple a key is derived from.
///
/// Compound arguments (where / order-by clauses) are already canonicalized
/// `Arc`s at this point; building a `KeySpec` from raw clauses goes
/// through the store's canonicalizers first.
#[derive(Debug, Clone)]
pub enum KeySpec {
    /// One object, addressed by type and primary key.
    Object {
        object_type: String,
        primary_key: PrimaryKey,
    },
    /// One filtered, ordered list of objects.
    ///
    /// `where_clause: None` and an omitted (empty) clause canonicalize
    /// identically; the same holds for `order_by`.
    List {
        object_type: String,
        where_clause: Option<Arc<CanonicalWhere>>,
        order_by: Arc<OrderBy>,
    },
}

impl KeySpec {
    pub fn object_type(&self) -> &str {
        match self {
            Self::Object { object_type, .. } | Self::List { object_type, .. } => object_type,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    /// Stable serialization used as the interner key.
    pub(crate) fn canonical_string(&self) -> String {
        match self {
            Self::Object {
                object_type,
                primary_key,
            } => {
                // Tag the primary key variant so "42" and 42 stay distinct.
                let pk = match primary_key {
                    PrimaryKey::String(s) => format!("s\u{1f}{s}"),
                    PrimaryKey::Integer(i) => format!("i\u{1f}{i}"),
                    PrimaryKey::Boolean(b) => format!("b\u{1f}{b}"),
                };
                format!("obj\u{1e}{object_type}\u{1e}{pk}")
            }
            Self::List {
                object_type,
                where_clause,
                order_by,
            } => {
                let where_part = where_clause
                    .as_ref()
                    .map_or("", |w| w.canonical_string());
                format!(
                    "list\u{1e}{object_type}\u{1e}{where_part}\u{1e}{}",
                    order_by.canonical_string()
                )
            }
        }
    }
}

#[derive(Debug)]
struct KeyData {
    spec: KeySpec,
    canon: String,
}

/// Interned, identity-stable cache key.
///
/// Cloning is cheap (`Arc`). Equality is pointer equality: two keys
/// compare equal iff they came out of the same interner slot, which the
/// canonicalization invariant guarantees for deep-equal arguments.
#[derive(Debug, Clone)]
pub struct CacheKey {
    data: Arc<KeyData>,
}

impl CacheKey {
    pub fn spec(&self) -> &KeySpec {
        &self.data.spec
    }

    pub fn object_type(&self) -> &str {
        self.data.spec.object_type()
    }

    pub fn is_list(&self) -> bool {
        self.data.spec.is_list()
    }

    /// True when `self` and `other` are the same interned identity.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub(crate) fn canonical_string(&self) -> &str {
        &self.data.canon
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Consistent with pointer equality: interning makes canon-equal
        // imply pointer-equal for live keys.
        self.data.canon.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.spec() {
            KeySpec::Object {
                object_type,
                primary_key,
            } => write!(f, "object:{object_type}:{primary_key}"),
            KeySpec::List { object_type, .. } => write!(f, "list:{object_type}"),
        }
    }
}

/// Store-scoped cache key interner.
#[derive(Debug, Default)]
pub(crate) struct CacheKeys {
    interned: DashMap<String, Weak<KeyData>>,
}

impl CacheKeys {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get or create the interned key for `spec`.
    pub(crate) fn get(&self, spec: KeySpec) -> CacheKey {
        let canon = spec.canonical_string();
        match self.interned.entry(canon.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    return CacheKey { data: live };
                }
                let data = Arc::new(KeyData { spec, canon });
                occupied.insert(Arc::downgrade(&data));
                CacheKey { data }
            }
            Entry::Vacant(vacant) => {
                let data = Arc::new(KeyData { spec, canon });
                vacant.insert(Arc::downgrade(&data));
                CacheKey { data }
            }
        }
    }

    /// Look up without creating. Used by invalidation, which must not
    /// mint keys for data nobody observes.
    pub(crate) fn peek(&self, spec: &KeySpec) -> Option<CacheKey> {
        let canon = spec.canonical_string();
        let weak = self.interned.get(&canon)?;
        weak.upgrade().map(|data| CacheKey { data })
    }

    /// Evict `key`'s interner slot. Called when the owning query is
    /// disposed; a stale slot for a different allocation is left alone.
    pub(crate) fn remove(&self, key: &CacheKey) {
        if let Entry::Occupied(occupied) = self.interned.entry(key.data.canon.clone()) {
            let points_here = occupied
                .get()
                .upgrade()
                .is_some_and(|data| Arc::ptr_eq(&data, &key.data));
            let is_dead = occupied.get().strong_count() == 0;
            if points_here || is_dead {
                occupied.remove();
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.interned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::Canonicalizer;
    use serde_json::json;

    fn object_spec(pk: impl Into<PrimaryKey>) -> KeySpec {
        KeySpec::Object {
            object_type: "Employee".into(),
            primary_key: pk.into(),
        }
    }

    #[test]
    fn same_arguments_intern_to_same_identity() {
        let keys = CacheKeys::new();
        let a = keys.get(object_spec("42"));
        let b = keys.get(object_spec("42"));
        assert!(a.same(&b));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn string_and_integer_primary_keys_differ() {
        let keys = CacheKeys::new();
        let a = keys.get(object_spec("42"));
        let b = keys.get(object_spec(42));
        assert!(!a.same(&b));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn list_keys_collapse_on_canonical_clauses() {
        let keys = CacheKeys::new();
        let canon = Canonicalizer::new();

        let where_a = canon
            .canonicalize_where(&json!({"dept": "Eng", "active": true}))
            .unwrap();
        let where_b = canon
            .canonicalize_where(&json!({"active": true, "dept": "Eng"}))
            .unwrap();
        let order = canon.canonicalize_order_by(&[]);

        let a = keys.get(KeySpec::List {
            object_type: "Employee".into(),
            where_clause: Some(where_a),
            order_by: Arc::clone(&order),
        });
        let b = keys.get(KeySpec::List {
            object_type: "Employee".into(),
            where_clause: Some(where_b),
            order_by: order,
        });
        assert!(a.same(&b));
    }

    #[test]
    fn peek_does_not_create() {
        let keys = CacheKeys::new();
        assert!(keys.peek(&object_spec("42")).is_none());
        assert_eq!(keys.len(), 0);

        let created = keys.get(object_spec("42"));
        let peeked = keys.peek(&object_spec("42")).unwrap();
        assert!(created.same(&peeked));
    }

    #[test]
    fn remove_evicts_only_the_matching_allocation() {
        let keys = CacheKeys::new();
        let original = keys.get(object_spec("42"));
        keys.remove(&original);
        assert_eq!(keys.len(), 0);

        // A new generation under the same canon is a fresh identity.
        let fresh = keys.get(object_spec("42"));
        assert!(!fresh.same(&original));

        // Removing with the stale key leaves the fresh slot alone.
        keys.remove(&original);
        assert_eq!(keys.len(), 1);
    }
}
