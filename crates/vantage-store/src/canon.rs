// ── Clause canonicalization ──
//
// Filter (where) clauses are order-insensitive: `{a: 1, b: 2}` and
// `{b: 2, a: 1}` must collapse to one identity. Ordering clauses are
// order-sensitive: `[(name, asc), (age, desc)]` and its reverse are
// distinct. Canonical forms are interned per store so deep-equal clauses
// share one `Arc` and can be embedded in cache keys by reference.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use vantage_api::SortDirection;

use crate::error::StoreError;

/// A where clause in canonical form: object keys recursively sorted,
/// array order preserved.
#[derive(Debug)]
pub struct CanonicalWhere {
    value: Value,
    canon: String,
}

impl CanonicalWhere {
    /// The normalized clause, suitable for handing to the transport.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Stable serialization used for interning and cache key identity.
    pub fn canonical_string(&self) -> &str {
        &self.canon
    }
}

impl PartialEq for CanonicalWhere {
    fn eq(&self, other: &Self) -> bool {
        self.canon == other.canon
    }
}

impl Eq for CanonicalWhere {}

/// An ordering clause: field/direction pairs, argument order preserved.
#[derive(Debug, PartialEq, Eq)]
pub struct OrderBy {
    clauses: Vec<(String, SortDirection)>,
    canon: String,
}

impl OrderBy {
    pub fn clauses(&self) -> &[(String, SortDirection)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn canonical_string(&self) -> &str {
        &self.canon
    }
}

/// Store-scoped interner for canonical clause forms.
///
/// Holds weak references: a clause with no remaining live cache key is
/// collectible, and [`purge`](Self::purge) sweeps the dead entries.
#[derive(Debug, Default)]
pub(crate) struct Canonicalizer {
    wheres: DashMap<String, Weak<CanonicalWhere>>,
    order_bys: DashMap<String, Weak<OrderBy>>,
}

impl Canonicalizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Canonicalize a raw where clause.
    ///
    /// Deep-equal inputs return the same `Arc`, regardless of field
    /// order. Rejects non-object clauses synchronously.
    pub(crate) fn canonicalize_where(
        &self,
        raw: &Value,
    ) -> Result<Arc<CanonicalWhere>, StoreError> {
        if !raw.is_object() {
            return Err(StoreError::canonicalization(format!(
                "where clause must be a JSON object, got {}",
                json_type_name(raw)
            )));
        }

        let mut canon = String::new();
        write_canonical(raw, &mut canon);

        let entry = self.wheres.entry(canon.clone());
        match entry {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    return Ok(live);
                }
                let fresh = Arc::new(CanonicalWhere {
                    value: canonical_value(raw),
                    canon,
                });
                occupied.insert(Arc::downgrade(&fresh));
                Ok(fresh)
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(CanonicalWhere {
                    value: canonical_value(raw),
                    canon,
                });
                vacant.insert(Arc::downgrade(&fresh));
                Ok(fresh)
            }
        }
    }

    /// Canonicalize an ordering clause. Argument order is significant
    /// and preserved; only deep-equal sequences share an `Arc`.
    pub(crate) fn canonicalize_order_by(
        &self,
        clauses: &[(String, SortDirection)],
    ) -> Arc<OrderBy> {
        let mut canon = String::new();
        for (field, direction) in clauses {
            canon.push_str(field);
            canon.push(match direction {
                SortDirection::Asc => '+',
                SortDirection::Desc => '-',
            });
            canon.push('\u{1f}');
        }

        let entry = self.order_bys.entry(canon.clone());
        match entry {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    return live;
                }
                let fresh = Arc::new(OrderBy {
                    clauses: clauses.to_vec(),
                    canon,
                });
                occupied.insert(Arc::downgrade(&fresh));
                fresh
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(OrderBy {
                    clauses: clauses.to_vec(),
                    canon,
                });
                vacant.insert(Arc::downgrade(&fresh));
                fresh
            }
        }
    }

    /// Drop interner entries whose clause is no longer referenced.
    pub(crate) fn purge(&self) {
        self.wheres.retain(|_, weak| weak.strong_count() > 0);
        self.order_bys.retain(|_, weak| weak.strong_count() > 0);
    }

    #[cfg(test)]
    pub(crate) fn where_count(&self) -> usize {
        self.wheres.len()
    }
}

/// Write a stable serialization of `value`: JSON with object keys
/// emitted in sorted order at every depth. Does not depend on the
/// `serde_json` map implementation preserving or sorting keys.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json string escaping is deterministic.
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| *k);
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

/// Rebuild `value` with object keys sorted at every depth.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| *k);
            let mut sorted = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                sorted.insert(key.clone(), canonical_value(item));
            }
            Value::Object(sorted)
        }
        scalar => scalar.clone(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_order_collapses() {
        let canon = Canonicalizer::new();
        let a = canon
            .canonicalize_where(&json!({"name": "Ada", "dept": {"id": 3, "name": "Eng"}}))
            .unwrap();
        let b = canon
            .canonicalize_where(&json!({"dept": {"name": "Eng", "id": 3}, "name": "Ada"}))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(canon.where_count(), 1);
    }

    #[test]
    fn distinct_clauses_stay_distinct() {
        let canon = Canonicalizer::new();
        let a = canon.canonicalize_where(&json!({"name": "Ada"})).unwrap();
        let b = canon.canonicalize_where(&json!({"name": "Bob"})).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn array_order_is_preserved() {
        let canon = Canonicalizer::new();
        let a = canon
            .canonicalize_where(&json!({"tags": ["x", "y"]}))
            .unwrap();
        let b = canon
            .canonicalize_where(&json!({"tags": ["y", "x"]}))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn non_object_clause_is_rejected() {
        let canon = Canonicalizer::new();
        let err = canon.canonicalize_where(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, StoreError::Canonicalization { .. }));
    }

    #[test]
    fn order_by_is_order_sensitive() {
        let canon = Canonicalizer::new();
        let forward = canon.canonicalize_order_by(&[
            ("name".into(), SortDirection::Asc),
            ("age".into(), SortDirection::Desc),
        ]);
        let reverse = canon.canonicalize_order_by(&[
            ("age".into(), SortDirection::Desc),
            ("name".into(), SortDirection::Asc),
        ]);
        assert!(!Arc::ptr_eq(&forward, &reverse));

        let again = canon.canonicalize_order_by(&[
            ("name".into(), SortDirection::Asc),
            ("age".into(), SortDirection::Desc),
        ]);
        assert!(Arc::ptr_eq(&forward, &again));
    }

    #[test]
    fn purge_drops_dead_entries() {
        let canon = Canonicalizer::new();
        let kept = canon.canonicalize_where(&json!({"keep": true})).unwrap();
        let dropped = canon.canonicalize_where(&json!({"drop": true})).unwrap();
        drop(dropped);

        canon.purge();
        assert_eq!(canon.where_count(), 1);
        drop(kept);
    }
}
