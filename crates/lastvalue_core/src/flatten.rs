//! Path flattening of structured payloads.
//!
//! A payload is decoded as JSON and every sub-value is made addressable by
//! a dotted path. Object keys and array indices are joined the same way:
//!
//! ```rust
//! use lastvalue_core::PathFlattener;
//! use serde_json::json;
//!
//! let flat = PathFlattener::new().flatten(br#"{"foo":[42,"bar"]}"#);
//! assert_eq!(flat["foo.0"], json!(42));
//! assert_eq!(flat["foo.1"], json!("bar"));
//! assert_eq!(flat["foo"], json!([42, "bar"]));
//! assert_eq!(flat[""], json!({"foo": [42, "bar"]}));
//! ```
//!
//! Input that is not JSON (including empty input) yields the single entry
//! `"" -> <payload as string>`. Flattening never fails.
//!
//! Object members are visited in ascending key order, parents before
//! children. When two structural paths join to the same string (a key that
//! itself contains a dot), the entry visited last wins.

use serde_json::Value;
use std::collections::HashMap;

/// Separator between path segments.
pub const PATH_SEPARATOR: &str = ".";

/// Flattened view of one payload: path to sub-value.
pub type FlatValues = HashMap<String, Value>;

/// Turns raw payloads into [`FlatValues`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFlattener {
    debug: bool,
}

impl PathFlattener {
    /// Creates a flattener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables debug logging of non-JSON payloads.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Flattens `raw` into a path mapping.
    #[must_use]
    pub fn flatten(&self, raw: &[u8]) -> FlatValues {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => flatten_value(&value),
            Err(e) => {
                if self.debug {
                    tracing::debug!(error = %e, "payload is not json, mapping it to the root path");
                }
                let mut flat = FlatValues::with_capacity(1);
                flat.insert(String::new(), Value::String(String::from_utf8_lossy(raw).into_owned()));
                flat
            }
        }
    }

    /// Flattens `raw` and returns the value at `path`, `Value::Null` if absent.
    #[must_use]
    pub fn lookup(&self, raw: &[u8], path: &str) -> Value {
        self.flatten(raw).remove(path).unwrap_or(Value::Null)
    }
}

/// Flattens an already decoded value.
#[must_use]
pub fn flatten_value(value: &Value) -> FlatValues {
    let mut flat = FlatValues::new();
    let mut path = Vec::new();
    walk(&mut path, value, &mut flat);
    flat
}

fn walk(path: &mut Vec<String>, value: &Value, flat: &mut FlatValues) {
    flat.insert(path.join(PATH_SEPARATOR), value.clone());
    match value {
        Value::Object(members) => {
            for (key, member) in members {
                path.push(key.clone());
                walk(path, member, flat);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                walk(path, item, flat);
                path.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn flatten(raw: &[u8]) -> FlatValues {
        PathFlattener::new().flatten(raw)
    }

    #[test]
    fn empty_payload_maps_to_empty_string() {
        let flat = flatten(b"");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[""], json!(""));
    }

    #[test]
    fn non_json_payload_is_kept_as_string() {
        let flat = flatten(b"bar");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[""], json!("bar"));
    }

    #[test]
    fn scalars_are_leaves() {
        assert_eq!(flatten(b"42"), FlatValues::from([(String::new(), json!(42))]));
        assert_eq!(flatten(br#""foo""#)[""], json!("foo"));
        assert_eq!(flatten(b"true")[""], json!(true));
        assert_eq!(flatten(b"null")[""], Value::Null);
    }

    #[test]
    fn empty_containers_are_leaves() {
        assert_eq!(flatten(b"{}"), FlatValues::from([(String::new(), json!({}))]));
        assert_eq!(flatten(b"[]"), FlatValues::from([(String::new(), json!([]))]));
    }

    #[test]
    fn object_members() {
        let flat = flatten(br#"{"foo": "bar", "batz":42}"#);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat["foo"], json!("bar"));
        assert_eq!(flat["batz"], json!(42));
        assert_eq!(flat[""], json!({"foo": "bar", "batz": 42}));
        assert!(!flat.contains_key("bar"));
    }

    #[test]
    fn array_items_are_indexed() {
        let flat = flatten(br#"[42, "foo", {"batz":13}]"#);
        assert_eq!(flat["0"], json!(42));
        assert_eq!(flat["1"], json!("foo"));
        assert_eq!(flat["2"], json!({"batz": 13}));
        assert_eq!(flat["2.batz"], json!(13));
    }

    #[test]
    fn nested_array_in_object() {
        let flat = flatten(br#"{"foo":[42, "bar"]}"#);
        assert_eq!(flat["foo.0"], json!(42));
        assert_eq!(flat["foo.1"], json!("bar"));
        assert_eq!(flat["foo"], json!([42, "bar"]));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn dotted_key_collision_last_visited_wins() {
        // "a" is visited before "a.b", so the literal dotted key wins.
        let flat = flatten(br#"{"a.b": 1, "a": {"b": 2}}"#);
        assert_eq!(flat["a.b"], json!(1));
        assert_eq!(flat["a"], json!({"b": 2}));
    }

    #[test]
    fn lookup_missing_path_is_null() {
        let flattener = PathFlattener::new().with_debug(true);
        assert_eq!(flattener.lookup(b"42", "foo"), Value::Null);
        assert_eq!(flattener.lookup(b"42", ""), json!(42));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn root_is_whole_value(value in arb_json()) {
            let raw = serde_json::to_vec(&value).unwrap();
            let flat = flatten(&raw);
            prop_assert_eq!(&flat[""], &value);
        }

        #[test]
        fn every_path_resolves_by_pointer(value in arb_json()) {
            let raw = serde_json::to_vec(&value).unwrap();
            for (path, sub) in flatten(&raw) {
                let pointer = if path.is_empty() {
                    String::new()
                } else {
                    format!("/{}", path.replace('.', "/"))
                };
                prop_assert_eq!(value.pointer(&pointer), Some(&sub));
            }
        }

        #[test]
        fn non_utf8_never_panics(raw in prop::collection::vec(any::<u8>(), 0..64)) {
            let flat = flatten(&raw);
            prop_assert!(flat.contains_key(""));
        }
    }
}
