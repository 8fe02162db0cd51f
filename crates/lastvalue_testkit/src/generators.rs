//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

/// Strategy for device or service keys.
///
/// Keys never contain the topic separator `/` or the key separator `.`.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,11}").expect("Invalid regex")
}

/// Strategy for JSON leaves.
pub fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(Number::from(n))),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// Strategy for nested JSON documents with dot-free object keys.
pub fn json_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Strategy for encoded JSON payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    json_strategy().prop_map(|value| serde_json::to_vec(&value).expect("Encodable JSON"))
}

/// Strategy for arbitrary payload bytes, JSON or not.
pub fn raw_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}
