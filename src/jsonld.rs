//! Minimal JSON-LD navigation over ActivityStreams documents.
//!
//! Only the handful of lookups the outbox walk needs are implemented: keyword
//! aliases (`id` / `@id`, `type` / `@type`) and the member field of the two
//! collection types. No expansion or compaction is performed.

use serde_json::Value;

/// Collection type whose members live in `items`.
pub const COLLECTION: &str = "Collection";
/// Collection type whose members live in `orderedItems`.
pub const ORDERED_COLLECTION: &str = "OrderedCollection";

/// Returns `node[key]`, falling back to the `@`-prefixed alias.
///
/// Absence is an ordinary outcome; `None` is also returned for nodes that
/// are not JSON objects.
pub fn resolve_field<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    let map = node.as_object()?;
    map.get(key).or_else(|| map.get(&format!("@{key}")))
}

/// Like [`resolve_field`], but only yields string values.
pub fn resolve_str<'a>(node: &'a Value, key: &str) -> Option<&'a str> {
    resolve_field(node, key).and_then(Value::as_str)
}

/// True when the node's resolved `type` is exactly `expected`.
pub fn has_type(node: &Value, expected: &str) -> bool {
    resolve_str(node, "type") == Some(expected)
}

/// Returns the member field of a collection node verbatim.
///
/// `items` for `Collection`, `orderedItems` for `OrderedCollection` and
/// `None` for any other (or absent) type. A recognized collection without its
/// member field also yields `None`.
pub fn resolve_collection_members(node: &Value) -> Option<&Value> {
    match resolve_str(node, "type")? {
        COLLECTION => node.get("items"),
        ORDERED_COLLECTION => node.get("orderedItems"),
        _ => None,
    }
}

/// Views a JSON-LD value as a list of nodes.
///
/// Compacted JSON-LD writes single-element lists as the bare element, so a
/// non-array value is treated as a list of one.
pub fn as_node_list(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Null => &[],
        other => std::slice::from_ref(other),
    }
}

