//! Property-based test generators using proptest.
//!
//! Provides strategies for connection strings, row keys and row payloads.

use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for database filenames accepted by every virtual filesystem.
pub fn filename_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,15}\\.(db|sqlite)").expect("Invalid regex")
}

/// Strategy for `key=value` pairs whose key never names a file.
pub fn unrelated_pair_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["Cache", "Mode", "Pooling", "Password", "Version"]),
        prop::string::string_regex("[A-Za-z0-9]{0,8}").expect("Invalid regex"),
    )
        .prop_map(|(key, value)| format!("{key}={value}"))
}

/// Strategy for connection strings naming a file.
///
/// Yields the connection string and the filename it names. The filename key
/// is spelled in any case and surrounded by unrelated pairs.
pub fn connection_string_strategy() -> impl Strategy<Value = (String, String)> {
    (
        prop::sample::select(vec!["Data Source", "data source", "DataSource", "Filename"]),
        filename_strategy(),
        prop::collection::vec(unrelated_pair_strategy(), 0..3),
        prop::collection::vec(unrelated_pair_strategy(), 0..3),
    )
        .prop_map(|(key, filename, before, after)| {
            let mut pairs = before;
            pairs.push(format!("{key}={filename}"));
            pairs.extend(after);
            (pairs.join(";"), filename)
        })
}

/// Strategy for row keys.
pub fn row_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{1,12}").expect("Invalid regex")
}

/// Strategy for row payloads: small JSON objects.
pub fn row_strategy() -> impl Strategy<Value = Value> {
    (
        prop::string::string_regex("[A-Za-z ]{0,24}").expect("Invalid regex"),
        any::<i32>(),
        any::<bool>(),
        prop::option::of(prop::collection::vec(any::<u16>(), 0..4)),
    )
        .prop_map(|(name, count, active, tags)| {
            json!({
                "name": name,
                "count": count,
                "active": active,
                "tags": tags,
            })
        })
}

/// Strategy for a batch of rows with distinct keys.
pub fn rows_strategy(max: usize) -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(row_key_strategy(), row_strategy(), 1..=max)
        .prop_map(|rows| rows.into_iter().collect())
}
