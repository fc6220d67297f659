//! Request parameter encoding.
//!
//! GET and DELETE calls carry their parameters in the query string. Nested
//! structures are flattened with bracket keys: `{"vars": {"a": 1}}` becomes
//! `vars[a]=1` and `{"ids": ["x", "y"]}` becomes `ids[0]=x&ids[1]=y`.

use serde_json::{Map, Value};

use crate::error::ApiError;

/// Flatten `params` into bracket-keyed string pairs.
///
/// Booleans encode as `1`/`0` and `null` as the empty string. Empty nested
/// objects and arrays produce no pairs.
pub fn flatten(params: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match params {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(key.clone(), value, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(index.to_string(), value, &mut pairs);
            }
        }
        _ => {}
    }
    pairs
}

fn flatten_into(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (sub, value) in map {
                flatten_into(format!("{key}[{sub}]"), value, pairs);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(format!("{key}[{index}]"), value, pairs);
            }
        }
        Value::Bool(b) => pairs.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Null => pairs.push((key, String::new())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s.clone())),
    }
}

/// Form-urlencoded query string for `params` (without the leading `?`).
pub fn encode_query(params: &Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(flatten(params))
        .finish()
}

/// Percent-encode one URL path segment. `/`, spaces and every other
/// reserved byte are escaped; spaces become `%20` rather than `+`.
pub fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Accept `null` or a JSON object as a parameter set.
pub fn object(params: Value) -> Result<Map<String, Value>, ApiError> {
    match params {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(ApiError::InvalidArgument(format!(
            "parameters must be a JSON object, got {other}"
        ))),
    }
}
