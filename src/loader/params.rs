//! Query string serialization for request parameters.
//!
//! Nested values flatten with bracket notation: `{a: [1, 2], b: {c: 3}}`
//! becomes `a[0]=1&a[1]=2&b[c]=3` before percent-encoding. Keys and values
//! are encoded the way a browser's `encodeURIComponent` does, so a space is
//! `%20` rather than `+`.

use crate::filter::operator::js_string;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Flatten params into `(key, value)` pairs in key order.
pub fn serialize_params(params: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match params {
        Value::Object(map) => {
            for (key, value) in map {
                flatten(key.clone(), value, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (i, value) in items.iter().enumerate() {
                flatten(i.to_string(), value, &mut pairs);
            }
        }
        Value::Null => {}
        other => tracing::warn!("Ajax params must be an object, ignoring {}", other),
    }
    pairs
}

fn flatten(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{}[{}]", prefix, i), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(format!("{}[{}]", prefix, key), item, pairs);
            }
        }
        leaf => pairs.push((prefix, js_string(leaf))),
    }
}

/// Percent-encoded `key=value` pairs joined with `&`.
pub fn encode_query(params: &Value) -> String {
    serialize_params(params)
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, URI_COMPONENT),
                utf8_percent_encode(value, URI_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a query to a url, respecting any query it already carries.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

/// Whether params contribute nothing to a request.
pub fn is_empty(params: &Value) -> bool {
    match params {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;
    use serde_json::json;

    #[test]
    fn test_nested_flattening() {
        let pairs = serialize_params(&json!({"a": [1, 2], "b": {"c": 3}}));
        assert_eq!(
            pairs,
            vec![
                ("a[0]".to_string(), "1".to_string()),
                ("a[1]".to_string(), "2".to_string()),
                ("b[c]".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_encoded_query() {
        let query = encode_query(&json!({"a": [1, 2], "b": {"c": 3}}));
        assert_eq!(query, "a%5B0%5D=1&a%5B1%5D=2&b%5Bc%5D=3");

        let key = query.split('&').nth(2).and_then(|pair| pair.split('=').next()).unwrap();
        assert_eq!(percent_decode_str(key).decode_utf8().unwrap(), "b[c]");
    }

    #[test]
    fn test_space_encodes_as_percent_20() {
        assert_eq!(encode_query(&json!({"q": "a b"})), "q=a%20b");
        assert_eq!(encode_query(&json!({"first name": "x"})), "first%20name=x");
    }

    #[test]
    fn test_reserved_characters() {
        assert_eq!(
            encode_query(&json!({"v": "&=/?+#,;:@$"})),
            "v=%26%3D%2F%3F%2B%23%2C%3B%3A%40%24"
        );
        // Left as-is by encodeURIComponent
        assert_eq!(encode_query(&json!({"v": "-_.!~*'()"})), "v=-_.!~*'()");
        assert_eq!(encode_query(&json!({"v": "é"})), "v=%C3%A9");
    }

    #[test]
    fn test_leaf_stringification() {
        let pairs = serialize_params(&json!({"n": null, "t": true, "f": 1.5, "s": "a b"}));
        let lookup = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(lookup("n"), Some("null"));
        assert_eq!(lookup("t"), Some("true"));
        assert_eq!(lookup("f"), Some("1.5"));
        assert_eq!(lookup("s"), Some("a b"));
    }

    #[test]
    fn test_deeply_nested() {
        let pairs = serialize_params(&json!({"filter": [{"field": "age", "type": ">", "value": 3}]}));
        assert!(pairs.contains(&("filter[0][field]".to_string(), "age".to_string())));
        assert!(pairs.contains(&("filter[0][type]".to_string(), ">".to_string())));
    }

    #[test]
    fn test_append_query() {
        assert_eq!(append_query("/data", "a=1"), "/data?a=1");
        assert_eq!(append_query("/data?x=1", "a=1"), "/data?x=1&a=1");
        assert_eq!(append_query("/data", ""), "/data");
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&json!({})));
        assert!(is_empty(&Value::Null));
        assert!(!is_empty(&json!({"a": 1})));
    }
}
