use serde_json::Value;

/// A JSON object, the currency of events, inputs and outputs across the
/// platform. Values are recursively typed (`null | bool | number | string |
/// list | map`); symbolic keys from upstream systems collapse to strings at
/// the decode boundary.
pub type JsonMap = serde_json::Map<String, Value>;

/// Borrow `value` as an object if it is one and has at least one key.
#[inline]
pub fn non_empty_object(value: &Value) -> Option<&JsonMap> {
    value.as_object().filter(|map| !map.is_empty())
}

/// Clone the object inside `value`, or produce an empty one for any other
/// shape.
pub fn object_or_empty(value: &Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

/// Overlay every entry of `src` onto `dst`; keys already in `dst` are
/// replaced.
pub fn merge_into(dst: &mut JsonMap, src: &JsonMap) {
    for (key, value) in src {
        dst.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_empty_object() {
        assert!(non_empty_object(&json!({"a": 1})).is_some());
        assert!(non_empty_object(&json!({})).is_none());
        assert!(non_empty_object(&json!([1, 2])).is_none());
        assert!(non_empty_object(&json!(null)).is_none());
    }

    #[test]
    fn test_object_or_empty() {
        let map = object_or_empty(&json!({"a": 1}));
        assert_eq!(map.get("a"), Some(&json!(1)));

        assert!(object_or_empty(&json!("text")).is_empty());
        assert!(object_or_empty(&json!(null)).is_empty());
    }

    #[test]
    fn test_merge_into_replaces_existing_keys() {
        let mut dst = object_or_empty(&json!({"a": 1, "b": 2}));
        let src = object_or_empty(&json!({"b": 3, "c": 4}));

        merge_into(&mut dst, &src);

        assert_eq!(dst.get("a"), Some(&json!(1)));
        assert_eq!(dst.get("b"), Some(&json!(3)));
        assert_eq!(dst.get("c"), Some(&json!(4)));
    }
}
