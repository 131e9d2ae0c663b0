use crate::value::Value;

/// JSON documents enter the engine as map sources.
///
/// - object → `Map` with string keys
/// - array → `List`
/// - number → `I64`, `U64` above `i64::MAX`, otherwise `F64`
impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (Value::Str(k.clone()), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_becomes_map() {
        let json = serde_json::json!({"s": 1, "tags": ["a"], "big": u64::MAX, "f": 1.5});
        let Value::Map(entries) = Value::from(json) else {
            panic!("expected map");
        };
        let get = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("s"), Some(Value::I64(1)));
        assert_eq!(get("tags"), Some(Value::List(vec![Value::Str("a".into())])));
        assert_eq!(get("big"), Some(Value::U64(u64::MAX)));
        assert_eq!(get("f"), Some(Value::F64(1.5)));
    }
}
