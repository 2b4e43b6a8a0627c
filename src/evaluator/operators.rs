use serde_json::Value;

/// Contains operator
pub fn contains(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::String(s), Value::String(t)) => s.contains(t.as_str()),
        (Value::Array(arr), target) => arr.contains(target),
        (Value::String(s), Value::Number(n)) => s.contains(&n.to_string()),
        _ => false,
    }
}

/// StartsWith operator
pub fn starts_with(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::String(s), Value::String(t)) => s.starts_with(t.as_str()),
        _ => false,
    }
}

/// EndsWith operator
pub fn ends_with(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::String(s), Value::String(t)) => s.ends_with(t.as_str()),
        _ => false,
    }
}

/// IsEmpty operator
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Equal operator with permissive cross-type coercion.
pub fn equal(value: &Value, target: &Value) -> bool {
    if value == target {
        return true;
    }

    match (value, target) {
        // int vs float
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        // string vs number
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            match s.parse::<f64>() {
                Ok(parsed) => Some(parsed) == n.as_f64(),
                Err(_) => false,
            }
        }
        // bool vs string
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            match s.to_lowercase().as_str() {
                "true" => *b,
                "false" => !*b,
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains_string() {
        assert!(contains(&json!("hello world"), &json!("world")));
        assert!(!contains(&json!("hello world"), &json!("xyz")));
    }

    #[test]
    fn test_contains_array() {
        assert!(contains(&json!([1, 2, 3]), &json!(2)));
        assert!(!contains(&json!([1, 2, 3]), &json!(4)));
    }

    #[test]
    fn test_is_empty_various_types() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!({})));
        assert!(!is_empty(&json!("hello")));
        assert!(!is_empty(&json!([1])));
    }

    #[test]
    fn test_equal_cross_type() {
        assert!(equal(&json!("42"), &json!(42)));
        assert!(equal(&json!(42), &json!("42")));
        assert!(equal(&json!("true"), &json!(true)));
        assert!(!equal(&json!("yes"), &json!(true)));
    }
}
