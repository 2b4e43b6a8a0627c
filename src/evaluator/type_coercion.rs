use serde_json::Value;

/// Convert a Value to f64 for numeric comparison. Returns None for values
/// with no numeric interpretation; the comparison then evaluates false
/// instead of failing the run.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

/// Numeric comparison with coercion on both sides.
pub fn compare_numeric<F>(value: &Value, target: &Value, compare_fn: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (to_f64(value), to_f64(target)) {
        (Some(a), Some(b)) => compare_fn(a, b),
        _ => false,
    }
}
