use serde_json::Value;

/// A row is a map from column key to a typed cell value.
pub type Row = serde_json::Map<String, Value>;

/// Coerces a cell to the string form used by filtering and sorting.
/// Missing cells and nulls become the empty string.
pub fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}
