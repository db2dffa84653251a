use unitydoc::asset::Value;

/// Convert a decoded value into its JSON representation.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
	match value {
		Value::Bool(v) => serde_json::json!(v),
		Value::I64(v) => serde_json::json!(v),
		Value::U64(v) => serde_json::json!(v),
		Value::F32(v) => serde_json::json!(v),
		Value::F64(v) => serde_json::json!(v),
		Value::String(v) => serde_json::json!(v),
		Value::Array(values) => serde_json::Value::Array(values.iter().map(value_to_json).collect()),
	}
}
