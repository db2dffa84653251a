/// Decoded runtime value of a basic-type, string, or basic-array node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Boolean stored as one byte.
	Bool(bool),
	/// Signed integer of any width.
	I64(i64),
	/// Unsigned integer of any width.
	U64(u64),
	/// 32-bit float.
	F32(f32),
	/// 64-bit float.
	F64(f64),
	/// Length-prefixed UTF-8 string.
	String(Box<str>),
	/// Packed array of basic-type values.
	Array(Vec<Value>),
}

impl Value {
	/// Logical kind name for diagnostics.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Bool(_) => "bool",
			Self::I64(_) => "i64",
			Self::U64(_) => "u64",
			Self::F32(_) => "f32",
			Self::F64(_) => "f64",
			Self::String(_) => "string",
			Self::Array(_) => "array",
		}
	}

	/// Signed integer view, widening unsigned values when they fit.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::I64(value) => Some(*value),
			Self::U64(value) => i64::try_from(*value).ok(),
			_ => None,
		}
	}

	/// Unsigned integer view, accepting non-negative signed values.
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			Self::U64(value) => Some(*value),
			Self::I64(value) => u64::try_from(*value).ok(),
			_ => None,
		}
	}

	/// Float view over either float width.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::F32(value) => Some(f64::from(*value)),
			Self::F64(value) => Some(*value),
			_ => None,
		}
	}

	/// Boolean view.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// String view.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}

	/// Array view.
	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Self::Array(values) => Some(values),
			_ => None,
		}
	}
}
