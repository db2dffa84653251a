use crate::asset::reader::Reader;
use crate::asset::{AssetError, Result};

/// One parsed operation in a property path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
	/// Select a named field.
	Field(String),
	/// Select an array element by zero-based index.
	Index(usize),
	/// Select a managed-reference registry entry by reference id.
	Rid(i64),
}

/// Parsed property path expression.
#[derive(Debug, Clone)]
pub struct PropertyPath {
	/// Ordered sequence of path steps.
	pub steps: Vec<PathStep>,
}

impl PropertyPath {
	/// Parse dotted field syntax with optional `[index]` and `rid(<id>)`
	/// selectors, e.g. `m_Container[0].second.asset`.
	pub fn parse(input: &str) -> Result<Self> {
		if input.is_empty() {
			return Err(AssetError::InvalidPath { path: input.to_owned() });
		}

		let bytes = input.as_bytes();
		let mut idx = 0_usize;
		let mut steps = Vec::new();

		while idx < bytes.len() {
			let start = idx;
			while idx < bytes.len() {
				let byte = bytes[idx];
				if byte.is_ascii_alphanumeric() || byte == b'_' {
					idx += 1;
				} else {
					break;
				}
			}

			if idx == start {
				return Err(AssetError::InvalidPath { path: input.to_owned() });
			}

			let ident = &input[start..idx];
			if ident == "rid" && idx < bytes.len() && bytes[idx] == b'(' {
				idx += 1;
				let n_start = idx;
				if idx < bytes.len() && bytes[idx] == b'-' {
					idx += 1;
				}
				while idx < bytes.len() && bytes[idx].is_ascii_digit() {
					idx += 1;
				}
				if idx >= bytes.len() || bytes[idx] != b')' {
					return Err(AssetError::InvalidPath { path: input.to_owned() });
				}

				let rid = input[n_start..idx]
					.parse::<i64>()
					.map_err(|_| AssetError::InvalidPath { path: input.to_owned() })?;
				steps.push(PathStep::Rid(rid));
				idx += 1;
			} else {
				steps.push(PathStep::Field(ident.to_owned()));
			}

			while idx < bytes.len() && bytes[idx] == b'[' {
				idx += 1;
				let n_start = idx;
				while idx < bytes.len() && bytes[idx].is_ascii_digit() {
					idx += 1;
				}
				if idx == n_start || idx >= bytes.len() || bytes[idx] != b']' {
					return Err(AssetError::InvalidPath { path: input.to_owned() });
				}

				let number = input[n_start..idx]
					.parse::<usize>()
					.map_err(|_| AssetError::InvalidPath { path: input.to_owned() })?;
				steps.push(PathStep::Index(number));
				idx += 1;
			}

			if idx < bytes.len() {
				if bytes[idx] != b'.' {
					return Err(AssetError::InvalidPath { path: input.to_owned() });
				}
				idx += 1;
				if idx >= bytes.len() {
					return Err(AssetError::InvalidPath { path: input.to_owned() });
				}
			}
		}

		Ok(Self { steps })
	}

	/// Navigate a reader through every step of this path.
	pub fn apply<'r, 'a>(&self, reader: Reader<'r, 'a>) -> Result<Reader<'r, 'a>> {
		let mut current = reader;
		for step in &self.steps {
			current = match step {
				PathStep::Field(name) => current.field(name)?,
				PathStep::Index(index) => current.element(*index)?,
				PathStep::Rid(rid) => current.field(&format!("rid({rid})"))?,
			};
		}
		Ok(current)
	}
}

#[cfg(test)]
mod tests {
	use crate::asset::{AssetError, PathStep, PropertyPath};

	#[test]
	fn fields_indices_and_rids_parse() {
		let path = PropertyPath::parse("m_Container[0].second.rid(-2).m_Value").expect("path parses");
		assert_eq!(
			path.steps,
			vec![
				PathStep::Field("m_Container".to_owned()),
				PathStep::Index(0),
				PathStep::Field("second".to_owned()),
				PathStep::Rid(-2),
				PathStep::Field("m_Value".to_owned()),
			]
		);
	}

	#[test]
	fn malformed_paths_are_rejected() {
		for input in ["", ".", "a..b", "a[", "a[]", "a[1", "a.", "rid(", "rid(x)", "a[-1]"] {
			let err = PropertyPath::parse(input).expect_err("path must fail");
			assert!(matches!(err, AssetError::InvalidPath { .. }), "input: {input}");
		}
	}

	#[test]
	fn rid_without_parens_is_a_plain_field() {
		let path = PropertyPath::parse("rid.value").expect("path parses");
		assert_eq!(path.steps, vec![PathStep::Field("rid".to_owned()), PathStep::Field("value".to_owned())]);
	}
}
