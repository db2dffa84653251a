use crate::asset::Result;
use crate::asset::reader::Reader;

/// Typed reference to another serialized object.
///
/// `file_index` selects the serialized file (0 = the current file,
/// positive values index the external reference table) and `path_id` is
/// the object's id inside that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PPtr {
	/// Serialized file selector.
	pub file_index: i32,
	/// Object id within the selected file.
	pub path_id: i64,
}

impl PPtr {
	/// The `(0, 0)` "no reference" value.
	pub fn null() -> Self {
		Self { file_index: 0, path_id: 0 }
	}

	/// Whether this is the `(0, 0)` "no reference" value.
	pub fn is_null(&self) -> bool {
		self.file_index == 0 && self.path_id == 0
	}

	/// Decode a reference from its `m_FileID`/`m_PathID` fields.
	pub fn read(reader: &Reader<'_, '_>) -> Result<Self> {
		Ok(Self {
			file_index: reader.field("m_FileID")?.i32_value()?,
			path_id: reader.field("m_PathID")?.i64_value()?,
		})
	}
}

/// Whether a declared type name is an object reference (`PPtr<T>`).
pub fn is_pptr_type(type_name: &str) -> bool {
	type_name.starts_with("PPtr<")
}

/// Extract the referenced type name from a `PPtr<T>` declaration.
pub fn referenced_type_name(type_name: &str) -> Option<&str> {
	let inner = type_name.strip_prefix("PPtr<")?;
	inner.strip_suffix('>')
}
