use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::bytes::SliceSource;
use crate::asset::typetree::{BasicType, SchemaProvider, TypeTreeNode, VARIABLE_SIZE};
use crate::asset::{AssetError, Result};

/// Serialized form of one type tree node in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaNode {
	/// Field name.
	pub name: String,
	/// Declared type name.
	pub type_name: String,
	/// Fixed serialized size; defaults to variable.
	#[serde(default = "variable_size")]
	pub byte_size: i32,
	/// Whether this node is a serialized array.
	#[serde(default)]
	pub is_array: bool,
	/// Whether this node requires 4-byte trailing alignment.
	#[serde(default)]
	pub align_bytes: bool,
	/// Whether this node is a managed-reference registry container.
	#[serde(default)]
	pub is_managed_reference_registry: bool,
	/// Child nodes in schema order.
	#[serde(default)]
	pub children: Vec<SchemaNode>,
}

fn variable_size() -> i32 {
	VARIABLE_SIZE
}

/// Serialized metadata of one object in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotObject {
	/// Object id.
	pub id: i64,
	/// Byte offset of the object's data inside the snapshot bytes.
	pub offset: i64,
	/// Type tree root describing the object's layout.
	pub root: SchemaNode,
}

/// Serialized type tree for one named polymorphic type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNamedType {
	/// Class name.
	pub class_name: String,
	/// Namespace name.
	#[serde(default)]
	pub namespace_name: String,
	/// Assembly name.
	pub assembly_name: String,
	/// Type tree root for the named type.
	pub root: SchemaNode,
}

/// On-disk snapshot: object table, named type trees, and raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
	/// Object metadata rows.
	pub objects: Vec<SnapshotObject>,
	/// Named polymorphic type trees, for managed-reference fields.
	#[serde(default)]
	pub named_types: Vec<SnapshotNamedType>,
	/// Raw serialized object bytes.
	pub data: Vec<u8>,
}

/// Resolved metadata of one snapshot object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
	/// Object id.
	pub id: i64,
	/// Byte offset of the object's data.
	pub offset: i64,
	/// Resolved type tree root.
	pub root: Rc<TypeTreeNode>,
}

/// Loaded snapshot of serialized objects with their type trees.
///
/// Implements [`SchemaProvider`] over the contained trees and exposes the
/// raw bytes as a byte source.
pub struct Snapshot {
	objects: Vec<ObjectInfo>,
	by_id: HashMap<i64, usize>,
	named: HashMap<(String, String, String), Rc<TypeTreeNode>>,
	data: Vec<u8>,
}

impl Snapshot {
	/// Resolve loaded snapshot rows into type trees.
	pub fn from_data(data: SnapshotData) -> Self {
		let objects: Vec<ObjectInfo> = data
			.objects
			.iter()
			.map(|row| ObjectInfo {
				id: row.id,
				offset: row.offset,
				root: convert(&row.root),
			})
			.collect();
		let by_id = objects.iter().enumerate().map(|(index, info)| (info.id, index)).collect();
		let named = data
			.named_types
			.iter()
			.map(|row| {
				(
					(row.class_name.clone(), row.namespace_name.clone(), row.assembly_name.clone()),
					convert(&row.root),
				)
			})
			.collect();

		Self {
			objects,
			by_id,
			named,
			data: data.data,
		}
	}

	/// Load and resolve a snapshot from a JSON file.
	pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let data: SnapshotData = serde_json::from_str(&text)?;
		Ok(Self::from_data(data))
	}

	/// Byte source over the snapshot's raw bytes.
	pub fn source(&self) -> SliceSource<'_> {
		SliceSource::new(&self.data)
	}

	/// All contained objects, in file order.
	pub fn objects(&self) -> &[ObjectInfo] {
		&self.objects
	}

	/// Look up one object by id.
	pub fn object(&self, id: i64) -> Result<&ObjectInfo> {
		self.by_id
			.get(&id)
			.map(|index| &self.objects[*index])
			.ok_or(AssetError::ObjectNotFound { id })
	}
}

impl SchemaProvider for Snapshot {
	fn type_tree(&self, object_id: i64) -> Result<Rc<TypeTreeNode>> {
		Ok(self.object(object_id)?.root.clone())
	}

	fn named_type_tree(&self, class_name: &str, namespace_name: &str, assembly_name: &str) -> Result<Rc<TypeTreeNode>> {
		self.named
			.get(&(class_name.to_owned(), namespace_name.to_owned(), assembly_name.to_owned()))
			.cloned()
			.ok_or_else(|| AssetError::TypeNotFound {
				class_name: class_name.to_owned(),
				namespace_name: namespace_name.to_owned(),
				assembly_name: assembly_name.to_owned(),
			})
	}
}

fn convert(node: &SchemaNode) -> Rc<TypeTreeNode> {
	let children: Vec<Rc<TypeTreeNode>> = node.children.iter().map(convert).collect();
	let basic = if children.is_empty() && !node.is_array {
		BasicType::from_type_name(&node.type_name)
	} else {
		None
	};
	let any_child_aligns = children.iter().any(|child| child.align_bytes || child.any_child_aligns);
	let byte_size = basic.map_or(node.byte_size, BasicType::size);

	Rc::new(TypeTreeNode {
		name: Arc::from(node.name.as_str()),
		type_name: Arc::from(node.type_name.as_str()),
		byte_size,
		is_array: node.is_array,
		align_bytes: node.align_bytes,
		any_child_aligns,
		is_managed_reference_registry: node.is_managed_reference_registry,
		basic,
		children,
	})
}

#[cfg(test)]
mod tests {
	use crate::asset::{RandomAccessReader, Snapshot, SnapshotData};

	const SAMPLE: &str = r#"{
		"objects": [
			{
				"id": 7,
				"offset": 0,
				"root": {
					"name": "Base", "type_name": "TextAsset",
					"children": [
						{"name": "m_Name", "type_name": "string", "align_bytes": true},
						{"name": "m_Value", "type_name": "int"}
					]
				}
			}
		],
		"data": [3, 0, 0, 0, 97, 98, 99, 0, 42, 0, 0, 0]
	}"#;

	#[test]
	fn snapshot_objects_decode_through_the_reader() {
		let data: SnapshotData = serde_json::from_str(SAMPLE).expect("snapshot parses");
		let snapshot = Snapshot::from_data(data);

		let info = snapshot.object(7).expect("object exists");
		assert_eq!(&*info.root.type_name, "TextAsset");

		let source = snapshot.source();
		let reader = RandomAccessReader::new(&snapshot, &source, info.root.clone(), info.offset).expect("reader builds");
		assert_eq!(reader.root().field("m_Name").expect("field exists").string_value().expect("string decodes"), "abc");
		assert_eq!(reader.root().field("m_Value").expect("field exists").i32_value().expect("int decodes"), 42);

		assert!(snapshot.object(8).is_err());
	}
}
