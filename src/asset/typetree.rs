use std::rc::Rc;
use std::sync::Arc;

use crate::asset::bytes::ByteSource;
use crate::asset::value::Value;
use crate::asset::{AssetError, Result};

/// Sentinel byte size for nodes whose serialized size is variable.
pub const VARIABLE_SIZE: i32 = -1;

/// Primitive kind of a basic-type leaf node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
	/// Signed 8-bit integer.
	I8,
	/// Unsigned 8-bit integer.
	U8,
	/// Signed 16-bit integer.
	I16,
	/// Unsigned 16-bit integer.
	U16,
	/// Signed 32-bit integer.
	I32,
	/// Unsigned 32-bit integer.
	U32,
	/// Signed 64-bit integer.
	I64,
	/// Unsigned 64-bit integer.
	U64,
	/// 32-bit float.
	F32,
	/// 64-bit float.
	F64,
	/// Boolean stored as one byte.
	Bool,
	/// Character stored as one byte.
	Char,
}

impl BasicType {
	/// Serialized size in bytes.
	pub fn size(self) -> i32 {
		match self {
			Self::I8 | Self::U8 | Self::Bool | Self::Char => 1,
			Self::I16 | Self::U16 => 2,
			Self::I32 | Self::U32 | Self::F32 => 4,
			Self::I64 | Self::U64 | Self::F64 => 8,
		}
	}

	/// Map an engine type name to its primitive kind.
	pub fn from_type_name(type_name: &str) -> Option<Self> {
		match type_name {
			"SInt8" => Some(Self::I8),
			"UInt8" => Some(Self::U8),
			"char" => Some(Self::Char),
			"SInt16" | "short" => Some(Self::I16),
			"UInt16" | "unsigned short" => Some(Self::U16),
			"SInt32" | "int" => Some(Self::I32),
			"UInt32" | "unsigned int" => Some(Self::U32),
			"SInt64" | "long long" => Some(Self::I64),
			"UInt64" | "unsigned long long" | "FileSize" => Some(Self::U64),
			"float" => Some(Self::F32),
			"double" => Some(Self::F64),
			"bool" => Some(Self::Bool),
			_ => None,
		}
	}

	/// Decode one primitive at `offset`.
	pub fn read(self, source: &dyn ByteSource, offset: i64) -> Result<Value> {
		Ok(match self {
			Self::I8 => Value::I64(i64::from(source.read_i8(offset)?)),
			Self::U8 | Self::Char => Value::U64(u64::from(source.read_u8(offset)?)),
			Self::I16 => Value::I64(i64::from(source.read_i16(offset)?)),
			Self::U16 => Value::U64(u64::from(source.read_u16(offset)?)),
			Self::I32 => Value::I64(i64::from(source.read_i32(offset)?)),
			Self::U32 => Value::U64(u64::from(source.read_u32(offset)?)),
			Self::I64 => Value::I64(source.read_i64(offset)?),
			Self::U64 => Value::U64(source.read_u64(offset)?),
			Self::F32 => Value::F32(source.read_f32(offset)?),
			Self::F64 => Value::F64(source.read_f64(offset)?),
			Self::Bool => Value::Bool(source.read_u8(offset)? != 0),
		})
	}
}

/// One node of a runtime type tree describing a serialized field.
#[derive(Debug)]
pub struct TypeTreeNode {
	/// Field name.
	pub name: Arc<str>,
	/// Declared type name.
	pub type_name: Arc<str>,
	/// Fixed serialized size, or [`VARIABLE_SIZE`].
	pub byte_size: i32,
	/// Whether this node is a serialized array (size leaf + element template).
	pub is_array: bool,
	/// Whether this node requires 4-byte alignment after its data.
	pub align_bytes: bool,
	/// Whether any descendant requires 4-byte alignment after its data.
	pub any_child_aligns: bool,
	/// Whether this node is a managed-reference registry container.
	pub is_managed_reference_registry: bool,
	/// Primitive kind when this node is a basic-type leaf.
	pub basic: Option<BasicType>,
	/// Child field nodes in schema order.
	pub children: Vec<Rc<TypeTreeNode>>,
}

impl TypeTreeNode {
	/// Whether the node has no children.
	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}

	/// Whether the node decodes as a primitive.
	pub fn is_basic(&self) -> bool {
		self.basic.is_some()
	}

	/// Whether the node is a length-prefixed string.
	pub fn is_string(&self) -> bool {
		&*self.type_name == "string"
	}

	/// Whether the node's serialized size is statically known.
	pub fn has_constant_size(&self) -> bool {
		self.byte_size >= 0
	}

	/// Whether the end offset must be rounded up to a 4-byte boundary.
	pub fn requires_align(&self) -> bool {
		self.align_bytes || self.any_child_aligns
	}

	/// Element template of an array node.
	///
	/// Validates the serialized array shape: a 4-byte integer size leaf
	/// followed by the element template.
	pub fn array_element(&self) -> Result<&Rc<TypeTreeNode>> {
		let size_leaf = self.children.first();
		let valid_size_leaf = size_leaf.is_some_and(|leaf| leaf.byte_size == 4 && leaf.is_leaf() && leaf.is_basic());
		if !valid_size_leaf || self.children.len() != 2 {
			return Err(AssetError::InvalidArraySizeNode {
				type_name: self.type_name.to_string(),
			});
		}
		Ok(&self.children[1])
	}

	/// Find a direct child by field name.
	pub fn find_child(&self, name: &str) -> Option<&Rc<TypeTreeNode>> {
		self.children.iter().find(|child| &*child.name == name)
	}

	/// Index of a direct child by field name.
	pub fn child_index(&self, name: &str) -> Option<usize> {
		self.children.iter().position(|child| &*child.name == name)
	}

	/// Build a basic-type leaf node.
	pub fn basic(name: &str, type_name: &str, kind: BasicType) -> Self {
		Self {
			name: Arc::from(name),
			type_name: Arc::from(type_name),
			byte_size: kind.size(),
			is_array: false,
			align_bytes: false,
			any_child_aligns: false,
			is_managed_reference_registry: false,
			basic: Some(kind),
			children: Vec::new(),
		}
	}

	/// Build a length-prefixed string node.
	pub fn string(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			type_name: Arc::from("string"),
			byte_size: VARIABLE_SIZE,
			is_array: false,
			align_bytes: false,
			any_child_aligns: false,
			is_managed_reference_registry: false,
			basic: None,
			children: Vec::new(),
		}
	}

	/// Build an array node from its element template.
	///
	/// The serialized layout is a 4-byte element count followed by the
	/// packed elements; the size leaf is generated.
	pub fn array(name: &str, element: TypeTreeNode) -> Self {
		let size_leaf = Self::basic("size", "int", BasicType::I32);
		let any_child_aligns = node_or_child_aligns(&size_leaf) || node_or_child_aligns(&element);
		Self {
			name: Arc::from(name),
			type_name: Arc::from("Array"),
			byte_size: VARIABLE_SIZE,
			is_array: true,
			align_bytes: false,
			any_child_aligns,
			is_managed_reference_registry: false,
			basic: None,
			children: vec![Rc::new(size_leaf), Rc::new(element)],
		}
	}

	/// Build a `vector` wrapper holding one array child.
	pub fn vector(name: &str, element: TypeTreeNode) -> Self {
		let array = Self::array("Array", element);
		let any_child_aligns = node_or_child_aligns(&array);
		Self {
			name: Arc::from(name),
			type_name: Arc::from("vector"),
			byte_size: VARIABLE_SIZE,
			is_array: false,
			align_bytes: false,
			any_child_aligns,
			is_managed_reference_registry: false,
			basic: None,
			children: vec![Rc::new(array)],
		}
	}

	/// Build an object node from ordered child fields.
	///
	/// The fixed size is the sum of child sizes when every child has a
	/// constant size, otherwise [`VARIABLE_SIZE`].
	pub fn object(name: &str, type_name: &str, children: Vec<TypeTreeNode>) -> Self {
		let mut byte_size = 0_i32;
		let mut constant = true;
		let mut any_child_aligns = false;
		for child in &children {
			any_child_aligns |= node_or_child_aligns(child);
			if child.has_constant_size() {
				byte_size = byte_size.saturating_add(child.byte_size);
			} else {
				constant = false;
			}
		}

		Self {
			name: Arc::from(name),
			type_name: Arc::from(type_name),
			byte_size: if constant { byte_size } else { VARIABLE_SIZE },
			is_array: false,
			align_bytes: false,
			any_child_aligns,
			is_managed_reference_registry: false,
			basic: None,
			children: children.into_iter().map(Rc::new).collect(),
		}
	}

	/// Build a typed object-reference node (`PPtr<T>`).
	pub fn pptr(name: &str, target_type: &str) -> Self {
		Self::object(
			name,
			&format!("PPtr<{target_type}>"),
			vec![
				Self::basic("m_FileID", "int", BasicType::I32),
				Self::basic("m_PathID", "SInt64", BasicType::I64),
			],
		)
	}

	/// Build a managed-reference registry container node.
	pub fn registry(name: &str) -> Self {
		let version = Self::basic("version", "int", BasicType::I32);
		Self {
			name: Arc::from(name),
			type_name: Arc::from("ManagedReferencesRegistry"),
			byte_size: VARIABLE_SIZE,
			is_array: false,
			align_bytes: false,
			any_child_aligns: false,
			is_managed_reference_registry: true,
			basic: None,
			children: vec![Rc::new(version)],
		}
	}

	/// Mark this node as requiring 4-byte trailing alignment.
	pub fn aligned(mut self) -> Self {
		self.align_bytes = true;
		self
	}
}

fn node_or_child_aligns(node: &TypeTreeNode) -> bool {
	node.align_bytes || node.any_child_aligns
}

/// Runtime source of type trees for serialized objects.
pub trait SchemaProvider {
	/// Type tree root describing the object with the given id.
	fn type_tree(&self, object_id: i64) -> Result<Rc<TypeTreeNode>>;

	/// Type tree root for a named polymorphic type.
	///
	/// Fails with [`AssetError::TypeNotFound`] when the triple cannot be
	/// resolved.
	fn named_type_tree(&self, class_name: &str, namespace_name: &str, assembly_name: &str) -> Result<Rc<TypeTreeNode>>;
}

/// Schema provider with no registered types, for objects without
/// managed-reference fields.
pub struct EmptySchemaProvider;

impl SchemaProvider for EmptySchemaProvider {
	fn type_tree(&self, object_id: i64) -> Result<Rc<TypeTreeNode>> {
		Err(AssetError::ObjectNotFound { id: object_id })
	}

	fn named_type_tree(&self, class_name: &str, namespace_name: &str, assembly_name: &str) -> Result<Rc<TypeTreeNode>> {
		Err(AssetError::TypeNotFound {
			class_name: class_name.to_owned(),
			namespace_name: namespace_name.to_owned(),
			assembly_name: assembly_name.to_owned(),
		})
	}
}

#[cfg(test)]
mod tests {
	use crate::asset::{BasicType, TypeTreeNode, VARIABLE_SIZE};

	#[test]
	fn object_size_sums_constant_children() {
		let node = TypeTreeNode::object(
			"m_Pair",
			"Pair",
			vec![
				TypeTreeNode::basic("first", "int", BasicType::I32),
				TypeTreeNode::basic("second", "SInt64", BasicType::I64),
			],
		);
		assert_eq!(node.byte_size, 12);
		assert!(node.has_constant_size());
	}

	#[test]
	fn variable_child_makes_object_variable() {
		let node = TypeTreeNode::object(
			"m_Named",
			"Named",
			vec![
				TypeTreeNode::string("m_Name"),
				TypeTreeNode::basic("m_Value", "int", BasicType::I32),
			],
		);
		assert_eq!(node.byte_size, VARIABLE_SIZE);
	}

	#[test]
	fn align_flags_propagate_to_ancestors() {
		let inner = TypeTreeNode::object("m_Inner", "Inner", vec![TypeTreeNode::basic("m_Flag", "bool", BasicType::Bool).aligned()]);
		assert!(!inner.align_bytes);
		assert!(inner.any_child_aligns);

		let outer = TypeTreeNode::object("m_Outer", "Outer", vec![inner]);
		assert!(outer.any_child_aligns);
		assert!(outer.requires_align());
	}

	#[test]
	fn array_nodes_carry_size_leaf_and_template() {
		let node = TypeTreeNode::array("m_Values", TypeTreeNode::basic("data", "int", BasicType::I32));
		assert!(node.is_array);
		assert_eq!(node.children.len(), 2);
		assert_eq!(&*node.children[0].name, "size");
		assert_eq!(node.children[0].byte_size, 4);
		assert_eq!(&*node.children[1].name, "data");
	}
}
