use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::asset::bytes::ByteSource;
use crate::asset::registry::{self, TypeHeader};
use crate::asset::typetree::{SchemaProvider, TypeTreeNode};
use crate::asset::value::Value;
use crate::asset::{AssetError, Result};

/// Index of a materialized node in the reader arena.
type SlotId = usize;

/// Lazy random-access reader over one serialized object.
///
/// Field offsets are computed on demand from the type tree: a child's
/// offset is the end offset of its preceding sibling, so children are
/// materialized strictly in schema/index order and cached. Sizes, array
/// lengths, and decoded values are memoized; the underlying bytes are read
/// at most once per property.
///
/// The reader is a pure view over the byte source and is intended for
/// single-threaded use; decode distinct objects on distinct readers.
pub struct RandomAccessReader<'a> {
	schema: &'a dyn SchemaProvider,
	source: &'a dyn ByteSource,
	slots: RefCell<Vec<Slot>>,
	named_trees: RefCell<HashMap<TypeHeader, Rc<TypeTreeNode>>>,
}

struct Slot {
	node: Rc<TypeTreeNode>,
	offset: i64,
	size: Cell<Option<i64>>,
	array_len: Cell<Option<usize>>,
	value: RefCell<Option<Value>>,
	fill: RefCell<Vec<SlotId>>,
	registry: RefCell<Option<Rc<RegistryState>>>,
}

struct RegistryState {
	version: i32,
	entries: Vec<RegistryEntrySlot>,
	end_offset: i64,
}

struct RegistryEntrySlot {
	rid: i64,
	header: TypeHeader,
	data: SlotId,
}

/// One decoded polymorphic registry entry.
#[derive(Debug)]
pub struct RegistryEntry<'r, 'a> {
	/// Runtime reference id (the entry ordinal for version-1 registries).
	pub rid: i64,
	/// Runtime type name triple of the entry.
	pub header: TypeHeader,
	/// Reader over the entry's decoded object data.
	pub data: Reader<'r, 'a>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NodeKind {
	Basic,
	Array,
	Str,
	Registry,
	Object,
	OpaqueLeaf,
}

fn node_kind(node: &TypeTreeNode) -> NodeKind {
	if node.is_managed_reference_registry {
		NodeKind::Registry
	} else if node.is_basic() {
		NodeKind::Basic
	} else if node.is_array {
		NodeKind::Array
	} else if node.is_string() {
		NodeKind::Str
	} else if node.is_leaf() {
		NodeKind::OpaqueLeaf
	} else {
		NodeKind::Object
	}
}

impl<'a> RandomAccessReader<'a> {
	/// Build a reader over one object located at `offset` in `source`.
	pub fn new(schema: &'a dyn SchemaProvider, source: &'a dyn ByteSource, root: Rc<TypeTreeNode>, offset: i64) -> Result<Self> {
		let reader = Self {
			schema,
			source,
			slots: RefCell::new(Vec::new()),
			named_trees: RefCell::new(HashMap::new()),
		};
		reader.new_slot(root, offset)?;
		Ok(reader)
	}

	/// Reader positioned on the object's root node.
	pub fn root(&self) -> Reader<'_, 'a> {
		Reader { owner: self, slot: 0 }
	}

	fn new_slot(&self, node: Rc<TypeTreeNode>, offset: i64) -> Result<SlotId> {
		// vector and map wrappers hold a single child that is the real
		// array node; navigation descends into it transparently. An align
		// flag carried by the wrapper must survive the unwrap, since the
		// sequential scanner applies it at the wrapper level.
		let node = if matches!(&*node.type_name, "vector" | "map") && !node.is_managed_reference_registry {
			let inner = node.children.first().cloned().ok_or_else(|| AssetError::EmptyWrapperNode {
				type_name: node.type_name.to_string(),
			})?;
			if node.align_bytes && !inner.align_bytes {
				Rc::new(TypeTreeNode {
					name: inner.name.clone(),
					type_name: inner.type_name.clone(),
					byte_size: inner.byte_size,
					is_array: inner.is_array,
					align_bytes: true,
					any_child_aligns: inner.any_child_aligns,
					is_managed_reference_registry: inner.is_managed_reference_registry,
					basic: inner.basic,
					children: inner.children.clone(),
				})
			} else {
				inner
			}
		} else {
			node
		};

		let mut slots = self.slots.borrow_mut();
		slots.push(Slot {
			node,
			offset,
			size: Cell::new(None),
			array_len: Cell::new(None),
			value: RefCell::new(None),
			fill: RefCell::new(Vec::new()),
			registry: RefCell::new(None),
		});
		Ok(slots.len() - 1)
	}

	fn slot_node(&self, id: SlotId) -> Rc<TypeTreeNode> {
		self.slots.borrow()[id].node.clone()
	}

	fn slot_offset(&self, id: SlotId) -> i64 {
		self.slots.borrow()[id].offset
	}

	fn fill_len(&self, id: SlotId) -> usize {
		self.slots.borrow()[id].fill.borrow().len()
	}

	fn fill_get(&self, id: SlotId, index: usize) -> SlotId {
		self.slots.borrow()[id].fill.borrow()[index]
	}

	fn fill_push(&self, id: SlotId, child: SlotId) {
		self.slots.borrow()[id].fill.borrow_mut().push(child);
	}

	fn ensure_size(&self, id: SlotId) -> Result<i64> {
		if let Some(size) = self.slots.borrow()[id].size.get() {
			return Ok(size);
		}

		let node = self.slot_node(id);
		let offset = self.slot_offset(id);

		let mut size = match node_kind(&node) {
			NodeKind::Basic => i64::from(node.byte_size),
			NodeKind::OpaqueLeaf => {
				if node.has_constant_size() {
					i64::from(node.byte_size)
				} else {
					return Err(AssetError::UnsupportedType {
						type_name: node.type_name.to_string(),
					});
				}
			}
			NodeKind::Str => {
				let len = self.read_string_len(offset)?;
				4 + len as i64
			}
			NodeKind::Array => self.array_size(id, &node, offset)?,
			NodeKind::Registry => {
				let state = self.ensure_registry(id)?;
				state.end_offset - offset
			}
			NodeKind::Object => {
				let last = self.ensure_child_at(id, node.children.len() - 1)?;
				self.slot_offset(last) + self.ensure_size(last)? - offset
			}
		};

		if node.requires_align() {
			size = registry::align4(offset + size) - offset;
		}

		self.slots.borrow()[id].size.set(Some(size));
		Ok(size)
	}

	fn array_size(&self, id: SlotId, node: &TypeTreeNode, offset: i64) -> Result<i64> {
		let element = node.array_element()?;
		let len = self.ensure_array_len(id)?;

		if element.is_basic() {
			return Ok(4 + len as i64 * i64::from(element.byte_size));
		}
		if len == 0 {
			return Ok(4);
		}

		if element.has_constant_size() {
			let first = self.ensure_element_at(id, 0, len)?;
			Ok(4 + self.ensure_size(first)? * len as i64)
		} else {
			let last = self.ensure_element_at(id, len - 1, len)?;
			Ok(self.slot_offset(last) + self.ensure_size(last)? - offset)
		}
	}

	fn ensure_array_len(&self, id: SlotId) -> Result<usize> {
		if let Some(len) = self.slots.borrow()[id].array_len.get() {
			return Ok(len);
		}

		let offset = self.slot_offset(id);
		let len = self.read_count(offset)?;
		self.slots.borrow()[id].array_len.set(Some(len));
		Ok(len)
	}

	fn read_count(&self, offset: i64) -> Result<usize> {
		let len = self.source.read_i32(offset)?;
		if len < 0 {
			return Err(AssetError::NegativeArrayLength { len });
		}
		Ok(len as usize)
	}

	fn read_string_len(&self, offset: i64) -> Result<usize> {
		let len = self.source.read_i32(offset)?;
		if len < 0 {
			return Err(AssetError::NegativeStringLength { len });
		}
		Ok(len as usize)
	}

	/// Materialize object children up to `index`, in schema order.
	fn ensure_child_at(&self, id: SlotId, index: usize) -> Result<SlotId> {
		loop {
			let filled = self.fill_len(id);
			if index < filled {
				return Ok(self.fill_get(id, index));
			}

			let node = self.slot_node(id);
			let child_node = node.children.get(filled).cloned().ok_or(AssetError::IndexOutOfRange {
				index,
				len: node.children.len(),
			})?;

			let start = if filled == 0 {
				self.slot_offset(id)
			} else {
				let prev = self.fill_get(id, filled - 1);
				self.slot_offset(prev) + self.ensure_size(prev)?
			};

			let child = self.new_slot(child_node, start)?;
			self.fill_push(id, child);
		}
	}

	/// Materialize array elements up to `index`, in ascending order.
	fn ensure_element_at(&self, id: SlotId, index: usize, len: usize) -> Result<SlotId> {
		if index >= len {
			return Err(AssetError::IndexOutOfRange { index, len });
		}

		loop {
			let filled = self.fill_len(id);
			if index < filled {
				return Ok(self.fill_get(id, index));
			}

			let node = self.slot_node(id);
			let template = node.array_element()?.clone();

			let start = if filled == 0 {
				// The 4-byte element count precedes the first element.
				self.slot_offset(id) + 4
			} else {
				let prev = self.fill_get(id, filled - 1);
				self.slot_offset(prev) + self.ensure_size(prev)?
			};

			let child = self.new_slot(template, start)?;
			self.fill_push(id, child);
		}
	}

	fn ensure_registry(&self, id: SlotId) -> Result<Rc<RegistryState>> {
		if let Some(state) = self.slots.borrow()[id].registry.borrow().as_ref() {
			return Ok(state.clone());
		}

		let node = self.slot_node(id);
		let offset = self.slot_offset(id);
		if node.children.is_empty() {
			return Err(AssetError::MalformedRegistry {
				detail: "registry node has no version child",
			});
		}

		let version = self.source.read_i32(offset)?;
		let mut cursor = offset + 4;
		let mut entries = Vec::new();

		match version {
			registry::REGISTRY_VERSION_SENTINEL => {
				// No entry count is serialized; the list ends at the
				// reserved sentinel type triple, which itself carries no
				// payload. Entry ids are the ordinals.
				loop {
					let (header, after) = registry::read_type_header(self.source, cursor)?;
					cursor = after;
					if header.is_terminus() {
						break;
					}

					let tree = self.resolve_named(&header)?;
					let data = self.new_slot(tree, cursor)?;
					cursor += self.ensure_size(data)?;
					entries.push(RegistryEntrySlot {
						rid: entries.len() as i64,
						header,
						data,
					});
				}
			}
			registry::REGISTRY_VERSION_COUNTED => {
				let count = self.read_count(cursor)?;
				cursor += 4;

				for _ in 0..count {
					let rid = self.source.read_i64(cursor)?;
					cursor += 8;
					let (header, after) = registry::read_type_header(self.source, cursor)?;
					cursor = after;

					let tree = self.resolve_named(&header)?;
					let data = self.new_slot(tree, cursor)?;
					cursor += self.ensure_size(data)?;

					// Reserved rids mark absent entries: their bytes are
					// consumed but they are not exposed to navigation.
					if !registry::is_reserved_rid(rid) {
						entries.push(RegistryEntrySlot { rid, header, data });
					}
				}
			}
			version => return Err(AssetError::UnsupportedSchemaVersion { version }),
		}

		let state = Rc::new(RegistryState {
			version,
			entries,
			end_offset: cursor,
		});
		*self.slots.borrow()[id].registry.borrow_mut() = Some(state.clone());
		Ok(state)
	}

	fn resolve_named(&self, header: &TypeHeader) -> Result<Rc<TypeTreeNode>> {
		if let Some(tree) = self.named_trees.borrow().get(header) {
			return Ok(tree.clone());
		}

		let tree = self.schema.named_type_tree(&header.class_name, &header.namespace_name, &header.assembly_name)?;
		self.named_trees.borrow_mut().insert(header.clone(), tree.clone());
		Ok(tree)
	}

	fn ensure_value(&self, id: SlotId) -> Result<Value> {
		if let Some(value) = self.slots.borrow()[id].value.borrow().as_ref() {
			return Ok(value.clone());
		}

		let node = self.slot_node(id);
		let offset = self.slot_offset(id);

		let value = match node_kind(&node) {
			NodeKind::Basic => {
				let kind = node.basic.ok_or_else(|| AssetError::UnsupportedType {
					type_name: node.type_name.to_string(),
				})?;
				kind.read(self.source, offset)?
			}
			NodeKind::Str => {
				let len = self.read_string_len(offset)?;
				Value::String(self.source.read_string(offset + 4, len)?.into_boxed_str())
			}
			NodeKind::Array => {
				let element = node.array_element()?;
				let kind = element.basic.ok_or_else(|| AssetError::UnsupportedType {
					type_name: node.type_name.to_string(),
				})?;
				let len = self.ensure_array_len(id)?;
				let element_size = i64::from(kind.size());

				let mut values = Vec::with_capacity(len);
				for index in 0..len {
					values.push(kind.read(self.source, offset + 4 + index as i64 * element_size)?);
				}
				Value::Array(values)
			}
			_ => {
				return Err(AssetError::UnsupportedType {
					type_name: node.type_name.to_string(),
				});
			}
		};

		*self.slots.borrow()[id].value.borrow_mut() = Some(value.clone());
		Ok(value)
	}
}

/// Cheap handle to one materialized node of a [`RandomAccessReader`].
#[derive(Clone, Copy)]
pub struct Reader<'r, 'a> {
	owner: &'r RandomAccessReader<'a>,
	slot: SlotId,
}

impl core::fmt::Debug for Reader<'_, '_> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Reader").field("slot", &self.slot).finish()
	}
}

impl<'r, 'a> Reader<'r, 'a> {
	/// Field name of this node.
	pub fn name(&self) -> Arc<str> {
		self.owner.slot_node(self.slot).name.clone()
	}

	/// Declared type name of this node.
	pub fn type_name(&self) -> Arc<str> {
		self.owner.slot_node(self.slot).type_name.clone()
	}

	/// Type tree node this reader is positioned on.
	pub fn node(&self) -> Rc<TypeTreeNode> {
		self.owner.slot_node(self.slot)
	}

	/// Absolute byte offset of this node's data.
	pub fn offset(&self) -> i64 {
		self.owner.slot_offset(self.slot)
	}

	/// Serialized size of this node in bytes, including trailing alignment.
	pub fn size(&self) -> Result<i64> {
		self.owner.ensure_size(self.slot)
	}

	/// Whether this node navigates by field name.
	pub fn is_object(&self) -> bool {
		matches!(node_kind(&self.owner.slot_node(self.slot)), NodeKind::Object)
	}

	/// Whether this node is a serialized array.
	pub fn is_array(&self) -> bool {
		self.owner.slot_node(self.slot).is_array
	}

	/// Whether this node is an array of non-basic elements.
	pub fn is_array_of_objects(&self) -> bool {
		let node = self.owner.slot_node(self.slot);
		node.is_array && node.array_element().map(|element| !element.is_basic()).unwrap_or(false)
	}

	/// Whether this node is a managed-reference registry container.
	pub fn is_registry(&self) -> bool {
		self.owner.slot_node(self.slot).is_managed_reference_registry
	}

	/// Schema-only check for a direct child field; performs no reads.
	pub fn has_field(&self, name: &str) -> bool {
		self.owner.slot_node(self.slot).find_child(name).is_some()
	}

	/// Navigate to a named field of an object node.
	pub fn field(&self, name: &str) -> Result<Reader<'r, 'a>> {
		let node = self.owner.slot_node(self.slot);
		match node_kind(&node) {
			NodeKind::Object => {
				let index = node.child_index(name).ok_or_else(|| AssetError::FieldNotFound {
					name: name.to_owned(),
					type_name: node.type_name.to_string(),
				})?;
				let slot = self.owner.ensure_child_at(self.slot, index)?;
				Ok(Reader { owner: self.owner, slot })
			}
			NodeKind::Registry => {
				if name == "version" && node.child_index("version") == Some(0) {
					let slot = self.owner.ensure_child_at(self.slot, 0)?;
					return Ok(Reader { owner: self.owner, slot });
				}

				if let Some(rid) = parse_rid_field(name) {
					let state = self.owner.ensure_registry(self.slot)?;
					let entry = state.entries.iter().find(|entry| entry.rid == rid);
					if let Some(entry) = entry {
						return Ok(Reader {
							owner: self.owner,
							slot: entry.data,
						});
					}
				}

				Err(AssetError::FieldNotFound {
					name: name.to_owned(),
					type_name: node.type_name.to_string(),
				})
			}
			_ => Err(AssetError::NotAnObject {
				type_name: node.type_name.to_string(),
			}),
		}
	}

	/// Navigate to one element of an array-of-objects node.
	pub fn element(&self, index: usize) -> Result<Reader<'r, 'a>> {
		let node = self.owner.slot_node(self.slot);
		if !node.is_array || node.array_element()?.is_basic() {
			return Err(AssetError::NotAnObjectArray {
				type_name: node.type_name.to_string(),
			});
		}

		let len = self.owner.ensure_array_len(self.slot)?;
		let slot = self.owner.ensure_element_at(self.slot, index, len)?;
		Ok(Reader { owner: self.owner, slot })
	}

	/// Serialized element count of an array node.
	pub fn array_len(&self) -> Result<usize> {
		let node = self.owner.slot_node(self.slot);
		if !node.is_array {
			return Err(AssetError::NotAnArray {
				type_name: node.type_name.to_string(),
			});
		}
		self.owner.ensure_array_len(self.slot)
	}

	/// Child count: schema children for objects, element count for arrays.
	pub fn count(&self) -> Result<usize> {
		let node = self.owner.slot_node(self.slot);
		match node_kind(&node) {
			NodeKind::Object => Ok(node.children.len()),
			NodeKind::Array => self.owner.ensure_array_len(self.slot),
			_ => Ok(0),
		}
	}

	/// Materialize every child reader of an object or array-of-objects node.
	pub fn children(&self) -> Result<Vec<Reader<'r, 'a>>> {
		let node = self.owner.slot_node(self.slot);
		match node_kind(&node) {
			NodeKind::Object => (0..node.children.len())
				.map(|index| {
					let slot = self.owner.ensure_child_at(self.slot, index)?;
					Ok(Reader { owner: self.owner, slot })
				})
				.collect(),
			NodeKind::Array if !node.array_element()?.is_basic() => {
				let len = self.owner.ensure_array_len(self.slot)?;
				(0..len)
					.map(|index| {
						let slot = self.owner.ensure_element_at(self.slot, index, len)?;
						Ok(Reader { owner: self.owner, slot })
					})
					.collect()
			}
			_ => Ok(Vec::new()),
		}
	}

	/// Decoded polymorphic entries of a managed-reference registry node.
	pub fn registry_entries(&self) -> Result<Vec<RegistryEntry<'r, 'a>>> {
		let node = self.owner.slot_node(self.slot);
		if !node.is_managed_reference_registry {
			return Err(AssetError::NotARegistry {
				type_name: node.type_name.to_string(),
			});
		}

		let state = self.owner.ensure_registry(self.slot)?;
		Ok(state
			.entries
			.iter()
			.map(|entry| RegistryEntry {
				rid: entry.rid,
				header: entry.header.clone(),
				data: Reader {
					owner: self.owner,
					slot: entry.data,
				},
			})
			.collect())
	}

	/// Registry format version of a managed-reference registry node.
	pub fn registry_version(&self) -> Result<i32> {
		let node = self.owner.slot_node(self.slot);
		if !node.is_managed_reference_registry {
			return Err(AssetError::NotARegistry {
				type_name: node.type_name.to_string(),
			});
		}
		Ok(self.owner.ensure_registry(self.slot)?.version)
	}

	/// Decode the primitive, string, or basic-array value at this node.
	pub fn value(&self) -> Result<Value> {
		self.owner.ensure_value(self.slot)
	}

	/// Decode a signed 32-bit integer value.
	pub fn i32_value(&self) -> Result<i32> {
		let value = self.value()?;
		value
			.as_i64()
			.and_then(|wide| i32::try_from(wide).ok())
			.ok_or(AssetError::ValueTypeMismatch {
				expected: "i32",
				got: value.kind_name(),
			})
	}

	/// Decode a signed 64-bit integer value.
	pub fn i64_value(&self) -> Result<i64> {
		let value = self.value()?;
		value.as_i64().ok_or(AssetError::ValueTypeMismatch {
			expected: "i64",
			got: value.kind_name(),
		})
	}

	/// Decode a string value.
	pub fn string_value(&self) -> Result<String> {
		let value = self.value()?;
		match value {
			Value::String(text) => Ok(text.into_string()),
			other => Err(AssetError::ValueTypeMismatch {
				expected: "string",
				got: other.kind_name(),
			}),
		}
	}
}

fn parse_rid_field(name: &str) -> Option<i64> {
	name.strip_prefix("rid(")?.strip_suffix(')')?.parse().ok()
}
