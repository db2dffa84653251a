use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::asset::bytes::ByteSource;
use crate::asset::pptr::{PPtr, is_pptr_type, referenced_type_name};
use crate::asset::registry::{self, TypeHeader};
use crate::asset::typetree::{SchemaProvider, TypeTreeNode};
use crate::asset::{AssetError, Result};

/// One discovered object reference and the property path leading to it.
#[derive(Debug, Clone)]
pub struct RefRecord {
	/// Id of the object owning the reference field.
	pub object_id: i64,
	/// Decoded reference value.
	pub pptr: PPtr,
	/// Dotted/indexed path from the object root to the reference field.
	pub property_path: Arc<str>,
	/// Referenced type name extracted from the `PPtr<T>` declaration.
	pub referenced_type: Arc<str>,
}

/// Walk one object's full layout and emit every non-null reference.
///
/// The walk is strictly sequential with a single running cursor and no
/// caching; each call is independent and re-entrant. Returns the end
/// offset of the object, which must agree with the root size computed by
/// [`crate::asset::RandomAccessReader`].
pub fn scan_object_refs(
	schema: &dyn SchemaProvider,
	source: &dyn ByteSource,
	object_id: i64,
	offset: i64,
	root: &TypeTreeNode,
	emit: &mut dyn FnMut(RefRecord),
) -> Result<i64> {
	let mut scanner = RefScanner {
		schema,
		source,
		object_id,
		cursor: offset,
		suppressed: 0,
		named_trees: HashMap::new(),
		emit,
	};

	let mut path = String::new();
	for child in &root.children {
		path.push_str(&child.name);
		scanner.process_node(child, &mut path)?;
		path.clear();
	}

	if root.requires_align() {
		scanner.cursor = registry::align4(scanner.cursor);
	}

	Ok(scanner.cursor)
}

/// Collect every reference emitted by [`scan_object_refs`].
pub fn collect_object_refs(
	schema: &dyn SchemaProvider,
	source: &dyn ByteSource,
	object_id: i64,
	offset: i64,
	root: &TypeTreeNode,
) -> Result<Vec<RefRecord>> {
	let mut out = Vec::new();
	scan_object_refs(schema, source, object_id, offset, root, &mut |record| out.push(record))?;
	Ok(out)
}

struct RefScanner<'a, 'c> {
	schema: &'a dyn SchemaProvider,
	source: &'a dyn ByteSource,
	object_id: i64,
	cursor: i64,
	suppressed: u32,
	named_trees: HashMap<TypeHeader, Rc<TypeTreeNode>>,
	emit: &'c mut dyn FnMut(RefRecord),
}

impl RefScanner<'_, '_> {
	fn process_node(&mut self, node: &TypeTreeNode, path: &mut String) -> Result<()> {
		if node.is_managed_reference_registry {
			self.process_registry(node, path)?;
		} else if node.is_basic() {
			self.cursor += i64::from(node.byte_size);
		} else if node.is_array {
			let element = node.array_element()?.clone();
			let len = self.read_count()?;
			self.cursor += 4;

			if element.is_basic() {
				self.cursor += len as i64 * i64::from(element.byte_size);
			} else {
				for index in 0..len {
					let mark = path.len();
					path.push('[');
					path.push_str(&index.to_string());
					path.push(']');
					self.process_node(&element, path)?;
					path.truncate(mark);
				}
			}
		} else if is_pptr_type(&node.type_name) {
			self.extract_pptr(node, path)?;
		} else if node.is_string() {
			let len = self.read_string_len()?;
			self.cursor += 4 + len as i64;
		} else if node.is_leaf() {
			if !node.has_constant_size() {
				return Err(AssetError::UnsupportedType {
					type_name: node.type_name.to_string(),
				});
			}
			self.cursor += i64::from(node.byte_size);
		} else {
			for child in &node.children {
				let mark = path.len();
				path.push('.');
				path.push_str(&child.name);
				self.process_node(child, path)?;
				path.truncate(mark);
			}
		}

		if node.requires_align() {
			self.cursor = registry::align4(self.cursor);
		}

		Ok(())
	}

	fn extract_pptr(&mut self, node: &TypeTreeNode, path: &str) -> Result<()> {
		let file_index = self.source.read_i32(self.cursor)?;
		let path_id = self.source.read_i64(self.cursor + 4)?;
		self.cursor += 12;

		let pptr = PPtr { file_index, path_id };
		if pptr.is_null() || self.suppressed > 0 {
			return Ok(());
		}

		(self.emit)(RefRecord {
			object_id: self.object_id,
			pptr,
			property_path: Arc::from(path),
			referenced_type: Arc::from(referenced_type_name(&node.type_name).unwrap_or_default()),
		});
		Ok(())
	}

	fn process_registry(&mut self, node: &TypeTreeNode, path: &mut String) -> Result<()> {
		if node.children.is_empty() {
			return Err(AssetError::MalformedRegistry {
				detail: "registry node has no version child",
			});
		}

		let version = self.source.read_i32(self.cursor)?;
		self.cursor += 4;

		match version {
			registry::REGISTRY_VERSION_SENTINEL => {
				// Sentinel-terminated: no entry count; the reserved type
				// triple ends the list and carries no payload.
				let mut ordinal = 0_i64;
				loop {
					let (header, after) = registry::read_type_header(self.source, self.cursor)?;
					self.cursor = after;
					if header.is_terminus() {
						break;
					}

					let tree = self.resolve_named(&header)?;
					self.process_entry(&tree, ordinal, path, false)?;
					ordinal += 1;
				}
			}
			registry::REGISTRY_VERSION_COUNTED => {
				let count = self.read_count()?;
				self.cursor += 4;

				for _ in 0..count {
					let rid = self.source.read_i64(self.cursor)?;
					self.cursor += 8;
					let (header, after) = registry::read_type_header(self.source, self.cursor)?;
					self.cursor = after;

					let tree = self.resolve_named(&header)?;
					// Reserved rids still occupy bytes; walk them with
					// emission suppressed so the cursor stays in sync.
					self.process_entry(&tree, rid, path, registry::is_reserved_rid(rid))?;
				}
			}
			version => return Err(AssetError::UnsupportedSchemaVersion { version }),
		}

		Ok(())
	}

	fn process_entry(&mut self, tree: &TypeTreeNode, rid: i64, path: &mut String, suppress: bool) -> Result<()> {
		if suppress {
			self.suppressed += 1;
		}

		let mark = path.len();
		path.push_str(&format!(".rid({rid}).data"));
		let walked = self.process_node(tree, path);
		path.truncate(mark);

		if suppress {
			self.suppressed -= 1;
		}
		walked
	}

	fn resolve_named(&mut self, header: &TypeHeader) -> Result<Rc<TypeTreeNode>> {
		if let Some(tree) = self.named_trees.get(header) {
			return Ok(tree.clone());
		}

		let tree = self.schema.named_type_tree(&header.class_name, &header.namespace_name, &header.assembly_name)?;
		self.named_trees.insert(header.clone(), tree.clone());
		Ok(tree)
	}

	fn read_count(&mut self) -> Result<usize> {
		let len = self.source.read_i32(self.cursor)?;
		if len < 0 {
			return Err(AssetError::NegativeArrayLength { len });
		}
		Ok(len as usize)
	}

	fn read_string_len(&mut self) -> Result<usize> {
		let len = self.source.read_i32(self.cursor)?;
		if len < 0 {
			return Err(AssetError::NegativeStringLength { len });
		}
		Ok(len as usize)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::rc::Rc;

	use crate::asset::{
		AssetError, BasicType, EmptySchemaProvider, Result, SchemaProvider, SliceSource, TypeHeader, TypeTreeNode, collect_object_refs,
	};

	struct NamedTypes {
		trees: HashMap<(String, String, String), Rc<TypeTreeNode>>,
	}

	impl SchemaProvider for NamedTypes {
		fn type_tree(&self, object_id: i64) -> Result<Rc<TypeTreeNode>> {
			Err(AssetError::ObjectNotFound { id: object_id })
		}

		fn named_type_tree(&self, class_name: &str, namespace_name: &str, assembly_name: &str) -> Result<Rc<TypeTreeNode>> {
			self.trees
				.get(&(class_name.to_owned(), namespace_name.to_owned(), assembly_name.to_owned()))
				.cloned()
				.ok_or_else(|| AssetError::TypeNotFound {
					class_name: class_name.to_owned(),
					namespace_name: namespace_name.to_owned(),
					assembly_name: assembly_name.to_owned(),
				})
		}
	}

	fn push_i32(out: &mut Vec<u8>, value: i32) {
		out.extend_from_slice(&value.to_le_bytes());
	}

	fn push_i64(out: &mut Vec<u8>, value: i64) {
		out.extend_from_slice(&value.to_le_bytes());
	}

	fn push_string(out: &mut Vec<u8>, text: &str) {
		push_i32(out, text.len() as i32);
		out.extend_from_slice(text.as_bytes());
	}

	fn push_aligned_string(out: &mut Vec<u8>, text: &str) {
		push_string(out, text);
		while out.len() % 4 != 0 {
			out.push(0);
		}
	}

	fn push_pptr(out: &mut Vec<u8>, file_index: i32, path_id: i64) {
		push_i32(out, file_index);
		push_i64(out, path_id);
	}

	#[test]
	fn object_without_references_emits_nothing() {
		let root = TypeTreeNode::object(
			"Base",
			"Sample",
			vec![TypeTreeNode::basic("m_Value", "int", BasicType::I32), TypeTreeNode::string("m_Name")],
		);

		let mut bytes = Vec::new();
		push_i32(&mut bytes, 1);
		push_string(&mut bytes, "x");

		let schema = EmptySchemaProvider;
		let source = SliceSource::new(&bytes);
		let refs = collect_object_refs(&schema, &source, 10, 0, &root).expect("scan succeeds");
		assert!(refs.is_empty());
	}

	#[test]
	fn null_references_are_suppressed_and_paths_are_exact() {
		let item = TypeTreeNode::object("data", "Item", vec![TypeTreeNode::pptr("m_Target", "Material")]);
		let root = TypeTreeNode::object(
			"Base",
			"Sample",
			vec![
				TypeTreeNode::pptr("m_Script", "MonoScript"),
				TypeTreeNode::vector("m_Items", item),
				TypeTreeNode::object("m_Extra", "Extra", vec![TypeTreeNode::pptr("m_Owner", "GameObject")]),
			],
		);

		let mut bytes = Vec::new();
		push_pptr(&mut bytes, 0, 0); // m_Script: null, not emitted
		push_i32(&mut bytes, 2);
		push_pptr(&mut bytes, 0, 301);
		push_pptr(&mut bytes, 0, 0); // m_Items[1]: null
		push_pptr(&mut bytes, 2, 77);

		let schema = EmptySchemaProvider;
		let source = SliceSource::new(&bytes);
		let refs = collect_object_refs(&schema, &source, 4, 0, &root).expect("scan succeeds");

		assert_eq!(refs.len(), 2);
		assert_eq!(&*refs[0].property_path, "m_Items.Array[0].m_Target");
		assert_eq!(refs[0].pptr.path_id, 301);
		assert_eq!(&*refs[0].referenced_type, "Material");
		assert_eq!(&*refs[1].property_path, "m_Extra.m_Owner");
		assert_eq!(refs[1].pptr.file_index, 2);
		assert_eq!(&*refs[1].referenced_type, "GameObject");
	}

	#[test]
	fn sentinel_registry_emits_each_real_entry() {
		let header = TypeHeader {
			class_name: "Effect".to_owned(),
			namespace_name: "Game".to_owned(),
			assembly_name: "Assembly-CSharp".to_owned(),
		};
		let mut trees = HashMap::new();
		trees.insert(
			(header.class_name.clone(), header.namespace_name.clone(), header.assembly_name.clone()),
			Rc::new(TypeTreeNode::object("Effect", "Effect", vec![TypeTreeNode::pptr("m_Texture", "Texture2D")])),
		);
		let schema = NamedTypes { trees };

		let root = TypeTreeNode::object("Base", "Sample", vec![TypeTreeNode::registry("references")]);

		let mut bytes = Vec::new();
		push_i32(&mut bytes, 1); // registry version
		for path_id in [41_i64, 42] {
			push_aligned_string(&mut bytes, "Effect");
			push_aligned_string(&mut bytes, "Game");
			push_aligned_string(&mut bytes, "Assembly-CSharp");
			push_pptr(&mut bytes, 0, path_id);
		}
		push_aligned_string(&mut bytes, "Terminus");
		push_aligned_string(&mut bytes, "UnityEngine.DMAT");
		push_aligned_string(&mut bytes, "FAKE_ASM");

		let source = SliceSource::new(&bytes);
		let refs = collect_object_refs(&schema, &source, 5, 0, &root).expect("scan succeeds");

		assert_eq!(refs.len(), 2);
		assert_eq!(&*refs[0].property_path, "references.rid(0).data.m_Texture");
		assert_eq!(refs[0].pptr.path_id, 41);
		assert_eq!(&*refs[1].property_path, "references.rid(1).data.m_Texture");
		assert_eq!(refs[1].pptr.path_id, 42);
	}

	#[test]
	fn counted_registry_consumes_reserved_entries_without_emitting() {
		let header = TypeHeader {
			class_name: "Effect".to_owned(),
			namespace_name: "Game".to_owned(),
			assembly_name: "Assembly-CSharp".to_owned(),
		};
		let mut trees = HashMap::new();
		trees.insert(
			(header.class_name.clone(), header.namespace_name.clone(), header.assembly_name.clone()),
			Rc::new(TypeTreeNode::object("Effect", "Effect", vec![TypeTreeNode::pptr("m_Texture", "Texture2D")])),
		);
		let schema = NamedTypes { trees };

		let root = TypeTreeNode::object("Base", "Sample", vec![TypeTreeNode::registry("references")]);

		let mut bytes = Vec::new();
		push_i32(&mut bytes, 2); // registry version
		push_i32(&mut bytes, 3); // entry count
		for (rid, path_id) in [(3_i64, 31_i64), (-2, 999), (4, 44)] {
			push_i64(&mut bytes, rid);
			push_aligned_string(&mut bytes, "Effect");
			push_aligned_string(&mut bytes, "Game");
			push_aligned_string(&mut bytes, "Assembly-CSharp");
			push_pptr(&mut bytes, 0, path_id);
		}

		let source = SliceSource::new(&bytes);
		let refs = collect_object_refs(&schema, &source, 6, 0, &root).expect("scan succeeds");

		// The reserved entry's bytes were consumed but not emitted, so the
		// entry after it still decodes at the right offset.
		assert_eq!(refs.len(), 2);
		assert_eq!(&*refs[0].property_path, "references.rid(3).data.m_Texture");
		assert_eq!(refs[0].pptr.path_id, 31);
		assert_eq!(&*refs[1].property_path, "references.rid(4).data.m_Texture");
		assert_eq!(refs[1].pptr.path_id, 44);
	}
}
