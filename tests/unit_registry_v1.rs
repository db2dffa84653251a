#![allow(missing_docs)]

use std::collections::HashMap;
use std::rc::Rc;

use unitydoc::asset::{
	AssetError, BasicType, RandomAccessReader, Result, SchemaProvider, SliceSource, TypeTreeNode, scan_object_refs,
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

fn push_aligned_string(out: &mut Vec<u8>, text: &str) {
	push_i32(out, text.len() as i32);
	out.extend_from_slice(text.as_bytes());
	while out.len() % 4 != 0 {
		out.push(0);
	}
}

fn push_header(out: &mut Vec<u8>, class_name: &str) {
	push_aligned_string(out, class_name);
	push_aligned_string(out, "Game");
	push_aligned_string(out, "Assembly-CSharp");
}

fn push_terminus(out: &mut Vec<u8>) {
	push_aligned_string(out, "Terminus");
	push_aligned_string(out, "UnityEngine.DMAT");
	push_aligned_string(out, "FAKE_ASM");
}

fn sample_schema() -> NamedTypes {
	let mut trees = HashMap::new();
	trees.insert(
		("Buff".to_owned(), "Game".to_owned(), "Assembly-CSharp".to_owned()),
		Rc::new(TypeTreeNode::object("Buff", "Buff", vec![TypeTreeNode::basic("m_Power", "int", BasicType::I32)])),
	);
	NamedTypes { trees }
}

fn registry_root() -> Rc<TypeTreeNode> {
	Rc::new(TypeTreeNode::object("Base", "Sample", vec![TypeTreeNode::registry("references")]))
}

#[test]
fn sentinel_terminated_registry_decodes_each_entry_by_ordinal() {
	let schema = sample_schema();
	let root = registry_root();

	let mut bytes = Vec::new();
	push_i32(&mut bytes, 1); // registry version
	for power in [5_i32, 6, 7] {
		push_header(&mut bytes, "Buff");
		push_i32(&mut bytes, power);
	}
	push_terminus(&mut bytes);

	let source = SliceSource::new(&bytes);
	let reader = RandomAccessReader::new(&schema, &source, root.clone(), 0).expect("reader builds");
	let registry = reader.root().field("references").expect("field exists");

	assert_eq!(registry.registry_version().expect("version reads"), 1);

	let entries = registry.registry_entries().expect("entries decode");
	assert_eq!(entries.len(), 3);
	for (ordinal, entry) in entries.iter().enumerate() {
		assert_eq!(entry.rid, ordinal as i64);
		assert_eq!(entry.header.class_name, "Buff");
		assert!(!entry.header.is_terminus());
		assert_eq!(
			entry.data.field("m_Power").expect("field exists").i32_value().expect("int decodes"),
			5 + ordinal as i32
		);
	}

	// The sentinel entry contributes no payload: the registry ends right
	// after its header, and the scanner agrees.
	assert_eq!(registry.size().expect("size computes"), bytes.len() as i64);
	let end = scan_object_refs(&schema, &source, 1, 0, &root, &mut |_| {}).expect("scan succeeds");
	assert_eq!(end, bytes.len() as i64);
}

#[test]
fn empty_sentinel_registry_has_no_entries() {
	let schema = sample_schema();
	let root = registry_root();

	let mut bytes = Vec::new();
	push_i32(&mut bytes, 1);
	push_terminus(&mut bytes);

	let source = SliceSource::new(&bytes);
	let reader = RandomAccessReader::new(&schema, &source, root, 0).expect("reader builds");
	let registry = reader.root().field("references").expect("field exists");

	assert!(registry.registry_entries().expect("entries decode").is_empty());
	assert_eq!(registry.size().expect("size computes"), bytes.len() as i64);
}

#[test]
fn unresolvable_entry_type_fails_with_type_not_found() {
	let schema = sample_schema();
	let root = registry_root();

	let mut bytes = Vec::new();
	push_i32(&mut bytes, 1);
	push_header(&mut bytes, "Missing");
	push_i32(&mut bytes, 0);
	push_terminus(&mut bytes);

	let source = SliceSource::new(&bytes);
	let reader = RandomAccessReader::new(&schema, &source, root, 0).expect("reader builds");
	let registry = reader.root().field("references").expect("field exists");

	let err = registry.registry_entries().expect_err("unknown type fails");
	assert!(matches!(err, AssetError::TypeNotFound { class_name, .. } if class_name == "Missing"));
}
