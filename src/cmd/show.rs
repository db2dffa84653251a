use std::path::PathBuf;

use unitydoc::asset::{ObjectInfo, PropertyPath, RandomAccessReader, Reader, Snapshot};

use crate::cmd::util::value_to_json;

#[derive(clap::Args)]
pub struct Args {
	pub file: PathBuf,
	#[arg(long)]
	pub object: Option<i64>,
	#[arg(long = "path")]
	pub path_expr: Option<String>,
	#[arg(long)]
	pub json: bool,
}

/// Decode and print a snapshot object, or list all contained objects.
pub fn run(args: Args) -> unitydoc::asset::Result<()> {
	let Args {
		file,
		object,
		path_expr,
		json,
	} = args;

	let snapshot = Snapshot::load_json(&file)?;

	let Some(object_id) = object else {
		list_objects(&snapshot);
		return Ok(());
	};

	let info = snapshot.object(object_id)?;
	let source = snapshot.source();
	let reader = RandomAccessReader::new(&snapshot, &source, info.root.clone(), info.offset)?;

	let mut node = reader.root();
	if let Some(expr) = path_expr.as_deref() {
		node = PropertyPath::parse(expr)?.apply(node)?;
	}

	if json {
		println!("{}", serde_json::to_string_pretty(&node_to_json(&node)?)?);
		return Ok(());
	}

	println!("object: {object_id}");
	println!("node: {}", node.name());
	println!("type: {}", node.type_name());
	println!("offset: {}", node.offset());
	println!("size: {}", node.size()?);

	if node.is_array() {
		println!("length: {}", node.array_len()?);
	}
	if let Ok(value) = node.value() {
		println!("value: {}", value_to_json(&value));
	} else if node.is_object() {
		println!("fields:");
		for child in node.node().children.iter() {
			println!("  {} {}", child.type_name, child.name);
		}
	}

	Ok(())
}

fn list_objects(snapshot: &Snapshot) {
	println!("id\ttype\tname");
	for info in snapshot.objects() {
		let name = object_display_name(snapshot, info).unwrap_or_default();
		println!("{}\t{}\t{}", info.id, info.root.type_name, name);
	}
}

/// Display name from the object's `m_Name` field, when it has one.
fn object_display_name(snapshot: &Snapshot, info: &ObjectInfo) -> Option<String> {
	let source = snapshot.source();
	let reader = RandomAccessReader::new(snapshot, &source, info.root.clone(), info.offset).ok()?;
	let root = reader.root();
	if !root.has_field("m_Name") {
		return None;
	}
	root.field("m_Name").ok()?.string_value().ok()
}

fn node_to_json(node: &Reader<'_, '_>) -> unitydoc::asset::Result<serde_json::Value> {
	let mut out = serde_json::Map::new();
	out.insert("name".to_owned(), serde_json::json!(&*node.name()));
	out.insert("type".to_owned(), serde_json::json!(&*node.type_name()));
	out.insert("offset".to_owned(), serde_json::json!(node.offset()));
	out.insert("size".to_owned(), serde_json::json!(node.size()?));

	if node.is_array() {
		out.insert("length".to_owned(), serde_json::json!(node.array_len()?));
	}
	if let Ok(value) = node.value() {
		out.insert("value".to_owned(), value_to_json(&value));
	}

	Ok(serde_json::Value::Object(out))
}
