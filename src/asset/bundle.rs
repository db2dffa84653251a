use crate::asset::Result;
use crate::asset::pptr::PPtr;
use crate::asset::reader::Reader;

/// Decoded asset-bundle directory: bundle name plus named entry references.
#[derive(Debug, Clone)]
pub struct BundleInfo {
	/// Bundle display name.
	pub name: Box<str>,
	/// Named container entries in serialized order.
	pub assets: Vec<BundleAsset>,
}

/// One named entry of an asset-bundle container.
#[derive(Debug, Clone)]
pub struct BundleAsset {
	/// Entry path name.
	pub name: Box<str>,
	/// Reference to the entry's root object.
	pub pptr: PPtr,
}

/// Decode an `AssetBundle` object's name and `m_Container` entries.
///
/// Container entries are pairs of a path string (`first`) and an asset
/// info struct whose `asset` field holds the entry reference.
pub fn read_bundle(reader: &Reader<'_, '_>) -> Result<BundleInfo> {
	let name = reader.field("m_Name")?.string_value()?;

	let container = reader.field("m_Container")?;
	let count = container.array_len()?;
	let mut assets = Vec::with_capacity(count);
	for index in 0..count {
		let pair = container.element(index)?;
		assets.push(BundleAsset {
			name: pair.field("first")?.string_value()?.into_boxed_str(),
			pptr: PPtr::read(&pair.field("second")?.field("asset")?)?,
		});
	}

	Ok(BundleInfo {
		name: name.into_boxed_str(),
		assets,
	})
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use crate::asset::{BasicType, EmptySchemaProvider, RandomAccessReader, SliceSource, TypeTreeNode, read_bundle};

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

	fn pad4(out: &mut Vec<u8>) {
		while out.len() % 4 != 0 {
			out.push(0);
		}
	}

	#[test]
	fn container_pairs_decode_names_and_references() {
		let asset_info = TypeTreeNode::object(
			"second",
			"AssetInfo",
			vec![
				TypeTreeNode::basic("preloadIndex", "int", BasicType::I32),
				TypeTreeNode::basic("preloadSize", "int", BasicType::I32),
				TypeTreeNode::pptr("asset", "Object"),
			],
		);
		let pair = TypeTreeNode::object("data", "pair", vec![TypeTreeNode::string("first").aligned(), asset_info]);
		let root = Rc::new(TypeTreeNode::object(
			"Base",
			"AssetBundle",
			vec![TypeTreeNode::string("m_Name").aligned(), TypeTreeNode::vector("m_Container", pair)],
		));

		let mut bytes = Vec::new();
		push_string(&mut bytes, "bundle");
		pad4(&mut bytes);
		push_i32(&mut bytes, 2);
		for (path, path_id) in [("Assets/player.prefab", 11_i64), ("Assets/enemy.prefab", 12)] {
			push_string(&mut bytes, path);
			pad4(&mut bytes);
			push_i32(&mut bytes, 0);
			push_i32(&mut bytes, 1);
			push_i32(&mut bytes, 0);
			push_i64(&mut bytes, path_id);
		}

		let schema = EmptySchemaProvider;
		let source = SliceSource::new(&bytes);
		let reader = RandomAccessReader::new(&schema, &source, root, 0).expect("reader builds");

		let bundle = read_bundle(&reader.root()).expect("bundle decodes");
		assert_eq!(&*bundle.name, "bundle");
		assert_eq!(bundle.assets.len(), 2);
		assert_eq!(&*bundle.assets[0].name, "Assets/player.prefab");
		assert_eq!(bundle.assets[0].pptr.path_id, 11);
		assert_eq!(&*bundle.assets[1].name, "Assets/enemy.prefab");
		assert_eq!(bundle.assets[1].pptr.path_id, 12);
	}
}
