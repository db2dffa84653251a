use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::chains::{AssetRow, EdgeStore, InboundRef, ObjectRow};
use crate::asset::Result;

/// One persisted object metadata row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
	/// Object id, unique across the whole store.
	pub id: i64,
	/// Object type name.
	pub type_name: String,
	/// Optional display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Serialized file the object lives in.
	pub serialized_file: String,
	/// Owning asset bundle name, when any.
	#[serde(default)]
	pub asset_bundle: Option<String>,
	/// Id of the owning composite object, when any.
	#[serde(default)]
	pub owner: Option<i64>,
}

/// One persisted asset-bundle entry row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAsset {
	/// Object id of the asset root.
	pub id: i64,
	/// Exposed asset name.
	pub name: String,
	/// Owning asset bundle name.
	pub asset_bundle: String,
	/// Serialized file the asset lives in.
	pub serialized_file: String,
}

/// One persisted reference edge row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRef {
	/// Referencing object id.
	pub from: i64,
	/// Referenced object id.
	pub to: i64,
	/// Property path on the referencing object.
	pub property_path: String,
	/// Referenced type name from the field declaration, when recorded.
	#[serde(default)]
	pub referenced_type: Option<String>,
}

/// Serializable contents of an edge store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
	/// Object metadata rows.
	pub objects: Vec<StoredObject>,
	/// Asset-bundle entry rows.
	pub assets: Vec<StoredAsset>,
	/// Reference edge rows.
	pub refs: Vec<StoredRef>,
}

/// In-memory [`EdgeStore`] over loaded rows.
///
/// Reference rows are indexed by their target id; lookups return edges in
/// a deterministic `(from, path)` order.
pub struct MemoryEdgeStore {
	objects: HashMap<i64, StoredObject>,
	assets: HashMap<i64, StoredAsset>,
	inbound: HashMap<i64, Vec<usize>>,
	outbound: HashMap<i64, Vec<usize>>,
	refs: Vec<StoredRef>,
}

impl MemoryEdgeStore {
	/// Build the indexed store from loaded rows.
	pub fn new(data: StoreData) -> Self {
		let objects = data.objects.into_iter().map(|row| (row.id, row)).collect();
		let assets: HashMap<i64, StoredAsset> = data.assets.into_iter().map(|row| (row.id, row)).collect();

		let mut refs = data.refs;
		refs.sort_by(|left, right| {
			left.from
				.cmp(&right.from)
				.then_with(|| left.property_path.cmp(&right.property_path))
		});

		let mut inbound: HashMap<i64, Vec<usize>> = HashMap::new();
		let mut outbound: HashMap<i64, Vec<usize>> = HashMap::new();
		for (index, row) in refs.iter().enumerate() {
			inbound.entry(row.to).or_default().push(index);
			outbound.entry(row.from).or_default().push(index);
		}

		Self {
			objects,
			assets,
			inbound,
			outbound,
			refs,
		}
	}

	/// Load store rows from a JSON file.
	pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let data: StoreData = serde_json::from_str(&text)?;
		Ok(Self::new(data))
	}

	fn script_name(&self, object_id: i64) -> Option<String> {
		// The attached script is the target of the object's `m_Script`
		// reference, mirroring how script components serialize.
		let indices = self.outbound.get(&object_id)?;
		let row = indices
			.iter()
			.map(|index| &self.refs[*index])
			.find(|row| row.property_path == "m_Script")?;
		self.objects.get(&row.to).and_then(|target| target.name.clone())
	}
}

impl EdgeStore for MemoryEdgeStore {
	fn refs_to(&self, object_id: i64) -> Result<Vec<InboundRef>> {
		let rows = self.inbound.get(&object_id).map(Vec::as_slice).unwrap_or_default();
		Ok(rows
			.iter()
			.map(|index| {
				let row = &self.refs[*index];
				InboundRef {
					from: row.from,
					property_path: Arc::from(row.property_path.as_str()),
					from_is_asset: self.assets.contains_key(&row.from),
				}
			})
			.collect())
	}

	fn object_row(&self, object_id: i64) -> Result<Option<ObjectRow>> {
		let Some(row) = self.objects.get(&object_id) else {
			return Ok(None);
		};

		let owner = row.owner.and_then(|owner_id| {
			self.objects
				.get(&owner_id)
				.map(|owner| format!("{} (id={})", owner.name.as_deref().unwrap_or(""), owner.id))
		});
		let script = if row.type_name == "MonoBehaviour" { self.script_name(object_id) } else { None };

		Ok(Some(ObjectRow {
			type_name: row.type_name.clone(),
			name: row.name.clone(),
			asset_bundle: row.asset_bundle.clone(),
			serialized_file: row.serialized_file.clone(),
			owner,
			script,
		}))
	}

	fn asset_row(&self, object_id: i64) -> Result<Option<AssetRow>> {
		Ok(self.assets.get(&object_id).map(|row| AssetRow {
			asset_name: row.name.clone(),
			asset_bundle: row.asset_bundle.clone(),
			serialized_file: row.serialized_file.clone(),
		}))
	}

	fn find_objects(&self, name: &str, type_name: Option<&str>) -> Result<Vec<i64>> {
		let mut ids: Vec<i64> = self
			.objects
			.values()
			.filter(|row| row.name.as_deref() == Some(name))
			.filter(|row| type_name.is_none_or(|wanted| row.type_name == wanted))
			.map(|row| row.id)
			.collect();
		ids.sort_unstable();
		Ok(ids)
	}
}

#[cfg(test)]
mod tests {
	use crate::asset::{EdgeStore, MemoryEdgeStore, StoreData};

	const SAMPLE: &str = r#"{
		"objects": [
			{"id": 1, "type_name": "GameObject", "name": "Player", "serialized_file": "CAB-a"},
			{"id": 2, "type_name": "MonoBehaviour", "serialized_file": "CAB-a", "owner": 1},
			{"id": 3, "type_name": "MonoScript", "name": "PlayerController", "serialized_file": "CAB-a"}
		],
		"assets": [
			{"id": 1, "name": "Assets/player.prefab", "asset_bundle": "chars.unity3d", "serialized_file": "CAB-a"}
		],
		"refs": [
			{"from": 2, "to": 3, "property_path": "m_Script"},
			{"from": 1, "to": 2, "property_path": "m_Component.Array[0].component", "referenced_type": "MonoBehaviour"}
		]
	}"#;

	#[test]
	fn rows_load_and_index_by_target() {
		let data: StoreData = serde_json::from_str(SAMPLE).expect("store parses");
		let store = MemoryEdgeStore::new(data);

		let inbound = store.refs_to(2).expect("query succeeds");
		assert_eq!(inbound.len(), 1);
		assert_eq!(inbound[0].from, 1);
		assert!(inbound[0].from_is_asset);

		assert!(store.refs_to(99).expect("query succeeds").is_empty());
	}

	#[test]
	fn script_and_owner_annotations_are_derived() {
		let data: StoreData = serde_json::from_str(SAMPLE).expect("store parses");
		let store = MemoryEdgeStore::new(data);

		let row = store.object_row(2).expect("query succeeds").expect("object exists");
		assert_eq!(row.type_name, "MonoBehaviour");
		assert_eq!(row.script.as_deref(), Some("PlayerController"));
		assert_eq!(row.owner.as_deref(), Some("Player (id=1)"));
	}

	#[test]
	fn name_lookup_filters_by_type() {
		let data: StoreData = serde_json::from_str(SAMPLE).expect("store parses");
		let store = MemoryEdgeStore::new(data);

		assert_eq!(store.find_objects("Player", None).expect("query succeeds"), vec![1]);
		assert_eq!(store.find_objects("Player", Some("GameObject")).expect("query succeeds"), vec![1]);
		assert!(store.find_objects("Player", Some("Texture2D")).expect("query succeeds").is_empty());
	}
}
