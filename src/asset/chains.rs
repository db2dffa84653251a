use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use crate::asset::{AssetError, Result};

/// One persisted inbound reference edge into a target object.
#[derive(Debug, Clone)]
pub struct InboundRef {
	/// Id of the referencing object.
	pub from: i64,
	/// Property path on the referencing object.
	pub property_path: Arc<str>,
	/// Whether the referencing object is an asset-bundle entry.
	pub from_is_asset: bool,
}

/// Report metadata for one object.
#[derive(Debug, Clone)]
pub struct ObjectRow {
	/// Object type name.
	pub type_name: String,
	/// Optional display name.
	pub name: Option<String>,
	/// Owning asset bundle name, when any.
	pub asset_bundle: Option<String>,
	/// Serialized file name.
	pub serialized_file: String,
	/// Owning composite annotation, preformatted as `Name (id=N)`.
	pub owner: Option<String>,
	/// Attached script name for script-component objects.
	pub script: Option<String>,
}

/// Report metadata for one asset-bundle entry.
#[derive(Debug, Clone)]
pub struct AssetRow {
	/// Exposed asset name.
	pub asset_name: String,
	/// Owning asset bundle name.
	pub asset_bundle: String,
	/// Serialized file name.
	pub serialized_file: String,
}

/// Queryable store of persisted reference edges and object metadata.
pub trait EdgeStore {
	/// Every edge whose target is `object_id`.
	fn refs_to(&self, object_id: i64) -> Result<Vec<InboundRef>>;

	/// Report metadata for an object, when known.
	fn object_row(&self, object_id: i64) -> Result<Option<ObjectRow>>;

	/// Asset-entry metadata for an object, when it is an asset root.
	fn asset_row(&self, object_id: i64) -> Result<Option<AssetRow>>;

	/// Object ids matching a display name and optional type name.
	fn find_objects(&self, name: &str, type_name: Option<&str>) -> Result<Vec<i64>>;
}

/// Traversal switches for reference-chain search.
#[derive(Debug, Clone, Default)]
pub struct ChainOptions {
	/// Visit each object once per distinct inbound path instead of once
	/// system-wide, surfacing every distinct route at the cost of
	/// potentially much larger output.
	pub find_all: bool,
	/// Visited-object budget bounding work on pathological fan-in graphs.
	pub max_visited: Option<usize>,
}

/// One node of a reconstructed reference chain, from an asset root down
/// toward the queried object.
#[derive(Debug, Clone)]
pub struct ChainNode {
	/// Object id at this hop.
	pub object_id: i64,
	/// Next hops toward the queried object.
	pub children: Vec<ChainChild>,
}

/// One outgoing hop of a [`ChainNode`].
#[derive(Debug, Clone)]
pub struct ChainChild {
	/// Property path on this node's object that produced the hop.
	pub property_path: Arc<str>,
	/// Referenced node.
	pub node: ChainNode,
}

/// Every reference chain discovered for one queried object.
#[derive(Debug, Clone)]
pub struct ChainForest {
	/// The queried object id.
	pub seed: i64,
	/// One tree per discovered asset root.
	pub roots: Vec<ChainNode>,
	/// Number of distinct visited-set entries examined.
	pub visited: usize,
	/// Whether the visited-object budget stopped the search early.
	pub truncated: bool,
}

/// Reconstruct every chain of references leading into `seed` from an
/// asset root.
///
/// Walks the edge store backward from the seed. Each referencing object is
/// expanded at most once per visited-set key (`(object, path)` when
/// `find_all`, `(object, "")` otherwise), which is the sole mechanism
/// bounding cyclic graphs. Branches that never reach an asset root are
/// pruned. A seed with no inbound edges yields an empty forest, which is a
/// correct result rather than an error.
pub fn find_reference_chains(store: &dyn EdgeStore, seed: i64, options: &ChainOptions) -> Result<ChainForest> {
	let mut walker = Walker {
		store,
		find_all: options.find_all,
		max_visited: options.max_visited,
		visited: HashSet::new(),
		roots: Vec::new(),
		truncated: false,
	};

	walker.process(seed)?;

	Ok(ChainForest {
		seed,
		roots: walker.roots.iter().map(freeze).collect(),
		visited: walker.visited.len(),
		truncated: walker.truncated,
	})
}

struct BuildNode {
	object_id: i64,
	children: Vec<(Arc<str>, Rc<RefCell<BuildNode>>)>,
}

struct Walker<'a> {
	store: &'a dyn EdgeStore,
	find_all: bool,
	max_visited: Option<usize>,
	visited: HashSet<(i64, Arc<str>)>,
	roots: Vec<Rc<RefCell<BuildNode>>>,
	truncated: bool,
}

impl Walker<'_> {
	fn process(&mut self, id: i64) -> Result<Option<Rc<RefCell<BuildNode>>>> {
		let references = self.store.refs_to(id)?;

		let node = Rc::new(RefCell::new(BuildNode {
			object_id: id,
			children: Vec::new(),
		}));
		let mut was_used = false;

		for reference in references {
			let key_path: Arc<str> = if self.find_all { reference.property_path.clone() } else { Arc::from("") };
			if self.visited.contains(&(reference.from, key_path.clone())) {
				continue;
			}
			if self.max_visited.is_some_and(|max| self.visited.len() >= max) {
				self.truncated = true;
				break;
			}
			self.visited.insert((reference.from, key_path));

			if reference.from_is_asset {
				let asset = Rc::new(RefCell::new(BuildNode {
					object_id: reference.from,
					children: vec![(reference.property_path.clone(), node.clone())],
				}));
				self.roots.push(asset);
				was_used = true;
			} else if let Some(parent) = self.process(reference.from)? {
				parent.borrow_mut().children.push((reference.property_path.clone(), node.clone()));
				was_used = true;
			}
		}

		Ok(was_used.then_some(node))
	}
}

fn freeze(node: &Rc<RefCell<BuildNode>>) -> ChainNode {
	let inner = node.borrow();
	ChainNode {
		object_id: inner.object_id,
		children: inner
			.children
			.iter()
			.map(|(path, child)| ChainChild {
				property_path: path.clone(),
				node: freeze(child),
			})
			.collect(),
	}
}

/// Render the plain-text reference-chain report for one or more queried
/// objects.
pub fn render_chain_report(store: &dyn EdgeStore, forests: &[ChainForest], out: &mut dyn Write) -> Result<()> {
	for (index, forest) in forests.iter().enumerate() {
		let row = store.object_row(forest.seed)?.ok_or(AssetError::ObjectNotFound { id: forest.seed })?;

		writeln!(out, "Reference chains to {}", row.name.as_deref().unwrap_or(""))?;
		writeln!(out, "  ID:             {}", forest.seed)?;
		writeln!(out, "  Type:           {}", row.type_name)?;
		writeln!(out, "  AssetBundle:    {}", row.asset_bundle.as_deref().unwrap_or(""))?;
		writeln!(out, "  SerializedFile: {}", row.serialized_file)?;
		writeln!(out)?;

		for root in &forest.roots {
			let asset = store.asset_row(root.object_id)?.ok_or(AssetError::ObjectNotFound { id: root.object_id })?;
			writeln!(out, "Found reference in:")?;
			writeln!(out, "{}", asset.asset_name)?;
			writeln!(out, "(AssetBundle = {}; SerializedFile = {})", asset.asset_bundle, asset.serialized_file)?;
			render_node(store, root, "", 1, out)?;
			writeln!(out)?;
		}

		if forest.truncated {
			writeln!(out, "Search truncated at the visited-object budget.")?;
		}
		writeln!(out, "Analyzed {} object(s).", forest.visited)?;
		writeln!(out, "Found {} reference chain(s).", forest.roots.len())?;

		if index + 1 < forests.len() {
			writeln!(out)?;
			writeln!(out, "{}", "*".repeat(80))?;
			writeln!(out)?;
		}
	}

	Ok(())
}

fn render_node(store: &dyn EdgeStore, node: &ChainNode, property_path: &str, indentation: usize, out: &mut dyn Write) -> Result<()> {
	let indent = "  ".repeat(indentation);
	let row = store.object_row(node.object_id)?.ok_or(AssetError::ObjectNotFound { id: node.object_id })?;

	if !property_path.is_empty() {
		writeln!(out, "{indent}↓ {property_path}")?;
	}

	write!(out, "{indent}{} (id={})", row.type_name, node.object_id)?;
	if let Some(name) = row.name.as_deref().filter(|name| !name.is_empty()) {
		write!(out, " {name}")?;
	}
	if let Some(script) = row.script.as_deref().filter(|script| !script.is_empty()) {
		write!(out, " [Script = {script}]")?;
	}
	if let Some(owner) = row.owner.as_deref().filter(|owner| !owner.is_empty()) {
		write!(out, " [Component of {owner}]")?;
	}
	writeln!(out)?;

	for child in &node.children {
		render_node(store, &child.node, &child.property_path, indentation + 1, out)?;
	}

	Ok(())
}
