use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use unitydoc::asset::{AssetError, ChainForest, ChainOptions, EdgeStore, MemoryEdgeStore, find_reference_chains, render_chain_report};

#[derive(clap::Args)]
pub struct Args {
	pub store: PathBuf,
	#[arg(long, conflicts_with = "name")]
	pub id: Option<i64>,
	#[arg(long, required_unless_present = "id")]
	pub name: Option<String>,
	#[arg(long = "type")]
	pub type_name: Option<String>,
	#[arg(long = "find-all")]
	pub find_all: bool,
	#[arg(long = "max-visited")]
	pub max_visited: Option<usize>,
	#[arg(long)]
	pub output: Option<PathBuf>,
}

/// Report every reference chain leading into the selected objects.
pub fn run(args: Args) -> unitydoc::asset::Result<()> {
	let Args {
		store: store_path,
		id,
		name,
		type_name,
		find_all,
		max_visited,
		output,
	} = args;

	let store = MemoryEdgeStore::load_json(&store_path)?;

	let seeds = match (id, name) {
		(Some(id), _) => vec![id],
		(None, Some(name)) => {
			let ids = store.find_objects(&name, type_name.as_deref())?;
			if ids.is_empty() {
				return Err(AssetError::NameNotFound { name });
			}
			ids
		}
		(None, None) => return Err(AssetError::MissingSeedSelector),
	};

	let options = ChainOptions { find_all, max_visited };
	let forests: Vec<ChainForest> = seeds
		.iter()
		.map(|seed| find_reference_chains(&store, *seed, &options))
		.collect::<unitydoc::asset::Result<_>>()?;

	match output {
		Some(path) => {
			let mut file = File::create(path)?;
			render_chain_report(&store, &forests, &mut file)?;
		}
		None => {
			let stdout = std::io::stdout();
			let mut lock = stdout.lock();
			render_chain_report(&store, &forests, &mut lock)?;
			lock.flush()?;
		}
	}

	Ok(())
}
