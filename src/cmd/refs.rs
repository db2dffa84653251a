use std::path::PathBuf;

use unitydoc::asset::{ObjectInfo, Snapshot, collect_object_refs};

#[derive(clap::Args)]
pub struct Args {
	pub file: PathBuf,
	#[arg(long)]
	pub object: Option<i64>,
}

/// Extract and print object references from snapshot objects.
///
/// Without `--object`, every object in the snapshot is scanned; objects
/// that fail to decode are reported and skipped so one bad object does
/// not abort the batch.
pub fn run(args: Args) -> unitydoc::asset::Result<()> {
	let Args { file, object } = args;

	let snapshot = Snapshot::load_json(&file)?;
	let source = snapshot.source();

	println!("object\tpath\tfile_index\tpath_id\ttype");

	if let Some(object_id) = object {
		let info = snapshot.object(object_id)?;
		print_refs(&snapshot, &source, info)?;
		return Ok(());
	}

	for info in snapshot.objects() {
		if let Err(err) = print_refs(&snapshot, &source, info) {
			eprintln!("error processing object {}: {err}", info.id);
		}
	}

	Ok(())
}

fn print_refs(snapshot: &Snapshot, source: &unitydoc::asset::SliceSource<'_>, info: &ObjectInfo) -> unitydoc::asset::Result<()> {
	let refs = collect_object_refs(snapshot, source, info.id, info.offset, &info.root)?;
	for record in refs {
		println!(
			"{}\t{}\t{}\t{}\t{}",
			record.object_id, record.property_path, record.pptr.file_index, record.pptr.path_id, record.referenced_type
		);
	}
	Ok(())
}
