#![allow(missing_docs)]

use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "unitydoc", about = "Unity serialized asset inspection tools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	Show(cmd::show::Args),
	Refs(cmd::refs::Args),
	Chains(cmd::chains::Args),
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> unitydoc::asset::Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Show(args) => cmd::show::run(args),
		Commands::Refs(args) => cmd::refs::run(args),
		Commands::Chains(args) => cmd::chains::run(args),
	}
}
