/// Reference-chain report command.
pub mod chains;
/// Reference extraction command.
pub mod refs;
/// Snapshot object decode command.
pub mod show;

mod util;
