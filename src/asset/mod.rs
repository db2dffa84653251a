mod bundle;
mod bytes;
mod chains;
mod error;
mod path;
mod pptr;
mod reader;
mod refs;
mod registry;
mod snapshot;
mod store;
mod typetree;
mod value;

/// Asset-bundle container decoding helpers.
pub use bundle::{BundleAsset, BundleInfo, read_bundle};
/// Positioned byte-source trait and implementations.
pub use bytes::{ByteSource, FileSource, SliceSource};
/// Edge-store trait, reference-chain search, and report rendering.
pub use chains::{
	AssetRow, ChainChild, ChainForest, ChainNode, ChainOptions, EdgeStore, InboundRef, ObjectRow, find_reference_chains, render_chain_report,
};
/// Error and result aliases.
pub use error::{AssetError, Result};
/// Property path expression parser types.
pub use path::{PathStep, PropertyPath};
/// Object reference value and type-name helpers.
pub use pptr::{PPtr, is_pptr_type, referenced_type_name};
/// Lazy random-access layout engine.
pub use reader::{RandomAccessReader, Reader, RegistryEntry};
/// Sequential reference extraction entry points and output record.
pub use refs::{RefRecord, collect_object_refs, scan_object_refs};
/// Managed-reference registry wire constants and helpers.
pub use registry::{
	REGISTRY_VERSION_COUNTED, REGISTRY_VERSION_SENTINEL, RID_NULL, RID_UNKNOWN, TypeHeader, align4, is_reserved_rid, read_type_header,
};
/// JSON snapshot loading and schema resolution.
pub use snapshot::{ObjectInfo, SchemaNode, Snapshot, SnapshotData, SnapshotNamedType, SnapshotObject};
/// In-memory edge store and its serializable row types.
pub use store::{MemoryEdgeStore, StoreData, StoredAsset, StoredObject, StoredRef};
/// Runtime type-tree schema model and provider traits.
pub use typetree::{BasicType, EmptySchemaProvider, SchemaProvider, TypeTreeNode, VARIABLE_SIZE};
/// Decoded runtime value type.
pub use value::Value;
