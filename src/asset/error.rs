use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Errors produced while decoding and traversing serialized asset data.
#[derive(Debug, Error)]
pub enum AssetError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Snapshot or edge-store JSON parse failure.
	#[error("json: {0}")]
	Json(#[from] serde_json::Error),
	/// Read at a negative byte offset.
	#[error("negative read offset {offset}")]
	NegativeOffset {
		/// Requested byte offset.
		offset: i64,
	},
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: i64,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: i64,
	},
	/// Requested field name does not exist on the receiver node.
	#[error("field not found: {name} on {type_name}")]
	FieldNotFound {
		/// Requested field name.
		name: String,
		/// Type name of the receiver node.
		type_name: String,
	},
	/// Field navigation attempted on a non-object node.
	#[error("not an object node: {type_name}")]
	NotAnObject {
		/// Type name of the receiver node.
		type_name: String,
	},
	/// Array length requested from a non-array node.
	#[error("not an array node: {type_name}")]
	NotAnArray {
		/// Type name of the receiver node.
		type_name: String,
	},
	/// Element navigation attempted on a node that is not an array of objects.
	#[error("not an array of objects: {type_name}")]
	NotAnObjectArray {
		/// Type name of the receiver node.
		type_name: String,
	},
	/// Registry entry access on a node that is not a managed-reference registry.
	#[error("not a managed-reference registry: {type_name}")]
	NotARegistry {
		/// Type name of the receiver node.
		type_name: String,
	},
	/// Array element index past the serialized element count.
	#[error("array index {index} out of range (len={len})")]
	IndexOutOfRange {
		/// Requested zero-based index.
		index: usize,
		/// Serialized element count.
		len: usize,
	},
	/// Value extraction attempted on a node without a primitive decoding.
	#[error("cannot extract value of {type_name} type")]
	UnsupportedType {
		/// Type name of the receiver node.
		type_name: String,
	},
	/// Decoded value kind did not match the requested kind.
	#[error("value type mismatch: expected {expected}, got {got}")]
	ValueTypeMismatch {
		/// Expected logical value kind.
		expected: &'static str,
		/// Actual logical value kind.
		got: &'static str,
	},
	/// Serialized array element count was negative.
	#[error("negative array length {len}")]
	NegativeArrayLength {
		/// Parsed signed element count.
		len: i32,
	},
	/// Serialized string length was negative.
	#[error("negative string length {len}")]
	NegativeStringLength {
		/// Parsed signed byte length.
		len: i32,
	},
	/// Array node whose size child is not a four-byte integer leaf.
	#[error("invalid array size node on {type_name}")]
	InvalidArraySizeNode {
		/// Type name of the offending array node.
		type_name: String,
	},
	/// Wrapper node (`vector`/`map`) without its single array child.
	#[error("wrapper node {type_name} has no array child")]
	EmptyWrapperNode {
		/// Type name of the offending wrapper node.
		type_name: String,
	},
	/// Managed-reference registry node violated its expected shape.
	#[error("malformed managed-reference registry: {detail}")]
	MalformedRegistry {
		/// Violated shape constraint.
		detail: &'static str,
	},
	/// Named polymorphic type could not be resolved to a type tree.
	#[error("type not found: {class_name} (namespace={namespace_name}, assembly={assembly_name})")]
	TypeNotFound {
		/// Requested class name.
		class_name: String,
		/// Requested namespace name.
		namespace_name: String,
		/// Requested assembly name.
		assembly_name: String,
	},
	/// Managed-reference registry with an unknown format version.
	#[error("unsupported managed-reference registry version {version}")]
	UnsupportedSchemaVersion {
		/// Parsed version value.
		version: i32,
	},
	/// Property path expression syntax is invalid.
	#[error("invalid property path: {path}")]
	InvalidPath {
		/// Original path expression.
		path: String,
	},
	/// Requested object id was not found.
	#[error("object not found: {id}")]
	ObjectNotFound {
		/// Requested object id.
		id: i64,
	},
	/// No object matched a name/type lookup.
	#[error("no object found: {name}")]
	NameNotFound {
		/// Requested display name.
		name: String,
	},
	/// Chain query without an object id or display name seed.
	#[error("chain query needs an object id or a display name")]
	MissingSeedSelector,
}
