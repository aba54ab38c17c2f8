use thiserror::Error;

/// Errors surfaced by collection operations. Nothing is retried internally;
/// every failure propagates to the caller.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The key does not match the key schema of the collection
	#[error("Key does not match the key schema of this collection")]
	SchemaViolation,

	/// The operation requires the key to be present, and it is not
	#[error("Key was not found in this collection")]
	NotFound,

	/// An `init` was attempted on a key which is already present
	#[error("Key already registered in this collection")]
	AlreadyPresent,

	/// The key variant has no sortable encoding
	#[error("Keys of type '{0}' are not supported")]
	UnsupportedKeyPassStyle(String),

	/// A value pattern other than `any` was supplied
	#[error("Value patterns other than 'any' are not supported")]
	UnsupportedValuePattern,

	/// An encoded key read back from the store cannot be parsed
	#[error("Unparseable encoded key {0:?}")]
	DecodeCorruption(String),

	/// A remotable used as a key has no ordinal mapping where one is expected
	#[error("No ordinal assigned to remotable {0:?}")]
	OrdinalMissing(String),

	/// The collection was structurally mutated while an iterator was open
	#[error("Keys in this collection cannot be changed during iteration")]
	ConcurrentModification,

	/// The per-collection ordinal space is exhausted
	#[error("Ordinal space of this collection is exhausted")]
	OrdinalOverflow,

	/// An external collection identifier cannot be parsed
	#[error("Unparseable collection identifier {0:?}")]
	VrefCorruption(String),

	/// A collection identifier names a kind this process has not registered
	#[error("Unknown collection kind id {0}")]
	KindUnknown(u64),

	/// A metadata row is missing or cannot be parsed
	#[error("Corrupt collection metadata row {0:?}")]
	MetadataCorruption(String),

	/// A serialized value body cannot be interpreted
	#[error("Unmarshalable value: {0}")]
	Marshal(String),

	/// A row or schema failed to serialize or deserialize
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
