//! Error types for indexed maps.

use polykey_store::StoreError;
use polykey_striping::LockError;
use thiserror::Error;

/// Malformed [`crate::Index`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
	/// The primary key also appears among the secondaries.
	#[error("primary key {key} repeated as a secondary key")]
	PrimaryInSecondaries {
		/// Debug rendering of the offending key.
		key: String,
	},
	/// A secondary key appears more than once.
	#[error("duplicate secondary key {key}")]
	DuplicateSecondary {
		/// Debug rendering of the offending key.
		key: String,
	},
}

/// Errors returned by [`crate::IndexedMap`] operations.
///
/// Every variant except [`IndexedMapError::Store`] is raised before any lock is taken or any
/// state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexedMapError {
	/// The extractor produced an invalid index.
	#[error("invalid index: {0}")]
	Index(#[from] IndexError),

	/// A key-qualified operation named a key the value does not carry.
	#[error("key {key} is not among the keys of value with primary {primary}")]
	KeyNotInIndex {
		/// Debug rendering of the key passed by the caller.
		key: String,
		/// Debug rendering of the value's primary key.
		primary: String,
	},

	/// A replacement would change the value's primary key.
	#[error("primary key cannot change: {old} -> {new}")]
	PrimaryMismatch {
		/// Primary key of the expected (old) value.
		old: String,
		/// Primary key of the replacement value.
		new: String,
	},

	/// A backing store failed while the per-primary lock was held.
	///
	/// Sub-steps completed before the failure stay applied.
	#[error("backing store failure: {0}")]
	Store(#[from] StoreError),
}

/// Result type for indexed map operations.
pub type Result<T> = std::result::Result<T, IndexedMapError>;

/// Errors raised while loading an [`crate::IndexedMapConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML source did not parse.
	#[error("config parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// The striping section is invalid.
	#[error("invalid striping config: {0}")]
	Striping(#[from] LockError),
}
