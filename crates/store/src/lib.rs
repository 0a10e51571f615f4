//! Backing-map contract for polykey's indexed structures.
//!
//! # Purpose
//!
//! [`ConcurrentStore`] is the interface every backing map must satisfy: lock-free-ish reads
//! plus three atomic conditional mutations (put-if-absent, compare-and-swap replace,
//! compare-and-swap remove). The striping and indexed-map crates only ever talk to their
//! storage through this trait, so callers can plug in a store with eviction, persistence
//! hooks or fault injection without touching the locking code.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`ConcurrentStore`] | Atomic key/value store contract. |
//! | [`DashStore`] | Default implementation over a sharded [`dashmap::DashMap`]. |
//! | [`StoreError`] | Failure reported by a collaborator store during a mutation. |
//!
//! # Atomicity
//!
//! Each individual method is atomic with respect to every other method on the same key.
//! Nothing is promised across keys: snapshots returned by [`ConcurrentStore::keys`] and
//! friends are weakly consistent.

mod dash;
mod error;

pub use dash::DashStore;
pub use error::{Result, StoreError};

/// Thread-safe key/value store with atomic conditional mutations.
///
/// Reads are infallible. Mutations return [`StoreError`] so that collaborator stores
/// (remote, size-bounded, instrumented) can surface faults to the caller.
pub trait ConcurrentStore<K, V>: Send + Sync {
	/// Returns a clone of the value stored under `key`.
	fn get(&self, key: &K) -> Option<V>;

	/// Returns true if `key` currently has a value.
	fn contains_key(&self, key: &K) -> bool {
		self.get(key).is_some()
	}

	/// Number of entries.
	fn len(&self) -> usize;

	/// Returns true if the store has no entries.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Weakly consistent snapshot of the current keys.
	fn keys(&self) -> Vec<K>;

	/// Weakly consistent snapshot of the current values.
	fn values(&self) -> Vec<V>;

	/// Weakly consistent snapshot of the current entries.
	fn entries(&self) -> Vec<(K, V)>;

	/// Stores `value` under `key` unconditionally, returning the previous value.
	fn insert(&self, key: K, value: V) -> Result<Option<V>>;

	/// Stores `value` only if `key` is vacant.
	///
	/// Returns the existing value when the key was occupied (and nothing was written).
	fn put_if_absent(&self, key: K, value: V) -> Result<Option<V>>;

	/// Overwrites the value under `key` only if one exists, returning it.
	fn replace(&self, key: &K, value: V) -> Result<Option<V>>;

	/// Overwrites the value under `key` only if it currently equals `expected`.
	fn replace_if(&self, key: &K, expected: &V, value: V) -> Result<bool>;

	/// Removes `key`, returning the value it held.
	fn remove(&self, key: &K) -> Result<Option<V>>;

	/// Removes `key` only if its value currently equals `expected`.
	fn remove_if(&self, key: &K, expected: &V) -> Result<bool>;
}
