#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Concurrent value store addressable by several independent keys.
//!
//! # Purpose
//!
//! An [`IndexedMap`] stores each value once, under its *primary key*, and makes it reachable
//! through any number of *secondary keys* (a user by id, email, or login name). An extractor
//! derives each value's [`Index`]; the map keeps the primary store and the key-to-index store
//! consistent across inserts, replacements, removals and out-of-band evictions.
//!
//! # Mental Model
//!
//! 1. **Derive:** the extractor turns a value into an [`Index`]; validation errors surface here,
//!    before any lock is taken.
//! 2. **Lock:** the primary key selects a lock through a [`polykey_striping::StripingLock`].
//!    Operations on the same primary are totally ordered; different primaries run in parallel.
//! 3. **Apply:** the primary store is mutated first, then the key-index store is brought in
//!    line: new keys are written over in place, dropped secondaries are removed afterwards.
//! 4. **Read:** lookups resolve key -> index -> value without locking.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`IndexedMap`] | The store and sole writer of both backing maps. |
//! | [`Index`] | One primary key plus a set of secondary keys. |
//! | [`IndexExtractor`] | Pure `value -> Index` derivation. |
//! | [`KeysView`], [`ValuesView`], [`EntriesView`] | Read adapters with redirected removal. |
//! | [`IndexedMapConfig`] | TOML-loadable construction settings. |
//!
//! # Concurrency
//!
//! - **Reads:** lock-free, not linearizable. During a secondary-key update, keys being dropped
//!   and keys being added may both resolve to the new value for a moment. A key never resolves
//!   to a stale value once the update has started, and the primary key never stops resolving.
//! - **Writes:** per-primary mutual exclusion. [`IndexedMap::clear`] is best-effort.
//!
//! # Failure Model
//!
//! Validation failures ([`IndexedMapError::Index`], [`IndexedMapError::KeyNotInIndex`],
//! [`IndexedMapError::PrimaryMismatch`]) leave the map untouched. A
//! [`IndexedMapError::Store`] raised under the lock releases the lock and leaves completed
//! sub-steps in place; there is no rollback.
//!
//! # Eviction
//!
//! A component that removes entries from the primary store directly (a size-bounded store,
//! say) should report each removal through [`IndexedMap::evicted`]. Removal paths also tolerate
//! finding an index entry already gone, so a missed report degrades to stale key-index entries
//! that the next removal through any of their keys sweeps up.

mod builder;
mod config;
mod error;
mod extract;
mod index;
mod map;
mod views;

pub use builder::IndexedMapBuilder;
pub use config::IndexedMapConfig;
pub use error::{ConfigError, IndexError, IndexedMapError, Result};
pub use extract::IndexExtractor;
pub use index::Index;
pub use map::{IndexStore, IndexedMap, MapKey, MapValue, PrimaryStore};
pub use polykey_store::{ConcurrentStore, DashStore, StoreError};
pub use polykey_striping::{StrategyKind, StripingConfig, StripingLock};
pub use views::{EntriesView, KeysView, ValuesView};

#[cfg(test)]
mod test_fixtures;

#[cfg(test)]
mod tests;
