//! The indexed map and its locked mutation paths.
//!
//! # Role
//!
//! [`IndexedMap`] is the only writer of its two backing stores. Every mutation follows the
//! same shape:
//!
//! 1. Derive (and validate) the value's [`Index`] without locking.
//! 2. Lock the index's primary key through the [`StripingLock`].
//! 3. Apply the primary-store mutation, then bring the key-index store in line.
//! 4. Release the lock when the guard drops, on success, error, or unwind alike.
//!
//! Reads never lock.
//!
//! # Invariants
//!
//! - Outside a critical section, every primary `p` present in the primary store has an index
//!   `ix` with `ix.primary() == p`, and every `k` in `ix.all()` resolves to `ix`.
//!   - Enforced in: [`IndexedMap::relink`], [`IndexedMap::unlink`].
//!   - Tested by: `tests::prop_model_consistency`
//!   - Failure symptom: a key resolves to another value, or a stored value is unreachable
//!     through one of its keys.
//!
//! - The primary key of a stored value never changes.
//!   - Enforced in: [`IndexedMap::replace_if`], [`IndexedMap::replace_value_if`] (mismatch is
//!     rejected before locking). Unconditional writes are keyed by the new value's primary, so
//!     they cannot re-key an existing value.
//!   - Tested by: `tests::test_cas_rejects_primary_change_before_mutation`
//!   - Failure symptom: dangling key-index entries for the old primary.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use polykey_store::{ConcurrentStore, DashStore};
use polykey_striping::StripingLock;

use crate::builder::IndexedMapBuilder;
use crate::config::IndexedMapConfig;
use crate::error::{ConfigError, IndexedMapError, Result};
use crate::extract::IndexExtractor;
use crate::index::Index;
use crate::views::{EntriesView, KeysView, ValuesView};

/// Bounds required of keys stored in an [`IndexedMap`].
pub trait MapKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}
impl<T> MapKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Bounds required of values stored in an [`IndexedMap`].
///
/// Values are cloned out on reads; wrap large values in `Arc`.
pub trait MapValue: Clone + PartialEq + Send + Sync + 'static {}
impl<T> MapValue for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Primary-key store type.
pub type PrimaryStore<K, V> = dyn ConcurrentStore<K, V>;
/// Key-to-index store type.
pub type IndexStore<K> = dyn ConcurrentStore<K, Arc<Index<K>>>;

/// Concurrent value store addressable by any key of each value's [`Index`].
///
/// [`IndexedMap::len`] counts values; [`IndexedMap::keys`] counts keys across all values.
pub struct IndexedMap<K, V> {
	pub(crate) primary: Arc<PrimaryStore<K, V>>,
	pub(crate) index: Arc<IndexStore<K>>,
	extractor: Box<dyn IndexExtractor<K, V>>,
	locks: StripingLock<K>,
}

impl<K: MapKey, V: MapValue> IndexedMap<K, V> {
	/// Map over default [`DashStore`]s with a 256-stripe fixed lock table.
	pub fn new(extractor: impl IndexExtractor<K, V> + 'static) -> Self {
		Self::builder(extractor).build()
	}

	/// Map configured by `config`.
	pub fn from_config(
		extractor: impl IndexExtractor<K, V> + 'static,
		config: &IndexedMapConfig,
	) -> std::result::Result<Self, ConfigError> {
		let mut builder =
			Self::builder(extractor).striping(StripingLock::from_config(&config.striping)?);
		if let Some(capacity) = config.initial_capacity {
			builder = builder
				.primary_store(Arc::new(DashStore::<K, V>::with_capacity(capacity)))
				.index_store(Arc::new(DashStore::<K, Arc<Index<K>>>::with_capacity(capacity)));
		}
		Ok(builder.build())
	}

	/// Starts a builder for custom stores or striping.
	pub fn builder(extractor: impl IndexExtractor<K, V> + 'static) -> IndexedMapBuilder<K, V> {
		IndexedMapBuilder::new(Box::new(extractor))
	}

	pub(crate) fn from_parts(
		extractor: Box<dyn IndexExtractor<K, V>>,
		primary: Arc<PrimaryStore<K, V>>,
		index: Arc<IndexStore<K>>,
		locks: StripingLock<K>,
	) -> Self {
		Self {
			primary,
			index,
			extractor,
			locks,
		}
	}

	/// Lock table keyed by primary key. Exposed for monitoring.
	pub fn striping(&self) -> &StripingLock<K> {
		&self.locks
	}

	fn derive(&self, value: &V) -> Result<Arc<Index<K>>> {
		Ok(Arc::new(self.extractor.extract(value)?))
	}

	fn ensure_member(key: &K, index: &Index<K>) -> Result<()> {
		if index.contains(key) {
			Ok(())
		} else {
			Err(IndexedMapError::KeyNotInIndex {
				key: format!("{key:?}"),
				primary: format!("{:?}", index.primary()),
			})
		}
	}

	fn ensure_same_primary(old: &Index<K>, new: &Index<K>) -> Result<()> {
		if old.primary() == new.primary() {
			Ok(())
		} else {
			Err(IndexedMapError::PrimaryMismatch {
				old: format!("{:?}", old.primary()),
				new: format!("{:?}", new.primary()),
			})
		}
	}

	/// Value reachable through `key`.
	pub fn get(&self, key: &K) -> Option<V> {
		let index = self.index.get(key)?;
		self.primary.get(index.primary())
	}

	/// Current index `key` resolves to.
	pub fn index_of(&self, key: &K) -> Option<Arc<Index<K>>> {
		self.index.get(key)
	}

	/// Returns true if `key` resolves to a stored value.
	pub fn contains_key(&self, key: &K) -> bool {
		self.get(key).is_some()
	}

	/// Returns true if `value` is currently stored under its primary key.
	pub fn contains_value(&self, value: &V) -> bool {
		self.extractor
			.extract(value)
			.ok()
			.and_then(|index| self.primary.get(index.primary()))
			.is_some_and(|stored| stored == *value)
	}

	/// Number of stored values.
	pub fn len(&self) -> usize {
		self.primary.len()
	}

	/// Returns true if no value is stored.
	pub fn is_empty(&self) -> bool {
		self.primary.is_empty()
	}

	/// Stores `value`, returning the value previously stored under its primary key.
	pub fn put_value(&self, value: V) -> Result<Option<V>> {
		let index = self.derive(&value)?;
		self.put_indexed(index, value)
	}

	/// Stores `value` after checking that `key` is one of its keys.
	pub fn put(&self, key: &K, value: V) -> Result<Option<V>> {
		let index = self.derive(&value)?;
		Self::ensure_member(key, &index)?;
		self.put_indexed(index, value)
	}

	/// Stores every value in order, stopping at the first failure.
	pub fn put_all_values(&self, values: impl IntoIterator<Item = V>) -> Result<()> {
		for value in values {
			self.put_value(value)?;
		}
		Ok(())
	}

	fn put_indexed(&self, index: Arc<Index<K>>, value: V) -> Result<Option<V>> {
		let _guard = self.locks.lock(index.primary());
		let previous = self.primary.insert(index.primary().clone(), value)?;
		self.relink(&index)?;
		tracing::trace!(
			primary = ?index.primary(),
			keys = index.len(),
			replaced = previous.is_some(),
			"polykey.map.put"
		);
		Ok(previous)
	}

	/// Stores `value` only if its primary key is vacant. Returns the occupying value otherwise.
	pub fn put_if_absent_value(&self, value: V) -> Result<Option<V>> {
		let index = self.derive(&value)?;
		self.put_if_absent_indexed(index, value)
	}

	/// Key-checked [`IndexedMap::put_if_absent_value`].
	pub fn put_if_absent(&self, key: &K, value: V) -> Result<Option<V>> {
		let index = self.derive(&value)?;
		Self::ensure_member(key, &index)?;
		self.put_if_absent_indexed(index, value)
	}

	fn put_if_absent_indexed(&self, index: Arc<Index<K>>, value: V) -> Result<Option<V>> {
		let _guard = self.locks.lock(index.primary());
		let existing = self
			.primary
			.put_if_absent(index.primary().clone(), value)?;
		if existing.is_none() {
			self.relink(&index)?;
		}
		Ok(existing)
	}

	/// Overwrites the value stored under `value`'s primary key, if any.
	pub fn replace_value(&self, value: V) -> Result<Option<V>> {
		let index = self.derive(&value)?;
		self.replace_indexed(index, value)
	}

	/// Key-checked [`IndexedMap::replace_value`].
	pub fn replace(&self, key: &K, value: V) -> Result<Option<V>> {
		let index = self.derive(&value)?;
		Self::ensure_member(key, &index)?;
		self.replace_indexed(index, value)
	}

	fn replace_indexed(&self, index: Arc<Index<K>>, value: V) -> Result<Option<V>> {
		let _guard = self.locks.lock(index.primary());
		let previous = self.primary.replace(index.primary(), value)?;
		if previous.is_some() {
			self.relink(&index)?;
		}
		Ok(previous)
	}

	/// Swaps `old` for `new` if `old` is the value currently stored.
	///
	/// Both values must share a primary key.
	pub fn replace_value_if(&self, old: &V, new: V) -> Result<bool> {
		let old_index = self.derive(old)?;
		let new_index = self.derive(&new)?;
		Self::ensure_same_primary(&old_index, &new_index)?;
		self.replace_if_indexed(new_index, old, new)
	}

	/// Key-checked [`IndexedMap::replace_value_if`]; `key` may belong to either value.
	pub fn replace_if(&self, key: &K, old: &V, new: V) -> Result<bool> {
		let old_index = self.derive(old)?;
		let new_index = self.derive(&new)?;
		Self::ensure_same_primary(&old_index, &new_index)?;
		if !old_index.contains(key) {
			Self::ensure_member(key, &new_index)?;
		}
		self.replace_if_indexed(new_index, old, new)
	}

	fn replace_if_indexed(&self, index: Arc<Index<K>>, old: &V, new: V) -> Result<bool> {
		let _guard = self.locks.lock(index.primary());
		let swapped = self.primary.replace_if(index.primary(), old, new)?;
		if swapped {
			self.relink(&index)?;
		}
		Ok(swapped)
	}

	/// Removes the value `key` resolves to, together with all of its keys.
	pub fn remove(&self, key: &K) -> Result<Option<V>> {
		let Some((primary, _guard)) = self.lock_resolved(key) else {
			return Ok(None);
		};
		let removed = self.primary.remove(&primary)?;
		self.unlink(&primary)?;
		Ok(removed)
	}

	/// Removes the value `key` resolves to only if it equals `value`.
	pub fn remove_if(&self, key: &K, value: &V) -> Result<bool> {
		let Some((primary, _guard)) = self.lock_resolved(key) else {
			return Ok(false);
		};
		self.remove_locked(&primary, value)
	}

	/// Removes `value` if it is the value stored under its primary key.
	pub fn remove_value(&self, value: &V) -> Result<bool> {
		let index = self.derive(value)?;
		let _guard = self.locks.lock(index.primary());
		self.remove_locked(index.primary(), value)
	}

	fn remove_locked(&self, primary: &K, value: &V) -> Result<bool> {
		let removed = self.primary.remove_if(primary, value)?;
		if removed {
			self.unlink(primary)?;
		}
		Ok(removed)
	}

	/// Resolves `key` to its primary and locks it, retrying if the key moved while waiting.
	fn lock_resolved(&self, key: &K) -> Option<(K, polykey_striping::StripeGuard<K>)> {
		loop {
			let primary = self.index.get(key)?.primary().clone();
			let guard = self.locks.lock(&primary);
			match self.index.get(key) {
				Some(current) if *current.primary() == primary => return Some((primary, guard)),
				Some(_) => continue,
				None => return None,
			}
		}
	}

	/// Removes every value present when the call starts.
	///
	/// Not atomic: values inserted concurrently may survive, and concurrent removals simply
	/// find nothing to do.
	pub fn clear(&self) -> Result<()> {
		let primaries = self.primary.keys();
		tracing::debug!(values = primaries.len(), "polykey.map.clear");
		for primary in primaries {
			let _guard = self.locks.lock(&primary);
			self.primary.remove(&primary)?;
			self.unlink(&primary)?;
		}
		Ok(())
	}

	/// Eviction hook: call after removing `primary` from the primary store out of band.
	///
	/// Drops the key-index entries the evicted value left behind. Returns whether anything was
	/// swept; a primary that is still (or again) stored is left alone.
	pub fn evicted(&self, primary: &K) -> Result<bool> {
		let _guard = self.locks.lock(primary);
		if self.primary.contains_key(primary) {
			return Ok(false);
		}
		let swept = self.unlink(primary)?;
		if swept {
			tracing::debug!(primary = ?primary, "polykey.map.evicted");
		}
		Ok(swept)
	}

	/// View over every key of every stored value.
	pub fn keys(&self) -> KeysView<'_, K, V> {
		KeysView::new(self)
	}

	/// View over stored values, one element per value.
	pub fn values(&self) -> ValuesView<'_, K, V> {
		ValuesView::new(self)
	}

	/// View over `(key, value)` resolutions, one element per key.
	pub fn entries(&self) -> EntriesView<'_, K, V> {
		EntriesView::new(self)
	}

	/// Points every key of `next` at it, then drops secondaries the previously stored index
	/// carried but `next` does not. Caller holds `next.primary()`'s lock.
	///
	/// Readers may briefly see both the dropped and the new keys resolve to the new value; the
	/// primary key never becomes unresolvable.
	fn relink(&self, next: &Arc<Index<K>>) -> Result<()> {
		let previous = self.index.get(next.primary());
		for key in next.all() {
			let displaced = self.index.insert(key.clone(), Arc::clone(next))?;
			if let Some(other) = displaced
				&& other.primary() != next.primary()
			{
				self.report_displaced(key, &other, next);
			}
		}
		if let Some(previous) = previous {
			// A dropped key may already belong to another value if `previous` outlived an
			// unreported eviction.
			for key in previous.dropped_in(next) {
				self.index.remove_if(key, &previous)?;
			}
		}
		Ok(())
	}

	/// `key` was pointed at `next` while resolving to `other`. Harmless if `other`'s value was
	/// evicted out of band; a key shared by two live values breaks the key partition.
	fn report_displaced(&self, key: &K, other: &Index<K>, next: &Index<K>) {
		if !self.primary.contains_key(other.primary()) {
			tracing::trace!(
				key = ?key,
				stale = ?other.primary(),
				claimant = ?next.primary(),
				"polykey.map.stale_key_swept"
			);
			return;
		}
		tracing::warn!(
			key = ?key,
			owner = ?other.primary(),
			claimant = ?next.primary(),
			"polykey.map.key_overlap"
		);
		debug_assert!(false, "key {key:?} claimed by two live primaries");
	}

	/// Removes the keys of whatever index `primary` currently resolves to. Caller holds
	/// `primary`'s lock. Tolerates the index having been cleared already.
	fn unlink(&self, primary: &K) -> Result<bool> {
		let Some(current) = self.index.get(primary) else {
			tracing::trace!(primary = ?primary, "polykey.map.unlink_absent");
			return Ok(false);
		};
		if current.primary() != primary {
			return Ok(false);
		}
		for key in current.all() {
			self.index.remove_if(key, &current)?;
		}
		Ok(true)
	}
}

impl<K, V> Debug for IndexedMap<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexedMap")
			.field("values", &self.primary.len())
			.field("keys", &self.index.len())
			.field("striping", &self.locks)
			.finish()
	}
}
