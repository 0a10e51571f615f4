//! Container views over an [`IndexedMap`].
//!
//! Reads go straight to the backing stores. Every removal, including [`KeysView::retain`]
//! style bulk filtering, is redirected through the map's locked removal path so the two stores
//! stay consistent; no view ever mutates a backing store directly.
//!
//! Cardinalities differ by design: [`KeysView`] and [`EntriesView`] have one element per key,
//! [`ValuesView`] one per stored value.

use crate::error::Result;
use crate::map::{IndexedMap, MapKey, MapValue};

/// Every key of every stored value.
pub struct KeysView<'a, K, V> {
	map: &'a IndexedMap<K, V>,
}

impl<'a, K: MapKey, V: MapValue> KeysView<'a, K, V> {
	pub(crate) fn new(map: &'a IndexedMap<K, V>) -> Self {
		Self { map }
	}

	/// Total number of keys across all values.
	pub fn len(&self) -> usize {
		self.map.index.len()
	}

	/// Returns true if no key resolves.
	pub fn is_empty(&self) -> bool {
		self.map.index.is_empty()
	}

	/// Weakly consistent snapshot of the keys.
	pub fn iter(&self) -> std::vec::IntoIter<K> {
		self.map.index.keys().into_iter()
	}

	/// Returns true if `key` resolves to a value.
	pub fn contains(&self, key: &K) -> bool {
		self.map.contains_key(key)
	}

	/// Removes the value `key` resolves to, and with it all of that value's keys.
	pub fn remove(&self, key: &K) -> Result<bool> {
		Ok(self.map.remove(key)?.is_some())
	}

	/// Removes every value reachable through a key rejected by `keep`. Returns how many values
	/// were removed.
	pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) -> Result<usize> {
		let mut removed = 0;
		for key in self.iter() {
			if !keep(&key) && self.remove(&key)? {
				removed += 1;
			}
		}
		Ok(removed)
	}

	/// Same as [`IndexedMap::clear`].
	pub fn clear(&self) -> Result<()> {
		self.map.clear()
	}
}

/// Stored values, one element per value.
pub struct ValuesView<'a, K, V> {
	map: &'a IndexedMap<K, V>,
}

impl<'a, K: MapKey, V: MapValue> ValuesView<'a, K, V> {
	pub(crate) fn new(map: &'a IndexedMap<K, V>) -> Self {
		Self { map }
	}

	/// Number of stored values.
	pub fn len(&self) -> usize {
		self.map.len()
	}

	/// Returns true if no value is stored.
	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}

	/// Weakly consistent snapshot of the values.
	pub fn iter(&self) -> std::vec::IntoIter<V> {
		self.map.primary.values().into_iter()
	}

	/// Returns true if `value` is stored.
	pub fn contains(&self, value: &V) -> bool {
		self.map.contains_value(value)
	}

	/// Removes `value` if it is still the stored value for its primary key.
	pub fn remove(&self, value: &V) -> Result<bool> {
		self.map.remove_value(value)
	}

	/// Removes every value rejected by `keep`. Values replaced since the snapshot was taken are
	/// left alone.
	pub fn retain(&self, mut keep: impl FnMut(&V) -> bool) -> Result<usize> {
		let mut removed = 0;
		for value in self.iter() {
			if !keep(&value) && self.remove(&value)? {
				removed += 1;
			}
		}
		Ok(removed)
	}

	/// Same as [`IndexedMap::clear`].
	pub fn clear(&self) -> Result<()> {
		self.map.clear()
	}
}

/// `(key, value)` resolutions, one element per key.
pub struct EntriesView<'a, K, V> {
	map: &'a IndexedMap<K, V>,
}

impl<'a, K: MapKey, V: MapValue> EntriesView<'a, K, V> {
	pub(crate) fn new(map: &'a IndexedMap<K, V>) -> Self {
		Self { map }
	}

	/// Number of keys (one entry per key).
	pub fn len(&self) -> usize {
		self.map.index.len()
	}

	/// Returns true if no key resolves.
	pub fn is_empty(&self) -> bool {
		self.map.index.is_empty()
	}

	/// Weakly consistent snapshot of the resolutions. Keys whose value vanished between the two
	/// store reads are skipped.
	pub fn iter(&self) -> std::vec::IntoIter<(K, V)> {
		self.map
			.index
			.entries()
			.into_iter()
			.filter_map(|(key, index)| {
				let value = self.map.primary.get(index.primary())?;
				Some((key, value))
			})
			.collect::<Vec<_>>()
			.into_iter()
	}

	/// Returns true if `key` currently resolves to `value`.
	pub fn contains(&self, key: &K, value: &V) -> bool {
		self.map.get(key).is_some_and(|stored| stored == *value)
	}

	/// Removes the value `key` resolves to if it equals `value`.
	pub fn remove(&self, key: &K, value: &V) -> Result<bool> {
		self.map.remove_if(key, value)
	}

	/// Removes every value with at least one entry rejected by `keep`.
	pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> Result<usize> {
		let mut removed = 0;
		for (key, value) in self.iter() {
			if !keep(&key, &value) && self.remove(&key, &value)? {
				removed += 1;
			}
		}
		Ok(removed)
	}

	/// Same as [`IndexedMap::clear`].
	pub fn clear(&self) -> Result<()> {
		self.map.clear()
	}
}
