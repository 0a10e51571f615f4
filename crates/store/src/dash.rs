use std::hash::Hash;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::{ConcurrentStore, Result};

/// Default [`ConcurrentStore`] backed by a sharded [`DashMap`].
///
/// Conditional mutations hold the key's shard lock for the duration of the compare, so
/// they are atomic per key. Reads clone the value out; store `Arc`s for large values.
pub struct DashStore<K, V> {
	inner: DashMap<K, V>,
}

impl<K, V> DashStore<K, V>
where
	K: Eq + Hash,
{
	/// Creates an empty store.
	pub fn new() -> Self {
		Self {
			inner: DashMap::new(),
		}
	}

	/// Creates an empty store preallocated for `capacity` entries.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			inner: DashMap::with_capacity(capacity),
		}
	}
}

impl<K, V> Default for DashStore<K, V>
where
	K: Eq + Hash,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K: Eq + Hash, V> std::fmt::Debug for DashStore<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DashStore")
			.field("len", &self.inner.len())
			.finish()
	}
}

impl<K, V> ConcurrentStore<K, V> for DashStore<K, V>
where
	K: Eq + Hash + Clone + Send + Sync,
	V: Clone + PartialEq + Send + Sync,
{
	fn get(&self, key: &K) -> Option<V> {
		self.inner.get(key).map(|r| r.value().clone())
	}

	fn contains_key(&self, key: &K) -> bool {
		self.inner.contains_key(key)
	}

	fn len(&self) -> usize {
		self.inner.len()
	}

	fn keys(&self) -> Vec<K> {
		self.inner.iter().map(|r| r.key().clone()).collect()
	}

	fn values(&self) -> Vec<V> {
		self.inner.iter().map(|r| r.value().clone()).collect()
	}

	fn entries(&self) -> Vec<(K, V)> {
		self.inner
			.iter()
			.map(|r| (r.key().clone(), r.value().clone()))
			.collect()
	}

	fn insert(&self, key: K, value: V) -> Result<Option<V>> {
		Ok(self.inner.insert(key, value))
	}

	fn put_if_absent(&self, key: K, value: V) -> Result<Option<V>> {
		match self.inner.entry(key) {
			Entry::Occupied(occupied) => Ok(Some(occupied.get().clone())),
			Entry::Vacant(vacant) => {
				vacant.insert(value);
				Ok(None)
			}
		}
	}

	fn replace(&self, key: &K, value: V) -> Result<Option<V>> {
		Ok(self
			.inner
			.get_mut(key)
			.map(|mut slot| std::mem::replace(slot.value_mut(), value)))
	}

	fn replace_if(&self, key: &K, expected: &V, value: V) -> Result<bool> {
		match self.inner.get_mut(key) {
			Some(mut slot) if slot.value() == expected => {
				*slot.value_mut() = value;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	fn remove(&self, key: &K) -> Result<Option<V>> {
		Ok(self.inner.remove(key).map(|(_, v)| v))
	}

	fn remove_if(&self, key: &K, expected: &V) -> Result<bool> {
		Ok(self.inner.remove_if(key, |_, v| v == expected).is_some())
	}
}
