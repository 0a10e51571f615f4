use std::sync::Arc;

use polykey_store::{ConcurrentStore, DashStore};
use polykey_striping::StripingLock;

use crate::extract::IndexExtractor;
use crate::index::Index;
use crate::map::{IndexStore, IndexedMap, MapKey, MapValue, PrimaryStore};

/// Assembles an [`IndexedMap`] from caller-supplied parts. Unset parts use defaults.
pub struct IndexedMapBuilder<K, V> {
	extractor: Box<dyn IndexExtractor<K, V>>,
	primary: Option<Arc<PrimaryStore<K, V>>>,
	index: Option<Arc<IndexStore<K>>>,
	locks: Option<StripingLock<K>>,
}

impl<K: MapKey, V: MapValue> IndexedMapBuilder<K, V> {
	pub(crate) fn new(extractor: Box<dyn IndexExtractor<K, V>>) -> Self {
		Self {
			extractor,
			primary: None,
			index: None,
			locks: None,
		}
	}

	/// Primary-key store. Keep a clone of the `Arc` to evict entries out of band, and report
	/// each eviction through [`IndexedMap::evicted`].
	pub fn primary_store<S>(mut self, store: Arc<S>) -> Self
	where
		S: ConcurrentStore<K, V> + 'static,
	{
		let store: Arc<PrimaryStore<K, V>> = store;
		self.primary = Some(store);
		self
	}

	/// Key-to-index store.
	pub fn index_store<S>(mut self, store: Arc<S>) -> Self
	where
		S: ConcurrentStore<K, Arc<Index<K>>> + 'static,
	{
		let store: Arc<IndexStore<K>> = store;
		self.index = Some(store);
		self
	}

	/// Lock table keyed by primary key. Defaults to a fixed table of 256 stripes.
	pub fn striping(mut self, locks: StripingLock<K>) -> Self {
		self.locks = Some(locks);
		self
	}

	/// Finishes the map.
	pub fn build(self) -> IndexedMap<K, V> {
		let primary: Arc<PrimaryStore<K, V>> = match self.primary {
			Some(store) => store,
			None => Arc::new(DashStore::<K, V>::new()),
		};
		let index: Arc<IndexStore<K>> = match self.index {
			Some(store) => store,
			None => Arc::new(DashStore::<K, Arc<Index<K>>>::new()),
		};
		IndexedMap::from_parts(
			self.extractor,
			primary,
			index,
			self.locks.unwrap_or_default(),
		)
	}
}
