use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use polykey_store::{ConcurrentStore, DashStore, StoreError};

use crate::{Index, IndexError, IndexedMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum UserKey {
	Id(u32),
	Name(String),
}

pub(crate) fn id(n: u32) -> UserKey {
	UserKey::Id(n)
}

pub(crate) fn name(s: &str) -> UserKey {
	UserKey::Name(s.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct User {
	pub(crate) id: u32,
	pub(crate) email: String,
	pub(crate) login: String,
	pub(crate) rev: u32,
}

pub(crate) fn user(id: u32, email: &str, login: &str) -> User {
	User {
		id,
		email: email.to_string(),
		login: login.to_string(),
		rev: 0,
	}
}

pub(crate) fn user_index(user: &User) -> Result<Index<UserKey>, IndexError> {
	Index::new(
		UserKey::Id(user.id),
		[
			UserKey::Name(user.email.clone()),
			UserKey::Name(user.login.clone()),
		],
	)
}

pub(crate) fn users() -> IndexedMap<UserKey, User> {
	IndexedMap::new(user_index)
}

/// Checks the global consistency invariant from the outside.
pub(crate) fn assert_consistent(map: &IndexedMap<UserKey, User>) {
	let mut expected_keys = 0;
	for value in map.values().iter() {
		let index = user_index(&value).unwrap();
		expected_keys += index.len();
		for key in index.all() {
			assert_eq!(map.get(key).as_ref(), Some(&value), "key {key:?} lost its value");
		}
	}
	assert_eq!(map.keys().len(), expected_keys, "dangling key-index entries");
}

/// Store wrapper whose mutations fail while `failing` is set.
pub(crate) struct FlakyStore<K, V> {
	inner: DashStore<K, V>,
	failing: AtomicBool,
}

impl<K: Eq + Hash, V> FlakyStore<K, V> {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self {
			inner: DashStore::new(),
			failing: AtomicBool::new(false),
		})
	}

	pub(crate) fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	fn check(&self) -> polykey_store::Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			Err(StoreError::Unavailable {
				reason: "injected".into(),
			})
		} else {
			Ok(())
		}
	}
}

impl<K, V> ConcurrentStore<K, V> for FlakyStore<K, V>
where
	K: Eq + Hash + Clone + Send + Sync,
	V: Clone + PartialEq + Send + Sync,
{
	fn get(&self, key: &K) -> Option<V> {
		self.inner.get(key)
	}

	fn len(&self) -> usize {
		self.inner.len()
	}

	fn keys(&self) -> Vec<K> {
		self.inner.keys()
	}

	fn values(&self) -> Vec<V> {
		self.inner.values()
	}

	fn entries(&self) -> Vec<(K, V)> {
		self.inner.entries()
	}

	fn insert(&self, key: K, value: V) -> polykey_store::Result<Option<V>> {
		self.check()?;
		self.inner.insert(key, value)
	}

	fn put_if_absent(&self, key: K, value: V) -> polykey_store::Result<Option<V>> {
		self.check()?;
		self.inner.put_if_absent(key, value)
	}

	fn replace(&self, key: &K, value: V) -> polykey_store::Result<Option<V>> {
		self.check()?;
		self.inner.replace(key, value)
	}

	fn replace_if(&self, key: &K, expected: &V, value: V) -> polykey_store::Result<bool> {
		self.check()?;
		self.inner.replace_if(key, expected, value)
	}

	fn remove(&self, key: &K) -> polykey_store::Result<Option<V>> {
		self.check()?;
		self.inner.remove(key)
	}

	fn remove_if(&self, key: &K, expected: &V) -> polykey_store::Result<bool> {
		self.check()?;
		self.inner.remove_if(key, expected)
	}
}
