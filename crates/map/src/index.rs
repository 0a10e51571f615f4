use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::error::IndexError;

/// The keys one stored value is reachable by: a primary key plus a set of secondary keys.
///
/// Immutable once built. A fresh `Index` is derived from a value on every write; updates never
/// mutate an existing one.
#[derive(Clone)]
pub struct Index<K> {
	primary: K,
	secondaries: FxHashSet<K>,
}

impl<K> Index<K>
where
	K: Eq + Hash + Debug,
{
	/// Builds an index, rejecting a secondary equal to the primary or repeated secondaries.
	pub fn new(primary: K, secondaries: impl IntoIterator<Item = K>) -> Result<Self, IndexError> {
		let iter = secondaries.into_iter();
		let mut set = FxHashSet::with_capacity_and_hasher(iter.size_hint().0, Default::default());
		for key in iter {
			if key == primary {
				return Err(IndexError::PrimaryInSecondaries {
					key: format!("{key:?}"),
				});
			}
			if set.contains(&key) {
				return Err(IndexError::DuplicateSecondary {
					key: format!("{key:?}"),
				});
			}
			set.insert(key);
		}
		Ok(Self {
			primary,
			secondaries: set,
		})
	}

	/// Index with no secondary keys.
	pub fn primary_only(primary: K) -> Self {
		Self {
			primary,
			secondaries: FxHashSet::default(),
		}
	}

	/// The stable key identifying the value.
	pub fn primary(&self) -> &K {
		&self.primary
	}

	/// Alternate lookup keys, in no particular order.
	pub fn secondaries(&self) -> impl Iterator<Item = &K> {
		self.secondaries.iter()
	}

	/// Primary key followed by every secondary key.
	pub fn all(&self) -> impl Iterator<Item = &K> {
		std::iter::once(&self.primary).chain(self.secondaries.iter())
	}

	/// Returns true if `key` is the primary or one of the secondaries.
	pub fn contains(&self, key: &K) -> bool {
		self.primary == *key || self.secondaries.contains(key)
	}

	/// Number of keys, primary included. Never zero.
	pub fn len(&self) -> usize {
		1 + self.secondaries.len()
	}

	/// Always false.
	pub fn is_empty(&self) -> bool {
		false
	}

	/// Secondaries of `self` that `next` no longer carries.
	pub(crate) fn dropped_in<'a>(&'a self, next: &'a Index<K>) -> impl Iterator<Item = &'a K> {
		self.secondaries
			.iter()
			.filter(move |key| !next.secondaries.contains(*key))
	}
}

impl<K: Eq + Hash> PartialEq for Index<K> {
	fn eq(&self, other: &Self) -> bool {
		self.primary == other.primary && self.secondaries == other.secondaries
	}
}

impl<K: Eq + Hash> Eq for Index<K> {}

impl<K: Debug> Debug for Index<K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Index")
			.field("primary", &self.primary)
			.field("secondaries", &self.secondaries)
			.finish()
	}
}
