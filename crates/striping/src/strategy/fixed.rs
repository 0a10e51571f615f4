use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use rustc_hash::FxHasher;

use super::{LockStrategy, StrategyKind};
use crate::error::LockError;
use crate::reentrant::ReentrantLock;
use crate::spread::spread;

/// Fixed table of independent reentrant locks.
///
/// A key maps to `spread(fx_hash(key)) % stripes`. Memory is bounded and nothing is ever
/// reclaimed; two keys on the same stripe serialize against each other, so size the table
/// above the expected number of concurrently locked keys.
pub struct FixedStripes<K> {
	stripes: Box<[ReentrantLock]>,
	_key: PhantomData<fn(&K)>,
}

impl<K: Hash> FixedStripes<K> {
	/// Creates a table of `stripes` locks.
	pub fn new(stripes: usize) -> Result<Self, LockError> {
		if stripes == 0 {
			return Err(LockError::InvalidStripeCount);
		}
		Ok(Self {
			stripes: (0..stripes).map(|_| ReentrantLock::new()).collect(),
			_key: PhantomData,
		})
	}

	/// Number of stripes.
	pub fn len(&self) -> usize {
		self.stripes.len()
	}

	/// Always false; a table has at least one stripe.
	pub fn is_empty(&self) -> bool {
		self.stripes.is_empty()
	}

	/// Slot `key` resolves to.
	pub fn stripe_of(&self, key: &K) -> usize {
		let mut hasher = FxHasher::default();
		key.hash(&mut hasher);
		(spread(hasher.finish()) % self.stripes.len() as u64) as usize
	}

	/// Lock at slot `index`.
	pub fn stripe(&self, index: usize) -> Option<&ReentrantLock> {
		self.stripes.get(index)
	}
}

impl<K: Hash> LockStrategy<K> for FixedStripes<K> {
	fn kind(&self) -> StrategyKind {
		StrategyKind::Fixed
	}

	fn checkout(&self, key: &K) -> ReentrantLock {
		self.stripes[self.stripe_of(key)].clone()
	}

	fn checkin(&self, _key: &K, _lock: &ReentrantLock) {}

	fn peek(&self, key: &K) -> Option<ReentrantLock> {
		Some(self.stripes[self.stripe_of(key)].clone())
	}
}

impl<K> std::fmt::Debug for FixedStripes<K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FixedStripes")
			.field("stripes", &self.stripes.len())
			.finish()
	}
}
