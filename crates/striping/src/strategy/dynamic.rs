//! Per-key locks with reference-counted reclamation.
//!
//! Each live key owns one slot `(lock, refs)`. Slots change only through compare-and-retry
//! steps against the slot value observed a moment earlier:
//!
//! - checkout, vacant: put-if-absent a fresh slot with `refs = 1`.
//! - checkout, occupied: swap `refs` for `refs + 1` if the slot is unchanged.
//! - checkin, `refs > 1`: swap `refs` for `refs - 1` if the slot is unchanged.
//! - checkin, `refs == 1`: remove the slot if it is unchanged.
//!
//! A lost race retries from a fresh read. Because the increment lands before `checkout`
//! returns and the decrement only after every hold is released, a slot with a holder or waiter
//! always has `refs >= 1` and is never removed.

use std::hash::Hash;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;

use super::{LockStrategy, StrategyKind};
use crate::reentrant::ReentrantLock;

#[derive(Clone)]
struct Slot {
	lock: ReentrantLock,
	refs: usize,
}

impl PartialEq for Slot {
	fn eq(&self, other: &Self) -> bool {
		self.refs == other.refs && self.lock.ptr_eq(&other.lock)
	}
}

/// One lock per distinct key, alive only while checked out.
///
/// No spurious contention between keys, at the cost of an allocation per newly locked key and
/// the bookkeeping above. [`crate::FixedStripes`] is usually the better default.
pub struct DynamicStripes<K> {
	slots: DashMap<K, Slot, FxBuildHasher>,
}

impl<K: Eq + Hash + Clone> DynamicStripes<K> {
	/// Creates an empty lock table.
	pub fn new() -> Self {
		Self {
			slots: DashMap::with_hasher(FxBuildHasher),
		}
	}

	/// Number of keys that currently have a lock (checked out by at least one user).
	pub fn live_locks(&self) -> usize {
		self.slots.len()
	}

	/// Outstanding checkouts for `key`.
	pub fn references(&self, key: &K) -> usize {
		self.slots.get(key).map_or(0, |slot| slot.refs)
	}

	fn snapshot(&self, key: &K) -> Option<Slot> {
		self.slots.get(key).map(|slot| slot.value().clone())
	}
}

impl<K: Eq + Hash + Clone> Default for DynamicStripes<K> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K> LockStrategy<K> for DynamicStripes<K>
where
	K: Eq + Hash + Clone + Send + Sync,
{
	fn kind(&self) -> StrategyKind {
		StrategyKind::Dynamic
	}

	fn checkout(&self, key: &K) -> ReentrantLock {
		loop {
			match self.snapshot(key) {
				None => match self.slots.entry(key.clone()) {
					Entry::Vacant(vacant) => {
						let lock = ReentrantLock::new();
						vacant.insert(Slot {
							lock: lock.clone(),
							refs: 1,
						});
						tracing::trace!(strategy = self.kind().as_str(), "polykey.striping.create");
						return lock;
					}
					Entry::Occupied(_) => continue,
				},
				Some(seen) => {
					if let Some(mut slot) = self.slots.get_mut(key)
						&& *slot == seen
					{
						slot.refs += 1;
						return seen.lock;
					}
				}
			}
		}
	}

	fn checkin(&self, key: &K, lock: &ReentrantLock) {
		loop {
			let Some(seen) = self.snapshot(key) else {
				tracing::warn!(strategy = self.kind().as_str(), "polykey.striping.checkin_untracked");
				return;
			};
			if !seen.lock.ptr_eq(lock) {
				tracing::warn!(strategy = self.kind().as_str(), "polykey.striping.checkin_foreign");
				return;
			}
			if seen.refs == 1 {
				if self.slots.remove_if(key, |_, slot| *slot == seen).is_some() {
					tracing::trace!(strategy = self.kind().as_str(), "polykey.striping.reclaim");
					return;
				}
			} else if let Some(mut slot) = self.slots.get_mut(key)
				&& *slot == seen
			{
				slot.refs -= 1;
				return;
			}
		}
	}

	fn peek(&self, key: &K) -> Option<ReentrantLock> {
		self.snapshot(key).map(|slot| slot.lock)
	}
}

impl<K: Eq + Hash> std::fmt::Debug for DynamicStripes<K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DynamicStripes")
			.field("live_locks", &self.slots.len())
			.finish()
	}
}
