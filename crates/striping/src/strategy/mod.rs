//! Key-to-lock selection strategies.

mod dynamic;
mod fixed;

pub use dynamic::DynamicStripes;
pub use fixed::FixedStripes;

use crate::reentrant::ReentrantLock;

/// Which selection strategy a [`crate::StripingLock`] delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
	/// Preallocated stripe table ([`FixedStripes`]).
	Fixed,
	/// Lazily created, reference-counted per-key locks ([`DynamicStripes`]).
	Dynamic,
}

impl StrategyKind {
	/// Stable lowercase name, used in log fields.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Fixed => "fixed",
			Self::Dynamic => "dynamic",
		}
	}
}

/// Resolves keys to locks.
///
/// Every [`LockStrategy::checkout`] must be paired with exactly one [`LockStrategy::checkin`]
/// for the same key and lock, issued after the caller has released every hold it took.
pub trait LockStrategy<K>: Send + Sync {
	/// Strategy identifier.
	fn kind(&self) -> StrategyKind;

	/// Returns the lock for `key`, pinning it until the matching checkin.
	fn checkout(&self, key: &K) -> ReentrantLock;

	/// Returns a lock obtained from [`LockStrategy::checkout`].
	fn checkin(&self, key: &K, lock: &ReentrantLock);

	/// Returns the lock currently associated with `key` without pinning or creating it.
	///
	/// Monitoring only: the association may change immediately after this returns.
	fn peek(&self, key: &K) -> Option<ReentrantLock>;
}
