use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::condition::Condition;
use crate::config::{DEFAULT_STRIPES, StripingConfig};
use crate::error::LockError;
use crate::interrupt::Interrupt;
use crate::reentrant::{ReentrantGuard, ReentrantLock};
use crate::strategy::{DynamicStripes, FixedStripes, LockStrategy, StrategyKind};

/// Keyed lock facade over a [`LockStrategy`].
///
/// Cloning shares the underlying strategy. Every acquisition method checks the key's lock out
/// of the strategy first and checks it back in when the returned guard (or a failed attempt)
/// is finished with it.
pub struct StripingLock<K> {
	strategy: Arc<dyn LockStrategy<K>>,
}

impl<K> Clone for StripingLock<K> {
	fn clone(&self) -> Self {
		Self {
			strategy: Arc::clone(&self.strategy),
		}
	}
}

impl<K> StripingLock<K>
where
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	/// Fixed table of `stripes` locks.
	pub fn fixed(stripes: usize) -> Result<Self, LockError> {
		Ok(Self::with_strategy(FixedStripes::new(stripes)?))
	}

	/// Lazily created per-key locks.
	pub fn dynamic() -> Self {
		Self::with_strategy(DynamicStripes::new())
	}

	/// Builds the strategy described by `config`.
	pub fn from_config(config: &StripingConfig) -> Result<Self, LockError> {
		config.validate()?;
		match *config {
			StripingConfig::Fixed { stripes } => Self::fixed(stripes),
			StripingConfig::Dynamic => Ok(Self::dynamic()),
		}
	}

	/// Wraps a custom strategy.
	pub fn with_strategy(strategy: impl LockStrategy<K> + 'static) -> Self {
		Self {
			strategy: Arc::new(strategy),
		}
	}

	/// Strategy in use.
	pub fn kind(&self) -> StrategyKind {
		self.strategy.kind()
	}

	fn lease(&self, key: &K) -> Lease<K> {
		let lock = self.strategy.checkout(key);
		Lease {
			strategy: Arc::clone(&self.strategy),
			key: key.clone(),
			lock,
		}
	}

	/// Blocks until the current thread holds `key`'s lock.
	pub fn lock(&self, key: &K) -> StripeGuard<K> {
		let lease = self.lease(key);
		let hold = lease.lock.lock();
		StripeGuard { hold, lease }
	}

	/// Acquires `key`'s lock only if that does not require waiting.
	pub fn try_lock(&self, key: &K) -> Option<StripeGuard<K>> {
		let lease = self.lease(key);
		let hold = lease.lock.try_lock()?;
		Some(StripeGuard { hold, lease })
	}

	/// Waits up to `timeout` for `key`'s lock.
	pub fn try_lock_for(&self, key: &K, timeout: Duration) -> Option<StripeGuard<K>> {
		let lease = self.lease(key);
		let hold = lease.lock.try_lock_for(timeout)?;
		Some(StripeGuard { hold, lease })
	}

	/// Blocks until `key`'s lock is held or `interrupt` fires.
	pub fn lock_interruptibly(
		&self,
		key: &K,
		interrupt: &Interrupt,
	) -> Result<StripeGuard<K>, LockError> {
		let lease = self.lease(key);
		let hold = lease.lock.lock_interruptibly(interrupt)?;
		Ok(StripeGuard { hold, lease })
	}

	/// Condition variable bound to `key`'s lock.
	///
	/// The lock stays checked out (and therefore unreclaimable) while the returned handle lives.
	pub fn new_condition(&self, key: &K) -> StripeCondition<K> {
		let lease = self.lease(key);
		StripeCondition {
			condition: lease.lock.new_condition(),
			lease,
		}
	}

	/// Returns true if `key`'s lock is held by any thread.
	pub fn is_locked(&self, key: &K) -> bool {
		self.strategy
			.peek(key)
			.is_some_and(|lock| lock.is_locked())
	}

	/// Returns true if the current thread holds `key`'s lock.
	///
	/// Under [`StrategyKind::Fixed`] this is also true for any key sharing the stripe.
	pub fn is_held_by_current_thread(&self, key: &K) -> bool {
		self.strategy
			.peek(key)
			.is_some_and(|lock| lock.is_held_by_current_thread())
	}

	/// Holds the current thread has on `key`'s lock.
	pub fn hold_count(&self, key: &K) -> usize {
		self.strategy
			.peek(key)
			.map_or(0, |lock| lock.hold_count())
	}

	/// Returns true if any thread is blocked acquiring `key`'s lock.
	pub fn has_queued_threads(&self, key: &K) -> bool {
		self.queue_length(key) > 0
	}

	/// Threads blocked acquiring `key`'s lock.
	pub fn queue_length(&self, key: &K) -> usize {
		self.strategy
			.peek(key)
			.map_or(0, |lock| lock.queue_length())
	}
}

impl<K> Default for StripingLock<K>
where
	K: Eq + Hash + Clone + Send + Sync + 'static,
{
	fn default() -> Self {
		match Self::fixed(DEFAULT_STRIPES) {
			Ok(lock) => lock,
			Err(err) => unreachable!("default stripe count rejected: {err}"),
		}
	}
}

impl<K> std::fmt::Debug for StripingLock<K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StripingLock")
			.field("strategy", &self.strategy.kind())
			.finish()
	}
}

/// A checked-out lock. Checks itself back in on drop.
struct Lease<K> {
	strategy: Arc<dyn LockStrategy<K>>,
	key: K,
	lock: ReentrantLock,
}

impl<K> Drop for Lease<K> {
	fn drop(&mut self) {
		self.strategy.checkin(&self.key, &self.lock);
	}
}

/// Hold on one key's lock, returned by [`StripingLock::lock`] and friends.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct StripeGuard<K> {
	// Field order matters: the hold is released before the lease is checked in.
	hold: ReentrantGuard,
	lease: Lease<K>,
}

impl<K> StripeGuard<K> {
	/// Key this guard was acquired for.
	pub fn key(&self) -> &K {
		&self.lease.key
	}

	/// Underlying lock.
	pub fn lock(&self) -> &ReentrantLock {
		self.hold.lock()
	}

	/// Releases the hold explicitly.
	pub fn unlock(self) {}
}

impl<K: std::fmt::Debug> std::fmt::Debug for StripeGuard<K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StripeGuard")
			.field("key", &self.lease.key)
			.finish()
	}
}

/// [`Condition`] on one key's lock that keeps the lock checked out while alive.
pub struct StripeCondition<K> {
	condition: Condition,
	lease: Lease<K>,
}

impl<K> StripeCondition<K> {
	/// Key whose lock this condition is bound to.
	pub fn key(&self) -> &K {
		&self.lease.key
	}

	/// See [`Condition::wait`].
	pub fn wait(&self) -> Result<(), LockError> {
		self.condition.wait()
	}

	/// See [`Condition::wait_for`].
	pub fn wait_for(&self, timeout: Duration) -> Result<bool, LockError> {
		self.condition.wait_for(timeout)
	}

	/// See [`Condition::wait_interruptibly`].
	pub fn wait_interruptibly(&self, interrupt: &Interrupt) -> Result<(), LockError> {
		self.condition.wait_interruptibly(interrupt)
	}

	/// See [`Condition::signal`].
	pub fn signal(&self) -> Result<(), LockError> {
		self.condition.signal()
	}

	/// See [`Condition::signal_all`].
	pub fn signal_all(&self) -> Result<(), LockError> {
		self.condition.signal_all()
	}

	/// See [`Condition::has_waiters`].
	pub fn has_waiters(&self) -> bool {
		self.condition.has_waiters()
	}

	/// See [`Condition::wait_queue_length`].
	pub fn wait_queue_length(&self) -> usize {
		self.condition.wait_queue_length()
	}
}
