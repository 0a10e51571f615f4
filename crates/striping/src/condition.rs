use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Condvar;

use crate::error::LockError;
use crate::interrupt::Interrupt;
use crate::reentrant::{LockCore, ReentrantLock, WaitPolicy};

/// Condition variable bound to one [`ReentrantLock`].
///
/// Waiting fully releases the lock (every hold of the current thread) and restores the same
/// hold count before returning, whatever the outcome. Signals are counted as permits, so a
/// signal issued while a waiter is between wakeups is never lost and spurious wakeups never
/// leak out of [`Condition::wait`].
#[derive(Clone)]
pub struct Condition {
	core: Arc<LockCore>,
	inner: Arc<ConditionInner>,
}

struct ConditionInner {
	signal: Condvar,
	// Both counters are only touched while holding `core.state`.
	waiters: AtomicUsize,
	permits: AtomicUsize,
}

impl Condition {
	pub(crate) fn new(core: Arc<LockCore>) -> Self {
		Self {
			core,
			inner: Arc::new(ConditionInner {
				signal: Condvar::new(),
				waiters: AtomicUsize::new(0),
				permits: AtomicUsize::new(0),
			}),
		}
	}

	/// Returns true if this condition belongs to `lock`.
	pub fn is_bound_to(&self, lock: &ReentrantLock) -> bool {
		Arc::ptr_eq(&self.core, &lock.core)
	}

	/// Waits until signalled.
	pub fn wait(&self) -> Result<(), LockError> {
		self.wait_with(WaitPolicy::unbounded()).map(|_| ())
	}

	/// Waits until signalled or `timeout` elapses. Returns whether a signal was consumed.
	pub fn wait_for(&self, timeout: Duration) -> Result<bool, LockError> {
		self.wait_with(WaitPolicy::timeout(timeout))
	}

	/// Waits until signalled or `interrupt` fires.
	///
	/// On interruption the lock is still re-acquired before [`LockError::Interrupted`] is returned.
	pub fn wait_interruptibly(&self, interrupt: &Interrupt) -> Result<(), LockError> {
		self.wait_with(WaitPolicy::interruptible(interrupt)).map(|_| ())
	}

	fn wait_with(&self, policy: WaitPolicy<'_>) -> Result<bool, LockError> {
		let me = thread::current().id();
		let mut state = self.core.state.lock();
		if state.owner != Some(me) {
			return Err(LockError::NotOwner);
		}
		if policy.interrupted() {
			return Err(LockError::Interrupted);
		}

		let saved_holds = state.holds;
		state.owner = None;
		state.holds = 0;
		self.core.available.notify_one();

		self.inner.waiters.fetch_add(1, Ordering::Relaxed);
		let outcome = loop {
			let permits = self.inner.permits.load(Ordering::Relaxed);
			if permits > 0 {
				self.inner.permits.store(permits - 1, Ordering::Relaxed);
				break Ok(true);
			}
			if policy.interrupted() {
				break Err(LockError::Interrupted);
			}
			if policy.expired() {
				break Ok(false);
			}
			policy.park(&self.inner.signal, &mut state);
		};
		self.inner.waiters.fetch_sub(1, Ordering::Relaxed);

		state.queued += 1;
		while state.owner.is_some() {
			self.core.available.wait(&mut state);
		}
		state.queued -= 1;
		state.owner = Some(me);
		state.holds = saved_holds;
		outcome
	}

	/// Wakes one waiter. The caller must hold the lock.
	pub fn signal(&self) -> Result<(), LockError> {
		let state = self.core.state.lock();
		if state.owner != Some(thread::current().id()) {
			return Err(LockError::NotOwner);
		}
		let waiters = self.inner.waiters.load(Ordering::Relaxed);
		let permits = self.inner.permits.load(Ordering::Relaxed);
		if waiters > permits {
			self.inner.permits.store(permits + 1, Ordering::Relaxed);
			self.inner.signal.notify_one();
		}
		Ok(())
	}

	/// Wakes every current waiter. The caller must hold the lock.
	pub fn signal_all(&self) -> Result<(), LockError> {
		let state = self.core.state.lock();
		if state.owner != Some(thread::current().id()) {
			return Err(LockError::NotOwner);
		}
		let waiters = self.inner.waiters.load(Ordering::Relaxed);
		self.inner.permits.store(waiters, Ordering::Relaxed);
		self.inner.signal.notify_all();
		Ok(())
	}

	/// Returns true if any thread is waiting on this condition.
	pub fn has_waiters(&self) -> bool {
		self.wait_queue_length() > 0
	}

	/// Number of threads waiting on this condition (snapshot).
	pub fn wait_queue_length(&self) -> usize {
		let _state = self.core.state.lock();
		self.inner.waiters.load(Ordering::Relaxed)
	}
}

impl std::fmt::Debug for Condition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Condition")
			.field("waiters", &self.inner.waiters.load(Ordering::Relaxed))
			.field("permits", &self.inner.permits.load(Ordering::Relaxed))
			.finish()
	}
}
