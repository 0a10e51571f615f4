//! Reentrant, thread-owned lock.
//!
//! # Role
//!
//! [`ReentrantLock`] is the primitive every stripe hands out. Ownership is tracked by
//! [`ThreadId`], so the owning thread may re-acquire without blocking; each acquisition adds
//! one hold and each [`ReentrantGuard`] drop removes one.
//!
//! # Invariants
//!
//! - `owner.is_none()` iff `holds == 0`.
//! - Only the owning thread mutates `holds` while `owner` is set. Guards are `!Send`, so a
//!   hold is always released on the thread that took it.

use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::condition::Condition;
use crate::error::LockError;
use crate::interrupt::{INTERRUPT_POLL, Interrupt};

pub(crate) struct LockState {
	pub(crate) owner: Option<ThreadId>,
	pub(crate) holds: usize,
	pub(crate) queued: usize,
}

pub(crate) struct LockCore {
	pub(crate) state: Mutex<LockState>,
	/// Signalled whenever `owner` becomes `None`.
	pub(crate) available: Condvar,
}

/// How long a blocked acquisition (or condition wait) is allowed to park.
#[derive(Clone, Copy)]
pub(crate) struct WaitPolicy<'a> {
	deadline: Option<Instant>,
	interrupt: Option<&'a Interrupt>,
}

impl<'a> WaitPolicy<'a> {
	pub(crate) fn unbounded() -> Self {
		Self {
			deadline: None,
			interrupt: None,
		}
	}

	pub(crate) fn immediate() -> Self {
		Self {
			deadline: Some(Instant::now()),
			interrupt: None,
		}
	}

	pub(crate) fn timeout(timeout: Duration) -> Self {
		Self {
			// Saturate instead of panicking on absurd timeouts.
			deadline: Instant::now().checked_add(timeout),
			interrupt: None,
		}
	}

	pub(crate) fn interruptible(interrupt: &'a Interrupt) -> Self {
		Self {
			deadline: None,
			interrupt: Some(interrupt),
		}
	}

	pub(crate) fn interrupted(&self) -> bool {
		self.interrupt.is_some_and(Interrupt::is_interrupted)
	}

	pub(crate) fn expired(&self) -> bool {
		self.deadline.is_some_and(|d| Instant::now() >= d)
	}

	/// Parks on `cv` for at most one slice of this policy.
	pub(crate) fn park(&self, cv: &Condvar, state: &mut MutexGuard<'_, LockState>) {
		let remaining = self
			.deadline
			.map(|d| d.saturating_duration_since(Instant::now()));
		let slice = match (remaining, self.interrupt) {
			(Some(r), Some(_)) => Some(r.min(INTERRUPT_POLL)),
			(Some(r), None) => Some(r),
			(None, Some(_)) => Some(INTERRUPT_POLL),
			(None, None) => None,
		};
		match slice {
			Some(slice) => {
				cv.wait_for(state, slice);
			}
			None => cv.wait(state),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquire {
	Acquired,
	TimedOut,
	Interrupted,
}

/// Reentrant mutual-exclusion lock owned by a thread.
///
/// Cloning yields another handle to the *same* lock; use [`ReentrantLock::ptr_eq`] to compare
/// identity.
#[derive(Clone)]
pub struct ReentrantLock {
	pub(crate) core: Arc<LockCore>,
}

impl Default for ReentrantLock {
	fn default() -> Self {
		Self::new()
	}
}

impl ReentrantLock {
	/// Creates an unlocked lock.
	pub fn new() -> Self {
		Self {
			core: Arc::new(LockCore {
				state: Mutex::new(LockState {
					owner: None,
					holds: 0,
					queued: 0,
				}),
				available: Condvar::new(),
			}),
		}
	}

	/// Blocks until the current thread holds the lock.
	pub fn lock(&self) -> ReentrantGuard {
		match self.acquire(WaitPolicy::unbounded()) {
			Acquire::Acquired => ReentrantGuard::new(self.clone()),
			other => unreachable!("unbounded acquisition ended with {other:?}"),
		}
	}

	/// Acquires the lock only if it is free or already held by the current thread.
	pub fn try_lock(&self) -> Option<ReentrantGuard> {
		match self.acquire(WaitPolicy::immediate()) {
			Acquire::Acquired => Some(ReentrantGuard::new(self.clone())),
			_ => None,
		}
	}

	/// Waits up to `timeout` for the lock.
	pub fn try_lock_for(&self, timeout: Duration) -> Option<ReentrantGuard> {
		match self.acquire(WaitPolicy::timeout(timeout)) {
			Acquire::Acquired => Some(ReentrantGuard::new(self.clone())),
			_ => None,
		}
	}

	/// Blocks until the lock is acquired or `interrupt` fires.
	///
	/// An already-set token fails immediately, even if the lock is free.
	pub fn lock_interruptibly(&self, interrupt: &Interrupt) -> Result<ReentrantGuard, LockError> {
		match self.acquire(WaitPolicy::interruptible(interrupt)) {
			Acquire::Acquired => Ok(ReentrantGuard::new(self.clone())),
			Acquire::Interrupted => Err(LockError::Interrupted),
			Acquire::TimedOut => unreachable!("interruptible acquisition has no deadline"),
		}
	}

	/// Creates a condition variable bound to this lock.
	pub fn new_condition(&self) -> Condition {
		Condition::new(Arc::clone(&self.core))
	}

	pub(crate) fn acquire(&self, policy: WaitPolicy<'_>) -> Acquire {
		if policy.interrupted() {
			return Acquire::Interrupted;
		}
		let me = thread::current().id();
		let mut state = self.core.state.lock();
		if state.owner == Some(me) {
			state.holds += 1;
			return Acquire::Acquired;
		}
		if state.owner.is_none() {
			state.owner = Some(me);
			state.holds = 1;
			return Acquire::Acquired;
		}
		if policy.expired() {
			return Acquire::TimedOut;
		}

		state.queued += 1;
		let outcome = loop {
			if state.owner.is_none() {
				break Acquire::Acquired;
			}
			if policy.interrupted() {
				break Acquire::Interrupted;
			}
			if policy.expired() {
				break Acquire::TimedOut;
			}
			policy.park(&self.core.available, &mut state);
		};
		state.queued -= 1;

		if outcome == Acquire::Acquired {
			state.owner = Some(me);
			state.holds = 1;
		} else if state.owner.is_none() {
			// A release may have targeted us; pass the wakeup on.
			self.core.available.notify_one();
		}
		outcome
	}

	fn release(&self) {
		let mut state = self.core.state.lock();
		debug_assert_eq!(state.owner, Some(thread::current().id()));
		state.holds = state.holds.saturating_sub(1);
		if state.holds == 0 {
			state.owner = None;
			drop(state);
			self.core.available.notify_one();
		}
	}

	/// Returns true if `self` and `other` are handles to the same lock.
	pub fn ptr_eq(&self, other: &ReentrantLock) -> bool {
		Arc::ptr_eq(&self.core, &other.core)
	}

	/// Returns true if any thread holds the lock.
	pub fn is_locked(&self) -> bool {
		self.core.state.lock().owner.is_some()
	}

	/// Returns true if the current thread holds the lock.
	pub fn is_held_by_current_thread(&self) -> bool {
		self.core.state.lock().owner == Some(thread::current().id())
	}

	/// Number of holds the current thread has on this lock (0 if it is not the owner).
	pub fn hold_count(&self) -> usize {
		let state = self.core.state.lock();
		if state.owner == Some(thread::current().id()) {
			state.holds
		} else {
			0
		}
	}

	/// Returns true if any thread is blocked acquiring this lock.
	pub fn has_queued_threads(&self) -> bool {
		self.queue_length() > 0
	}

	/// Number of threads blocked acquiring this lock.
	pub fn queue_length(&self) -> usize {
		self.core.state.lock().queued
	}
}

impl std::fmt::Debug for ReentrantLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut s = f.debug_struct("ReentrantLock");
		match self.core.state.try_lock() {
			Some(state) => s
				.field("owner", &state.owner)
				.field("holds", &state.holds)
				.field("queued", &state.queued),
			None => s.field("state", &"<busy>"),
		};
		s.finish()
	}
}

/// One hold on a [`ReentrantLock`]. Dropping it releases the hold.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReentrantGuard {
	lock: ReentrantLock,
	_thread_bound: PhantomData<*const ()>,
}

impl ReentrantGuard {
	fn new(lock: ReentrantLock) -> Self {
		Self {
			lock,
			_thread_bound: PhantomData,
		}
	}

	/// The lock this guard holds.
	pub fn lock(&self) -> &ReentrantLock {
		&self.lock
	}

	/// Releases the hold explicitly.
	pub fn unlock(self) {}
}

impl Drop for ReentrantGuard {
	fn drop(&mut self) {
		self.lock.release();
	}
}

impl std::fmt::Debug for ReentrantGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ReentrantGuard")
			.field("lock", &self.lock)
			.finish()
	}
}
