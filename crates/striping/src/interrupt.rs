use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Upper bound on how long an interruptible wait sleeps before re-checking its token.
pub(crate) const INTERRUPT_POLL: Duration = Duration::from_millis(5);

/// Cancellation token for interruptible lock and condition waits.
///
/// Clones share one flag. Interrupting wakes waiters within [`INTERRUPT_POLL`]; they return
/// [`crate::LockError::Interrupted`] without holding the lock they were queued on. The flag
/// stays set until [`Interrupt::clear`] so later interruptible calls fail fast.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
	flag: Arc<AtomicBool>,
}

impl Interrupt {
	/// Creates a token in the non-interrupted state.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests cancellation of every wait observing this token.
	pub fn interrupt(&self) {
		self.flag.store(true, Ordering::Release);
	}

	/// Returns true once [`Interrupt::interrupt`] has been called and not cleared.
	pub fn is_interrupted(&self) -> bool {
		self.flag.load(Ordering::Acquire)
	}

	/// Resets the token so it can be reused.
	pub fn clear(&self) {
		self.flag.store(false, Ordering::Release);
	}
}
