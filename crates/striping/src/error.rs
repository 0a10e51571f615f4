use thiserror::Error;

/// Errors raised by striping locks and their conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
	/// A fixed stripe table was requested with zero slots.
	#[error("stripe count must be > 0")]
	InvalidStripeCount,

	/// The wait was cancelled through an [`crate::Interrupt`]. No hold was taken.
	#[error("lock acquisition interrupted")]
	Interrupted,

	/// A condition operation was attempted by a thread that does not own the lock.
	#[error("current thread does not own the lock")]
	NotOwner,
}
