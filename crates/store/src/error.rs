use thiserror::Error;

/// Failure raised by a backing store while applying a mutation.
///
/// [`crate::DashStore`] never produces these; they exist for collaborator stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// The store could not be reached or is shutting down.
	#[error("store unavailable: {reason}")]
	Unavailable {
		/// Human-readable cause.
		reason: String,
	},
	/// The store refused the write (quota, read-only mode, injected fault).
	#[error("store rejected mutation: {reason}")]
	Rejected {
		/// Human-readable cause.
		reason: String,
	},
}

/// Result type for store mutations.
pub type Result<T> = std::result::Result<T, StoreError>;
