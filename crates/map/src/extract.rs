use crate::error::IndexError;
use crate::index::Index;

/// Derives the [`Index`] of a value. Must be pure: the same value always yields the same keys.
pub trait IndexExtractor<K, V>: Send + Sync {
	/// Computes the keys `value` is reachable by.
	fn extract(&self, value: &V) -> Result<Index<K>, IndexError>;
}

impl<K, V, F> IndexExtractor<K, V> for F
where
	F: Fn(&V) -> Result<Index<K>, IndexError> + Send + Sync,
{
	fn extract(&self, value: &V) -> Result<Index<K>, IndexError> {
		self(value)
	}
}
