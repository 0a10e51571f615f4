use serde::{Deserialize, Serialize};

use crate::error::LockError;
use crate::strategy::StrategyKind;

/// Stripe count used when none is configured.
pub const DEFAULT_STRIPES: usize = 256;

fn default_stripes() -> usize {
	DEFAULT_STRIPES
}

/// Striping strategy selection.
///
/// ```toml
/// strategy = "fixed"
/// stripes = 512
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StripingConfig {
	/// Preallocated stripe table.
	Fixed {
		/// Number of stripes; must be > 0.
		#[serde(default = "default_stripes")]
		stripes: usize,
	},
	/// One lock per live key.
	Dynamic,
}

impl Default for StripingConfig {
	fn default() -> Self {
		Self::Fixed {
			stripes: DEFAULT_STRIPES,
		}
	}
}

impl StripingConfig {
	/// Strategy this config selects.
	pub fn kind(&self) -> StrategyKind {
		match self {
			Self::Fixed { .. } => StrategyKind::Fixed,
			Self::Dynamic => StrategyKind::Dynamic,
		}
	}

	/// Rejects configurations no strategy can be built from.
	pub fn validate(&self) -> Result<(), LockError> {
		match self {
			Self::Fixed { stripes: 0 } => Err(LockError::InvalidStripeCount),
			_ => Ok(()),
		}
	}
}
