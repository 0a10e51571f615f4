use polykey_striping::StripingConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Construction-time settings for an [`crate::IndexedMap`].
///
/// ```toml
/// initial_capacity = 4096
///
/// [striping]
/// strategy = "fixed"
/// stripes = 512
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexedMapConfig {
	/// Lock selection strategy keyed by primary key.
	pub striping: StripingConfig,
	/// Preallocation hint for the default backing stores.
	pub initial_capacity: Option<usize>,
}

impl IndexedMapConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(src)?;
		config.striping.validate()?;
		Ok(config)
	}
}
