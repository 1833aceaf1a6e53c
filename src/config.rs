use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Configuration for the memoizing matcher.
///
/// Cheap to clone and serde-friendly so it can be embedded in higher-level
/// configuration files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of memoized match results; least-recently-used entries
    /// are evicted beyond this.
    #[serde(default = "EngineConfig::default_cache_capacity")]
    pub cache_capacity: usize,

    /// Whether the cache keeps hit/miss counters.
    #[serde(default)]
    pub record_stats: bool,
}

impl EngineConfig {
    pub(crate) fn default_cache_capacity() -> usize {
        1000
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.cache_capacity == 0 {
            return Err(MatchError::InvalidConfig(
                "cache_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: Self::default_cache_capacity(),
            record_stats: false,
        }
    }
}
