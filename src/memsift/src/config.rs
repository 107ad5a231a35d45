//! Prefilter configuration.
//!
//! All values come from the caller (the CLI reads them from its TOML config);
//! the engine only validates them. Validation runs in every constructor, so a
//! bad value fails before any scan starts.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Byte width of the widest primitive the downstream scanner compares (u64/f64).
pub const DEFAULT_SCALAR_WIDTH: usize = 8;

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// One pacing regime of the background prefilter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regime {
    /// Delay between passes, in milliseconds.
    pub interval_ms: u64,
    /// Maximum chunks dequeued per pass.
    pub chunk_budget: usize,
}

impl Regime {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { regime: name });
        }
        if self.chunk_budget == 0 {
            return Err(ConfigError::ZeroBudget { regime: name });
        }
        Ok(())
    }
}

/// Ramp-up and steady-state regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Used while some tracked chunk has never been checksummed.
    pub ramp_up: Regime,
    /// Used once every tracked chunk has a checksum.
    pub steady: Regime,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            ramp_up: Regime {
                interval_ms: 200,
                chunk_budget: 0x4000,
            },
            steady: Regime {
                interval_ms: 800,
                chunk_budget: 0x2000,
            },
        }
    }
}

/// Settings for the continuous background prefilter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    pub chunk_size: usize,
    pub pacing: Pacing,
    /// Worker threads used per pass.
    pub parallelism: usize,
    pub max_scalar_width: usize,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 0x2000,
            pacing: Pacing::default(),
            parallelism: default_parallelism(),
            max_scalar_width: DEFAULT_SCALAR_WIDTH,
        }
    }
}

impl PrefilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        self.pacing.ramp_up.validate("ramp-up")?;
        self.pacing.steady.validate("steady-state")?;
        if self.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        if self.max_scalar_width == 0 {
            return Err(ConfigError::ZeroScalarWidth);
        }
        Ok(())
    }
}

/// Settings for an explicit chunk-tree filter scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub chunk_size: usize,
    /// Changes a chunk needs before it is kept.
    pub min_changes: u16,
    /// Delay between passes when run on the scheduler, in milliseconds.
    pub interval_ms: u64,
    pub parallelism: usize,
    pub max_scalar_width: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 0x1000,
            min_changes: 1,
            interval_ms: 200,
            parallelism: default_parallelism(),
            max_scalar_width: DEFAULT_SCALAR_WIDTH,
        }
    }
}

impl FilterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.min_changes == 0 {
            return Err(ConfigError::ZeroMinChanges);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { regime: "filter" });
        }
        if self.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        if self.max_scalar_width == 0 {
            return Err(ConfigError::ZeroScalarWidth);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(PrefilterConfig::default().validate(), Ok(()));
        assert_eq!(FilterConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let config = PrefilterConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));

        let config = FilterConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));
    }

    #[test]
    fn test_rejects_zero_budget_and_interval() {
        let mut config = PrefilterConfig::default();
        config.pacing.steady.chunk_budget = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroBudget {
                regime: "steady-state"
            })
        );

        let mut config = PrefilterConfig::default();
        config.pacing.ramp_up.interval_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval { regime: "ramp-up" })
        );
    }

    #[test]
    fn test_rejects_zero_min_changes_and_parallelism() {
        let config = FilterConfig {
            min_changes: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinChanges));

        let config = FilterConfig {
            parallelism: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroParallelism));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PrefilterConfig = toml::from_str(
            r#"
            chunk_size = 4096

            [pacing.steady]
            interval_ms = 1000
            chunk_budget = 512
            "#,
        )
        .unwrap();

        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.pacing.steady.chunk_budget, 512);
        assert_eq!(config.pacing.ramp_up, Pacing::default().ramp_up);
        assert_eq!(config.max_scalar_width, DEFAULT_SCALAR_WIDTH);
    }
}
