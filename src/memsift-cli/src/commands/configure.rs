//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up memsift defaults.

use crate::config::Config;
use anyhow::{Context, Result};

/// Settings changed by one `configure` invocation
#[derive(Debug, Default)]
pub struct Changes {
    pub chunk_size: Option<usize>,
    pub prefilter_chunk_size: Option<usize>,
    pub min_changes: Option<u16>,
    pub reset: bool,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.chunk_size.is_none()
            && self.prefilter_chunk_size.is_none()
            && self.min_changes.is_none()
            && !self.reset
    }
}

/// Handle the configure command
pub fn handle(changes: Changes, show: bool) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config)?;
        return Ok(());
    }

    if changes.is_empty() {
        show_usage();
        return Ok(());
    }

    apply(&mut config, &changes)?;
    config.save()?;

    println!("Configuration updated");
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

/// Apply `changes` to `config`, rejecting values the engine would refuse.
fn apply(config: &mut Config, changes: &Changes) -> Result<()> {
    if changes.reset {
        *config = Config::default();
    }
    if let Some(size) = changes.chunk_size {
        config.filter.chunk_size = size;
    }
    if let Some(size) = changes.prefilter_chunk_size {
        config.prefilter.chunk_size = size;
    }
    if let Some(min) = changes.min_changes {
        config.filter.min_changes = min;
    }
    config.validate().context("Refusing to save configuration")
}

/// Display current configuration
fn show_config(config: &Config) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", contents.trim_end());

    if let Ok(path) = Config::config_path() {
        println!();
        println!("Config file: {}", path.display());
    }

    Ok(())
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: memsift configure --show");
    println!("       memsift configure --chunk-size 0x1000 --min-changes 2");
    println!("       memsift configure --prefilter-chunk-size 0x2000");
    println!("       memsift configure --reset");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_requested_fields() {
        let mut config = Config::default();
        apply(
            &mut config,
            &Changes {
                chunk_size: Some(0x800),
                min_changes: Some(4),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.filter.chunk_size, 0x800);
        assert_eq!(config.filter.min_changes, 4);
        assert_eq!(config.prefilter, Config::default().prefilter);
    }

    #[test]
    fn test_apply_rejects_zero_chunk_size() {
        let mut config = Config::default();
        let result = apply(
            &mut config,
            &Changes {
                prefilter_chunk_size: Some(0),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reset_then_override() {
        let mut config = Config::default();
        config.filter.min_changes = 9;
        config.regions.writable_only = false;

        apply(
            &mut config,
            &Changes {
                reset: true,
                min_changes: Some(2),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.filter.min_changes, 2);
        assert!(config.regions.writable_only);
    }

    #[test]
    fn test_empty_changes() {
        assert!(Changes::default().is_empty());
        assert!(!Changes {
            reset: true,
            ..Default::default()
        }
        .is_empty());
    }
}
