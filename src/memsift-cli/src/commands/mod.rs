//! Command handlers for memsift CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod filter;
pub mod prefilter;
pub mod regions;

use crate::cli::Target;
use anyhow::{Context, Result};
use memsift::{LiveProcess, RegionFilter};

/// Attach to the process named by `target`
pub fn attach(target: &Target, filter: RegionFilter) -> Result<LiveProcess> {
    match (target.pid, target.name.as_deref()) {
        (Some(pid), _) => {
            LiveProcess::attach(pid, filter).with_context(|| format!("Failed to attach to {}", pid))
        }
        (None, Some(name)) => LiveProcess::attach_by_name(name, filter)
            .with_context(|| format!("Failed to attach to {:?}", name)),
        (None, None) => anyhow::bail!("Specify a target with --pid or --name"),
    }
}
