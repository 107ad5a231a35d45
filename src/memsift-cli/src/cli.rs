//! CLI argument definitions for memsift

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "memsift")]
#[command(about = "Narrow process memory scans to the regions that change", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which process to attach to
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Process id
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Process name (the instance using the most memory wins)
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the regions a scan would cover
    #[command(visible_alias = "r")]
    Regions {
        #[command(flatten)]
        target: Target,

        /// Also list mappings rejected by the region filter
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a fixed number of chunk-tree filter passes and print what changed
    #[command(visible_alias = "f")]
    Filter {
        #[command(flatten)]
        target: Target,

        /// Passes to run (the first one only records checksums)
        #[arg(long, default_value = "10")]
        passes: usize,

        /// Chunk size in bytes, decimal or 0x-prefixed (overrides config)
        #[arg(long, value_parser = parse_size)]
        chunk_size: Option<usize>,

        /// Changes a chunk needs before it is kept (overrides config)
        #[arg(long)]
        min_changes: Option<u16>,

        /// Delay between passes in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run the background prefilter for a while and print what changed
    #[command(visible_alias = "p")]
    Prefilter {
        #[command(flatten)]
        target: Target,

        /// How long to run
        #[arg(short, long, default_value = "30")]
        seconds: u64,

        /// Print an interim summary every N seconds (0 disables)
        #[arg(short, long, default_value = "5")]
        report: u64,

        /// Chunk size in bytes, decimal or 0x-prefixed (overrides config)
        #[arg(long, value_parser = parse_size)]
        chunk_size: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Default chunk size of the filter command
        #[arg(long, value_parser = parse_size)]
        chunk_size: Option<usize>,

        /// Default chunk size of the prefilter command
        #[arg(long, value_parser = parse_size)]
        prefilter_chunk_size: Option<usize>,

        /// Default change threshold of the filter command
        #[arg(long)]
        min_changes: Option<u16>,

        /// Restore every default
        #[arg(long)]
        reset: bool,
    },
}

/// Parse a byte count written in decimal or with a 0x prefix.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid size {:?}: {}", s, e))
}
