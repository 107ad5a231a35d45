mod cli;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Configure {
            show,
            chunk_size,
            prefilter_chunk_size,
            min_changes,
            reset,
        } => {
            let changes = commands::configure::Changes {
                chunk_size,
                prefilter_chunk_size,
                min_changes,
                reset,
            };
            commands::configure::handle(changes, show)?;
        }

        Commands::Regions { target, all, json } => {
            let config = Config::load()?;
            commands::regions::handle(&target, config.regions, all, json)?;
        }

        Commands::Filter {
            target,
            passes,
            chunk_size,
            min_changes,
            interval_ms,
            json,
        } => {
            let config = Config::load()?;
            let mut filter = config.filter;
            if let Some(size) = chunk_size {
                filter.chunk_size = size;
            }
            if let Some(min) = min_changes {
                filter.min_changes = min;
            }
            if let Some(ms) = interval_ms {
                filter.interval_ms = ms;
            }
            commands::filter::handle(&target, filter, config.regions, passes, json)?;
        }

        Commands::Prefilter {
            target,
            seconds,
            report,
            chunk_size,
            json,
        } => {
            let config = Config::load()?;
            let mut prefilter = config.prefilter;
            if let Some(size) = chunk_size {
                prefilter.chunk_size = size;
            }
            commands::prefilter::handle(&target, prefilter, config.regions, seconds, report, json)?;
        }
    }

    Ok(())
}

/// Log to stderr so `--json` output on stdout stays clean. `RUST_LOG` wins
/// over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "memsift=info",
        1 => "memsift=debug",
        _ => "memsift=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
