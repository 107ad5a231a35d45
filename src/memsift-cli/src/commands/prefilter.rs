//! Background prefilter run

use super::attach;
use crate::cli::Target;
use crate::output::{format_bytes, print_snapshot, progress_style, BarProgress};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use memsift::{ChunkQueuePrefilter, Prefilter, PrefilterConfig, RegionFilter, Scheduler};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub fn handle(
    target: &Target,
    config: PrefilterConfig,
    regions: RegionFilter,
    seconds: u64,
    report_every: u64,
    json: bool,
) -> Result<()> {
    let process = Arc::new(attach(target, regions)?);

    let pb = ProgressBar::new(0);
    pb.set_style(progress_style());
    let prefilter = Arc::new(
        ChunkQueuePrefilter::new(process, config)
            .context("Invalid prefilter settings")?
            .with_sink(Arc::new(BarProgress::new(pb.clone()))),
    );

    let handle = Scheduler::spawn(prefilter.clone()).context("Failed to start prefilter")?;

    let started = Instant::now();
    let deadline = started + Duration::from_secs(seconds);
    let period = (report_every > 0).then(|| Duration::from_secs(report_every));
    while let Some(wait) = next_wait(Instant::now(), deadline, period) {
        std::thread::sleep(wait);
        if Instant::now() < deadline {
            let snapshot = prefilter.collect_results()?;
            pb.println(format!(
                "[{:>5}s] {} regions, {} changed",
                started.elapsed().as_secs(),
                snapshot.len(),
                format_bytes(snapshot.size())
            ));
        }
    }

    let ticks = handle.stop();
    pb.finish_and_clear();
    tracing::info!(ticks, chunks = prefilter.len(), "prefilter stopped");

    let snapshot = prefilter.collect_results()?;
    print_snapshot(&snapshot, json)
}

/// How long to sleep before the next interim report, or `None` once the run
/// is over.
fn next_wait(now: Instant, deadline: Instant, period: Option<Duration>) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(now);
    if remaining.is_zero() {
        return None;
    }
    Some(period.map_or(remaining, |p| p.min(remaining)))
}
