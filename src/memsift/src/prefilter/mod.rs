//! Change-detection prefilters
//!
//! Two strategies share one interface:
//!
//! - [`ChunkTreeFilter`] builds a chunk partition per region when a scan
//!   begins, counts checksum changes on every pass, and keeps chunks whose
//!   count reaches a threshold when the scan is collected.
//! - [`ChunkQueuePrefilter`] keeps one long-lived FIFO pool of chunks,
//!   reconciles it against the live layout on every pass, processes a bounded
//!   number of chunks per pass, and retires a chunk once it has changed.
//!
//! Either one can be driven by hand or by the background [`Scheduler`].

mod cancel;
mod queue;
mod scheduler;
mod tree;

pub use cancel::CancelToken;
pub use queue::ChunkQueuePrefilter;
pub use scheduler::{ScheduleHandle, Scheduler};
pub use tree::{ChunkRoot, ChunkTreeFilter};

use crate::error::PrefilterError;
use crate::progress::Progress;
use crate::snapshot::Snapshot;
use crate::source::MemorySource;
use serde::Serialize;
use std::time::Duration;

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Chunks discovered by reconciliation this pass.
    pub added: usize,
    /// Chunks read and checksummed.
    pub processed: usize,
    /// Already-changed chunks requeued without a read.
    pub skipped: usize,
    /// Chunks (or whole roots) whose read failed.
    pub dropped: usize,
    /// Observations that counted as a change.
    pub changed: usize,
    pub progress: Progress,
}

/// A change-detection strategy that narrows the memory a value scan must
/// examine.
pub trait Prefilter: Send + Sync {
    /// Short name used in logs and thread names.
    fn name(&self) -> &'static str;

    /// Prepare for passes. Clears any earlier cancellation.
    fn begin_scan(&self) -> Result<(), PrefilterError>;

    /// Run one pass. Per-chunk read failures are absorbed here.
    fn update_scan(&self) -> Result<TickReport, PrefilterError>;

    /// Assemble the accepted chunks into a grown, masked snapshot.
    fn collect_results(&self) -> Result<Snapshot, PrefilterError>;

    /// Delay the scheduler should wait before the next pass.
    fn update_interval(&self) -> Duration;

    /// Stop dequeuing work. In-flight chunk reads finish normally.
    fn cancel(&self);

    fn progress(&self) -> Progress;
}

/// Grow accepted regions by `max_scalar_width - 1` and clip them to the
/// source's current layout.
///
/// A layout that can no longer be enumerated (process gone) yields an empty
/// snapshot.
pub(crate) fn assemble(
    accepted: Vec<crate::region::MemoryRegion>,
    source: &dyn MemorySource,
    max_scalar_width: usize,
) -> Snapshot {
    let mut snapshot = Snapshot::new(accepted);
    snapshot.grow(max_scalar_width.saturating_sub(1));

    let reference = match source.snapshot() {
        Ok(reference) => reference,
        Err(e) => {
            tracing::warn!("cannot enumerate regions for masking: {}", e);
            Snapshot::default()
        }
    };
    snapshot.mask(&reference);
    snapshot
}

fn build_workers(name: &'static str, threads: usize) -> Result<rayon::ThreadPool, PrefilterError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |index| format!("{}-{}", name, index))
        .build()?)
}
