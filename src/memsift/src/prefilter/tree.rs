//! Chunk-tree filter scan.
//!
//! One [`ChunkRoot`] per region of the layout at scan start. Every pass reads
//! each live root in full and counts, per chunk, how often its checksum
//! differed from the previous pass.

use super::{assemble, build_workers, CancelToken, Prefilter, TickReport};
use crate::checksum::checksum_range;
use crate::chunk::{ChangePolicy, Chunk};
use crate::config::FilterConfig;
use crate::error::PrefilterError;
use crate::progress::{LogProgress, Progress, ProgressSink};
use crate::region::MemoryRegion;
use crate::snapshot::Snapshot;
use crate::source::MemorySource;

use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A region and its fixed chunk partition.
#[derive(Debug, Clone)]
pub struct ChunkRoot {
    region: MemoryRegion,
    chunks: Vec<Chunk>,
    dead: bool,
}

impl ChunkRoot {
    pub fn new(region: MemoryRegion, chunk_size: usize) -> Self {
        Self {
            region,
            chunks: region.chunks(chunk_size).map(Chunk::new).collect(),
            dead: false,
        }
    }

    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Mark the region deallocated; it is never read or reported again.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Update every chunk from a full read of the region. Returns how many
    /// chunks changed since the previous pass.
    pub fn process_changes(&mut self, data: &[u8]) -> usize {
        let base = self.region.start;
        let mut changed = 0;
        for chunk in &mut self.chunks {
            let (start, end) = chunk.region().offsets_from(base);
            if chunk.observe(checksum_range(data, start, end), ChangePolicy::Count) {
                changed += 1;
            }
        }
        changed
    }

    /// Append chunks with at least `min_changes` changes. Dead roots add none.
    pub fn changed_regions(&self, min_changes: u16, accepted: &mut Vec<MemoryRegion>) {
        if self.dead {
            return;
        }
        accepted.extend(
            self.chunks
                .iter()
                .filter(|c| c.change_count() >= min_changes)
                .map(Chunk::region),
        );
    }
}

struct TreeScan {
    roots: Vec<ChunkRoot>,
    passes: usize,
}

impl TreeScan {
    fn progress(&self) -> Progress {
        let live = self.roots.iter().filter(|r| !r.is_dead());
        let (processed, total) = live.fold((0, 0), |(processed, total), root| {
            let done = root.chunks.iter().filter(|c| c.is_processed()).count();
            (processed + done, total + root.chunks.len())
        });
        Progress::new(processed, total)
    }
}

/// Explicit filter scan keeping chunks that changed at least `min_changes`
/// times between [`Prefilter::begin_scan`] and [`Prefilter::collect_results`].
pub struct ChunkTreeFilter {
    source: Arc<dyn MemorySource>,
    config: FilterConfig,
    workers: rayon::ThreadPool,
    cancel: CancelToken,
    sink: Arc<dyn ProgressSink>,
    scan: Mutex<Option<TreeScan>>,
}

impl ChunkTreeFilter {
    pub fn new(source: Arc<dyn MemorySource>, config: FilterConfig) -> Result<Self, PrefilterError> {
        config.validate()?;
        let workers = build_workers("memsift-filter", config.parallelism)?;
        Ok(Self {
            source,
            config,
            workers,
            cancel: CancelToken::new(),
            sink: Arc::new(LogProgress),
            scan: Mutex::new(None),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Whether a scan is in progress.
    pub fn is_scanning(&self) -> bool {
        self.scan.lock().is_some()
    }
}

impl Prefilter for ChunkTreeFilter {
    fn name(&self) -> &'static str {
        "chunk-tree"
    }

    fn begin_scan(&self) -> Result<(), PrefilterError> {
        let regions = self.source.query_regions()?;
        let roots: Vec<ChunkRoot> = regions
            .into_iter()
            .filter(|r| !r.is_empty())
            .map(|r| ChunkRoot::new(r, self.config.chunk_size))
            .collect();

        let chunks: usize = roots.iter().map(|r| r.chunks.len()).sum();
        tracing::info!(
            roots = roots.len(),
            chunks,
            chunk_size = self.config.chunk_size,
            "filter scan started"
        );

        self.cancel.reset();
        *self.scan.lock() = Some(TreeScan { roots, passes: 0 });
        Ok(())
    }

    fn update_scan(&self) -> Result<TickReport, PrefilterError> {
        let mut guard = self.scan.lock();
        let scan = guard.as_mut().ok_or(PrefilterError::NotStarted)?;

        let processed = AtomicUsize::new(0);
        let dropped = AtomicUsize::new(0);
        let changed = AtomicUsize::new(0);
        let source = &*self.source;
        let cancel = &self.cancel;

        self.workers.install(|| {
            scan.roots
                .par_iter_mut()
                .filter(|root| !root.is_dead())
                .for_each(|root| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let region = root.region();
                    match source.read_bytes(region.start, region.size()) {
                        Ok(data) => {
                            changed.fetch_add(root.process_changes(&data), Ordering::Relaxed);
                            processed.fetch_add(root.chunks.len(), Ordering::Relaxed);
                        }
                        Err(e) => {
                            tracing::trace!("region {} died: {}", region, e);
                            root.kill();
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
        });

        scan.passes += 1;
        let report = TickReport {
            added: 0,
            processed: processed.into_inner(),
            skipped: 0,
            dropped: dropped.into_inner(),
            changed: changed.into_inner(),
            progress: scan.progress(),
        };

        tracing::debug!(
            pass = scan.passes,
            processed = report.processed,
            changed = report.changed,
            dead = report.dropped,
            "filter pass complete"
        );
        self.sink.progress(report.progress);

        Ok(report)
    }

    fn collect_results(&self) -> Result<Snapshot, PrefilterError> {
        let scan = self.scan.lock().take().ok_or(PrefilterError::NotStarted)?;

        let mut accepted = Vec::new();
        for root in &scan.roots {
            root.changed_regions(self.config.min_changes, &mut accepted);
        }

        let snapshot = assemble(accepted, &*self.source, self.config.max_scalar_width);
        tracing::info!(
            passes = scan.passes,
            regions = snapshot.len(),
            bytes = snapshot.size(),
            "filter scan finished"
        );
        self.sink.result_size(snapshot.size());

        Ok(snapshot)
    }

    fn update_interval(&self) -> Duration {
        self.config.interval()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn progress(&self) -> Progress {
        self.scan
            .lock()
            .as_ref()
            .map(TreeScan::progress)
            .unwrap_or_default()
    }
}
