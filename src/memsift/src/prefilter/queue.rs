//! Continuous chunk-queue prefilter.
//!
//! Most of a process's memory stays constant over short spans, and the
//! values a user hunts for live in the part that doesn't. This prefilter
//! runs in the background from the moment a process is attached:
//!
//! 1. Reconcile the pool against the current layout; newly allocated chunks
//!    go to the front of the queue.
//! 2. Pop up to a budget of chunks, checksum them and push them to the back.
//!    A chunk that has changed once is requeued without being read again.
//! 3. On request, grow and mask the changed chunks into a snapshot.
//!
//! Pacing follows two regimes: ramp-up while some chunk has never been
//! checksummed, steady-state afterwards.

use super::{assemble, build_workers, CancelToken, Prefilter, TickReport};
use crate::checksum::checksum;
use crate::chunk::{ChangePolicy, Chunk, ChunkArena, ChunkId};
use crate::config::{PrefilterConfig, Regime};
use crate::error::PrefilterError;
use crate::progress::{LogProgress, Progress, ProgressSink};
use crate::reconcile::collect_new_regions;
use crate::region::MemoryRegion;
use crate::snapshot::Snapshot;
use crate::source::MemorySource;

use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracked chunks and their processing order.
#[derive(Default)]
struct ChunkPool {
    arena: ChunkArena,
    order: VecDeque<ChunkId>,
}

impl ChunkPool {
    fn progress(&self) -> Progress {
        let processed = self.arena.iter().filter(|(_, c)| c.is_processed()).count();
        Progress::new(processed, self.arena.len())
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.order.clear();
    }
}

#[derive(Default)]
struct TickCounters {
    processed: AtomicUsize,
    skipped: AtomicUsize,
    dropped: AtomicUsize,
    changed: AtomicUsize,
}

/// Background prefilter over a persistent pool of chunks.
///
/// Two locks guard the pool. `session` is held for a whole pass and for
/// structural changes (reconciliation, clearing, collection); `pool` is only
/// held to pop, requeue, or update a single chunk, never across a read.
pub struct ChunkQueuePrefilter {
    config: PrefilterConfig,
    workers: rayon::ThreadPool,
    cancel: CancelToken,
    sink: Arc<dyn ProgressSink>,
    steady: AtomicBool,
    session: Mutex<Arc<dyn MemorySource>>,
    pool: Mutex<ChunkPool>,
}

impl ChunkQueuePrefilter {
    pub fn new(
        source: Arc<dyn MemorySource>,
        config: PrefilterConfig,
    ) -> Result<Self, PrefilterError> {
        config.validate()?;
        let workers = build_workers("memsift-prefilter", config.parallelism)?;
        Ok(Self {
            config,
            workers,
            cancel: CancelToken::new(),
            sink: Arc::new(LogProgress),
            steady: AtomicBool::new(false),
            session: Mutex::new(source),
            pool: Mutex::new(ChunkPool::default()),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PrefilterConfig {
        &self.config
    }

    /// Switch to another source. History is discarded when the target's
    /// identity differs; a different address space has nothing in common
    /// with the old one.
    pub fn attach(&self, source: Arc<dyn MemorySource>) {
        let mut session = self.session.lock();
        if session.pid() != source.pid() {
            self.clear_pool();
        }
        *session = source;
    }

    /// Drop every tracked chunk.
    pub fn clear(&self) {
        let _session = self.session.lock();
        self.clear_pool();
    }

    /// Number of tracked chunks.
    pub fn len(&self) -> usize {
        self.pool.lock().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the steady-state regime is active.
    pub fn is_steady(&self) -> bool {
        self.steady.load(Ordering::Acquire)
    }

    fn regime(&self) -> Regime {
        if self.is_steady() {
            self.config.pacing.steady
        } else {
            self.config.pacing.ramp_up
        }
    }

    fn clear_pool(&self) {
        let mut pool = self.pool.lock();
        if !pool.arena.is_empty() {
            pool.clear();
            tracing::info!("prefilter cleared");
        }
        self.steady.store(false, Ordering::Release);
    }

    /// Queue chunks of newly allocated regions ahead of everything else.
    fn collect_new_chunks(&self, source: &dyn MemorySource) -> usize {
        let queried: Vec<MemoryRegion> = match source.query_regions() {
            Ok(regions) => regions
                .iter()
                .flat_map(|r| r.chunks(self.config.chunk_size))
                .collect(),
            Err(e) => {
                tracing::debug!("region query failed: {}", e);
                return 0;
            }
        };

        let tracked: Vec<MemoryRegion> = {
            let pool = self.pool.lock();
            pool.arena.iter().map(|(_, c)| c.region()).collect()
        };

        let additions = collect_new_regions(queried, tracked);
        let mut pool = self.pool.lock();
        for region in additions.iter().rev() {
            let id = pool.arena.insert(Chunk::new(*region));
            pool.order.push_front(id);
        }
        additions.len()
    }

    /// Pop one chunk, checksum it outside the lock, and requeue it.
    fn process_next(&self, source: &dyn MemorySource, counters: &TickCounters) {
        let (id, region) = {
            let mut guard = self.pool.lock();
            let pool = &mut *guard;
            let Some(id) = pool.order.pop_front() else {
                return;
            };
            let Some(chunk) = pool.arena.get(id) else {
                return;
            };
            if chunk.has_changed() {
                pool.order.push_back(id);
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            (id, chunk.region())
        };

        let data = match source.read_bytes(region.start, region.size()) {
            Ok(data) => data,
            Err(e) => {
                // Deallocated; forget it
                tracing::trace!("dropping chunk {}: {}", region, e);
                self.pool.lock().arena.remove(id);
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        let sum = checksum(&data);

        let mut guard = self.pool.lock();
        let pool = &mut *guard;
        if let Some(chunk) = pool.arena.get_mut(id) {
            if chunk.observe(sum, ChangePolicy::Flag) {
                counters.changed.fetch_add(1, Ordering::Relaxed);
            }
            pool.order.push_back(id);
            counters.processed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Prefilter for ChunkQueuePrefilter {
    fn name(&self) -> &'static str {
        "chunk-queue"
    }

    fn begin_scan(&self) -> Result<(), PrefilterError> {
        self.cancel.reset();
        tracing::info!(
            chunk_size = self.config.chunk_size,
            tracked = self.len(),
            "prefilter started"
        );
        Ok(())
    }

    fn update_scan(&self) -> Result<TickReport, PrefilterError> {
        let session = self.session.lock();
        let source: &dyn MemorySource = &**session;

        let added = self.collect_new_chunks(source);

        let budget = self.regime().chunk_budget;
        let count = self.pool.lock().order.len().min(budget);
        let counters = TickCounters::default();
        let cancel = &self.cancel;

        self.workers.install(|| {
            (0..count).into_par_iter().for_each(|_| {
                if !cancel.is_cancelled() {
                    self.process_next(source, &counters);
                }
            });
        });

        let progress = self.pool.lock().progress();
        let steady = progress.is_complete();
        if steady != self.steady.swap(steady, Ordering::AcqRel) {
            tracing::info!(
                chunks = progress.total,
                "prefilter {}",
                if steady {
                    "warmed up, switching to steady-state pacing"
                } else {
                    "found unprocessed chunks, ramping up"
                }
            );
        }
        self.sink.progress(progress);

        let report = TickReport {
            added,
            processed: counters.processed.into_inner(),
            skipped: counters.skipped.into_inner(),
            dropped: counters.dropped.into_inner(),
            changed: counters.changed.into_inner(),
            progress,
        };
        tracing::debug!(
            added = report.added,
            processed = report.processed,
            skipped = report.skipped,
            dropped = report.dropped,
            changed = report.changed,
            "prefilter pass complete"
        );

        Ok(report)
    }

    fn collect_results(&self) -> Result<Snapshot, PrefilterError> {
        let session = self.session.lock();
        let accepted: Vec<MemoryRegion> = {
            let pool = self.pool.lock();
            pool.arena
                .iter()
                .filter(|(_, c)| c.has_changed())
                .map(|(_, c)| c.region())
                .collect()
        };

        let snapshot = assemble(accepted, &**session, self.config.max_scalar_width);
        self.sink.result_size(snapshot.size());
        Ok(snapshot)
    }

    fn update_interval(&self) -> Duration {
        self.regime().interval()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn progress(&self) -> Progress {
        self.pool.lock().progress()
    }
}
