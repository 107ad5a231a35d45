//! # memsift
//!
//! Change-detection prefilter for scanning live process memory.
//!
//! A value scan over a whole address space is slow, and most of that space
//! never changes. This library narrows the search by checksumming fixed-size
//! chunks of readable memory over time and keeping only the chunks that
//! changed:
//! - Tile memory regions into chunks and checksum them with Adler-32
//! - Track per-chunk change state across repeated passes
//! - Reconcile tracked chunks against a changing memory layout
//! - Grow the surviving chunks to cover straddling values and mask them
//!   against the live layout
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use memsift::{ChunkQueuePrefilter, LiveProcess, Prefilter, PrefilterConfig, RegionFilter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let process = Arc::new(LiveProcess::attach_by_name("game", RegionFilter::default())?);
//! let prefilter = Arc::new(ChunkQueuePrefilter::new(process, PrefilterConfig::default())?);
//!
//! let handle = memsift::Scheduler::spawn(prefilter.clone())?;
//! std::thread::sleep(Duration::from_secs(10));
//! handle.stop();
//!
//! let snapshot = prefilter.collect_results()?;
//! for region in snapshot.regions() {
//!     println!("{}", region);
//! }
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod chunk;
pub mod config;
pub mod error;
pub mod prefilter;
pub mod progress;
pub mod reconcile;
pub mod region;
pub mod snapshot;
pub mod source;

// Re-export commonly used items
#[doc(inline)]
pub use chunk::{ChangePolicy, Chunk, ChunkArena, ChunkId};
#[doc(inline)]
pub use config::{FilterConfig, Pacing, PrefilterConfig, Regime, DEFAULT_SCALAR_WIDTH};
#[doc(inline)]
pub use error::{ConfigError, PrefilterError, ReadError, SourceError};
#[doc(inline)]
pub use prefilter::{
    CancelToken, ChunkQueuePrefilter, ChunkTreeFilter, Prefilter, ScheduleHandle, Scheduler,
    TickReport,
};
#[doc(inline)]
pub use progress::{LogProgress, Progress, ProgressSink};
#[doc(inline)]
pub use reconcile::collect_new_regions;
#[doc(inline)]
pub use region::MemoryRegion;
#[doc(inline)]
pub use snapshot::Snapshot;
#[doc(inline)]
pub use source::{find_process, LiveProcess, MapsEntry, MemorySource, RegionFilter};
