//! Memory Source Trait
//!
//! The narrow interface the prefilter needs from whatever owns the target
//! process: byte reads and a fresh region enumeration.

use crate::error::{ReadError, SourceError};
use crate::region::MemoryRegion;
use crate::snapshot::Snapshot;

/// Trait for reading a target's memory (live process, test mock, ...)
pub trait MemorySource: Send + Sync {
    /// Read `size` bytes at `address`. Any error means the range is no
    /// longer valid.
    fn read_bytes(&self, address: usize, size: usize) -> Result<Vec<u8>, ReadError>;

    /// Enumerate the target's current scannable regions. Called once per
    /// prefilter pass, so implementations must re-query every time.
    fn query_regions(&self) -> Result<Vec<MemoryRegion>, SourceError>;

    /// Identity of the target; a change means history no longer applies.
    fn pid(&self) -> Option<u32>;

    /// Current layout as a snapshot.
    fn snapshot(&self) -> Result<Snapshot, SourceError> {
        Ok(Snapshot::new(self.query_regions()?))
    }

    /// Find the current region containing `address`
    fn find_region(&self, address: usize) -> Option<MemoryRegion> {
        self.query_regions()
            .ok()?
            .into_iter()
            .find(|r| r.contains(address))
    }
}
