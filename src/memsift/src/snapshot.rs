//! Snapshots
//!
//! An ordered set of memory regions: either the full layout of the target or
//! the filtered subset a prefilter hands to the value scanner.

use crate::region::MemoryRegion;
use serde::Serialize;

/// Ordered, non-overlapping set of memory regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    regions: Vec<MemoryRegion>,
}

impl Snapshot {
    /// Build a snapshot from regions in any order. Empty regions are dropped
    /// and overlapping ones merged.
    pub fn new(mut regions: Vec<MemoryRegion>) -> Self {
        regions.retain(|r| !r.is_empty());
        regions.sort_unstable_by_key(|r| r.start);
        let mut snapshot = Self { regions };
        snapshot.coalesce(false);
        snapshot
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn into_regions(self) -> Vec<MemoryRegion> {
        self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total bytes covered.
    pub fn size(&self) -> u64 {
        self.regions.iter().map(|r| r.size() as u64).sum()
    }

    /// Extend every region's end by `bytes`, merging regions that now
    /// overlap or touch.
    ///
    /// A value starting in the last `width - 1` bytes of a region ends past
    /// it; growing by that much keeps such values readable.
    pub fn grow(&mut self, bytes: usize) {
        for region in &mut self.regions {
            *region = region.grown(bytes);
        }
        self.coalesce(true);
    }

    /// Clip every region to the regions of `reference`, discarding bytes
    /// that are no longer backed by a live mapping.
    pub fn mask(&mut self, reference: &Snapshot) {
        let mut masked = Vec::with_capacity(self.regions.len());
        let mut cursor = 0;

        for region in &self.regions {
            // Reference regions ending before this one can't overlap it or
            // any later one.
            while cursor < reference.regions.len() && reference.regions[cursor].end <= region.start
            {
                cursor += 1;
            }

            let mut index = cursor;
            while index < reference.regions.len() && reference.regions[index].start < region.end {
                if let Some(overlap) = region.intersect(&reference.regions[index]) {
                    masked.push(overlap);
                }
                index += 1;
            }
        }

        self.regions = masked;
    }

    /// Whether `region` lies entirely inside one region of this snapshot.
    pub fn covers(&self, region: &MemoryRegion) -> bool {
        let index = self.regions.partition_point(|r| r.end <= region.start);
        self.regions
            .get(index)
            .is_some_and(|r| r.start <= region.start && region.end <= r.end)
    }

    fn coalesce(&mut self, join_adjacent: bool) {
        let mut merged: Vec<MemoryRegion> = Vec::with_capacity(self.regions.len());
        for region in self.regions.drain(..) {
            match merged.last_mut() {
                Some(last)
                    if region.start < last.end || (join_adjacent && region.start == last.end) =>
                {
                    last.end = last.end.max(region.end);
                }
                _ => merged.push(region),
            }
        }
        self.regions = merged;
    }
}

impl FromIterator<MemoryRegion> for Snapshot {
    fn from_iter<I: IntoIterator<Item = MemoryRegion>>(iter: I) -> Self {
        Snapshot::new(iter.into_iter().collect())
    }
}
