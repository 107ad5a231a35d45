//! Memory Region Types
//!
//! Half-open address ranges and the arithmetic the prefilter needs on them:
//! chunk partitioning, growth, and intersection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous extent of the target's address space, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub start: usize,
    pub end: usize,
}

impl MemoryRegion {
    pub fn new(start: usize, size: usize) -> Self {
        Self {
            start,
            end: start.saturating_add(size),
        }
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, address: usize) -> bool {
        address >= self.start && address < self.end
    }

    /// Split into consecutive `chunk_size` pieces; the last piece holds the
    /// remainder. A zero `chunk_size` yields nothing.
    pub fn chunks(&self, chunk_size: usize) -> Chunks {
        Chunks {
            next: self.start,
            end: self.end,
            chunk_size,
        }
    }

    /// Number of pieces [`MemoryRegion::chunks`] yields.
    pub fn chunk_count(&self, chunk_size: usize) -> usize {
        if chunk_size == 0 {
            return 0;
        }
        self.size().div_ceil(chunk_size)
    }

    /// Extend the end boundary by `bytes`, saturating at the top of the
    /// address space.
    pub fn grown(&self, bytes: usize) -> Self {
        Self {
            start: self.start,
            end: self.end.saturating_add(bytes),
        }
    }

    /// Overlap of two regions, if any.
    pub fn intersect(&self, other: &MemoryRegion) -> Option<MemoryRegion> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(MemoryRegion { start, end })
    }

    /// Offset range of `self` within a buffer that starts at `base`.
    pub(crate) fn offsets_from(&self, base: usize) -> (usize, usize) {
        (self.start - base, self.end - base)
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}-{:#x} ({:#x})", self.start, self.end, self.size())
    }
}

/// Iterator returned by [`MemoryRegion::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks {
    next: usize,
    end: usize,
    chunk_size: usize,
}

impl Iterator for Chunks {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<Self::Item> {
        if self.chunk_size == 0 || self.next >= self.end {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.chunk_size).min(self.end);
        self.next = end;
        Some(MemoryRegion { start, end })
    }
}
