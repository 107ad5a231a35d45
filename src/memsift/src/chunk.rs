//! Tracked Chunks
//!
//! A chunk is a fixed-size slice of a memory region together with the last
//! checksum seen for it and its change state. Both prefilter strategies share
//! this type; they differ only in the [`ChangePolicy`] they observe with.

use crate::region::MemoryRegion;

/// How a chunk records differing checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePolicy {
    /// Count every differing observation (saturating).
    Count,
    /// Flag the first differing observation; the flag never clears.
    Flag,
}

/// A chunk of target memory under observation.
#[derive(Debug, Clone)]
pub struct Chunk {
    region: MemoryRegion,
    checksum: Option<u32>,
    changes: u16,
}

impl Chunk {
    pub fn new(region: MemoryRegion) -> Self {
        Self {
            region,
            checksum: None,
            changes: 0,
        }
    }

    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    pub fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    /// Whether a checksum has ever been recorded.
    pub fn is_processed(&self) -> bool {
        self.checksum.is_some()
    }

    /// Number of observed changes (at most 1 under [`ChangePolicy::Flag`]).
    pub fn change_count(&self) -> u16 {
        self.changes
    }

    pub fn has_changed(&self) -> bool {
        self.changes > 0
    }

    /// Record a freshly computed checksum. Returns whether this observation
    /// counted as a change.
    ///
    /// The first observation only seeds the checksum.
    pub fn observe(&mut self, checksum: u32, policy: ChangePolicy) -> bool {
        let Some(previous) = self.checksum else {
            self.checksum = Some(checksum);
            return false;
        };

        let changed = previous != checksum;
        match policy {
            ChangePolicy::Count => {
                if changed {
                    self.changes = self.changes.saturating_add(1);
                }
                self.checksum = Some(checksum);
            }
            ChangePolicy::Flag => {
                if changed {
                    self.changes = 1;
                }
            }
        }
        changed
    }
}

/// Stable handle to a chunk stored in a [`ChunkArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(usize);

/// Slab of chunks with slot reuse. Handles stay valid until removed.
#[derive(Debug, Default)]
pub struct ChunkArena {
    slots: Vec<Option<Chunk>>,
    free: Vec<usize>,
    len: usize,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk: Chunk) -> ChunkId {
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(chunk);
                ChunkId(index)
            }
            None => {
                self.slots.push(Some(chunk));
                ChunkId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: ChunkId) -> Option<Chunk> {
        let chunk = self.slots.get_mut(id.0)?.take()?;
        self.len -= 1;
        if id.0 + 1 == self.slots.len() {
            // Release the trailing run of empty slots
            while matches!(self.slots.last(), Some(None)) {
                self.slots.pop();
            }
            let end = self.slots.len();
            self.free.retain(|&index| index < end);
        } else {
            self.free.push(id.0);
        }
        Some(chunk)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|chunk| (ChunkId(index), chunk)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk::new(MemoryRegion::new(0x1000, 0x1000))
    }

    #[test]
    fn test_first_observation_is_not_a_change() {
        for policy in [ChangePolicy::Count, ChangePolicy::Flag] {
            let mut c = chunk();
            assert!(!c.is_processed());
            assert!(!c.observe(0xdead_beef, policy));
            assert!(c.is_processed());
            assert!(!c.has_changed());
            assert_eq!(c.checksum(), Some(0xdead_beef));
        }
    }

    #[test]
    fn test_count_policy_counts_each_difference() {
        let mut c = chunk();
        c.observe(1, ChangePolicy::Count);
        assert!(c.observe(2, ChangePolicy::Count));
        assert!(!c.observe(2, ChangePolicy::Count));
        assert!(c.observe(3, ChangePolicy::Count));
        assert_eq!(c.change_count(), 2);
        assert_eq!(c.checksum(), Some(3));
    }

    #[test]
    fn test_count_policy_saturates() {
        let mut c = chunk();
        c.observe(0, ChangePolicy::Count);
        for i in 1..=(u32::from(u16::MAX) + 10) {
            c.observe(i, ChangePolicy::Count);
        }
        assert_eq!(c.change_count(), u16::MAX);
    }

    #[test]
    fn test_flag_policy_is_permanent() {
        let mut c = chunk();
        c.observe(1, ChangePolicy::Flag);
        assert!(c.observe(2, ChangePolicy::Flag));
        assert!(c.has_changed());

        // Same checksum as the baseline again: still flagged
        assert!(!c.observe(1, ChangePolicy::Flag));
        assert!(c.has_changed());
        assert_eq!(c.change_count(), 1);
    }

    #[test]
    fn test_arena_reuses_slots() {
        let mut arena = ChunkArena::new();
        let a = arena.insert(chunk());
        let b = arena.insert(Chunk::new(MemoryRegion::new(0x2000, 0x1000)));
        assert_eq!(arena.len(), 2);

        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.region().start, 0x1000);
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 1);

        let c = arena.insert(Chunk::new(MemoryRegion::new(0x3000, 0x1000)));
        assert_eq!(c, a);
        assert_eq!(arena.get(b).unwrap().region().start, 0x2000);
        assert_eq!(arena.iter().count(), 2);
    }

    #[test]
    fn test_arena_releases_trailing_slots() {
        let mut arena = ChunkArena::new();
        let ids: Vec<ChunkId> = (0..6)
            .map(|i| arena.insert(Chunk::new(MemoryRegion::new(0x1000 * (i + 1), 0x1000))))
            .collect();

        // Free a run in the middle first, then the tail behind it
        arena.remove(ids[3]);
        arena.remove(ids[4]);
        arena.remove(ids[5]);
        assert_eq!(arena.slots.len(), 3);
        assert!(arena.free.is_empty());
        assert_eq!(arena.len(), 3);

        arena.remove(ids[1]);
        assert_eq!(arena.slots.len(), 3);
        assert_eq!(arena.free, vec![1]);

        // Reuse and growth both land on live slots
        assert_eq!(arena.insert(chunk()), ids[1]);
        let grown = arena.insert(chunk());
        assert_eq!(grown, ids[3]);
        assert_eq!(arena.iter().count(), 4);

        for id in [ids[0], ids[1], ids[2], grown] {
            arena.remove(id);
        }
        assert!(arena.is_empty());
        assert!(arena.slots.is_empty());
        assert!(arena.free.is_empty());
    }
}
