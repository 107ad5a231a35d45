//! Mock Memory Source
//!
//! An in-memory target whose mappings can be rewritten, unmapped, or made
//! unreadable between prefilter passes.

use super::MemorySource;
use crate::error::{ReadError, SourceError};
use crate::region::MemoryRegion;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Mapping {
    region: MemoryRegion,
    data: Vec<u8>,
    readable: bool,
}

/// A mock memory source for testing the prefilter engine
pub struct MockMemorySource {
    pid: u32,
    mappings: RwLock<Vec<Mapping>>,
    reads: AtomicUsize,
}

impl MockMemorySource {
    /// Create a new mock with one mapping at `base_address`
    pub fn new(data: Vec<u8>, base_address: usize) -> Self {
        let mock = Self::empty(1);
        mock.map(base_address, data);
        mock
    }

    /// Create a mock with no mappings and the given identity
    pub fn empty(pid: u32) -> Self {
        Self {
            pid,
            mappings: RwLock::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    /// Add a mapping. Mappings must not overlap.
    pub fn map(&self, base_address: usize, data: Vec<u8>) {
        let region = MemoryRegion::new(base_address, data.len());
        let mut mappings = self.mappings.write();
        mappings.push(Mapping {
            region,
            data,
            readable: true,
        });
        mappings.sort_by_key(|m| m.region.start);
    }

    /// Remove the mapping starting at `base_address`
    pub fn unmap(&self, base_address: usize) -> bool {
        let mut mappings = self.mappings.write();
        let before = mappings.len();
        mappings.retain(|m| m.region.start != base_address);
        mappings.len() != before
    }

    /// Keep a mapping listed but make every read of it fail
    pub fn protect(&self, base_address: usize) {
        for mapping in self.mappings.write().iter_mut() {
            if mapping.region.start == base_address {
                mapping.readable = false;
            }
        }
    }

    /// Overwrite bytes inside a mapping
    pub fn write(&self, address: usize, bytes: &[u8]) {
        let mut mappings = self.mappings.write();
        let mapping = mappings
            .iter_mut()
            .find(|m| m.region.contains(address))
            .expect("mock write outside any mapping");
        let offset = address - mapping.region.start;
        mapping.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Number of reads served or refused so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl MemorySource for MockMemorySource {
    fn read_bytes(&self, address: usize, size: usize) -> Result<Vec<u8>, ReadError> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let mappings = self.mappings.read();
        let unmapped = ReadError::Unmapped { address, size };
        let mapping = mappings
            .iter()
            .find(|m| m.region.contains(address))
            .ok_or(unmapped)?;

        if !mapping.readable {
            return Err(ReadError::Unmapped { address, size });
        }

        let offset = address - mapping.region.start;
        let available = mapping.data.len() - offset;
        if size > available {
            return Err(ReadError::Short {
                address,
                expected: size,
                actual: available,
            });
        }

        Ok(mapping.data[offset..offset + size].to_vec())
    }

    fn query_regions(&self) -> Result<Vec<MemoryRegion>, SourceError> {
        Ok(self.mappings.read().iter().map(|m| m.region).collect())
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_read_bytes() {
        let data = vec![0x41, 0x42, 0x43, 0x44]; // "ABCD"
        let source = MockMemorySource::new(data, 0x1000);

        let result = source.read_bytes(0x1000, 4).unwrap();
        assert_eq!(result, vec![0x41, 0x42, 0x43, 0x44]);

        let partial = source.read_bytes(0x1001, 2).unwrap();
        assert_eq!(partial, vec![0x42, 0x43]);
        assert_eq!(source.read_count(), 2);
    }

    #[test]
    fn test_mock_source_read_out_of_bounds() {
        let source = MockMemorySource::new(vec![0x41, 0x42, 0x43, 0x44], 0x1000);

        // Reading past end is a short read
        assert!(matches!(
            source.read_bytes(0x1002, 10),
            Err(ReadError::Short {
                expected: 10,
                actual: 2,
                ..
            })
        ));

        // Reading before base is unmapped
        assert!(matches!(
            source.read_bytes(0x500, 4),
            Err(ReadError::Unmapped { .. })
        ));
    }

    #[test]
    fn test_mock_source_write_and_unmap() {
        let source = MockMemorySource::new(vec![0; 0x100], 0x1000);
        source.map(0x3000, vec![0; 0x100]);
        source.write(0x1010, &[1, 2, 3]);
        assert_eq!(source.read_bytes(0x1010, 3).unwrap(), vec![1, 2, 3]);

        assert!(source.unmap(0x1000));
        assert!(!source.unmap(0x1000));
        assert!(source.read_bytes(0x1010, 3).is_err());
        assert_eq!(
            source.query_regions().unwrap(),
            vec![MemoryRegion::new(0x3000, 0x100)]
        );
    }

    #[test]
    fn test_mock_source_protect() {
        let source = MockMemorySource::new(vec![0; 0x100], 0x1000);
        source.protect(0x1000);
        assert!(source.read_bytes(0x1000, 1).is_err());
        assert_eq!(source.query_regions().unwrap().len(), 1);
    }

    #[test]
    fn test_mock_source_find_region() {
        let source = MockMemorySource::new(vec![0; 0x1000], 0x1000);
        source.map(0x4000, vec![0; 0x1000]);

        assert_eq!(source.find_region(0x1500).unwrap().start, 0x1000);
        assert_eq!(source.find_region(0x4fff).unwrap().start, 0x4000);
        assert!(source.find_region(0x3000).is_none());
    }
}
