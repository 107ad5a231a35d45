//! Region reconciliation.
//!
//! Compares the chunked region list the OS reports now against the chunks
//! already tracked and returns the ones never seen before. Tracked chunks
//! that disappeared are left alone; their next read fails and drops them.

use crate::region::MemoryRegion;
use std::cmp::Ordering;

/// Return every region of `queried` whose start address is not present in
/// `tracked`, in ascending address order.
///
/// Both inputs are sorted here; the merge itself is a single linear pass.
pub fn collect_new_regions(
    mut queried: Vec<MemoryRegion>,
    mut tracked: Vec<MemoryRegion>,
) -> Vec<MemoryRegion> {
    queried.sort_unstable_by_key(|r| r.start);
    queried.dedup_by_key(|r| r.start);
    tracked.sort_unstable_by_key(|r| r.start);

    let mut additions = Vec::new();
    let mut queried = queried.into_iter().peekable();
    let mut tracked = tracked.into_iter().peekable();

    while let (Some(q), Some(t)) = (queried.peek().copied(), tracked.peek().copied()) {
        match q.start.cmp(&t.start) {
            Ordering::Less => {
                additions.extend(queried.next());
            }
            Ordering::Greater => {
                tracked.next();
            }
            Ordering::Equal => {
                queried.next();
                tracked.next();
            }
        }
    }

    additions.extend(queried);
    additions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn regions(starts: &[usize]) -> Vec<MemoryRegion> {
        starts
            .iter()
            .map(|&s| MemoryRegion::new(s, 0x1000))
            .collect()
    }

    fn starts(regions: &[MemoryRegion]) -> Vec<usize> {
        regions.iter().map(|r| r.start).collect()
    }

    #[test]
    fn test_empty_inputs() {
        assert!(collect_new_regions(vec![], vec![]).is_empty());
        assert!(collect_new_regions(vec![], regions(&[0x1000])).is_empty());
        assert_eq!(
            starts(&collect_new_regions(regions(&[0x2000, 0x1000]), vec![])),
            vec![0x1000, 0x2000]
        );
    }

    #[test]
    fn test_identical_inputs() {
        let layout = regions(&[0x1000, 0x2000, 0x3000]);
        assert!(collect_new_regions(layout.clone(), layout).is_empty());
    }

    #[test]
    fn test_additions_and_removals() {
        let queried = regions(&[0x1000, 0x3000, 0x5000, 0x9000]);
        let tracked = regions(&[0x2000, 0x3000, 0x4000, 0x5000]);
        assert_eq!(
            starts(&collect_new_regions(queried, tracked)),
            vec![0x1000, 0x9000]
        );
    }

    #[test]
    fn test_trailing_queried_entries_are_drained() {
        let queried = regions(&[0x1000, 0x2000, 0x3000]);
        let tracked = regions(&[0x1000]);
        assert_eq!(
            starts(&collect_new_regions(queried, tracked)),
            vec![0x2000, 0x3000]
        );
    }

    #[test]
    fn test_high_addresses_compare_unsigned() {
        let high = usize::MAX - 0x1fff;
        let queried = regions(&[0x1000, high]);
        let tracked = regions(&[0x1000]);
        assert_eq!(starts(&collect_new_regions(queried, tracked)), vec![high]);
    }

    #[test]
    fn test_matches_set_difference() {
        // Deterministic pseudo-random layouts
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..50 {
            let q: BTreeSet<usize> = (0..next() % 40).map(|_| (next() % 64) as usize * 0x1000).collect();
            let t: BTreeSet<usize> = (0..next() % 40).map(|_| (next() % 64) as usize * 0x1000).collect();

            let q_regions: Vec<_> = q.iter().rev().map(|&s| MemoryRegion::new(s, 0x1000)).collect();
            let t_regions: Vec<_> = t.iter().map(|&s| MemoryRegion::new(s, 0x1000)).collect();

            let expected: Vec<usize> = q.difference(&t).copied().collect();
            assert_eq!(starts(&collect_new_regions(q_regions, t_regions)), expected);
        }
    }
}
