//! Chunk fingerprints.
//!
//! Adler-32 is cheap enough to run over every tracked chunk on each pass and
//! any single-byte edit changes its low sum. Collisions only postpone
//! detection to a later pass.

/// Checksum of a whole buffer.
pub fn checksum(bytes: &[u8]) -> u32 {
    adler::adler32_slice(bytes)
}

/// Checksum of `bytes[start..end]`, with the range clamped to the buffer.
pub fn checksum_range(bytes: &[u8], start: usize, end: usize) -> u32 {
    let end = end.min(bytes.len());
    let start = start.min(end);
    checksum(&bytes[start..end])
}
