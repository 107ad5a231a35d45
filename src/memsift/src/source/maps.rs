//! Memory map parsing
//!
//! Entries from /proc/pid/maps and the filter deciding which of them a scan
//! should look at.

use crate::error::SourceError;
use crate::region::MemoryRegion;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

/// A memory region from /proc/pid/maps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapsEntry {
    pub start: usize,
    pub end: usize,
    pub perms: String,
    pub offset: usize,
    pub path: Option<String>,
}

impl MapsEntry {
    pub fn region(&self) -> MemoryRegion {
        MemoryRegion {
            start: self.start,
            end: self.end,
        }
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn is_readable(&self) -> bool {
        self.perms.starts_with('r')
    }

    pub fn is_writable(&self) -> bool {
        self.perms.chars().nth(1) == Some('w')
    }

    pub fn is_executable(&self) -> bool {
        self.perms.chars().nth(2) == Some('x')
    }

    /// Backed by a file on disk rather than anonymous memory or a
    /// `[heap]`/`[stack]` style pseudo-path.
    pub fn is_file_backed(&self) -> bool {
        self.path.as_deref().is_some_and(|p| p.starts_with('/'))
    }

    /// Kernel-provided pages that fault or hang when read through
    /// process_vm_readv.
    pub fn is_kernel_special(&self) -> bool {
        matches!(self.path.as_deref(), Some("[vvar]" | "[vsyscall]" | "[vvar_vclock]"))
    }
}

/// Parse one line of /proc/pid/maps.
pub fn parse_maps_line(line: &str) -> Option<MapsEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (start, end) = parts.first()?.split_once('-')?;

    let start = usize::from_str_radix(start, 16).ok()?;
    let end = usize::from_str_radix(end, 16).ok()?;
    if end <= start {
        return None;
    }

    let perms = parts.get(1).unwrap_or(&"").to_string();
    let offset = parts
        .get(2)
        .and_then(|s| usize::from_str_radix(s, 16).ok())
        .unwrap_or(0);
    // Paths may contain spaces
    let path = (parts.len() > 5).then(|| parts[5..].join(" "));

    Some(MapsEntry {
        start,
        end,
        perms,
        offset,
        path,
    })
}

/// Read and parse a maps file. A vanished file means the process exited.
pub fn read_maps(path: &Path) -> Result<Vec<MapsEntry>, SourceError> {
    let maps_error = |source: std::io::Error| {
        if source.kind() == ErrorKind::NotFound {
            SourceError::Detached
        } else {
            SourceError::Maps {
                path: path.display().to_string(),
                source,
            }
        }
    };

    let file = File::open(path).map_err(maps_error)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(maps_error)?;
        if let Some(entry) = parse_maps_line(&line) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Which mapped regions are worth scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFilter {
    /// Only keep writable regions (values a program mutates live there).
    pub writable_only: bool,
    pub include_executable: bool,
    /// Keep regions mapped from files on disk.
    pub include_file_backed: bool,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            writable_only: true,
            include_executable: false,
            include_file_backed: true,
        }
    }
}

impl RegionFilter {
    pub fn accepts(&self, entry: &MapsEntry) -> bool {
        if !entry.is_readable() || entry.is_kernel_special() {
            return false;
        }
        if self.writable_only && !entry.is_writable() {
            return false;
        }
        if !self.include_executable && entry.is_executable() {
            return false;
        }
        if !self.include_file_backed && entry.is_file_backed() {
            return false;
        }
        true
    }

    /// Filtered regions, in address order.
    pub fn apply(&self, entries: &[MapsEntry]) -> Vec<MemoryRegion> {
        let mut regions: Vec<_> = entries
            .iter()
            .filter(|e| self.accepts(e))
            .map(MapsEntry::region)
            .collect();
        regions.sort_unstable_by_key(|r| r.start);
        regions
    }
}
