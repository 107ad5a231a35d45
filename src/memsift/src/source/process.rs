//! Live Process Memory Source
//!
//! Memory source implementation for reading from a live process.

use super::maps::{read_maps, MapsEntry, RegionFilter};
use super::MemorySource;
use crate::error::{ReadError, SourceError};
use crate::region::MemoryRegion;

#[cfg(not(target_os = "linux"))]
use process_memory::CopyAddress;
use process_memory::{ProcessHandle, TryIntoProcessHandle};
use std::path::PathBuf;
use sysinfo::System;

/// An attached target process
pub struct LiveProcess {
    pub pid: u32,
    pub handle: ProcessHandle,
    pub exe_path: PathBuf,
    filter: RegionFilter,
}

// SAFETY: the handle is a pid (Linux) or a process-wide HANDLE (Windows),
// both usable from any thread.
unsafe impl Send for LiveProcess {}
unsafe impl Sync for LiveProcess {}

impl MemorySource for LiveProcess {
    fn read_bytes(&self, address: usize, size: usize) -> Result<Vec<u8>, ReadError> {
        let mut buffer = vec![0u8; size];
        let read = self
            .read_into(address, &mut buffer)
            .map_err(|source| ReadError::Os {
                address,
                size,
                source,
            })?;
        if read != size {
            return Err(ReadError::Short {
                address,
                expected: size,
                actual: read,
            });
        }
        Ok(buffer)
    }

    fn query_regions(&self) -> Result<Vec<MemoryRegion>, SourceError> {
        Ok(self.filter.apply(&self.maps()?))
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

impl LiveProcess {
    /// Copy target memory into `buffer`, returning how many bytes arrived.
    /// A read running off the end of a mapping stops there.
    #[cfg(target_os = "linux")]
    fn read_into(&self, address: usize, buffer: &mut [u8]) -> std::io::Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr().cast(),
            iov_len: buffer.len(),
        };
        let remote = libc::iovec {
            iov_base: address as *mut libc::c_void,
            iov_len: buffer.len(),
        };
        // SAFETY: `local` covers exactly `buffer`, which outlives the call;
        // the remote range is only read, and the kernel validates it.
        let read =
            unsafe { libc::process_vm_readv(self.pid as libc::pid_t, &local, 1, &remote, 1, 0) };
        if read < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(read as usize)
    }

    #[cfg(not(target_os = "linux"))]
    fn read_into(&self, address: usize, buffer: &mut [u8]) -> std::io::Result<usize> {
        self.handle.copy_address(address, buffer)?;
        Ok(buffer.len())
    }

    /// Attach to a process by pid
    pub fn attach(pid: u32, filter: RegionFilter) -> Result<Self, SourceError> {
        let handle = (pid as process_memory::Pid)
            .try_into_process_handle()
            .map_err(|source| SourceError::Attach { pid, source })?;

        let exe_path = std::fs::read_link(format!("/proc/{}/exe", pid))
            .unwrap_or_else(|_| PathBuf::from("unknown"));

        tracing::info!(pid, exe = %exe_path.display(), "attached to process");

        Ok(LiveProcess {
            pid,
            handle,
            exe_path,
            filter,
        })
    }

    /// Attach to the best process matching `name`
    pub fn attach_by_name(name: &str, filter: RegionFilter) -> Result<Self, SourceError> {
        Self::attach(find_process(name)?, filter)
    }

    pub fn filter(&self) -> RegionFilter {
        self.filter
    }

    /// Every mapping of the process, unfiltered
    pub fn maps(&self) -> Result<Vec<MapsEntry>, SourceError> {
        read_maps(&PathBuf::from(format!("/proc/{}/maps", self.pid)))
    }

    /// Get process info summary
    pub fn info(&self) -> String {
        let (count, bytes) = match self.query_regions() {
            Ok(regions) => (
                regions.len(),
                regions.iter().map(|r| r.size() as u64).sum::<u64>(),
            ),
            Err(_) => (0, 0),
        };

        format!(
            "PID: {}\nExecutable: {}\nScannable Regions: {} ({} MB)",
            self.pid,
            self.exe_path.display(),
            count,
            bytes / 1_000_000
        )
    }
}

/// Find a running process by name, preferring the one using the most memory.
///
/// Threads and Wine/Proton helper processes share the name; candidates are
/// folded onto their thread group id.
pub fn find_process(name: &str) -> Result<u32, SourceError> {
    let mut system = System::new_all();
    system.refresh_all();

    let needle = name.to_lowercase();
    let mut candidates: Vec<(u32, u64)> = Vec::new();

    for process in system.processes().values() {
        let pid = process.pid().as_u32();
        let process_name = process.name().to_string_lossy().to_lowercase();

        let cmdline_match = std::fs::read_to_string(format!("/proc/{}/cmdline", pid))
            .map(|cmdline| cmdline.to_lowercase().contains(&needle))
            .unwrap_or(false);

        if process_name.contains(&needle) || cmdline_match {
            let tgid = get_tgid(pid).unwrap_or(pid);
            candidates.push((tgid, process.memory()));
        }
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.dedup_by(|a, b| a.0 == b.0);

    match candidates.first() {
        Some(&(pid, memory)) => {
            tracing::info!(pid, memory_mb = memory / 1_000_000, "found process {:?}", name);
            Ok(pid)
        }
        None => Err(SourceError::ProcessNotFound(name.to_string())),
    }
}

/// Get the thread group ID (main process) for a given PID/TID
pub fn get_tgid(pid: u32) -> Option<u32> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    for line in status.lines() {
        if line.starts_with("Tgid:") {
            return line.split_whitespace().nth(1)?.parse().ok();
        }
    }
    None
}
