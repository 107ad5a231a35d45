//! Explicit chunk-tree filter scan

use super::attach;
use crate::cli::Target;
use crate::output::{print_snapshot, progress_style};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use memsift::{ChunkTreeFilter, FilterConfig, Prefilter, RegionFilter, TickReport};
use std::sync::Arc;

pub fn handle(
    target: &Target,
    config: FilterConfig,
    regions: RegionFilter,
    passes: usize,
    json: bool,
) -> Result<()> {
    if passes < 2 {
        bail!("At least 2 passes are needed; the first one only records checksums");
    }

    let process = Arc::new(attach(target, regions)?);
    let filter = ChunkTreeFilter::new(process, config).context("Invalid filter settings")?;

    let pb = ProgressBar::new(passes as u64);
    pb.set_style(progress_style());
    let reports = run_passes(&filter, passes, &pb)?;
    pb.finish_and_clear();

    let changed: usize = reports.iter().map(|r| r.changed).sum();
    tracing::info!(passes, changed, "filter scan complete");

    let snapshot = filter.collect_results()?;
    print_snapshot(&snapshot, json)
}

/// Begin a scan and run `passes` passes, waiting the filter's interval
/// between them.
fn run_passes(filter: &dyn Prefilter, passes: usize, pb: &ProgressBar) -> Result<Vec<TickReport>> {
    filter.begin_scan().context("Failed to start scan")?;

    let mut reports = Vec::with_capacity(passes);
    for pass in 0..passes {
        if pass > 0 {
            std::thread::sleep(filter.update_interval());
        }
        let report = filter.update_scan()?;
        pb.inc(1);
        pb.set_message(format!("{} chunks changed", report.changed));
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memsift::{MemoryRegion, MemorySource, ReadError, SourceError};
    use std::sync::Mutex;

    const BASE: usize = 0x10_0000;

    /// Target whose first byte flips on every read.
    struct Flipping {
        data: Mutex<Vec<u8>>,
    }

    impl MemorySource for Flipping {
        fn read_bytes(&self, address: usize, size: usize) -> Result<Vec<u8>, ReadError> {
            let mut data = self.data.lock().unwrap();
            let offset = address - BASE;
            let bytes = data
                .get(offset..offset + size)
                .ok_or(ReadError::Unmapped { address, size })?
                .to_vec();
            if offset == 0 {
                data[0] = data[0].wrapping_add(1);
            }
            Ok(bytes)
        }

        fn query_regions(&self) -> Result<Vec<MemoryRegion>, SourceError> {
            let len = self.data.lock().unwrap().len();
            Ok(vec![MemoryRegion::new(BASE, len)])
        }

        fn pid(&self) -> Option<u32> {
            None
        }
    }

    #[test]
    fn test_run_passes_finds_changing_chunk() {
        let source = Arc::new(Flipping {
            data: Mutex::new(vec![0; 0x3000]),
        });
        let filter = ChunkTreeFilter::new(
            source,
            FilterConfig {
                interval_ms: 1,
                parallelism: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let pb = ProgressBar::hidden();
        let reports = run_passes(&filter, 3, &pb).unwrap();
        assert_eq!(pb.position(), 3);
        assert_eq!(reports.iter().map(|r| r.changed).collect::<Vec<_>>(), [0, 1, 1]);

        let snapshot = filter.collect_results().unwrap();
        assert_eq!(snapshot.regions(), &[MemoryRegion::new(BASE, 0x1007)]);
    }
}
