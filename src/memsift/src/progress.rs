//! Progress reporting for scans.

use serde::Serialize;

/// Fraction of the tracked chunks that carry a checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(processed: usize, total: usize) -> Self {
        Self { processed, total }
    }

    /// Completion in `[0.0, 1.0]`. An empty pool reports zero.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    /// Every tracked chunk has been checksummed at least once.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.processed >= self.total
    }
}

/// Observer for scan telemetry. Nothing in the engine depends on it.
pub trait ProgressSink: Send + Sync {
    /// Called after every pass.
    fn progress(&self, progress: Progress);

    /// Called with the byte size of each assembled result snapshot.
    fn result_size(&self, bytes: u64);
}

/// Sink that forwards telemetry to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, progress: Progress) {
        tracing::debug!(
            processed = progress.processed,
            total = progress.total,
            "prefilter progress {:.1}%",
            progress.fraction() * 100.0
        );
    }

    fn result_size(&self, bytes: u64) {
        tracing::info!(bytes, "filtered snapshot holds {} KB", bytes / 1024);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress::new(1, 4).fraction(), 0.25);
        assert_eq!(Progress::default().fraction(), 0.0);
    }

    #[test]
    fn test_empty_pool_is_not_complete() {
        assert!(!Progress::new(0, 0).is_complete());
        assert!(!Progress::new(3, 4).is_complete());
        assert!(Progress::new(4, 4).is_complete());
    }
}
