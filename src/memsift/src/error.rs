//! Error types for the prefilter engine.

use thiserror::Error;

/// Invalid prefilter configuration, reported before any scan starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("{regime} chunk budget must be greater than zero")]
    ZeroBudget { regime: &'static str },

    #[error("{regime} update interval must be greater than zero")]
    ZeroInterval { regime: &'static str },

    #[error("parallelism must be greater than zero")]
    ZeroParallelism,

    #[error("maximum scalar width must be greater than zero")]
    ZeroScalarWidth,

    #[error("minimum change count must be greater than zero")]
    ZeroMinChanges,
}

/// A failed read of target process memory.
///
/// Every variant means the same thing to the engine: the region is no longer
/// valid. The variants exist so callers can tell a short read from a fault.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("address range {address:#x}+{size:#x} is not mapped")]
    Unmapped { address: usize, size: usize },

    #[error("short read at {address:#x}: expected {expected} bytes, got {actual}")]
    Short {
        address: usize,
        expected: usize,
        actual: usize,
    },

    #[error("failed to read {size} bytes at {address:#x}: {source}")]
    Os {
        address: usize,
        size: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the process/region plumbing around the engine.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read memory map {path}: {source}")]
    Maps {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to attach to process {pid}: {source}")]
    Attach {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("no running process matches {0:?}")]
    ProcessNotFound(String),

    #[error("target process has detached")]
    Detached,
}

/// Errors surfaced by [`crate::Prefilter`] operations.
#[derive(Debug, Error)]
pub enum PrefilterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("scan has not been started")]
    NotStarted,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(std::io::Error),
}
