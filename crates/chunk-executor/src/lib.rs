//! Chunked Parallel Execution
//!
//! Splits every recording segment into contiguous sample ranges and runs a
//! per-chunk function over them on a rayon thread pool, returning the
//! outputs in chunk order.

mod executor;

pub use executor::{chunk_bounds, ChunkBounds, ChunkExecutor, ChunkFailure, JobConfig};

use thiserror::Error;

/// Errors building or configuring the executor
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Chunk size must be positive")]
    InvalidChunkSize,
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}
