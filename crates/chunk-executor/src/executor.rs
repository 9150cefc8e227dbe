//! Chunk Executor Implementation

use crate::ExecutorError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default chunk length in samples
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Configuration for chunked execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Samples per chunk
    pub chunk_size: usize,
    /// Worker threads (0 = one per logical core)
    pub n_jobs: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            n_jobs: 0,
        }
    }
}

impl JobConfig {
    /// Single-threaded config with the given chunk size
    pub fn sequential(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            n_jobs: 1,
        }
    }
}

/// Contiguous sample range of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBounds {
    /// Position of the chunk in the global chunk order
    pub index: usize,
    pub segment: usize,
    pub start: usize,
    pub end: usize,
}

impl ChunkBounds {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ChunkBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} (segment {}, samples {}..{})",
            self.index, self.segment, self.start, self.end
        )
    }
}

/// Failure inside one chunk, tagged with the chunk it came from
#[derive(Debug, Error)]
#[error("chunk {bounds} failed: {source}")]
pub struct ChunkFailure<E: std::error::Error + 'static> {
    pub bounds: ChunkBounds,
    #[source]
    pub source: E,
}

/// Split each segment into `chunk_size` ranges, segments in order
pub fn chunk_bounds(segment_lengths: &[usize], chunk_size: usize) -> Vec<ChunkBounds> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    for (segment, &num_samples) in segment_lengths.iter().enumerate() {
        let mut start = 0;
        while start < num_samples {
            let end = (start + chunk_size).min(num_samples);
            chunks.push(ChunkBounds {
                index: chunks.len(),
                segment,
                start,
                end,
            });
            start = end;
        }
    }
    chunks
}

/// Runs per-chunk work on a dedicated thread pool
pub struct ChunkExecutor {
    config: JobConfig,
    pool: rayon::ThreadPool,
}

impl ChunkExecutor {
    /// Create an executor and its worker pool
    pub fn new(config: JobConfig) -> Result<Self, ExecutorError> {
        if config.chunk_size == 0 {
            return Err(ExecutorError::InvalidChunkSize);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.n_jobs)
            .thread_name(|i| format!("chunk-worker-{}", i))
            .build()?;

        info!(
            "Creating chunk executor: chunk_size={}, threads={}",
            config.chunk_size,
            pool.current_num_threads()
        );

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Chunks covering segments of the given lengths
    pub fn plan(&self, segment_lengths: &[usize]) -> Vec<ChunkBounds> {
        chunk_bounds(segment_lengths, self.config.chunk_size)
    }

    /// Run `func` over every chunk.
    ///
    /// `init` builds a per-worker context, reused across the chunks that
    /// worker handles. Outputs come back ordered by chunk index.
    ///
    /// On failure the error of the lowest-index failing chunk is returned,
    /// whatever the thread count. Chunks after a known failure are skipped;
    /// chunks before it still run.
    pub fn run<S, T, E, I, F>(
        &self,
        chunks: &[ChunkBounds],
        init: I,
        func: F,
    ) -> Result<Vec<T>, ChunkFailure<E>>
    where
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, &ChunkBounds) -> Result<T, E> + Sync + Send,
        T: Send,
        E: std::error::Error + Send + 'static,
    {
        info!("Running {} chunks on {} threads", chunks.len(), self.num_threads());

        let first_failure = AtomicUsize::new(usize::MAX);
        let results: Vec<Result<(usize, T), ChunkFailure<E>>> = self.pool.install(|| {
            chunks
                .par_iter()
                .map_init(init, |context, bounds| {
                    if bounds.index > first_failure.load(Ordering::Relaxed) {
                        return None;
                    }
                    debug!("Processing chunk {}", bounds);
                    let result = func(context, bounds)
                        .map(|output| (bounds.index, output))
                        .map_err(|source| {
                            first_failure.fetch_min(bounds.index, Ordering::Relaxed);
                            ChunkFailure {
                                bounds: *bounds,
                                source,
                            }
                        });
                    Some(result)
                })
                .flatten()
                .collect()
        });

        let mut outputs = Vec::with_capacity(results.len());
        let mut failure: Option<ChunkFailure<E>> = None;
        for result in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    if failure
                        .as_ref()
                        .map_or(true, |seen| err.bounds.index < seen.bounds.index)
                    {
                        failure = Some(err);
                    }
                }
            }
        }
        if let Some(failure) = failure {
            warn!("Chunk {} failed: {}", failure.bounds, failure.source);
            return Err(failure);
        }

        outputs.sort_by_key(|(index, _)| *index);
        Ok(outputs.into_iter().map(|(_, output)| output).collect())
    }
}
