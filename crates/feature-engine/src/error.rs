//! Feature Extraction Error Types

use crate::params::{AggregationMode, FeatureKind};
use chunk_executor::{ChunkBounds, ExecutorError};
use recording::RecordingError;
use thiserror::Error;

/// Errors raised while computing features for one chunk
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Peak window does not fit inside the loaded traces
    #[error("Window -{nbefore}/+{nafter} around sample {sample} exceeds {len} loaded samples")]
    WindowOutOfBounds {
        sample: usize,
        nbefore: usize,
        nafter: usize,
        len: usize,
    },

    /// Peak attributed to a channel the recording does not have
    #[error("Peak channel {channel} is out of range ({num_channels} channels)")]
    ChannelOutOfRange { channel: usize, num_channels: usize },

    /// Channel with no neighbor in its sparsity mask
    #[error("Channel {0} has an empty neighborhood")]
    EmptyNeighborhood(usize),

    /// Peak-to-peak values over the neighborhood sum to zero
    #[error("Center of mass undefined for peak {peak} on channel {channel}: peak-to-peak sum is zero")]
    DegenerateCenterOfMass { peak: usize, channel: usize },

    /// Distance to center of mass requested before it was computed
    #[error("Center of mass columns have not been computed")]
    MissingCenterOfMass,

    /// Feature has no form in the configured aggregation mode
    #[error("Feature '{feature}' cannot be computed in {mode} mode")]
    UnsupportedInMode {
        feature: FeatureKind,
        mode: AggregationMode,
    },

    #[error("Recording read failed: {0}")]
    Recording(#[from] RecordingError),
}

/// Errors surfaced by feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Feature name unknown or not supported by the aggregation mode
    #[error("Unknown feature '{name}' for {mode} aggregation")]
    UnknownFeature { name: String, mode: AggregationMode },

    /// Feature requested without its prerequisite
    #[error("Feature '{feature}' requires '{requires}' in the same request")]
    MissingDependency {
        feature: FeatureKind,
        requires: FeatureKind,
    },

    /// Neighbor radius not usable for a sparsity mask
    #[error("Invalid neighbor radius {0} um: must be positive and finite")]
    InvalidRadius(f64),

    #[error("Feature '{0}' requested more than once")]
    DuplicateFeature(FeatureKind),

    #[error("No features requested")]
    EmptyFeatureList,

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid smoothing: {0}")]
    InvalidSmoothing(String),

    /// Peaks are not sorted by (segment, sample)
    #[error("Peaks are not sorted by (segment, sample) at index {0}")]
    UnsortedPeaks(usize),

    #[error("Peak {index} is out of range: {reason}")]
    PeakOutOfRange { index: usize, reason: String },

    /// Failure inside one chunk; aborts the run
    #[error("Chunk {bounds} failed: {source}")]
    ChunkWorker {
        bounds: ChunkBounds,
        #[source]
        source: ComputeError,
    },

    #[error("Chunk executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Failed to assemble chunk outputs: {0}")]
    Assembly(#[from] ndarray::ShapeError),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl From<chunk_executor::ChunkFailure<ComputeError>> for FeatureError {
    fn from(failure: chunk_executor::ChunkFailure<ComputeError>) -> Self {
        FeatureError::ChunkWorker {
            bounds: failure.bounds,
            source: failure.source,
        }
    }
}
