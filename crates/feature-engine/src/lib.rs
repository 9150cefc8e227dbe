//! Peak Waveform Feature Extraction
//!
//! Computes per-peak waveform features (amplitude, peak-to-peak, local
//! energy, center of mass and its distance to the strongest channel) from a
//! multichannel recording, processing the recording in parallel chunks.

mod dispatcher;
mod error;
mod features;
mod params;
mod settings;
mod smoothing;
mod sparsity;
mod telemetry;
mod windows;

pub use dispatcher::{compute_features_from_peaks, peaks_in_chunk, PeakFeatureExtractor};
pub use error::{ComputeError, FeatureError};
pub use features::{compute_features, neighborhood_energy, weighted_centroid, FeatureTensor};
pub use params::{
    ms_to_samples, AggregationMode, FeatureKind, FeatureParams, FeatureRequest, FeatureSpec,
    PeakSign, ResolvedConfig, ResolvedFeature, SampleWindow, UnknownFeatureName, DEFAULT_RADIUS_UM,
};
pub use settings::{ExtractionSettings, ENV_PREFIX};
pub use smoothing::{MedianSmoother, SavitzkyGolay, SmoothingConfig, TraceFilter};
pub use sparsity::SparsityMask;
pub use telemetry::{init_json_logging, init_logging};
pub use windows::{extract_windows, peak_to_peak, signed_extremum};

pub use chunk_executor::JobConfig;
pub use recording::{InMemoryRecording, Peak, Recording};
