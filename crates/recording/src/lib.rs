//! Multichannel Recording Interface
//!
//! Describes the chunk-addressable recording consumed by the feature
//! extractor, the detected peak records, and a simple in-memory recording.

mod memory;

pub use memory::InMemoryRecording;

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading a recording
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Segment {segment} does not exist (recording has {num_segments})")]
    SegmentOutOfRange { segment: usize, num_segments: usize },

    #[error("Sample range {start}..{end} is invalid for segment {segment} of {num_samples} samples")]
    InvalidRange {
        segment: usize,
        start: usize,
        end: usize,
        num_samples: usize,
    },

    #[error("Margin of {margin} samples around {len} samples does not fit in memory")]
    MarginTooLarge { margin: usize, len: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// One detected event
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Segment the peak belongs to
    pub segment: usize,
    /// Sample index, absolute within its segment
    pub sample: usize,
    /// Channel the detector attributed the peak to
    pub channel: usize,
    /// Amplitude measured at detection time
    pub amplitude: f32,
}

impl Peak {
    pub fn new(segment: usize, sample: usize, channel: usize, amplitude: f32) -> Self {
        Self {
            segment,
            sample,
            channel,
            amplitude,
        }
    }

    /// Sort key used for binary-search slicing
    pub fn position(&self) -> (usize, usize) {
        (self.segment, self.sample)
    }
}

/// Traces read around a chunk, plus the margins actually applied
#[derive(Debug, Clone)]
pub struct TraceChunk {
    /// Samples x channels
    pub traces: Array2<f32>,
    pub left_margin: usize,
    pub right_margin: usize,
}

/// Chunk-addressable multichannel recording
pub trait Recording: Send + Sync {
    /// Sampling frequency in Hz
    fn sampling_frequency(&self) -> f64;

    fn num_channels(&self) -> usize;

    fn num_segments(&self) -> usize;

    /// Number of samples in `segment`
    fn num_samples(&self, segment: usize) -> usize;

    /// Channel positions, channels x spatial dimensions (2 or 3)
    fn channel_locations(&self) -> ArrayView2<'_, f64>;

    /// Read `start..end` of `segment` as samples x channels
    fn read_traces(
        &self,
        segment: usize,
        start: usize,
        end: usize,
    ) -> Result<Array2<f32>, RecordingError>;

    /// Pairwise Euclidean distances between channels
    fn channel_distances(&self) -> Array2<f64> {
        channel_distances(self.channel_locations())
    }

    /// Read `start..end` extended by `margin` on both sides.
    ///
    /// The returned buffer always holds `end - start + 2 * margin` rows.
    /// Rows falling before the segment start or past its end are zero.
    fn read_with_margin(
        &self,
        segment: usize,
        start: usize,
        end: usize,
        margin: usize,
    ) -> Result<TraceChunk, RecordingError> {
        let num_samples = self.num_samples(segment);
        if start > end || end > num_samples {
            return Err(RecordingError::InvalidRange {
                segment,
                start,
                end,
                num_samples,
            });
        }

        let total = margin
            .checked_mul(2)
            .and_then(|padding| padding.checked_add(end - start))
            .ok_or(RecordingError::MarginTooLarge {
                margin,
                len: end - start,
            })?;

        let read_start = start.saturating_sub(margin);
        let read_end = end.saturating_add(margin).min(num_samples);
        let available = self.read_traces(segment, read_start, read_end)?;

        let mut traces = Array2::<f32>::zeros((total, self.num_channels()));
        // Offset of `read_start` inside the padded buffer
        let offset = margin - (start - read_start);
        traces
            .slice_mut(s![offset..offset + available.nrows(), ..])
            .assign(&available);

        Ok(TraceChunk {
            traces,
            left_margin: margin,
            right_margin: margin,
        })
    }
}

/// Pairwise Euclidean distance matrix for channel positions
pub fn channel_distances(locations: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = locations.nrows();
    let mut distances = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = locations
                .row(i)
                .iter()
                .zip(locations.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}
