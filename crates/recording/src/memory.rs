//! In-Memory Recording

use crate::{Recording, RecordingError};
use ndarray::{s, Array2, ArrayView2};

/// Recording whose segments are fully held in memory
#[derive(Debug, Clone)]
pub struct InMemoryRecording {
    /// One samples x channels buffer per segment
    segments: Vec<Array2<f32>>,
    /// Channels x spatial dimensions
    locations: Array2<f64>,
    /// Sampling frequency (Hz)
    sampling_frequency: f64,
}

impl InMemoryRecording {
    /// Create a recording from per-segment traces and channel locations
    pub fn new(
        segments: Vec<Array2<f32>>,
        locations: Array2<f64>,
        sampling_frequency: f64,
    ) -> Result<Self, RecordingError> {
        if !(sampling_frequency.is_finite() && sampling_frequency > 0.0) {
            return Err(RecordingError::ShapeMismatch(format!(
                "sampling frequency must be positive, got {}",
                sampling_frequency
            )));
        }

        let num_channels = locations.nrows();
        if let Some((index, segment)) = segments
            .iter()
            .enumerate()
            .find(|(_, traces)| traces.ncols() != num_channels)
        {
            return Err(RecordingError::ShapeMismatch(format!(
                "segment {} has {} channels, locations describe {}",
                index,
                segment.ncols(),
                num_channels
            )));
        }

        Ok(Self {
            segments,
            locations,
            sampling_frequency,
        })
    }

    /// Single-segment convenience constructor
    pub fn single_segment(
        traces: Array2<f32>,
        locations: Array2<f64>,
        sampling_frequency: f64,
    ) -> Result<Self, RecordingError> {
        Self::new(vec![traces], locations, sampling_frequency)
    }

    fn segment(&self, segment: usize) -> Result<&Array2<f32>, RecordingError> {
        self.segments
            .get(segment)
            .ok_or(RecordingError::SegmentOutOfRange {
                segment,
                num_segments: self.segments.len(),
            })
    }
}

impl Recording for InMemoryRecording {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn num_channels(&self) -> usize {
        self.locations.nrows()
    }

    fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn num_samples(&self, segment: usize) -> usize {
        self.segments.get(segment).map_or(0, |traces| traces.nrows())
    }

    fn channel_locations(&self) -> ArrayView2<'_, f64> {
        self.locations.view()
    }

    fn read_traces(
        &self,
        segment: usize,
        start: usize,
        end: usize,
    ) -> Result<Array2<f32>, RecordingError> {
        let traces = self.segment(segment)?;
        if start > end || end > traces.nrows() {
            return Err(RecordingError::InvalidRange {
                segment,
                start,
                end,
                num_samples: traces.nrows(),
            });
        }
        Ok(traces.slice(s![start..end, ..]).to_owned())
    }
}
