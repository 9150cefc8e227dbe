//! Chunked Extraction Driver
//!
//! Splits the recording into chunks, reads each chunk with enough margin for
//! the widest feature window, rebases the chunk's peaks onto the loaded buffer
//! and stitches per-chunk feature tensors back together in peak order.

use crate::error::{ComputeError, FeatureError};
use crate::features::{compute_features, FeatureTensor};
use crate::params::{FeatureRequest, ResolvedConfig};
use chunk_executor::{ChunkBounds, ChunkExecutor, JobConfig};
use recording::{Peak, Recording};
use tracing::{debug, info};

/// Feature extractor bound to one recording and one resolved request
pub struct PeakFeatureExtractor<'a, R: Recording + ?Sized> {
    recording: &'a R,
    config: ResolvedConfig,
    executor: ChunkExecutor,
}

impl<'a, R: Recording + ?Sized> PeakFeatureExtractor<'a, R> {
    /// Resolve `request` and build the worker pool.
    ///
    /// Every configuration error surfaces here, before any chunk is read.
    pub fn new(
        recording: &'a R,
        request: &FeatureRequest,
        job: JobConfig,
    ) -> Result<Self, FeatureError> {
        let config = ResolvedConfig::resolve(request, recording)?;
        let executor = ChunkExecutor::new(job)?;
        Ok(Self {
            recording,
            config,
            executor,
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Compute features for `peaks`, sorted by (segment, sample).
    ///
    /// Row `i` of the result belongs to `peaks[i]` whatever the chunking.
    pub fn extract(&self, peaks: &[Peak]) -> Result<FeatureTensor, FeatureError> {
        validate_peaks(self.recording, peaks)?;

        let segment_lengths: Vec<usize> = (0..self.recording.num_segments())
            .map(|segment| self.recording.num_samples(segment))
            .collect();
        let chunks = self.executor.plan(&segment_lengths);

        info!(
            "Extracting features for {} peaks over {} chunks (margin {} samples)",
            peaks.len(),
            chunks.len(),
            self.config.margin()
        );

        let parts = self.executor.run(&chunks, ChunkWorker::default, |worker, bounds| {
            worker.process(self.recording, &self.config, peaks, bounds)
        })?;

        let output = FeatureTensor::concatenate(&self.config, &parts)?;
        debug_assert_eq!(output.num_peaks(), peaks.len());

        info!("Feature extraction complete: output shape {:?}", output.shape());
        Ok(output)
    }
}

/// Resolve `request`, run it over `recording` and return the feature tensor
pub fn compute_features_from_peaks<R: Recording + ?Sized>(
    recording: &R,
    peaks: &[Peak],
    request: &FeatureRequest,
    job: JobConfig,
) -> Result<FeatureTensor, FeatureError> {
    PeakFeatureExtractor::new(recording, request, job)?.extract(peaks)
}

/// Per-thread state reused across the chunks one worker handles
#[derive(Debug, Default)]
struct ChunkWorker {
    rebased: Vec<Peak>,
}

impl ChunkWorker {
    fn process<R: Recording + ?Sized>(
        &mut self,
        recording: &R,
        config: &ResolvedConfig,
        peaks: &[Peak],
        bounds: &ChunkBounds,
    ) -> Result<FeatureTensor, ComputeError> {
        let local = peaks_in_chunk(peaks, bounds);
        if local.is_empty() {
            return Ok(FeatureTensor::zeros(config, 0));
        }

        let chunk = recording.read_with_margin(
            bounds.segment,
            bounds.start,
            bounds.end,
            config.margin(),
        )?;

        self.rebased.clear();
        self.rebased.extend(local.iter().map(|peak| Peak {
            sample: peak.sample - bounds.start + chunk.left_margin,
            ..*peak
        }));

        debug!("Chunk {}: {} peaks", bounds, local.len());
        compute_features(chunk.traces.view(), &self.rebased, config)
    }
}

/// Peaks with `(segment, sample)` inside the chunk, by binary search
pub fn peaks_in_chunk<'p>(peaks: &'p [Peak], bounds: &ChunkBounds) -> &'p [Peak] {
    let lo = peaks.partition_point(|peak| peak.position() < (bounds.segment, bounds.start));
    let hi = peaks.partition_point(|peak| peak.position() < (bounds.segment, bounds.end));
    &peaks[lo..hi]
}

fn validate_peaks<R: Recording + ?Sized>(
    recording: &R,
    peaks: &[Peak],
) -> Result<(), FeatureError> {
    if let Some(index) =
        (1..peaks.len()).find(|&i| peaks[i].position() < peaks[i - 1].position())
    {
        return Err(FeatureError::UnsortedPeaks(index));
    }

    let num_segments = recording.num_segments();
    let num_channels = recording.num_channels();
    for (index, peak) in peaks.iter().enumerate() {
        let reason = if peak.segment >= num_segments {
            format!("segment {} of {}", peak.segment, num_segments)
        } else if peak.sample >= recording.num_samples(peak.segment) {
            format!(
                "sample {} past the end of segment {} ({} samples)",
                peak.sample,
                peak.segment,
                recording.num_samples(peak.segment)
            )
        } else if peak.channel >= num_channels {
            format!("channel {} of {}", peak.channel, num_channels)
        } else {
            continue;
        };
        return Err(FeatureError::PeakOutOfRange { index, reason });
    }
    Ok(())
}
