//! Peak Window Extraction and Reductions

use crate::error::ComputeError;
use crate::params::{PeakSign, SampleWindow};
use crate::smoothing::{smooth_windows, TraceFilter};
use ndarray::{s, Array3, ArrayView1, ArrayView2, Axis};
use recording::Peak;
use std::collections::BTreeMap;

/// Cut `traces[sample - nbefore .. sample + nafter, :]` for every peak.
///
/// Returns peaks x time x channels. Peak samples are relative to `traces`.
pub fn extract_windows(
    traces: ArrayView2<'_, f32>,
    peaks: &[Peak],
    window: SampleWindow,
    smoothing: Option<&dyn TraceFilter>,
) -> Result<Array3<f32>, ComputeError> {
    let len = traces.nrows();
    let mut windows = Array3::<f32>::zeros((peaks.len(), window.width(), traces.ncols()));

    for (peak, mut slot) in peaks.iter().zip(windows.outer_iter_mut()) {
        if peak.sample < window.nbefore || peak.sample + window.nafter > len {
            return Err(ComputeError::WindowOutOfBounds {
                sample: peak.sample,
                nbefore: window.nbefore,
                nafter: window.nafter,
                len,
            });
        }
        let start = peak.sample - window.nbefore;
        slot.assign(&traces.slice(s![start..start + window.width(), ..]));
    }

    if let Some(filter) = smoothing {
        smooth_windows(filter, &mut windows);
    }
    Ok(windows)
}

/// Reduce values to the extremum selected by `sign`
pub fn signed_extremum<'a>(values: impl IntoIterator<Item = &'a f32>, sign: PeakSign) -> f32 {
    let values = values.into_iter().copied();
    match sign {
        PeakSign::Neg => values.fold(f32::INFINITY, f32::min),
        PeakSign::Pos => values.fold(f32::NEG_INFINITY, f32::max),
        PeakSign::Both => values.map(f32::abs).fold(f32::NEG_INFINITY, f32::max),
    }
}

/// Max minus min of a trace
pub fn peak_to_peak(trace: ArrayView1<'_, f32>) -> f32 {
    let (min, max) = trace
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    max - min
}

/// Peak-to-peak for every channel of a time x channels window
pub fn channel_ptps(window: ArrayView2<'_, f32>) -> Vec<f32> {
    window.axis_iter(Axis(1)).map(peak_to_peak).collect()
}

/// Peaks of one chunk grouped by the channel they are attributed to.
///
/// Built at most once per chunk call and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct ChannelGroups {
    groups: BTreeMap<usize, Vec<usize>>,
}

impl ChannelGroups {
    pub fn new(peaks: &[Peak]) -> Self {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, peak) in peaks.iter().enumerate() {
            groups.entry(peak.channel).or_default().push(index);
        }
        Self { groups }
    }

    /// `(channel, peak indices)` in ascending channel order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.groups
            .iter()
            .map(|(&channel, indices)| (channel, indices.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
