//! Per-Chunk Feature Computation

use crate::error::ComputeError;
use crate::params::{AggregationMode, FeatureKind, FeatureSpec, PeakSign, ResolvedConfig};
use crate::sparsity::SparsityMask;
use crate::windows::{channel_ptps, extract_windows, peak_to_peak, signed_extremum, ChannelGroups};
use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use recording::Peak;
use std::cell::OnceCell;
use tracing::debug;

/// Feature values for a run of peaks
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureTensor {
    /// peaks x columns
    PerPeak(Array2<f32>),
    /// peaks x channels x features
    PerChannel(Array3<f32>),
}

impl FeatureTensor {
    /// Zeroed tensor shaped for `num_peaks` rows of `config`
    pub fn zeros(config: &ResolvedConfig, num_peaks: usize) -> Self {
        match config.mode() {
            AggregationMode::PerPeak => {
                FeatureTensor::PerPeak(Array2::zeros((num_peaks, config.num_columns())))
            }
            AggregationMode::PerChannel => FeatureTensor::PerChannel(Array3::zeros((
                num_peaks,
                config.num_channels(),
                config.num_columns(),
            ))),
        }
    }

    pub fn num_peaks(&self) -> usize {
        match self {
            FeatureTensor::PerPeak(values) => values.nrows(),
            FeatureTensor::PerChannel(values) => values.len_of(Axis(0)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            FeatureTensor::PerPeak(values) => values.shape(),
            FeatureTensor::PerChannel(values) => values.shape(),
        }
    }

    pub fn as_per_peak(&self) -> Option<&Array2<f32>> {
        match self {
            FeatureTensor::PerPeak(values) => Some(values),
            FeatureTensor::PerChannel(_) => None,
        }
    }

    pub fn as_per_channel(&self) -> Option<&Array3<f32>> {
        match self {
            FeatureTensor::PerChannel(values) => Some(values),
            FeatureTensor::PerPeak(_) => None,
        }
    }

    /// Stack chunk outputs along the peak axis, in the given order
    pub fn concatenate(
        config: &ResolvedConfig,
        parts: &[FeatureTensor],
    ) -> Result<Self, ndarray::ShapeError> {
        match config.mode() {
            AggregationMode::PerPeak => {
                let mut views = Vec::with_capacity(parts.len() + 1);
                let empty = Array2::<f32>::zeros((0, config.num_columns()));
                views.push(empty.view());
                for part in parts {
                    views.push(part.as_per_peak().ok_or_else(incompatible)?.view());
                }
                Ok(FeatureTensor::PerPeak(concatenate(Axis(0), &views)?))
            }
            AggregationMode::PerChannel => {
                let mut views = Vec::with_capacity(parts.len() + 1);
                let empty = Array3::<f32>::zeros((0, config.num_channels(), config.num_columns()));
                views.push(empty.view());
                for part in parts {
                    views.push(part.as_per_channel().ok_or_else(incompatible)?.view());
                }
                Ok(FeatureTensor::PerChannel(concatenate(Axis(0), &views)?))
            }
        }
    }
}

fn incompatible() -> ndarray::ShapeError {
    ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape)
}

/// Compute every configured feature for the peaks of one chunk.
///
/// `peaks` carry sample indices relative to `traces`, which must already
/// include enough margin for every window. Rows follow `peaks` order.
pub fn compute_features(
    traces: ArrayView2<'_, f32>,
    peaks: &[Peak],
    config: &ResolvedConfig,
) -> Result<FeatureTensor, ComputeError> {
    let mut output = FeatureTensor::zeros(config, peaks.len());
    if peaks.is_empty() {
        return Ok(output);
    }

    let num_channels = config.num_channels();
    if let Some(peak) = peaks.iter().find(|p| p.channel >= num_channels) {
        return Err(ComputeError::ChannelOutOfRange {
            channel: peak.channel,
            num_channels,
        });
    }

    let shared = config
        .shared_window()
        .map(|window| extract_windows(traces, peaks, window, config.smoothing()))
        .transpose()?;
    let groups = OnceCell::new();
    let mut com_ready = false;

    for &index in config.compute_order() {
        let feature = &config.features()[index];
        let own;
        let windows = match &shared {
            Some(windows) => windows.view(),
            None => {
                own = extract_windows(traces, peaks, feature.spec.window(), config.smoothing())?;
                own.view()
            }
        };

        match &mut output {
            FeatureTensor::PerPeak(values) => {
                let column = feature.column;
                match &feature.spec {
                    FeatureSpec::Amplitude { peak_sign, .. } => {
                        let amplitudes = amplitude_per_peak(windows, peaks, *peak_sign);
                        values.column_mut(column).assign(&amplitudes);
                    }
                    FeatureSpec::Ptp { .. } => {
                        let ptps: Array1<f32> = windows
                            .outer_iter()
                            .map(|window| {
                                channel_ptps(window)
                                    .into_iter()
                                    .fold(f32::NEG_INFINITY, f32::max)
                            })
                            .collect();
                        values.column_mut(column).assign(&ptps);
                    }
                    FeatureSpec::Energy { sparsity, .. } => {
                        let groups = groups.get_or_init(|| ChannelGroups::new(peaks));
                        let energies = energy(windows, groups, sparsity)?;
                        values.column_mut(column).assign(&energies);
                    }
                    FeatureSpec::CenterOfMass { sparsity, .. } => {
                        let groups = groups.get_or_init(|| ChannelGroups::new(peaks));
                        let coms = center_of_mass(
                            windows,
                            groups,
                            sparsity,
                            config.channel_locations(),
                        )?;
                        values
                            .slice_mut(s![.., column..column + feature.width])
                            .assign(&coms);
                        com_ready = true;
                    }
                    FeatureSpec::DistComVsMaxPtpChannel { sparsity, .. } => {
                        let com_columns = config
                            .columns_of(FeatureKind::CenterOfMass)
                            .filter(|_| com_ready)
                            .ok_or(ComputeError::MissingCenterOfMass)?;
                        let groups = groups.get_or_init(|| ChannelGroups::new(peaks));
                        let distances = distance_to_com(
                            windows,
                            groups,
                            sparsity,
                            config.channel_locations(),
                            values.slice(s![.., com_columns]),
                        )?;
                        values.column_mut(column).assign(&distances);
                    }
                }
            }
            FeatureTensor::PerChannel(values) => {
                let slab = per_channel_slab(&feature.spec, windows, peaks)?;
                values.slice_mut(s![.., .., feature.column]).assign(&slab);
            }
        }
    }

    debug!(
        "Computed {} features for {} peaks",
        config.features().len(),
        peaks.len()
    );
    Ok(output)
}

/// Peaks x channels values of a feature in per-channel mode
fn per_channel_slab(
    spec: &FeatureSpec,
    windows: ArrayView3<'_, f32>,
    peaks: &[Peak],
) -> Result<Array2<f32>, ComputeError> {
    match spec {
        FeatureSpec::Amplitude { peak_sign, .. } => {
            Ok(amplitude_per_channel(windows, peaks, *peak_sign))
        }
        FeatureSpec::Ptp { .. } => {
            let (num_peaks, _, num_channels) = windows.dim();
            let mut ptps = Array2::<f32>::zeros((num_peaks, num_channels));
            for (window, mut row) in windows.outer_iter().zip(ptps.outer_iter_mut()) {
                row.assign(&Array1::from(channel_ptps(window)));
            }
            Ok(ptps)
        }
        other => Err(ComputeError::UnsupportedInMode {
            feature: other.kind(),
            mode: AggregationMode::PerChannel,
        }),
    }
}

/// One amplitude per peak, reduced over time and channels
fn amplitude_per_peak(
    windows: ArrayView3<'_, f32>,
    peaks: &[Peak],
    sign: PeakSign,
) -> Array1<f32> {
    if windows.len_of(Axis(1)) == 0 {
        return peaks.iter().map(|peak| peak.amplitude).collect();
    }
    windows
        .outer_iter()
        .map(|window| signed_extremum(window.iter(), sign))
        .collect()
}

/// One amplitude per peak and channel, reduced over time
fn amplitude_per_channel(
    windows: ArrayView3<'_, f32>,
    peaks: &[Peak],
    sign: PeakSign,
) -> Array2<f32> {
    let (num_peaks, width, num_channels) = windows.dim();
    if width == 0 {
        return Array2::from_shape_fn((num_peaks, num_channels), |(p, _)| peaks[p].amplitude);
    }
    Array2::from_shape_fn((num_peaks, num_channels), |(p, c)| {
        signed_extremum(windows.slice(s![p, .., c]).iter(), sign)
    })
}

fn neighbors_of(sparsity: &SparsityMask, channel: usize) -> Result<&[usize], ComputeError> {
    match sparsity.neighbors(channel) {
        Some([]) => Err(ComputeError::EmptyNeighborhood(channel)),
        Some(neighbors) => Ok(neighbors),
        None => Err(ComputeError::ChannelOutOfRange {
            channel,
            num_channels: sparsity.num_channels(),
        }),
    }
}

/// Norm of the window over a channel's neighbors, over sqrt(neighbor count)
pub fn neighborhood_energy(window: ArrayView2<'_, f32>, neighbors: &[usize]) -> f32 {
    let sum_sq: f64 = neighbors
        .iter()
        .map(|&c| {
            window
                .column(c)
                .iter()
                .map(|&v| (v as f64) * (v as f64))
                .sum::<f64>()
        })
        .sum();
    (sum_sq.sqrt() / (neighbors.len() as f64).sqrt()) as f32
}

fn energy(
    windows: ArrayView3<'_, f32>,
    groups: &ChannelGroups,
    sparsity: &SparsityMask,
) -> Result<Array1<f32>, ComputeError> {
    let mut energies = Array1::<f32>::zeros(windows.len_of(Axis(0)));
    for (channel, indices) in groups.iter() {
        let neighbors = neighbors_of(sparsity, channel)?;
        for &i in indices {
            energies[i] = neighborhood_energy(windows.index_axis(Axis(0), i), neighbors);
        }
    }
    Ok(energies)
}

/// Ptp-weighted centroid of neighbor locations
pub fn weighted_centroid(
    ptps: &[f64],
    neighbors: &[usize],
    locations: &Array2<f64>,
) -> Option<Vec<f64>> {
    let total: f64 = ptps.iter().sum();
    if !(total.is_finite() && total != 0.0) {
        return None;
    }
    let centroid = (0..locations.ncols())
        .map(|d| {
            ptps.iter()
                .zip(neighbors)
                .map(|(w, &c)| w * locations[[c, d]])
                .sum::<f64>()
                / total
        })
        .collect();
    Some(centroid)
}

fn neighbor_ptps(window: ArrayView2<'_, f32>, neighbors: &[usize]) -> Vec<f64> {
    neighbors
        .iter()
        .map(|&c| peak_to_peak(window.column(c)) as f64)
        .collect()
}

fn center_of_mass(
    windows: ArrayView3<'_, f32>,
    groups: &ChannelGroups,
    sparsity: &SparsityMask,
    locations: &Array2<f64>,
) -> Result<Array2<f32>, ComputeError> {
    let mut coms = Array2::<f32>::zeros((windows.len_of(Axis(0)), locations.ncols()));
    for (channel, indices) in groups.iter() {
        let neighbors = neighbors_of(sparsity, channel)?;
        for &i in indices {
            let ptps = neighbor_ptps(windows.index_axis(Axis(0), i), neighbors);
            let centroid = weighted_centroid(&ptps, neighbors, locations)
                .ok_or(ComputeError::DegenerateCenterOfMass { peak: i, channel })?;
            for (d, value) in centroid.into_iter().enumerate() {
                coms[[i, d]] = value as f32;
            }
        }
    }
    Ok(coms)
}

fn distance_to_com(
    windows: ArrayView3<'_, f32>,
    groups: &ChannelGroups,
    sparsity: &SparsityMask,
    locations: &Array2<f64>,
    coms: ArrayView2<'_, f32>,
) -> Result<Array1<f32>, ComputeError> {
    let mut distances = Array1::<f32>::zeros(windows.len_of(Axis(0)));
    for (channel, indices) in groups.iter() {
        let neighbors = neighbors_of(sparsity, channel)?;
        for &i in indices {
            let ptps = neighbor_ptps(windows.index_axis(Axis(0), i), neighbors);
            // First maximum wins on ties
            let best = ptps
                .iter()
                .enumerate()
                .fold(0, |best, (k, &v)| if v > ptps[best] { k } else { best });
            let location = locations.row(neighbors[best]);
            let squared: f64 = location
                .iter()
                .zip(coms.row(i).iter())
                .map(|(&a, &b)| (a - b as f64) * (a - b as f64))
                .sum();
            distances[i] = squared.sqrt() as f32;
        }
    }
    Ok(distances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FeatureParams, FeatureRequest, SampleWindow};
    use ndarray::array;
    use proptest::prelude::*;
    use recording::InMemoryRecording;
    use std::sync::Arc;

    /// Recording at 1 kHz so 1 ms is one sample
    fn recording(traces: Array2<f32>, locations: Array2<f64>) -> InMemoryRecording {
        InMemoryRecording::single_segment(traces, locations, 1000.0).unwrap()
    }

    fn resolve(request: &FeatureRequest, rec: &InMemoryRecording) -> ResolvedConfig {
        ResolvedConfig::resolve(request, rec).unwrap()
    }

    #[test]
    fn test_ptp_single_channel() {
        let traces = array![[0.0f32], [5.0], [-3.0], [5.0], [1.0]];
        let rec = recording(traces.clone(), array![[0.0, 0.0]]);
        let request = FeatureRequest::new([FeatureKind::Ptp]).with_window(0.0, 4.0);
        let config = resolve(&request, &rec);

        let output = compute_features(traces.view(), &[Peak::new(0, 0, 0, 0.0)], &config).unwrap();

        assert_eq!(output.as_per_peak().unwrap()[[0, 0]], 8.0);
    }

    #[test]
    fn test_zero_width_amplitude_uses_stored_value() {
        let traces = Array2::<f32>::ones((8, 2));
        let rec = recording(traces.clone(), array![[0.0, 0.0], [0.0, 10.0]]);
        let request = FeatureRequest::new([FeatureKind::Amplitude]).with_window(0.0, 0.0);
        let config = resolve(&request, &rec);
        let peaks = [Peak::new(0, 2, 0, -42.5), Peak::new(0, 5, 1, 7.25)];

        let output = compute_features(traces.view(), &peaks, &config).unwrap();
        let values = output.as_per_peak().unwrap();
        assert_eq!(values[[0, 0]], -42.5);
        assert_eq!(values[[1, 0]], 7.25);

        let per_channel = compute_features(
            traces.view(),
            &peaks,
            &resolve(&request.clone().with_mode(AggregationMode::PerChannel), &rec),
        )
        .unwrap();
        assert_eq!(per_channel.as_per_channel().unwrap()[[1, 1, 0]], 7.25);
    }

    #[test]
    fn test_amplitude_sign_modes() {
        let traces = array![[0.0f32, 1.0], [-6.0, 2.0], [3.0, 9.0], [0.0, -1.0]];
        let rec = recording(traces.clone(), array![[0.0, 0.0], [0.0, 10.0]]);
        let peaks = [Peak::new(0, 1, 0, 0.0)];

        let run = |sign: PeakSign, mode: AggregationMode| {
            let request = FeatureRequest::new([FeatureKind::Amplitude])
                .with_window(1.0, 2.0)
                .with_mode(mode)
                .with_params(
                    FeatureKind::Amplitude,
                    FeatureParams {
                        peak_sign: Some(sign),
                        ..Default::default()
                    },
                );
            compute_features(traces.view(), &peaks, &resolve(&request, &rec)).unwrap()
        };

        let per_peak = |sign| run(sign, AggregationMode::PerPeak).as_per_peak().unwrap()[[0, 0]];
        assert_eq!(per_peak(PeakSign::Neg), -6.0);
        assert_eq!(per_peak(PeakSign::Pos), 9.0);
        assert_eq!(per_peak(PeakSign::Both), 9.0);

        let per_channel = |sign| {
            let output = run(sign, AggregationMode::PerChannel);
            let values = output.as_per_channel().unwrap();
            (values[[0, 0, 0]], values[[0, 1, 0]])
        };
        assert_eq!(per_channel(PeakSign::Neg), (-6.0, 1.0));
        assert_eq!(per_channel(PeakSign::Pos), (3.0, 9.0));
        // max |value| per channel, same rule as per-peak mode
        assert_eq!(per_channel(PeakSign::Both), (6.0, 9.0));
    }

    #[test]
    fn test_per_channel_ptp_slabs() {
        let traces = array![[0.0f32, 1.0], [4.0, 2.0], [-1.0, 1.5], [0.0, 0.0]];
        let rec = recording(traces.clone(), array![[0.0, 0.0], [0.0, 10.0]]);
        let request = FeatureRequest::new([FeatureKind::Amplitude, FeatureKind::Ptp])
            .with_window(1.0, 2.0)
            .with_mode(AggregationMode::PerChannel);
        let config = resolve(&request, &rec);

        let output = compute_features(traces.view(), &[Peak::new(0, 1, 0, 0.0)], &config).unwrap();
        let values = output.as_per_channel().unwrap();

        assert_eq!(values.dim(), (1, 2, 2));
        assert_eq!(values[[0, 0, 1]], 5.0);
        assert_eq!(values[[0, 1, 1]], 1.0);
    }

    #[test]
    fn test_center_of_mass_centroid() {
        let locations = array![[0.0, 0.0], [10.0, 0.0]];

        let equal = weighted_centroid(&[2.0, 2.0], &[0, 1], &locations).unwrap();
        assert_eq!(equal, vec![5.0, 0.0]);

        let skewed = weighted_centroid(&[1.0, 3.0], &[0, 1], &locations).unwrap();
        assert_eq!(skewed, vec![7.5, 0.0]);

        assert!(weighted_centroid(&[0.0, 0.0], &[0, 1], &locations).is_none());
    }

    #[test]
    fn test_center_of_mass_and_distance() {
        // Channel 0 swings by 1, channel 1 by 3
        let traces = array![[0.0f32, 0.0], [-1.0, -3.0], [0.0, 0.0]];
        let rec = recording(traces.clone(), array![[0.0, 0.0], [10.0, 0.0]]);
        let request = FeatureRequest::new([
            FeatureKind::DistComVsMaxPtpChannel,
            FeatureKind::CenterOfMass,
        ])
        .with_window(1.0, 2.0);
        let config = resolve(&request, &rec);

        let output = compute_features(traces.view(), &[Peak::new(0, 1, 0, -1.0)], &config).unwrap();
        let values = output.as_per_peak().unwrap();

        assert_eq!(values.dim(), (1, 3));
        assert_eq!(values[[0, 1]], 7.5);
        assert_eq!(values[[0, 2]], 0.0);
        // Max ptp channel sits at (10, 0)
        assert_eq!(values[[0, 0]], 2.5);
    }

    #[test]
    fn test_flat_neighborhood_is_an_error() {
        let traces = Array2::<f32>::zeros((5, 2));
        let rec = recording(traces.clone(), array![[0.0, 0.0], [10.0, 0.0]]);
        let request = FeatureRequest::new([FeatureKind::CenterOfMass]).with_window(1.0, 1.0);
        let config = resolve(&request, &rec);

        let err = compute_features(traces.view(), &[Peak::new(0, 2, 1, 0.0)], &config).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::DegenerateCenterOfMass { peak: 0, channel: 1 }
        ));
    }

    #[test]
    fn test_energy_normalized_by_neighbor_count() {
        let traces = array![[3.0f32, 4.0, 100.0], [0.0, 0.0, 0.0]];
        // Channel 2 is far away and excluded by the default radius
        let rec = recording(traces.clone(), array![[0.0, 0.0], [0.0, 20.0], [0.0, 500.0]]);
        let request = FeatureRequest::new([FeatureKind::Energy]).with_window(0.0, 2.0);
        let config = resolve(&request, &rec);

        let output = compute_features(traces.view(), &[Peak::new(0, 0, 0, 0.0)], &config).unwrap();
        let expected = 5.0 / 2f32.sqrt();

        assert!((output.as_per_peak().unwrap()[[0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_energy_ignores_neighbor_order() {
        let window = array![[1.0f32, -2.0, 0.5], [3.0, 0.25, -4.0]];
        let a = neighborhood_energy(window.view(), &[0, 1, 2]);
        let b = neighborhood_energy(window.view(), &[2, 0, 1]);
        assert!((a - b).abs() < 1e-6);

        // Masks built from permuted lists are identical
        let forward = SparsityMask::from_neighbors(3, &[vec![0, 1, 2], vec![1], vec![2]]);
        let shuffled = SparsityMask::from_neighbors(3, &[vec![2, 1, 0], vec![1], vec![2]]);
        assert_eq!(forward.neighbors(0), shuffled.neighbors(0));
    }

    proptest! {
        #[test]
        fn test_energy_invariant_under_neighbor_permutation(
            values in prop::collection::vec(-100.0f32..100.0, 5 * 6),
            order in Just((0usize..6).collect::<Vec<_>>()).prop_shuffle(),
            keep in 1usize..=6,
        ) {
            let window = Array2::from_shape_vec((5, 6), values).unwrap();
            let mut sorted: Vec<usize> = order[..keep].to_vec();
            let permuted = sorted.clone();
            sorted.sort_unstable();

            let expected = neighborhood_energy(window.view(), &sorted);
            let actual = neighborhood_energy(window.view(), &permuted);
            prop_assert!((expected - actual).abs() <= 1e-6 * expected.abs().max(1.0));

            let lists = vec![permuted.clone(); 6];
            let mask = SparsityMask::from_neighbors(6, &lists);
            prop_assert_eq!(mask.neighbors(0), Some(sorted.as_slice()));
        }
    }

    #[test]
    fn test_sparse_features_have_no_per_channel_form() {
        let window = SampleWindow::new(1, 1);
        let sparsity = Arc::new(SparsityMask::from_neighbors(1, &[vec![0]]));
        let windows = Array3::<f32>::ones((1, 2, 1));
        let peaks = [Peak::new(0, 1, 0, 0.0)];

        let energy = FeatureSpec::Energy { window, sparsity };
        let err = per_channel_slab(&energy, windows.view(), &peaks).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::UnsupportedInMode {
                feature: FeatureKind::Energy,
                mode: AggregationMode::PerChannel,
            }
        ));

        let ptp = FeatureSpec::Ptp { window };
        assert_eq!(per_channel_slab(&ptp, windows.view(), &peaks).unwrap(), array![[0.0f32]]);
    }

    #[test]
    fn test_rows_follow_peak_order() {
        let traces = Array2::from_shape_fn((20, 1), |(t, _)| t as f32);
        let rec = recording(traces.clone(), array![[0.0, 0.0]]);
        let request = FeatureRequest::new([FeatureKind::Amplitude])
            .with_window(1.0, 1.0)
            .with_params(
                FeatureKind::Amplitude,
                FeatureParams {
                    peak_sign: Some(PeakSign::Pos),
                    ..Default::default()
                },
            );
        let config = resolve(&request, &rec);
        let peaks = [Peak::new(0, 15, 0, 0.0), Peak::new(0, 3, 0, 0.0), Peak::new(0, 9, 0, 0.0)];

        let output = compute_features(traces.view(), &peaks, &config).unwrap();
        let column: Vec<f32> = output.as_per_peak().unwrap().column(0).to_vec();

        assert_eq!(column, vec![15.0, 3.0, 9.0]);
    }

    #[test]
    fn test_per_feature_windows() {
        let traces = Array2::from_shape_fn((20, 1), |(t, _)| if t == 12 { 10.0 } else { 0.0 });
        let rec = recording(traces.clone(), array![[0.0, 0.0]]);
        let request = FeatureRequest::new([FeatureKind::Ptp, FeatureKind::Amplitude])
            .with_window(1.0, 1.0)
            .with_params(
                FeatureKind::Ptp,
                FeatureParams {
                    ms_after: Some(5.0),
                    ..Default::default()
                },
            );
        let config = resolve(&request, &rec);

        let output = compute_features(traces.view(), &[Peak::new(0, 8, 0, 0.0)], &config).unwrap();
        let values = output.as_per_peak().unwrap();

        // Only the wider ptp window reaches sample 12
        assert_eq!(values[[0, 0]], 10.0);
        assert_eq!(values[[0, 1]], 0.0);
    }

    #[test]
    fn test_concatenate_keeps_order() {
        let rec = recording(Array2::zeros((4, 1)), array![[0.0, 0.0]]);
        let config = resolve(&FeatureRequest::new([FeatureKind::Ptp]), &rec);
        let a = FeatureTensor::PerPeak(array![[1.0f32], [2.0]]);
        let b = FeatureTensor::PerPeak(array![[3.0f32]]);

        let joined = FeatureTensor::concatenate(&config, &[a, b]).unwrap();
        assert_eq!(joined, FeatureTensor::PerPeak(array![[1.0f32], [2.0], [3.0]]));

        let empty = FeatureTensor::concatenate(&config, &[]).unwrap();
        assert_eq!(empty.shape(), &[0, 1]);
    }
}
