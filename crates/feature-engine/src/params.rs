//! Feature Parameter Resolution
//!
//! Turns a [`FeatureRequest`] into an immutable [`ResolvedConfig`]: defaults
//! merged with overrides, windows converted to samples, sparsity masks built,
//! dependencies checked and a computation order fixed.

use crate::smoothing::{SmoothingConfig, TraceFilter};
use crate::sparsity::SparsityMask;
use crate::FeatureError;
use ndarray::Array2;
use recording::Recording;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default neighbor radius for sparse features (um)
pub const DEFAULT_RADIUS_UM: f64 = 50.0;

/// Supported feature kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKind {
    #[serde(rename = "amplitude")]
    Amplitude,
    #[serde(rename = "ptp")]
    Ptp,
    #[serde(rename = "energy")]
    Energy,
    #[serde(rename = "com")]
    CenterOfMass,
    #[serde(rename = "dist_com_vs_max_ptp_channel")]
    DistComVsMaxPtpChannel,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::Amplitude,
        FeatureKind::Ptp,
        FeatureKind::Energy,
        FeatureKind::CenterOfMass,
        FeatureKind::DistComVsMaxPtpChannel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Amplitude => "amplitude",
            FeatureKind::Ptp => "ptp",
            FeatureKind::Energy => "energy",
            FeatureKind::CenterOfMass => "com",
            FeatureKind::DistComVsMaxPtpChannel => "dist_com_vs_max_ptp_channel",
        }
    }

    /// Features that must be computed earlier in the same pass
    pub fn dependencies(&self) -> &'static [FeatureKind] {
        match self {
            FeatureKind::DistComVsMaxPtpChannel => &[FeatureKind::CenterOfMass],
            _ => &[],
        }
    }

    /// Whether the feature works on a channel neighborhood
    pub fn uses_neighborhood(&self) -> bool {
        matches!(
            self,
            FeatureKind::Energy | FeatureKind::CenterOfMass | FeatureKind::DistComVsMaxPtpChannel
        )
    }

    /// Default parameters before overrides
    pub fn default_params(&self) -> FeatureParams {
        FeatureParams {
            peak_sign: (*self == FeatureKind::Amplitude).then_some(PeakSign::Neg),
            local_radius_um: self.uses_neighborhood().then_some(DEFAULT_RADIUS_UM),
            ..Default::default()
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that matches no feature kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeatureName(pub String);

impl FromStr for FeatureKind {
    type Err = UnknownFeatureName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownFeatureName(s.to_string()))
    }
}

/// Output shape: one value per peak, or one value per peak and channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    #[default]
    PerPeak,
    PerChannel,
}

impl AggregationMode {
    /// Feature kinds available in this mode
    pub fn supported(&self) -> &'static [FeatureKind] {
        match self {
            AggregationMode::PerPeak => &FeatureKind::ALL,
            AggregationMode::PerChannel => &[FeatureKind::Amplitude, FeatureKind::Ptp],
        }
    }

    pub fn supports(&self, kind: FeatureKind) -> bool {
        self.supported().contains(&kind)
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::PerPeak => f.write_str("per-peak"),
            AggregationMode::PerChannel => f.write_str("per-channel"),
        }
    }
}

/// Which extremum `amplitude` reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakSign {
    #[default]
    Neg,
    Pos,
    Both,
}

/// Per-feature overrides; `None` keeps the default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureParams {
    pub ms_before: Option<f64>,
    pub ms_after: Option<f64>,
    pub peak_sign: Option<PeakSign>,
    pub local_radius_um: Option<f64>,
}

impl FeatureParams {
    /// Shallow merge: keys set in `overrides` replace ours
    pub fn merged(&self, overrides: &FeatureParams) -> FeatureParams {
        FeatureParams {
            ms_before: overrides.ms_before.or(self.ms_before),
            ms_after: overrides.ms_after.or(self.ms_after),
            peak_sign: overrides.peak_sign.or(self.peak_sign),
            local_radius_um: overrides.local_radius_um.or(self.local_radius_um),
        }
    }

    fn has_custom_window(&self) -> bool {
        self.ms_before.is_some() || self.ms_after.is_some()
    }
}

/// Everything the caller asks for in one extraction run
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    /// Features in output column order
    pub features: Vec<FeatureKind>,
    pub params: BTreeMap<FeatureKind, FeatureParams>,
    /// Global window before each peak (ms)
    pub ms_before: f64,
    /// Global window after each peak (ms)
    pub ms_after: f64,
    pub mode: AggregationMode,
    pub smoothing: Option<SmoothingConfig>,
}

impl Default for FeatureRequest {
    fn default() -> Self {
        Self {
            features: vec![FeatureKind::Amplitude, FeatureKind::Ptp],
            params: BTreeMap::new(),
            ms_before: 1.0,
            ms_after: 1.0,
            mode: AggregationMode::PerPeak,
            smoothing: None,
        }
    }
}

impl FeatureRequest {
    pub fn new(features: impl IntoIterator<Item = FeatureKind>) -> Self {
        Self {
            features: features.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Parse feature names; unknown names fail for `mode`
    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        mode: AggregationMode,
    ) -> Result<Self, FeatureError> {
        let features = names
            .iter()
            .map(|name| {
                name.as_ref()
                    .parse::<FeatureKind>()
                    .map_err(|UnknownFeatureName(name)| FeatureError::UnknownFeature { name, mode })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            features,
            mode,
            ..Default::default()
        })
    }

    pub fn with_params(mut self, kind: FeatureKind, params: FeatureParams) -> Self {
        self.params.insert(kind, params);
        self
    }

    pub fn with_window(mut self, ms_before: f64, ms_after: f64) -> Self {
        self.ms_before = ms_before;
        self.ms_after = ms_after;
        self
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = Some(smoothing);
        self
    }
}

/// Window around a peak, in samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SampleWindow {
    pub nbefore: usize,
    pub nafter: usize,
}

impl SampleWindow {
    pub fn new(nbefore: usize, nafter: usize) -> Self {
        Self { nbefore, nafter }
    }

    /// Total samples; saturates, so check windows with [`checked_width`](Self::checked_width)
    pub fn width(&self) -> usize {
        self.nbefore.saturating_add(self.nafter)
    }

    pub fn checked_width(&self) -> Option<usize> {
        self.nbefore.checked_add(self.nafter)
    }

    /// Widest extent of both windows on each side
    pub fn union(&self, other: &SampleWindow) -> SampleWindow {
        SampleWindow {
            nbefore: self.nbefore.max(other.nbefore),
            nafter: self.nafter.max(other.nafter),
        }
    }
}

/// `round(ms * fs / 1000)`
pub fn ms_to_samples(ms: f64, sampling_frequency: f64) -> Result<usize, FeatureError> {
    if !(ms.is_finite() && ms >= 0.0) {
        return Err(FeatureError::InvalidWindow(format!(
            "duration must be finite and non-negative, got {} ms",
            ms
        )));
    }
    Ok((ms * sampling_frequency / 1000.0).round() as usize)
}

/// One fully resolved feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSpec {
    Amplitude {
        window: SampleWindow,
        peak_sign: PeakSign,
    },
    Ptp {
        window: SampleWindow,
    },
    Energy {
        window: SampleWindow,
        sparsity: Arc<SparsityMask>,
    },
    CenterOfMass {
        window: SampleWindow,
        sparsity: Arc<SparsityMask>,
    },
    DistComVsMaxPtpChannel {
        window: SampleWindow,
        sparsity: Arc<SparsityMask>,
    },
}

impl FeatureSpec {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureSpec::Amplitude { .. } => FeatureKind::Amplitude,
            FeatureSpec::Ptp { .. } => FeatureKind::Ptp,
            FeatureSpec::Energy { .. } => FeatureKind::Energy,
            FeatureSpec::CenterOfMass { .. } => FeatureKind::CenterOfMass,
            FeatureSpec::DistComVsMaxPtpChannel { .. } => FeatureKind::DistComVsMaxPtpChannel,
        }
    }

    pub fn window(&self) -> SampleWindow {
        match self {
            FeatureSpec::Amplitude { window, .. }
            | FeatureSpec::Ptp { window }
            | FeatureSpec::Energy { window, .. }
            | FeatureSpec::CenterOfMass { window, .. }
            | FeatureSpec::DistComVsMaxPtpChannel { window, .. } => *window,
        }
    }

    pub fn sparsity(&self) -> Option<&SparsityMask> {
        match self {
            FeatureSpec::Energy { sparsity, .. }
            | FeatureSpec::CenterOfMass { sparsity, .. }
            | FeatureSpec::DistComVsMaxPtpChannel { sparsity, .. } => Some(sparsity.as_ref()),
            _ => None,
        }
    }
}

/// A resolved feature and where it lands in the output
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFeature {
    pub spec: FeatureSpec,
    /// First output column (per-peak) or feature slab (per-channel)
    pub column: usize,
    /// Number of columns occupied
    pub width: usize,
}

/// Immutable configuration shared by every chunk
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    features: Vec<ResolvedFeature>,
    compute_order: Vec<usize>,
    shared_window: Option<SampleWindow>,
    max_window: SampleWindow,
    mode: AggregationMode,
    channel_locations: Array2<f64>,
    com_dims: usize,
    num_columns: usize,
    smoothing: Option<Arc<dyn TraceFilter>>,
}

impl ResolvedConfig {
    /// Resolve `request` against the geometry and sampling rate of `recording`
    pub fn resolve<R: Recording + ?Sized>(
        request: &FeatureRequest,
        recording: &R,
    ) -> Result<Self, FeatureError> {
        let mode = request.mode;
        if request.features.is_empty() {
            return Err(FeatureError::EmptyFeatureList);
        }

        for (i, &kind) in request.features.iter().enumerate() {
            if !mode.supports(kind) {
                return Err(FeatureError::UnknownFeature {
                    name: kind.name().to_string(),
                    mode,
                });
            }
            if request.features[..i].contains(&kind) {
                return Err(FeatureError::DuplicateFeature(kind));
            }
            for &requires in kind.dependencies() {
                if !request.features.contains(&requires) {
                    return Err(FeatureError::MissingDependency {
                        feature: kind,
                        requires,
                    });
                }
            }
        }

        for kind in request.params.keys() {
            if !request.features.contains(kind) {
                debug!("Ignoring parameters for unrequested feature '{}'", kind);
            }
        }

        let sampling_frequency = recording.sampling_frequency();
        let global = SampleWindow::new(
            ms_to_samples(request.ms_before, sampling_frequency)?,
            ms_to_samples(request.ms_after, sampling_frequency)?,
        );

        let longest_segment = (0..recording.num_segments())
            .map(|segment| recording.num_samples(segment))
            .max()
            .unwrap_or(0);

        let channel_locations = recording.channel_locations().to_owned();
        let com_dims = channel_locations.ncols();

        // Distances are computed once, masks once per distinct radius
        let mut distances: Option<Array2<f64>> = None;
        let mut masks: Vec<(f64, Arc<SparsityMask>)> = Vec::new();
        let mut neighborhood = |radius: f64| -> Result<Arc<SparsityMask>, FeatureError> {
            if let Some((_, mask)) = masks.iter().find(|(r, _)| *r == radius) {
                return Ok(Arc::clone(mask));
            }
            let distances = distances.get_or_insert_with(|| recording.channel_distances());
            let mask = Arc::new(SparsityMask::from_distances(distances.view(), radius)?);
            masks.push((radius, Arc::clone(&mask)));
            Ok(mask)
        };

        let mut shared = true;
        let mut max_window = SampleWindow::default();
        let mut features = Vec::with_capacity(request.features.len());
        let mut column = 0;

        for &kind in &request.features {
            let overrides = request.params.get(&kind).copied().unwrap_or_default();
            warn_inapplicable(kind, &overrides);
            let params = kind.default_params().merged(&overrides);

            let window = if params.has_custom_window() {
                shared = false;
                SampleWindow::new(
                    match params.ms_before {
                        Some(ms) => ms_to_samples(ms, sampling_frequency)?,
                        None => global.nbefore,
                    },
                    match params.ms_after {
                        Some(ms) => ms_to_samples(ms, sampling_frequency)?,
                        None => global.nafter,
                    },
                )
            } else {
                global
            };
            match window.checked_width() {
                Some(width) if width <= longest_segment => {}
                _ => {
                    return Err(FeatureError::InvalidWindow(format!(
                        "window -{}/+{} of '{}' exceeds the longest segment ({} samples)",
                        window.nbefore, window.nafter, kind, longest_segment
                    )))
                }
            }
            if window.width() == 0 && kind != FeatureKind::Amplitude {
                return Err(FeatureError::InvalidWindow(format!(
                    "feature '{}' needs a non-empty window",
                    kind
                )));
            }
            max_window = max_window.union(&window);

            let radius = params.local_radius_um.unwrap_or(DEFAULT_RADIUS_UM);
            let spec = match kind {
                FeatureKind::Amplitude => FeatureSpec::Amplitude {
                    window,
                    peak_sign: params.peak_sign.unwrap_or_default(),
                },
                FeatureKind::Ptp => FeatureSpec::Ptp { window },
                FeatureKind::Energy => FeatureSpec::Energy {
                    window,
                    sparsity: neighborhood(radius)?,
                },
                FeatureKind::CenterOfMass => FeatureSpec::CenterOfMass {
                    window,
                    sparsity: neighborhood(radius)?,
                },
                FeatureKind::DistComVsMaxPtpChannel => FeatureSpec::DistComVsMaxPtpChannel {
                    window,
                    sparsity: neighborhood(radius)?,
                },
            };

            let width = match (mode, kind) {
                (AggregationMode::PerPeak, FeatureKind::CenterOfMass) => com_dims,
                _ => 1,
            };
            features.push(ResolvedFeature {
                spec,
                column,
                width,
            });
            column += width;
        }

        let compute_order = computation_order(&request.features);
        let smoothing = request.smoothing.as_ref().map(SmoothingConfig::build).transpose()?;

        info!(
            "Resolved {} features ({} mode): window -{}/+{} samples, shared={}",
            features.len(),
            mode,
            max_window.nbefore,
            max_window.nafter,
            shared
        );

        Ok(Self {
            features,
            compute_order,
            shared_window: shared.then_some(global),
            max_window,
            mode,
            channel_locations,
            com_dims,
            num_columns: column,
            smoothing,
        })
    }

    /// Features in request (column) order
    pub fn features(&self) -> &[ResolvedFeature] {
        &self.features
    }

    /// Indices into [`features`](Self::features) in computation order
    pub fn compute_order(&self) -> &[usize] {
        &self.compute_order
    }

    /// Window shared by all features, if none overrides its own
    pub fn shared_window(&self) -> Option<SampleWindow> {
        self.shared_window
    }

    pub fn max_window(&self) -> SampleWindow {
        self.max_window
    }

    /// Samples read on each side of a chunk
    pub fn margin(&self) -> usize {
        self.max_window.nbefore.max(self.max_window.nafter)
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    pub fn channel_locations(&self) -> &Array2<f64> {
        &self.channel_locations
    }

    pub fn num_channels(&self) -> usize {
        self.channel_locations.nrows()
    }

    /// Spatial dimensions of the channel geometry
    pub fn com_dims(&self) -> usize {
        self.com_dims
    }

    /// Per-peak columns, or per-channel feature slabs
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Column range holding a feature's output
    pub fn columns_of(&self, kind: FeatureKind) -> Option<std::ops::Range<usize>> {
        self.features
            .iter()
            .find(|feature| feature.spec.kind() == kind)
            .map(|feature| feature.column..feature.column + feature.width)
    }

    pub fn smoothing(&self) -> Option<&dyn TraceFilter> {
        self.smoothing.as_deref()
    }
}

fn warn_inapplicable(kind: FeatureKind, overrides: &FeatureParams) {
    if overrides.peak_sign.is_some() && kind != FeatureKind::Amplitude {
        warn!("Ignoring peak_sign for feature '{}'", kind);
    }
    if overrides.local_radius_um.is_some() && !kind.uses_neighborhood() {
        warn!("Ignoring local_radius_um for feature '{}'", kind);
    }
}

/// Stable topological order: request order, dependencies first
fn computation_order(features: &[FeatureKind]) -> Vec<usize> {
    let mut order = Vec::with_capacity(features.len());
    let mut placed = vec![false; features.len()];
    while order.len() < features.len() {
        let next = (0..features.len()).find(|&i| {
            !placed[i]
                && features[i].dependencies().iter().all(|dep| {
                    features
                        .iter()
                        .position(|kind| kind == dep)
                        .map_or(true, |j| placed[j])
                })
        });
        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            // Dependencies are acyclic; unreachable after validation
            None => break,
        }
    }
    order
}
