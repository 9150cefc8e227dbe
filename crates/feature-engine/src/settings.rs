//! Extraction Settings
//!
//! File and environment configuration for an extraction run. Environment
//! variables use the `PEAK_FEATURES_` prefix and `__` for nesting, e.g.
//! `PEAK_FEATURES_MS_BEFORE=0.5` or `PEAK_FEATURES_JOB__N_JOBS=4`.

use crate::params::{
    AggregationMode, FeatureKind, FeatureParams, FeatureRequest, UnknownFeatureName,
};
use crate::smoothing::SmoothingConfig;
use crate::FeatureError;
use chunk_executor::JobConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PEAK_FEATURES";

/// Extraction settings as written in a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Feature names in output order
    pub features: Vec<String>,

    /// Per-feature overrides keyed by feature name
    pub feature_params: BTreeMap<String, FeatureParams>,

    /// Global window before each peak (ms)
    pub ms_before: f64,

    /// Global window after each peak (ms)
    pub ms_after: f64,

    /// One value per peak; `false` keeps one value per channel
    pub one_feature_per_peak: bool,

    pub smoothing: Option<SmoothingConfig>,

    pub job: JobConfig,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            features: vec!["amplitude".to_string(), "ptp".to_string()],
            feature_params: BTreeMap::new(),
            ms_before: 1.0,
            ms_after: 1.0,
            one_feature_per_peak: true,
            smoothing: None,
            job: JobConfig::default(),
        }
    }
}

impl ExtractionSettings {
    /// Load from a file (format from its extension) with environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let path = path.as_ref();
        let settings: Self = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        info!(
            "Loaded extraction settings from {}: {} features",
            path.display(),
            settings.features.len()
        );
        Ok(settings)
    }

    /// Parse TOML text, without environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self, FeatureError> {
        Ok(Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }

    pub fn mode(&self) -> AggregationMode {
        if self.one_feature_per_peak {
            AggregationMode::PerPeak
        } else {
            AggregationMode::PerChannel
        }
    }

    /// Build the feature request these settings describe
    pub fn request(&self) -> Result<FeatureRequest, FeatureError> {
        let mode = self.mode();
        let mut request = FeatureRequest::from_names(self.features.as_slice(), mode)?
            .with_window(self.ms_before, self.ms_after);

        for (name, params) in &self.feature_params {
            let kind = name
                .parse::<FeatureKind>()
                .map_err(|UnknownFeatureName(name)| FeatureError::UnknownFeature { name, mode })?;
            request = request.with_params(kind, *params);
        }
        if let Some(smoothing) = self.smoothing {
            request = request.with_smoothing(smoothing);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PeakSign;

    const SAMPLE: &str = r#"
features = ["amplitude", "ptp", "com"]
ms_before = 0.5
ms_after = 2

[feature_params.amplitude]
peak_sign = "pos"

[feature_params.com]
local_radius_um = 75.0

[smoothing]
method = "savgol"
window_length = 5
polyorder = 2

[job]
chunk_size = 2000
n_jobs = 2
"#;

    #[test]
    fn test_defaults() {
        let settings = ExtractionSettings::default();
        let request = settings.request().unwrap();

        assert_eq!(request, FeatureRequest::default());
        assert_eq!(settings.job, JobConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let settings = ExtractionSettings::from_toml_str(SAMPLE).unwrap();

        assert_eq!(settings.ms_after, 2.0);
        assert_eq!(settings.job, JobConfig { chunk_size: 2000, n_jobs: 2 });
        assert_eq!(
            settings.smoothing,
            Some(SmoothingConfig::Savgol {
                window_length: 5,
                polyorder: 2
            })
        );

        let request = settings.request().unwrap();
        assert_eq!(
            request.features,
            vec![FeatureKind::Amplitude, FeatureKind::Ptp, FeatureKind::CenterOfMass]
        );
        assert_eq!(request.params[&FeatureKind::Amplitude].peak_sign, Some(PeakSign::Pos));
        assert_eq!(request.params[&FeatureKind::CenterOfMass].local_radius_um, Some(75.0));
        assert_eq!(request.mode, AggregationMode::PerPeak);
    }

    #[test]
    fn test_per_channel_flag() {
        let settings = ExtractionSettings::from_toml_str("one_feature_per_peak = false").unwrap();
        assert_eq!(settings.request().unwrap().mode, AggregationMode::PerChannel);
    }

    #[test]
    fn test_unknown_names_rejected() {
        let settings =
            ExtractionSettings::from_toml_str(r#"features = ["amplitude", "width"]"#).unwrap();
        assert!(matches!(settings.request(), Err(FeatureError::UnknownFeature { .. })));

        let settings =
            ExtractionSettings::from_toml_str("[feature_params.widht]\nms_before = 1.0").unwrap();
        assert!(matches!(settings.request(), Err(FeatureError::UnknownFeature { .. })));
    }

    #[test]
    fn test_unknown_param_key_rejected() {
        let result = ExtractionSettings::from_toml_str("[feature_params.ptp]\nradius = 3.0");
        assert!(matches!(result, Err(FeatureError::Settings(_))));
    }

    #[test]
    fn test_load_file_with_env_override() {
        let path = std::env::temp_dir().join(format!("peak-features-{}.toml", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        std::env::set_var("PEAK_FEATURES_MS_BEFORE", "1.5");

        let loaded = ExtractionSettings::load(&path);
        std::env::remove_var("PEAK_FEATURES_MS_BEFORE");
        std::fs::remove_file(&path).unwrap();

        let settings = loaded.unwrap();
        assert_eq!(settings.ms_before, 1.5);
        assert_eq!(settings.features.len(), 3);
    }
}
