// Engine configuration
//
// Every field has a default, so an empty file (or no file) is a valid
// configuration. Non-positive values are treated as unset and fall back to
// the defaults during `normalize`.

use crate::attribution::{AttributionMode, DEFAULT_COVERAGE_THRESHOLD};
use crate::correlation::{
    Correlator, RetryStormDetector, DEFAULT_ENRICHMENT_THRESHOLD, DEFAULT_MAX_FANOUT,
    DEFAULT_STORM_THRESHOLD, DEFAULT_STORM_WINDOW, DEFAULT_WINDOW,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default minimum precision for the correlation gate
pub const DEFAULT_MIN_PRECISION: f64 = 0.90;

/// Default minimum recall for the correlation gate
pub const DEFAULT_MIN_RECALL: f64 = 0.85;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration
///
/// # Example
/// ```
/// use faultlens::config::EngineConfig;
///
/// let config = EngineConfig::from_toml_str("[correlation]\nmax_fanout = 5\n").unwrap();
/// assert_eq!(config.correlation.max_fanout, 5);
/// assert_eq!(config.correlation.window_ms, 2000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub correlation: CorrelationConfig,
    pub retry_storm: RetryStormConfig,
    pub evaluation: EvaluationConfig,
    pub attribution: AttributionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrelationConfig {
    pub window_ms: u64,
    pub enrichment_threshold: f64,
    pub max_fanout: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW.as_millis() as u64,
            enrichment_threshold: DEFAULT_ENRICHMENT_THRESHOLD,
            max_fanout: DEFAULT_MAX_FANOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryStormConfig {
    pub window_ms: u64,
    pub threshold: usize,
}

impl Default for RetryStormConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_STORM_WINDOW.as_millis() as u64,
            threshold: DEFAULT_STORM_THRESHOLD,
        }
    }
}

/// Correlation quality gate bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    pub min_precision: f64,
    pub min_recall: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_precision: DEFAULT_MIN_PRECISION,
            min_recall: DEFAULT_MIN_RECALL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributionConfig {
    /// `bayes` or `rule`; anything else selects bayes
    pub mode: String,
    pub coverage_threshold: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            mode: AttributionMode::Bayes.as_str().to_string(),
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Load, normalize and validate a TOML configuration file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Parse, normalize and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = toml::from_str(content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Replace unset (zero or negative) values with their defaults
    pub fn normalize(&mut self) {
        let defaults = EngineConfig::default();

        if self.correlation.window_ms == 0 {
            self.correlation.window_ms = defaults.correlation.window_ms;
        }
        if self.correlation.enrichment_threshold <= 0.0 {
            self.correlation.enrichment_threshold = defaults.correlation.enrichment_threshold;
        }
        if self.correlation.max_fanout == 0 {
            self.correlation.max_fanout = defaults.correlation.max_fanout;
        }
        if self.retry_storm.window_ms == 0 {
            self.retry_storm.window_ms = defaults.retry_storm.window_ms;
        }
        if self.retry_storm.threshold == 0 {
            self.retry_storm.threshold = defaults.retry_storm.threshold;
        }
        if self.attribution.coverage_threshold <= 0.0 {
            self.attribution.coverage_threshold = defaults.attribution.coverage_threshold;
        }
        if self.attribution.mode.trim().is_empty() {
            self.attribution.mode = defaults.attribution.mode;
        }
    }

    /// Check that every probability-like value lies in [0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounded = [
            (
                "correlation.enrichment_threshold",
                self.correlation.enrichment_threshold,
            ),
            ("evaluation.min_precision", self.evaluation.min_precision),
            ("evaluation.min_recall", self.evaluation.min_recall),
            (
                "attribution.coverage_threshold",
                self.attribution.coverage_threshold,
            ),
        ];
        for (name, value) in bounded {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn correlation_window(&self) -> Duration {
        Duration::from_millis(self.correlation.window_ms)
    }

    pub fn attribution_mode(&self) -> AttributionMode {
        AttributionMode::parse_lossy(&self.attribution.mode)
    }

    /// Enricher tuned by the `[correlation]` table
    pub fn correlator(&self) -> Correlator {
        Correlator {
            window: self.correlation_window(),
            enrichment_threshold: self.correlation.enrichment_threshold,
            max_fanout: self.correlation.max_fanout,
        }
    }

    /// Fresh detector tuned by the `[retry_storm]` table
    pub fn retry_storm_detector(&self) -> RetryStormDetector {
        RetryStormDetector::new(
            Duration::from_millis(self.retry_storm.window_ms),
            self.retry_storm.threshold,
        )
    }
}
