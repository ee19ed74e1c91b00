// Batch attribution and offline accuracy metrics
//
// Samples and predictions are paired by index; metrics only count pairs
// present in both lists.

use crate::attribution::bayesian::BayesianAttributor;
use crate::attribution::domain::FaultDomain;
use crate::attribution::mapper::{build_attribution, FaultSample};
use crate::schema::IncidentAttribution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default posterior a hypothesis needs to count toward coverage
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 0.2;

/// How samples are attributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionMode {
    /// Deterministic fault-label mapping
    Rule,
    /// Naive-Bayes posterior over signals
    #[default]
    Bayes,
}

impl AttributionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionMode::Rule => "rule",
            AttributionMode::Bayes => "bayes",
        }
    }

    /// Parse a mode name; anything other than `rule` selects Bayes
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rule" => AttributionMode::Rule,
            "bayes" | "" => AttributionMode::Bayes,
            other => {
                tracing::warn!(mode = other, "unrecognized attribution mode, using bayes");
                AttributionMode::Bayes
            }
        }
    }
}

impl fmt::Display for AttributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute every sample with the given mode
pub fn build_attributions(samples: &[FaultSample], mode: AttributionMode) -> Vec<IncidentAttribution> {
    match mode {
        AttributionMode::Rule => samples.iter().map(build_attribution).collect(),
        AttributionMode::Bayes => {
            let attributor = BayesianAttributor::new();
            samples
                .iter()
                .map(|s| attributor.attribute_sample(s))
                .collect()
        }
    }
}

fn ratio(hits: f64, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits / total as f64
    }
}

/// Fraction of predictions whose top-1 domain equals the sample's primary domain
pub fn accuracy(samples: &[FaultSample], predictions: &[IncidentAttribution]) -> f64 {
    let pairs = samples.iter().zip(predictions);
    let total = samples.len().min(predictions.len());
    let correct = pairs
        .filter(|(s, p)| s.actual_domain() == p.predicted_fault_domain)
        .count();
    ratio(correct as f64, total)
}

/// Fraction of predictions whose top-1 domain is any expected domain
pub fn partial_accuracy(samples: &[FaultSample], predictions: &[IncidentAttribution]) -> f64 {
    let total = samples.len().min(predictions.len());
    let correct = samples
        .iter()
        .zip(predictions)
        .filter(|(s, p)| s.expected_set().contains(&p.predicted_fault_domain))
        .count();
    ratio(correct as f64, total)
}

/// Mean fraction of each sample's expected domains that the prediction covers
///
/// A domain is covered when it is the top-1 prediction or a hypothesis with
/// posterior at or above `threshold`.
pub fn coverage_accuracy(
    samples: &[FaultSample],
    predictions: &[IncidentAttribution],
    threshold: f64,
) -> f64 {
    let total = samples.len().min(predictions.len());
    let covered: f64 = samples
        .iter()
        .zip(predictions)
        .map(|(s, p)| {
            let expected = s.expected_set();
            let hits = expected
                .iter()
                .filter(|d| {
                    **d == p.predicted_fault_domain
                        || p.fault_hypotheses
                            .iter()
                            .any(|h| h.domain == **d && h.posterior >= threshold)
                })
                .count();
            hits as f64 / expected.len() as f64
        })
        .sum();
    ratio(covered, total)
}

/// Actual/predicted domain pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatrixKey {
    pub actual: FaultDomain,
    pub predicted: FaultDomain,
}

/// Counts of actual versus predicted domains
pub fn build_confusion_matrix(
    samples: &[FaultSample],
    predictions: &[IncidentAttribution],
) -> BTreeMap<MatrixKey, usize> {
    let mut matrix = BTreeMap::new();
    for (sample, prediction) in samples.iter().zip(predictions) {
        let key = MatrixKey {
            actual: sample.actual_domain(),
            predicted: prediction.predicted_fault_domain,
        };
        *matrix.entry(key).or_insert(0) += 1;
    }
    matrix
}

/// Run summary written next to the attribution output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSummary {
    pub generated_at: DateTime<Utc>,
    pub total_samples: usize,
    pub accuracy: f64,
    pub partial_accuracy: f64,
    pub coverage_accuracy: f64,
    pub attribution_mode: AttributionMode,
    pub predicted_domain_counts: BTreeMap<FaultDomain, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confusion_path: Option<String>,
}

impl AttributionSummary {
    pub fn new(
        samples: &[FaultSample],
        predictions: &[IncidentAttribution],
        mode: AttributionMode,
        coverage_threshold: f64,
    ) -> Self {
        let mut counts = BTreeMap::new();
        for p in predictions {
            *counts.entry(p.predicted_fault_domain).or_insert(0) += 1;
        }
        Self {
            generated_at: Utc::now(),
            total_samples: samples.len(),
            accuracy: accuracy(samples, predictions),
            partial_accuracy: partial_accuracy(samples, predictions),
            coverage_accuracy: coverage_accuracy(samples, predictions, coverage_threshold),
            attribution_mode: mode,
            predicted_domain_counts: counts,
            input_path: None,
            output_path: None,
            confusion_path: None,
        }
    }
}
