// Correlation quality evaluation against labeled span/signal pairs
//
// Offline harness for CI gating: runs the matcher over a ground-truth
// dataset, scores the thresholded predictions and checks precision/recall
// against required minimums.

use crate::correlation::matcher::{
    match_signal, SignalRef, SpanRef, Tier, DEFAULT_ENRICHMENT_THRESHOLD, DEFAULT_WINDOW,
};
use crate::jsonl::{self, LoadError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One ground-truth pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPair {
    pub case_id: String,
    pub span: SpanRef,
    pub signal: SignalRef,
    pub expected_match: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tier: Option<Tier>,
}

/// One evaluated row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub case_id: String,
    pub expected: bool,
    pub predicted: bool,
    pub confidence: f64,
    pub tier: Option<Tier>,
    pub correct: bool,
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tier: Option<Tier>,
}

/// Confusion counts and quality statistics for one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub generated_at: DateTime<Utc>,
    pub sample_size: usize,
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub tier_accuracy: f64,
    pub mean_confidence: f64,
    pub window_ms: u64,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_precision_required: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_recall_required: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed_gate: Option<bool>,
}

impl EvalReport {
    /// Record gate bounds and verdict in the report
    pub fn with_gate(mut self, min_precision: f64, min_recall: f64, gate: &GateResult) -> Self {
        self.min_precision_required = Some(min_precision);
        self.min_recall_required = Some(min_recall);
        self.passed_gate = Some(gate.pass);
        self
    }
}

/// Gate verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub pass: bool,
    pub message: String,
}

/// Load labeled pairs from a JSONL file
pub fn load_labeled_pairs<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledPair>, LoadError> {
    jsonl::load_records(path)
}

fn safe_div(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score the matcher against labeled pairs
///
/// A zero `window` and a non-positive `threshold` fall back to the defaults.
/// Tier accuracy only counts true positives that name an expected tier; mean
/// confidence only counts accepted predictions.
pub fn evaluate_labeled_pairs(
    pairs: &[LabeledPair],
    window: Duration,
    threshold: f64,
) -> (EvalReport, Vec<Prediction>) {
    let window = if window.is_zero() {
        DEFAULT_WINDOW
    } else {
        window
    };
    let threshold = if threshold > 0.0 {
        threshold
    } else {
        DEFAULT_ENRICHMENT_THRESHOLD
    };

    let mut report = EvalReport {
        generated_at: Utc::now(),
        sample_size: pairs.len(),
        true_positive: 0,
        false_positive: 0,
        false_negative: 0,
        true_negative: 0,
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
        tier_accuracy: 0.0,
        mean_confidence: 0.0,
        window_ms: window.as_millis() as u64,
        threshold,
        min_precision_required: None,
        min_recall_required: None,
        passed_gate: None,
    };
    let mut predictions = Vec::with_capacity(pairs.len());

    let mut tier_correct = 0usize;
    let mut tier_comparable = 0usize;
    let mut confidence_sum = 0.0;
    let mut confidence_count = 0usize;

    for pair in pairs {
        let decision = match_signal(&pair.span, &pair.signal, window);
        let predicted = decision.matched && decision.confidence >= threshold;

        if predicted {
            confidence_sum += decision.confidence;
            confidence_count += 1;
        }

        match (pair.expected_match, predicted) {
            (true, true) => report.true_positive += 1,
            (false, true) => report.false_positive += 1,
            (true, false) => report.false_negative += 1,
            (false, false) => report.true_negative += 1,
        }

        if let (true, true, Some(expected_tier)) = (pair.expected_match, predicted, pair.expected_tier) {
            tier_comparable += 1;
            if decision.tier == Some(expected_tier) {
                tier_correct += 1;
            }
        }

        predictions.push(Prediction {
            case_id: pair.case_id.clone(),
            expected: pair.expected_match,
            predicted,
            confidence: decision.confidence,
            tier: decision.tier,
            correct: predicted == pair.expected_match,
            signal: pair.signal.signal.clone(),
            expected_tier: pair.expected_tier,
        });
    }

    report.precision = safe_div(
        report.true_positive,
        report.true_positive + report.false_positive,
    );
    report.recall = safe_div(
        report.true_positive,
        report.true_positive + report.false_negative,
    );
    if report.precision + report.recall > 0.0 {
        report.f1 = 2.0 * (report.precision * report.recall) / (report.precision + report.recall);
    }
    report.tier_accuracy = safe_div(tier_correct, tier_comparable);
    if confidence_count > 0 {
        report.mean_confidence = confidence_sum / confidence_count as f64;
    }

    tracing::info!(
        sample_size = report.sample_size,
        precision = report.precision,
        recall = report.recall,
        f1 = report.f1,
        "correlation evaluation complete"
    );

    (report, predictions)
}

/// Check a report against required precision and recall
///
/// Precision is checked first; the message names the violated bound.
pub fn evaluate_gate(report: &EvalReport, min_precision: f64, min_recall: f64) -> GateResult {
    if report.precision < min_precision {
        return GateResult {
            pass: false,
            message: format!(
                "precision gate failed: got {:.4} required {:.4}",
                report.precision, min_precision
            ),
        };
    }
    if report.recall < min_recall {
        return GateResult {
            pass: false,
            message: format!(
                "recall gate failed: got {:.4} required {:.4}",
                report.recall, min_recall
            ),
        };
    }
    GateResult {
        pass: true,
        message: "correlation gate passed".to_string(),
    }
}
