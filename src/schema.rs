// Incident attribution envelope
//
// Field names are a stable JSON contract consumed by downstream exporters.
// `validate` enforces the envelope constraints before anything is written.

use crate::attribution::FaultDomain;
use crate::signal::SignalKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One attribution result for one incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentAttribution {
    pub incident_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cluster: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub service: String,
    pub predicted_fault_domain: FaultDomain,
    pub confidence: f64,
    pub evidence: Vec<Evidence>,
    pub slo_impact: SloImpact,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fault_hypotheses: Vec<FaultHypothesis>,
}

/// A supporting observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub signal: String,
    pub value: EvidenceValue,
    pub source: String,
}

impl Evidence {
    pub fn new(signal: impl Into<String>, value: impl Into<EvidenceValue>, source: &str) -> Self {
        Self {
            signal: signal.into(),
            value: value.into(),
            source: source.to_string(),
        }
    }
}

/// Evidence payload: a measurement or a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceValue {
    Number(f64),
    Text(String),
}

impl From<f64> for EvidenceValue {
    fn from(v: f64) -> Self {
        EvidenceValue::Number(v)
    }
}

impl From<&str> for EvidenceValue {
    fn from(v: &str) -> Self {
        EvidenceValue::Text(v.to_string())
    }
}

impl From<String> for EvidenceValue {
    fn from(v: String) -> Self {
        EvidenceValue::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloImpact {
    pub sli: String,
    pub burn_rate: f64,
    pub window_minutes: u32,
}

/// One ranked fault-domain hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultHypothesis {
    pub domain: FaultDomain,
    pub posterior: f64,
    #[serde(default)]
    pub evidence: Vec<SignalKind>,
}

/// Envelope constraint violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} out of range [0,1]: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("burn_rate must be non-negative: {0}")]
    NegativeBurnRate(f64),

    #[error("fault_hypotheses not sorted by posterior at index {0}")]
    UnsortedHypotheses(usize),
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), SchemaError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SchemaError::OutOfRange { field, value })
    }
}

impl IncidentAttribution {
    /// Check the envelope against the export contract
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.incident_id.trim().is_empty() {
            return Err(SchemaError::Empty("incident_id"));
        }
        if self.service.trim().is_empty() {
            return Err(SchemaError::Empty("service"));
        }
        if self.evidence.is_empty() {
            return Err(SchemaError::Empty("evidence"));
        }
        unit_interval("confidence", self.confidence)?;
        let burn_rate = self.slo_impact.burn_rate;
        if burn_rate.is_nan() || burn_rate < 0.0 {
            return Err(SchemaError::NegativeBurnRate(self.slo_impact.burn_rate));
        }
        for h in &self.fault_hypotheses {
            unit_interval("posterior", h.posterior)?;
        }
        if let Some(i) = self
            .fault_hypotheses
            .windows(2)
            .position(|w| w[0].posterior < w[1].posterior)
        {
            return Err(SchemaError::UnsortedHypotheses(i + 1));
        }
        Ok(())
    }
}
