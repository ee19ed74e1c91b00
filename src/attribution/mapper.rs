// Fault samples and the deterministic label mapping
//
// A fault sample is one incident observation from a benchmark or replay run.
// The rule mapping turns its scenario label into a fault domain and is both
// the `rule` attribution mode and the fallback for samples without signals.

use crate::attribution::domain::FaultDomain;
use crate::jsonl::{self, LoadError};
use crate::schema::{Evidence, IncidentAttribution, SloImpact};
use crate::semconv;
use crate::signal::SignalKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// SLI that incident burn rates are measured against
pub const DEFAULT_SLI: &str = "ttft_ms";

/// Representative DNS latency attached to rule-mapped DNS incidents
const DNS_EVIDENCE_LATENCY_MS: f64 = 180.0;

/// One incident observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultSample {
    pub incident_id: String,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub service: String,
    pub fault_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_domain: Option<FaultDomain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_domains: Vec<FaultDomain>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub burn_rate: f64,
    #[serde(default)]
    pub window_minutes: u32,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub trace_id: String,
    /// Raw signal name to observed value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signals: BTreeMap<String, f64>,
}

impl FaultSample {
    /// Ground-truth primary domain: the explicit label or the rule mapping
    pub fn actual_domain(&self) -> FaultDomain {
        self.expected_domain
            .unwrap_or_else(|| map_fault_label(&self.fault_label))
    }

    /// Every acceptable domain for multi-fault ground truth
    ///
    /// Always contains the primary domain; order follows first appearance.
    pub fn expected_set(&self) -> Vec<FaultDomain> {
        let mut set: Vec<FaultDomain> = Vec::with_capacity(self.expected_domains.len() + 1);
        for domain in self
            .expected_domains
            .iter()
            .copied()
            .chain(std::iter::once(self.actual_domain()))
        {
            if !set.contains(&domain) {
                set.push(domain);
            }
        }
        set
    }

    /// Signals converted to the closed vocabulary
    ///
    /// Names outside the vocabulary are skipped.
    pub fn observed_signals(&self) -> BTreeMap<SignalKind, f64> {
        self.signals
            .iter()
            .filter_map(|(name, value)| match name.parse::<SignalKind>() {
                Ok(kind) => Some((kind, *value)),
                Err(e) => {
                    tracing::debug!(incident = %self.incident_id, "ignoring signal: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Map a scenario fault label onto a fault domain
pub fn map_fault_label(label: &str) -> FaultDomain {
    match label {
        "dns_latency" => FaultDomain::NetworkDns,
        "egress_drop" | "network_partition" => FaultDomain::NetworkEgress,
        "cpu_throttle" => FaultDomain::CpuThrottle,
        "memory_pressure" => FaultDomain::MemoryPressure,
        "provider_throttle" => FaultDomain::ProviderThrottle,
        "provider_error" => FaultDomain::ProviderError,
        "retrieval_slowdown" => FaultDomain::RetrievalBackend,
        _ => FaultDomain::Unknown,
    }
}

/// Rule-based incident envelope for one sample
pub fn build_attribution(sample: &FaultSample) -> IncidentAttribution {
    let domain = map_fault_label(&sample.fault_label);

    let mut evidence = vec![
        Evidence::new("fault_label", sample.fault_label.as_str(), "application"),
        Evidence::new("mapped_domain", domain.as_str(), "ebpf"),
        Evidence::new(
            semconv::ATTR_CORRELATION_CONFIDENCE,
            sample.confidence,
            "otel",
        ),
    ];
    if sample.fault_label == "dns_latency" {
        evidence.push(Evidence::new(
            semconv::ATTR_DNS_LATENCY_MS,
            DNS_EVIDENCE_LATENCY_MS,
            "ebpf",
        ));
    }

    let non_empty = |id: &str| {
        if id.is_empty() {
            Vec::new()
        } else {
            vec![id.to_string()]
        }
    };

    IncidentAttribution {
        incident_id: sample.incident_id.clone(),
        timestamp: sample.timestamp,
        cluster: sample.cluster.clone(),
        namespace: sample.namespace.clone(),
        service: sample.service.clone(),
        predicted_fault_domain: domain,
        confidence: sample.confidence,
        evidence,
        slo_impact: SloImpact {
            sli: DEFAULT_SLI.to_string(),
            burn_rate: sample.burn_rate,
            window_minutes: sample.window_minutes,
        },
        trace_ids: non_empty(&sample.trace_id),
        request_ids: non_empty(&sample.request_id),
        fault_hypotheses: Vec::new(),
    }
}

/// Load fault samples from a JSONL file
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<FaultSample>, LoadError> {
    jsonl::load_records(path)
}
