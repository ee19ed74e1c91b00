// Span/signal correlation matching
//
// Decides whether one kernel signal sample and one application span describe
// the same request. Rules are strict tiers checked in a fixed order: the first
// satisfied tier wins, there is no weighted blending of identity and timing.

use crate::signal::SignalKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default span/signal correlation window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(2000);

/// Minimum confidence for a signal to be merged into span attributes
pub const DEFAULT_ENRICHMENT_THRESHOLD: f64 = 0.7;

const POD_PID_WINDOW: Duration = Duration::from_millis(100);
const POD_CONN_WINDOW: Duration = Duration::from_millis(250);
const SERVICE_NODE_WINDOW: Duration = Duration::from_millis(500);

fn is_zero(pid: &u32) -> bool {
    *pid == 0
}

/// Correlation identity of one application request span
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pid: u32,
    /// Flow tuple, e.g. `10.0.0.2:42424->10.0.0.53:443/tcp`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conn_tuple: String,
    /// `None` is the zero timestamp and never correlates
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One kernel measurement with the same identity fields as [`SpanRef`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalRef {
    /// Wire name of the signal; see [`SignalRef::kind`]
    pub signal: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pid: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conn_tuple: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub value: f64,
}

impl SignalRef {
    /// Signal vocabulary entry, `None` for names the probes never emit
    pub fn kind(&self) -> Option<SignalKind> {
        self.signal.parse().ok()
    }
}

/// Identity/timing rule that produced a match, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "trace_id_exact")]
    TraceIdExact,
    #[serde(rename = "pod_pid_100ms")]
    PodPid100ms,
    #[serde(rename = "pod_conn_250ms")]
    PodConn250ms,
    #[serde(rename = "service_node_500ms")]
    ServiceNode500ms,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::TraceIdExact => "trace_id_exact",
            Tier::PodPid100ms => "pod_pid_100ms",
            Tier::PodConn250ms => "pod_conn_250ms",
            Tier::ServiceNode500ms => "service_node_500ms",
        }
    }

    /// Confidence is fully determined by the tier
    pub fn confidence(&self) -> f64 {
        match self {
            Tier::TraceIdExact => 1.0,
            Tier::PodPid100ms => 0.9,
            Tier::PodConn250ms => 0.8,
            Tier::ServiceNode500ms => 0.65,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one match attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub matched: bool,
    pub confidence: f64,
    pub tier: Option<Tier>,
}

impl Decision {
    pub fn unmatched() -> Self {
        Self::default()
    }

    fn from_tier(tier: Tier) -> Self {
        Self {
            matched: true,
            confidence: tier.confidence(),
            tier: Some(tier),
        }
    }

    /// Wire name of the tier, empty when unmatched
    pub fn tier_name(&self) -> &'static str {
        self.tier.map(|t| t.as_str()).unwrap_or("")
    }
}

/// Absolute distance between two timestamps
///
/// `None` when either side is the zero timestamp.
pub fn time_distance(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<Duration> {
    let (a, b) = (a?, b?);
    let delta = a.signed_duration_since(b);
    let delta = if delta < chrono::Duration::zero() {
        -delta
    } else {
        delta
    };
    delta.to_std().ok()
}

fn same_non_empty(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// Match one span against one signal
///
/// A zero `window` falls back to [`DEFAULT_WINDOW`]. The window gate applies
/// before any tier; afterwards tiers are tried strongest first.
///
/// # Example
/// ```
/// use faultlens::correlation::{match_signal, SignalRef, SpanRef, Tier};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let now = Utc::now();
/// let span = SpanRef { trace_id: "t-1".into(), timestamp: Some(now), ..Default::default() };
/// let signal = SignalRef {
///     signal: "dns_latency_ms".into(),
///     trace_id: "t-1".into(),
///     timestamp: Some(now),
///     value: 120.0,
///     ..Default::default()
/// };
///
/// let decision = match_signal(&span, &signal, Duration::ZERO);
/// assert_eq!(decision.tier, Some(Tier::TraceIdExact));
/// assert_eq!(decision.confidence, 1.0);
/// ```
pub fn match_signal(span: &SpanRef, signal: &SignalRef, window: Duration) -> Decision {
    let window = if window.is_zero() {
        DEFAULT_WINDOW
    } else {
        window
    };

    let Some(distance) = time_distance(span.timestamp, signal.timestamp) else {
        return Decision::unmatched();
    };
    if distance > window {
        return Decision::unmatched();
    }

    if same_non_empty(&span.trace_id, &signal.trace_id) {
        return Decision::from_tier(Tier::TraceIdExact);
    }

    let same_pod = same_non_empty(&span.pod, &signal.pod);

    if same_pod && span.pid > 0 && span.pid == signal.pid && distance <= POD_PID_WINDOW {
        return Decision::from_tier(Tier::PodPid100ms);
    }

    if same_pod && same_non_empty(&span.conn_tuple, &signal.conn_tuple) && distance <= POD_CONN_WINDOW
    {
        return Decision::from_tier(Tier::PodConn250ms);
    }

    if same_non_empty(&span.service, &signal.service)
        && same_non_empty(&span.node, &signal.node)
        && distance <= SERVICE_NODE_WINDOW
    {
        return Decision::from_tier(Tier::ServiceNode500ms);
    }

    Decision::unmatched()
}
