// Multi-signal span enrichment
//
// Runs the matcher across every candidate signal for one span, keeps the
// confident ones, ranks them, applies the fan-out limit and merges the
// survivors into a fresh attribute map. The caller's map is never touched.

use crate::correlation::matcher::{
    match_signal, time_distance, Decision, SignalRef, SpanRef, DEFAULT_ENRICHMENT_THRESHOLD,
    DEFAULT_WINDOW,
};
use crate::semconv;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default number of signals merged into one span
pub const DEFAULT_MAX_FANOUT: usize = 3;

/// Span attribute map: attribute key to numeric value
pub type Attributes = BTreeMap<String, f64>;

/// Counters for signals that did not make it into the attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebugStats {
    pub unmatched: usize,
    pub low_confidence: usize,
    pub fanout_dropped: usize,
    pub unsupported_type: usize,
}

/// One accepted signal with its match decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub signal: SignalRef,
    pub decision: Decision,
}

/// Output of [`Correlator::enrich`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentResult {
    pub attributes: Attributes,
    pub candidates: Vec<Candidate>,
    pub debug: DebugStats,
}

/// Span enricher with its correlation tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlator {
    pub window: Duration,
    pub enrichment_threshold: f64,
    pub max_fanout: usize,
}

impl Default for Correlator {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            enrichment_threshold: DEFAULT_ENRICHMENT_THRESHOLD,
            max_fanout: DEFAULT_MAX_FANOUT,
        }
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    fn effective_threshold(&self) -> f64 {
        if self.enrichment_threshold > 0.0 {
            self.enrichment_threshold
        } else {
            DEFAULT_ENRICHMENT_THRESHOLD
        }
    }

    fn effective_fanout(&self) -> usize {
        if self.max_fanout > 0 {
            self.max_fanout
        } else {
            DEFAULT_MAX_FANOUT
        }
    }

    /// Enrich a span from any set of candidate signals
    ///
    /// Signals without a span attribute count as `unsupported_type`, failed
    /// matches and NaN or infinite values as `unmatched`, matches under the threshold as
    /// `low_confidence`. Accepted candidates are ranked by confidence, then by
    /// closeness to the span timestamp, and cut at the fan-out limit.
    ///
    /// Merging keeps the larger of the existing and the new value per key, so
    /// feeding the output back in as `base` never lowers a value.
    pub fn enrich(&self, base: &Attributes, span: &SpanRef, signals: &[SignalRef]) -> EnrichmentResult {
        let threshold = self.effective_threshold();
        let fanout = self.effective_fanout();

        let mut debug = DebugStats::default();
        let mut candidates = Vec::with_capacity(signals.len());

        for signal in signals {
            if signal.kind().and_then(|k| k.attribute_key()).is_none() {
                tracing::debug!(signal = %signal.signal, "unsupported signal type");
                debug.unsupported_type += 1;
                continue;
            }
            if !signal.value.is_finite() {
                tracing::debug!(signal = %signal.signal, "non-finite signal value");
                debug.unmatched += 1;
                continue;
            }

            let decision = match_signal(span, signal, self.window);
            if !decision.matched {
                debug.unmatched += 1;
                continue;
            }
            if decision.confidence < threshold {
                tracing::debug!(
                    signal = %signal.signal,
                    tier = decision.tier_name(),
                    confidence = decision.confidence,
                    "correlation below enrichment threshold"
                );
                debug.low_confidence += 1;
                continue;
            }

            candidates.push(Candidate {
                signal: signal.clone(),
                decision,
            });
        }

        // Stable sort: equal confidence and distance keep input order
        candidates.sort_by(|a, b| rank(span, a, b));

        if candidates.len() > fanout {
            debug.fanout_dropped = candidates.len() - fanout;
            candidates.truncate(fanout);
        }

        let mut attributes = base.clone();
        let mut max_confidence = 0.0_f64;

        for candidate in &candidates {
            let Some(key) = candidate.signal.kind().and_then(|k| k.attribute_key()) else {
                continue;
            };
            let value = candidate.signal.value;
            attributes
                .entry(key.to_string())
                .and_modify(|existing| {
                    if value > *existing {
                        *existing = value;
                    }
                })
                .or_insert(value);
            max_confidence = max_confidence.max(candidate.decision.confidence);
        }

        if max_confidence > 0.0 {
            attributes.insert(
                semconv::ATTR_CORRELATION_CONFIDENCE.to_string(),
                max_confidence,
            );
        }

        EnrichmentResult {
            attributes,
            candidates,
            debug,
        }
    }

    /// Enrich a span from a single signal
    ///
    /// Same algorithm as [`Correlator::enrich`] on a one-element list. Returns
    /// the accepted decision, or an unmatched decision when the signal was
    /// filtered out for any reason.
    pub fn enrich_one(&self, base: &Attributes, span: &SpanRef, signal: &SignalRef) -> (Attributes, Decision) {
        let result = self.enrich(base, span, std::slice::from_ref(signal));
        let decision = result
            .candidates
            .first()
            .map(|c| c.decision)
            .unwrap_or_else(Decision::unmatched);
        (result.attributes, decision)
    }
}

fn rank(span: &SpanRef, a: &Candidate, b: &Candidate) -> Ordering {
    b.decision
        .confidence
        .partial_cmp(&a.decision.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let da = time_distance(span.timestamp, a.signal.timestamp).unwrap_or(Duration::MAX);
            let db = time_distance(span.timestamp, b.signal.timestamp).unwrap_or(Duration::MAX);
            da.cmp(&db)
        })
}

/// Sum the kernel-attributed share of retrieval latency
///
/// Adds DNS, connect and TLS handshake attributes (absent keys contribute
/// nothing) and records the total under
/// [`semconv::ATTR_RETRIEVAL_KERNEL_MS`] when it is positive.
pub fn decompose_retrieval(attrs: &mut Attributes) -> f64 {
    let total: f64 = [
        semconv::ATTR_DNS_LATENCY_MS,
        semconv::ATTR_CONNECT_LATENCY_MS,
        semconv::ATTR_TLS_HANDSHAKE_MS,
    ]
    .iter()
    .filter_map(|key| attrs.get(*key))
    .sum();

    if total > 0.0 {
        attrs.insert(semconv::ATTR_RETRIEVAL_KERNEL_MS.to_string(), total);
    }
    total
}
