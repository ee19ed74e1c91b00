// Kernel-signal to application-span correlation
//
// The matcher decides whether one signal sample and one span describe the
// same request. The enricher applies it across candidate signals and merges
// the confident ones into span attributes. The retry-storm detector fences
// retransmit bursts, and the evaluator scores the matcher against labeled
// ground truth for CI gating.

mod enricher;
mod evaluator;
mod matcher;
mod retry_storm;

pub use enricher::{
    decompose_retrieval, Attributes, Candidate, Correlator, DebugStats, EnrichmentResult,
    DEFAULT_MAX_FANOUT,
};
pub use evaluator::{
    evaluate_gate, evaluate_labeled_pairs, load_labeled_pairs, EvalReport, GateResult,
    LabeledPair, Prediction,
};
pub use matcher::{
    match_signal, time_distance, Decision, SignalRef, SpanRef, Tier,
    DEFAULT_ENRICHMENT_THRESHOLD, DEFAULT_WINDOW,
};
pub use retry_storm::{RetryStormDetector, DEFAULT_STORM_THRESHOLD, DEFAULT_STORM_WINDOW};
