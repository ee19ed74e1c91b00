// Fault-domain attribution
//
// Turns fault samples into incident attribution envelopes, either through
// the deterministic label mapping or the naive-Bayes attributor, and scores
// the results against ground truth for offline evaluation.

mod bayesian;
mod domain;
mod mapper;
mod pipeline;

pub use bayesian::{
    default_likelihoods, default_priors, BayesianAttributor, LikelihoodTable, Posterior,
    MAX_LIKELIHOOD, MIN_LIKELIHOOD, MIN_REPORTED_POSTERIOR, PRIOR_FLOOR,
};
pub use domain::{all_domains, FaultDomain, UnknownDomain};
pub use mapper::{build_attribution, load_samples, map_fault_label, FaultSample, DEFAULT_SLI};
pub use pipeline::{
    accuracy, build_attributions, build_confusion_matrix, coverage_accuracy, partial_accuracy,
    AttributionMode, AttributionSummary, MatrixKey, DEFAULT_COVERAGE_THRESHOLD,
};
