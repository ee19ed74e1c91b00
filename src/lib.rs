//! faultlens - kernel-signal correlation and fault attribution for LLM serving
//!
//! This library matches kernel signal samples (DNS latency, TCP retransmits,
//! scheduler delay, TLS handshakes, memory reclaim) to application request
//! spans, enriches spans with the confident matches, and infers the most
//! likely fault domain behind an SLO incident with a naive-Bayes attributor.

pub mod attribution;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod csv_output;
pub mod jsonl;
pub mod schema;
pub mod semconv;
pub mod signal;
