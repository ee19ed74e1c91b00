// Naive-Bayes fault attribution
//
// P(domain | signals) is proportional to P(domain) times the product over
// every configured signal of P(signal state | domain). All arithmetic runs in
// the log domain and is normalized with log-sum-exp.

use crate::attribution::domain::FaultDomain;
use crate::attribution::mapper::{build_attribution, FaultSample};
use crate::schema::{FaultHypothesis, IncidentAttribution};
use crate::signal::SignalKind;
use std::collections::BTreeMap;

/// Lower clamp bound for any likelihood term
pub const MIN_LIKELIHOOD: f64 = 0.01;
/// Upper clamp bound for any likelihood term
pub const MAX_LIKELIHOOD: f64 = 0.99;
/// Floor substituted for non-positive priors
pub const PRIOR_FLOOR: f64 = 1e-10;
/// Hypotheses below this posterior are left out of the envelope
pub const MIN_REPORTED_POSTERIOR: f64 = 0.01;

// Likelihood that each domain is observed with the signal elevated.
// Column order follows FaultDomain::ALL.
const LIKELIHOOD_TABLE: [(SignalKind, [f64; 8]); 12] = [
    (SignalKind::DnsLatencyMs, [0.95, 0.70, 0.10, 0.10, 0.10, 0.10, 0.15, 0.10]),
    (SignalKind::TcpRetransmitsTotal, [0.15, 0.90, 0.10, 0.10, 0.10, 0.15, 0.10, 0.10]),
    (SignalKind::RunqueueDelayMs, [0.10, 0.10, 0.90, 0.60, 0.10, 0.10, 0.10, 0.10]),
    (SignalKind::ConnectLatencyMs, [0.50, 0.85, 0.10, 0.10, 0.75, 0.40, 0.30, 0.10]),
    (SignalKind::TlsHandshakeMs, [0.10, 0.30, 0.10, 0.10, 0.80, 0.50, 0.20, 0.10]),
    (SignalKind::CpuStealPct, [0.10, 0.10, 0.90, 0.20, 0.10, 0.10, 0.10, 0.10]),
    (SignalKind::CfsThrottledMs, [0.10, 0.10, 0.85, 0.75, 0.10, 0.10, 0.10, 0.10]),
    (SignalKind::MemReclaimLatencyMs, [0.05, 0.05, 0.15, 0.95, 0.05, 0.05, 0.05, 0.05]),
    (SignalKind::DiskIoLatencyMs, [0.05, 0.05, 0.10, 0.85, 0.05, 0.05, 0.30, 0.05]),
    (SignalKind::SyscallLatencyMs, [0.10, 0.20, 0.15, 0.10, 0.90, 0.60, 0.40, 0.10]),
    (SignalKind::ConnectErrorsTotal, [0.10, 0.80, 0.05, 0.05, 0.60, 0.85, 0.15, 0.10]),
    (SignalKind::TlsHandshakeFailTotal, [0.05, 0.70, 0.05, 0.05, 0.30, 0.60, 0.10, 0.05]),
];

/// P(signal elevated | domain), keyed signal then domain
pub type LikelihoodTable = BTreeMap<SignalKind, BTreeMap<FaultDomain, f64>>;

/// Uniform priors over every fault domain
pub fn default_priors() -> BTreeMap<FaultDomain, f64> {
    let p = 1.0 / FaultDomain::ALL.len() as f64;
    FaultDomain::ALL.iter().map(|d| (*d, p)).collect()
}

/// Likelihoods calibrated against the fault-injection signal profiles
pub fn default_likelihoods() -> LikelihoodTable {
    LIKELIHOOD_TABLE
        .iter()
        .map(|(signal, row)| {
            let by_domain = FaultDomain::ALL
                .iter()
                .copied()
                .zip(row.iter().copied())
                .collect();
            (*signal, by_domain)
        })
        .collect()
}

fn clamp_likelihood(p: f64) -> f64 {
    p.clamp(MIN_LIKELIHOOD, MAX_LIKELIHOOD)
}

/// One domain's posterior and the elevated signals supporting it
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    pub domain: FaultDomain,
    pub posterior: f64,
    /// Elevated signals with likelihood >= 0.5 for this domain, in name order
    pub evidence: Vec<SignalKind>,
}

/// Bayesian attributor over the fixed domain set
///
/// Stateless per call; one instance can be shared across threads.
///
/// # Example
/// ```
/// use faultlens::attribution::{BayesianAttributor, FaultDomain};
/// use faultlens::signal::SignalKind;
/// use std::collections::BTreeMap;
///
/// let attributor = BayesianAttributor::new();
/// let signals = BTreeMap::from([(SignalKind::DnsLatencyMs, 220.0)]);
/// let posteriors = attributor.attribute(&signals);
/// assert_eq!(posteriors[0].domain, FaultDomain::NetworkDns);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BayesianAttributor {
    pub priors: BTreeMap<FaultDomain, f64>,
    pub likelihoods: LikelihoodTable,
}

impl Default for BayesianAttributor {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianAttributor {
    pub fn new() -> Self {
        Self {
            priors: default_priors(),
            likelihoods: default_likelihoods(),
        }
    }

    /// Likelihood of the observed state of `signal` under `domain`
    ///
    /// Signals or domains missing from the table are uninformative (0.5).
    fn likelihood_for(&self, signal: SignalKind, domain: FaultDomain, elevated: bool) -> f64 {
        match self.likelihoods.get(&signal).and_then(|row| row.get(&domain)) {
            Some(&p) if elevated => clamp_likelihood(p),
            Some(&p) => clamp_likelihood(1.0 - p),
            None => 0.5,
        }
    }

    fn log_prior(&self, domain: FaultDomain) -> f64 {
        let prior = self.priors.get(&domain).copied().unwrap_or(0.0);
        if prior > 0.0 {
            prior.ln()
        } else {
            PRIOR_FLOOR.ln()
        }
    }

    /// Posterior distribution over every fault domain
    ///
    /// The result always has one entry per domain, sums to 1 and is sorted by
    /// posterior descending; equal posteriors keep [`FaultDomain::ALL`] order.
    pub fn attribute(&self, signals: &BTreeMap<SignalKind, f64>) -> Vec<Posterior> {
        let elevated: Vec<SignalKind> = signals
            .iter()
            .filter(|(kind, value)| kind.is_elevated(**value))
            .map(|(kind, _)| *kind)
            .collect();

        let log_posteriors: Vec<f64> = FaultDomain::ALL
            .iter()
            .map(|&domain| {
                self.likelihoods.keys().fold(self.log_prior(domain), |acc, &signal| {
                    let is_elevated = elevated.contains(&signal);
                    acc + self.likelihood_for(signal, domain, is_elevated).ln()
                })
            })
            .collect();

        let max_log = log_posteriors
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let sum_exp: f64 = log_posteriors.iter().map(|lp| (lp - max_log).exp()).sum();
        let log_z = max_log + sum_exp.ln();

        let mut result: Vec<Posterior> = FaultDomain::ALL
            .iter()
            .zip(log_posteriors)
            .map(|(&domain, lp)| {
                let mut evidence: Vec<SignalKind> = elevated
                    .iter()
                    .copied()
                    .filter(|signal| {
                        self.likelihoods
                            .get(signal)
                            .and_then(|row| row.get(&domain))
                            .is_some_and(|p| *p >= 0.5)
                    })
                    .collect();
                evidence.sort_by_key(|s| s.as_str());
                Posterior {
                    domain,
                    posterior: (lp - log_z).exp(),
                    evidence,
                }
            })
            .collect();

        // stable: ties keep domain order
        result.sort_by(|a, b| b.posterior.total_cmp(&a.posterior));

        if let Some(top) = result.first() {
            tracing::debug!(
                domain = %top.domain,
                posterior = top.posterior,
                elevated = elevated.len(),
                "bayesian attribution"
            );
        }
        result
    }

    /// Attribute one fault sample into an incident envelope
    ///
    /// Samples without signal values get the rule-based envelope and no
    /// hypotheses. Otherwise the top posterior becomes the predicted domain and
    /// its confidence.
    pub fn attribute_sample(&self, sample: &FaultSample) -> IncidentAttribution {
        let mut attribution = build_attribution(sample);
        if sample.signals.is_empty() {
            return attribution;
        }

        let posteriors = self.attribute(&sample.observed_signals());
        if let Some(top) = posteriors.first() {
            attribution.predicted_fault_domain = top.domain;
            attribution.confidence = top.posterior;
        }
        attribution.fault_hypotheses = posteriors
            .into_iter()
            .filter(|p| p.posterior >= MIN_REPORTED_POSTERIOR)
            .map(|p| FaultHypothesis {
                domain: p.domain,
                posterior: p.posterior,
                evidence: p.evidence,
            })
            .collect();
        attribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(pairs: &[(SignalKind, f64)]) -> BTreeMap<SignalKind, f64> {
        pairs.iter().copied().collect()
    }

    fn total(posteriors: &[Posterior]) -> f64 {
        posteriors.iter().map(|p| p.posterior).sum()
    }

    #[test]
    fn test_default_priors_uniform() {
        let priors = default_priors();
        assert_eq!(priors.len(), 8);
        for p in priors.values() {
            assert!((p - 0.125).abs() < 1e-10);
        }
    }

    #[test]
    fn test_default_likelihoods_cover_vocabulary() {
        let table = default_likelihoods();
        assert_eq!(table.len(), SignalKind::ALL.len());
        for row in table.values() {
            assert_eq!(row.len(), FaultDomain::ALL.len());
        }
        assert_eq!(
            table[&SignalKind::MemReclaimLatencyMs][&FaultDomain::MemoryPressure],
            0.95
        );
        assert_eq!(
            table[&SignalKind::ConnectErrorsTotal][&FaultDomain::ProviderError],
            0.85
        );
    }

    #[test]
    fn test_posteriors_sum_to_one() {
        let a = BayesianAttributor::new();
        let p = a.attribute(&signals(&[
            (SignalKind::DnsLatencyMs, 220.0),
            (SignalKind::ConnectLatencyMs, 130.0),
        ]));
        assert_eq!(p.len(), 8);
        assert!((total(&p) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input_is_a_distribution() {
        let a = BayesianAttributor::new();
        let p = a.attribute(&BTreeMap::new());
        assert_eq!(p.len(), 8);
        assert!((total(&p) - 1.0).abs() < 1e-6);
        assert!(p.iter().all(|h| h.evidence.is_empty()));
    }

    #[test]
    fn test_sorted_descending() {
        let a = BayesianAttributor::new();
        let p = a.attribute(&signals(&[(SignalKind::CpuStealPct, 9.0)]));
        assert!(p.windows(2).all(|w| w[0].posterior >= w[1].posterior));
    }

    #[test]
    fn test_equal_posteriors_keep_domain_order() {
        let a = BayesianAttributor {
            priors: default_priors(),
            likelihoods: BTreeMap::new(),
        };
        let p = a.attribute(&signals(&[(SignalKind::DnsLatencyMs, 500.0)]));
        let order: Vec<FaultDomain> = p.iter().map(|h| h.domain).collect();
        assert_eq!(order, FaultDomain::ALL.to_vec());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let a = BayesianAttributor::new();
        let p = a.attribute(&signals(&[(SignalKind::DnsLatencyMs, 40.0)]));
        let dns = p.iter().find(|h| h.domain == FaultDomain::NetworkDns).unwrap();
        assert_eq!(dns.evidence, vec![SignalKind::DnsLatencyMs]);
    }

    #[test]
    fn test_evidence_requires_half_likelihood() {
        let a = BayesianAttributor::new();
        let p = a.attribute(&signals(&[
            (SignalKind::DnsLatencyMs, 220.0),
            (SignalKind::ConnectLatencyMs, 130.0),
        ]));
        let dns = p.iter().find(|h| h.domain == FaultDomain::NetworkDns).unwrap();
        // connect latency likelihood for network_dns is exactly 0.5
        assert_eq!(
            dns.evidence,
            vec![SignalKind::ConnectLatencyMs, SignalKind::DnsLatencyMs]
        );
        let cpu = p.iter().find(|h| h.domain == FaultDomain::CpuThrottle).unwrap();
        assert!(cpu.evidence.is_empty());
    }

    #[test]
    fn test_zero_prior_is_floored() {
        let mut a = BayesianAttributor::new();
        a.priors.insert(FaultDomain::NetworkDns, 0.0);
        let p = a.attribute(&signals(&[(SignalKind::DnsLatencyMs, 220.0)]));
        assert!((total(&p) - 1.0).abs() < 1e-6);
        let dns = p.iter().find(|h| h.domain == FaultDomain::NetworkDns).unwrap();
        assert!(dns.posterior > 0.0);
        assert!(dns.posterior < 1e-6);
    }

    #[test]
    fn test_extreme_likelihoods_are_clamped() {
        let mut a = BayesianAttributor::new();
        a.likelihoods
            .get_mut(&SignalKind::DnsLatencyMs)
            .unwrap()
            .insert(FaultDomain::Unknown, 0.0);
        let p = a.attribute(&signals(&[(SignalKind::DnsLatencyMs, 220.0)]));
        let unknown = p.iter().find(|h| h.domain == FaultDomain::Unknown).unwrap();
        assert!(unknown.posterior > 0.0);
        assert!(unknown.posterior.is_finite());
    }
}
