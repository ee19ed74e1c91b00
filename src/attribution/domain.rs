// Fault domain vocabulary
//
// The closed set of root-cause categories. Priors, likelihoods and posteriors
// are all indexed over exactly these eight variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Root-cause category of an SLO incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultDomain {
    NetworkDns,
    NetworkEgress,
    CpuThrottle,
    MemoryPressure,
    ProviderThrottle,
    ProviderError,
    RetrievalBackend,
    Unknown,
}

/// Domain name outside the known vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fault domain: {0}")]
pub struct UnknownDomain(pub String);

impl FaultDomain {
    /// Every domain, in the order used for tie-breaking equal posteriors
    pub const ALL: [FaultDomain; 8] = [
        FaultDomain::NetworkDns,
        FaultDomain::NetworkEgress,
        FaultDomain::CpuThrottle,
        FaultDomain::MemoryPressure,
        FaultDomain::ProviderThrottle,
        FaultDomain::ProviderError,
        FaultDomain::RetrievalBackend,
        FaultDomain::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultDomain::NetworkDns => "network_dns",
            FaultDomain::NetworkEgress => "network_egress",
            FaultDomain::CpuThrottle => "cpu_throttle",
            FaultDomain::MemoryPressure => "memory_pressure",
            FaultDomain::ProviderThrottle => "provider_throttle",
            FaultDomain::ProviderError => "provider_error",
            FaultDomain::RetrievalBackend => "retrieval_backend",
            FaultDomain::Unknown => "unknown",
        }
    }
}

/// All fault domains as a list
pub fn all_domains() -> Vec<FaultDomain> {
    FaultDomain::ALL.to_vec()
}

impl fmt::Display for FaultDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaultDomain::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}
