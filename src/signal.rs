//! Kernel signal vocabulary
//!
//! Every signal the probes can emit is a closed variant. Wire names are only
//! converted at the boundary (JSON records, CLI input) via [`SignalKind::as_str`]
//! and [`std::str::FromStr`].

use crate::semconv;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One named kernel measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DnsLatencyMs,
    TcpRetransmitsTotal,
    RunqueueDelayMs,
    ConnectLatencyMs,
    TlsHandshakeMs,
    CpuStealPct,
    CfsThrottledMs,
    MemReclaimLatencyMs,
    DiskIoLatencyMs,
    SyscallLatencyMs,
    ConnectErrorsTotal,
    TlsHandshakeFailTotal,
}

/// Signal name outside the known vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown signal name: {0}")]
pub struct UnknownSignal(pub String);

impl SignalKind {
    pub const ALL: [SignalKind; 12] = [
        SignalKind::DnsLatencyMs,
        SignalKind::TcpRetransmitsTotal,
        SignalKind::RunqueueDelayMs,
        SignalKind::ConnectLatencyMs,
        SignalKind::TlsHandshakeMs,
        SignalKind::CpuStealPct,
        SignalKind::CfsThrottledMs,
        SignalKind::MemReclaimLatencyMs,
        SignalKind::DiskIoLatencyMs,
        SignalKind::SyscallLatencyMs,
        SignalKind::ConnectErrorsTotal,
        SignalKind::TlsHandshakeFailTotal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::DnsLatencyMs => "dns_latency_ms",
            SignalKind::TcpRetransmitsTotal => "tcp_retransmits_total",
            SignalKind::RunqueueDelayMs => "runqueue_delay_ms",
            SignalKind::ConnectLatencyMs => "connect_latency_ms",
            SignalKind::TlsHandshakeMs => "tls_handshake_ms",
            SignalKind::CpuStealPct => "cpu_steal_pct",
            SignalKind::CfsThrottledMs => "cfs_throttled_ms",
            SignalKind::MemReclaimLatencyMs => "mem_reclaim_latency_ms",
            SignalKind::DiskIoLatencyMs => "disk_io_latency_ms",
            SignalKind::SyscallLatencyMs => "syscall_latency_ms",
            SignalKind::ConnectErrorsTotal => "connect_errors_total",
            SignalKind::TlsHandshakeFailTotal => "tls_handshake_fail_total",
        }
    }

    /// Value at or above which the signal counts as elevated
    pub fn elevation_threshold(&self) -> f64 {
        match self {
            SignalKind::DnsLatencyMs => 40.0,
            SignalKind::TcpRetransmitsTotal => 2.0,
            SignalKind::RunqueueDelayMs => 10.0,
            SignalKind::ConnectLatencyMs => 80.0,
            SignalKind::TlsHandshakeMs => 60.0,
            SignalKind::CpuStealPct => 2.0,
            SignalKind::CfsThrottledMs => 40.0,
            SignalKind::MemReclaimLatencyMs => 5.0,
            SignalKind::DiskIoLatencyMs => 10.0,
            SignalKind::SyscallLatencyMs => 50.0,
            SignalKind::ConnectErrorsTotal => 1.0,
            SignalKind::TlsHandshakeFailTotal => 1.0,
        }
    }

    pub fn is_elevated(&self, value: f64) -> bool {
        value >= self.elevation_threshold()
    }

    /// Span attribute the signal is merged under during enrichment
    ///
    /// Error counters have no span attribute and are rejected by the enricher.
    pub fn attribute_key(&self) -> Option<&'static str> {
        match self {
            SignalKind::DnsLatencyMs => Some(semconv::ATTR_DNS_LATENCY_MS),
            SignalKind::TcpRetransmitsTotal => Some(semconv::ATTR_TCP_RETRANSMITS),
            SignalKind::RunqueueDelayMs => Some(semconv::ATTR_RUNQUEUE_DELAY_MS),
            SignalKind::ConnectLatencyMs => Some(semconv::ATTR_CONNECT_LATENCY_MS),
            SignalKind::TlsHandshakeMs => Some(semconv::ATTR_TLS_HANDSHAKE_MS),
            SignalKind::CpuStealPct => Some(semconv::ATTR_CPU_STEAL_PCT),
            SignalKind::CfsThrottledMs => Some(semconv::ATTR_CFS_THROTTLED_MS),
            SignalKind::MemReclaimLatencyMs => Some(semconv::ATTR_MEM_RECLAIM_LATENCY_MS),
            SignalKind::DiskIoLatencyMs => Some(semconv::ATTR_DISK_IO_LATENCY_MS),
            SignalKind::SyscallLatencyMs => Some(semconv::ATTR_SYSCALL_LATENCY_MS),
            SignalKind::ConnectErrorsTotal | SignalKind::TlsHandshakeFailTotal => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownSignal(s.to_string()))
    }
}
