//! Span attribute keys for kernel-signal enrichment
//!
//! These names are part of the exported span schema and must stay stable.

pub const ATTR_DNS_LATENCY_MS: &str = "llm.ebpf.dns.latency_ms";
pub const ATTR_TCP_RETRANSMITS: &str = "llm.ebpf.tcp.retransmits";
pub const ATTR_RUNQUEUE_DELAY_MS: &str = "llm.ebpf.sched.runqueue_delay_ms";
pub const ATTR_CONNECT_LATENCY_MS: &str = "llm.ebpf.net.connect_latency_ms";
pub const ATTR_TLS_HANDSHAKE_MS: &str = "llm.ebpf.tls.handshake_ms";
pub const ATTR_CPU_STEAL_PCT: &str = "llm.ebpf.cpu.steal_pct";
pub const ATTR_CFS_THROTTLED_MS: &str = "llm.ebpf.cpu.cfs_throttled_ms";
pub const ATTR_MEM_RECLAIM_LATENCY_MS: &str = "llm.ebpf.mem.reclaim_latency_ms";
pub const ATTR_DISK_IO_LATENCY_MS: &str = "llm.ebpf.disk.io_latency_ms";
pub const ATTR_SYSCALL_LATENCY_MS: &str = "llm.ebpf.syscall.latency_ms";

/// Highest confidence among the signals merged into a span
pub const ATTR_CORRELATION_CONFIDENCE: &str = "llm.ebpf.correlation_confidence";

/// DNS + connect + TLS handshake time attributed to the kernel
pub const ATTR_RETRIEVAL_KERNEL_MS: &str = "llm.ebpf.retrieval.kernel_attributed_ms";
