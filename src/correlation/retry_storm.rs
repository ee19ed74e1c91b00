// Retry-storm detection
//
// Counts TCP retransmit events per workload (pod) inside a sliding window.
// A burst at or above the threshold marks the workload as storming so that
// cascading retransmits are not attributed as independent network faults.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default window for counting retransmit events
pub const DEFAULT_STORM_WINDOW: Duration = Duration::from_secs(10);

/// Default event count that constitutes a storm
pub const DEFAULT_STORM_THRESHOLD: usize = 5;

/// Time-ordered retransmit timestamps for one workload
#[derive(Debug, Default)]
struct StormBucket {
    events: Vec<DateTime<Utc>>,
}

impl StormBucket {
    /// Insert keeping `events` sorted; equal timestamps keep arrival order
    fn insert(&mut self, timestamp: DateTime<Utc>) {
        let at = self.events.partition_point(|ts| *ts <= timestamp);
        self.events.insert(at, timestamp);
    }

    fn latest(&self) -> Option<DateTime<Utc>> {
        self.events.last().copied()
    }

    /// Drop events strictly older than `now - window`
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let Ok(window) = chrono::Duration::from_std(window) else {
            return;
        };
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return;
        };
        let stale = self.events.iter().take_while(|ts| **ts < cutoff).count();
        if stale > 0 {
            self.events.drain(..stale);
        }
    }
}

/// Sliding-window burst detector keyed by workload identity
///
/// All state sits behind one mutex; call volume is bounded by the retransmit
/// event rate so a single coarse lock is enough.
///
/// # Example
/// ```
/// use faultlens::correlation::RetryStormDetector;
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let detector = RetryStormDetector::new(Duration::from_secs(10), 2);
/// let now = Utc::now();
/// assert!(!detector.record("pod-a", now));
/// assert!(detector.record("pod-a", now));
/// assert_eq!(detector.count("pod-a", now), 2);
/// ```
#[derive(Debug)]
pub struct RetryStormDetector {
    window: Duration,
    threshold: usize,
    buckets: Mutex<HashMap<String, StormBucket>>,
}

impl Default for RetryStormDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STORM_WINDOW, DEFAULT_STORM_THRESHOLD)
    }
}

impl RetryStormDetector {
    /// A zero `threshold` is raised to 1 so that a workload with no events is
    /// never storming.
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            window,
            threshold: threshold.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    // Every mutation leaves the map consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, HashMap<String, StormBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one retransmit for `key`
    ///
    /// Returns whether the workload is in storm state after this event.
    /// Late events are slotted in time order and the window ends at the
    /// newest event seen for `key`.
    pub fn record(&self, key: &str, timestamp: DateTime<Utc>) -> bool {
        let mut buckets = self.lock();
        let bucket = buckets.entry(key.to_string()).or_default();
        bucket.insert(timestamp);
        let newest = bucket.latest().unwrap_or(timestamp);
        bucket.prune(newest, self.window);

        let storm = bucket.events.len() >= self.threshold;
        if storm {
            tracing::debug!(key, count = bucket.events.len(), "retry storm");
        }
        storm
    }

    /// Whether `key` has at least `threshold` events in the window ending at `now`
    pub fn is_storm(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.count(key, now) >= self.threshold
    }

    /// Events for `key` in the window ending at `now`
    ///
    /// Unknown keys count zero. Workloads whose events have all expired are
    /// forgotten.
    pub fn count(&self, key: &str, now: DateTime<Utc>) -> usize {
        let mut buckets = self.lock();
        let Some(bucket) = buckets.get_mut(key) else {
            return 0;
        };
        bucket.prune(now, self.window);
        let count = bucket.events.len();
        if count == 0 {
            buckets.remove(key);
        }
        count
    }

    /// Forget every workload
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Number of workloads with retained events
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }
}
