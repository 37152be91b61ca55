use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage item counters.
///
/// Clones share the same counters, so the pipeline keeps one copy for
/// reporting while the stage thread records into another.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Items taken from the input side
    received: Arc<AtomicU64>,
    /// Items handed to the output side
    forwarded: Arc<AtomicU64>,
    /// Items rejected by the stage (filtered out or unparseable)
    dropped: Arc<AtomicU64>,
    start_time: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            received: Arc::new(AtomicU64::new(0)),
            forwarded: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record an item taken from the input side
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an item handed to the output side
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected item
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of items received
    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Get the total number of items forwarded
    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Get the total number of items dropped
    pub fn total_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Forwarded items per second since creation
    pub fn throughput_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_forwarded() as f64 / elapsed
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self, name: impl Into<String>) -> MetricsSnapshot {
        MetricsSnapshot {
            name: name.into(),
            received: self.total_received(),
            forwarded: self.total_forwarded(),
            dropped: self.total_dropped(),
            throughput_ips: self.throughput_ips(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of one stage's counters at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub name: String,
    pub received: u64,
    pub forwarded: u64,
    pub dropped: u64,
    pub throughput_ips: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "{}: Received: {}, Forwarded: {}, Dropped: {}, Throughput: {:.2} items/s, Elapsed: {:.2}s",
            self.name,
            self.received,
            self.forwarded,
            self.dropped,
            self.throughput_ips,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = StageMetrics::new();
        for i in 0..10 {
            metrics.record_received();
            if i % 2 == 0 {
                metrics.record_forwarded();
            } else {
                metrics.record_dropped();
            }
        }
        assert_eq!(metrics.total_received(), 10);
        assert_eq!(metrics.total_forwarded(), 5);
        assert_eq!(metrics.total_dropped(), 5);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = StageMetrics::new();
        let stage_side = metrics.clone();
        stage_side.record_forwarded();
        assert_eq!(metrics.total_forwarded(), 1);
        assert!(metrics.snapshot("s").format().starts_with("s: Received: 0, Forwarded: 1"));
    }
}
