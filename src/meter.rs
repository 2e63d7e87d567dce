//! Sliding-window request-rate meter
//!
//! ## Table of Contents
//! - **RequestBatch**: Batch of request timestamps reported by the proxy
//! - **RequestRateMeter**: Window-bounded timestamp store with an RPS query

use serde::{Deserialize, Serialize};

/// A batch of request timestamps reported by the request aggregator.
///
/// Timestamps are seconds since the Unix epoch, matching the clock `now`
/// passed to [`RequestRateMeter::ingest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBatch {
    /// Request timestamps, in seconds since epoch.
    pub timestamps: Vec<f64>,
}

impl RequestBatch {
    /// Build a batch from a list of timestamps.
    pub fn new(timestamps: Vec<f64>) -> Self {
        Self { timestamps }
    }
}

/// Tracks request timestamps within a trailing window and reports the
/// current request rate.
///
/// Newly appended timestamps are sorted in place, since the proxy transport
/// does not guarantee delivery order across batches; this keeps eviction a
/// simple prefix cut via [`slice::partition_point`] (the lower-bound binary
/// search `bisect_left` performs).
#[derive(Debug, Clone)]
pub struct RequestRateMeter {
    window_size: f64,
    timestamps: Vec<f64>,
}

impl RequestRateMeter {
    /// Create a new meter with the given window size in seconds.
    pub fn new(window_size_secs: u64) -> Self {
        Self {
            window_size: window_size_secs as f64,
            timestamps: Vec::new(),
        }
    }

    /// Window size in seconds.
    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    /// Absorb a batch of timestamps and evict anything older than the window.
    pub fn ingest(&mut self, batch: RequestBatch, now: f64) {
        self.timestamps.extend(batch.timestamps);
        self.timestamps
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let cutoff = now - self.window_size;
        let index = self.timestamps.partition_point(|&t| t < cutoff);
        self.timestamps.drain(..index);
    }

    /// Number of timestamps currently retained in the window.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Current requests-per-second, i.e. timestamps in window / window size.
    pub fn current_rps(&self) -> f64 {
        self.timestamps.len() as f64 / self.window_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_evicts_old_timestamps() {
        let mut meter = RequestRateMeter::new(60);
        meter.ingest(RequestBatch::new(vec![0.0, 10.0, 50.0]), 50.0);
        assert_eq!(meter.len(), 3);

        meter.ingest(RequestBatch::new(vec![70.0]), 70.0);
        // cutoff = 70 - 60 = 10; 0.0 evicted, 10.0 kept (>= cutoff)
        assert_eq!(meter.len(), 3);
        assert!(meter.current_rps() > 0.0);
    }

    #[test]
    fn test_ingest_handles_unsorted_batches() {
        let mut meter = RequestRateMeter::new(10);
        meter.ingest(RequestBatch::new(vec![5.0, 1.0, 3.0]), 5.0);
        assert_eq!(meter.len(), 3);
    }

    #[test]
    fn test_current_rps_zero_when_empty() {
        let meter = RequestRateMeter::new(60);
        assert_eq!(meter.current_rps(), 0.0);
    }

    #[test]
    fn test_window_invariant_after_ingest() {
        let mut meter = RequestRateMeter::new(5);
        meter.ingest(RequestBatch::new(vec![1.0, 2.0, 3.0, 4.0, 100.0]), 100.0);
        // cutoff = 95; only 100.0 should survive
        assert_eq!(meter.len(), 1);
    }
}
