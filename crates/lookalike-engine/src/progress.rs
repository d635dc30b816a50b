//! Engine progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;

/// Counters shared by the driver, the workers and the aggregator.
///
/// They only grow during a run and are zeroed when the next run starts.
#[derive(Debug)]
pub struct ProgressCounters {
    files_observed: AtomicU64,
    files_dispatched: AtomicU64,
    files_hashed: AtomicU64,
    bytes_hashed: AtomicU64,
    images_hashed: AtomicU64,
    errors: AtomicU64,
    started: Mutex<Instant>,
}

impl ProgressCounters {
    /// Create zeroed counters; elapsed time is measured from now.
    pub fn new() -> Self {
        Self {
            files_observed: AtomicU64::new(0),
            files_dispatched: AtomicU64::new(0),
            files_hashed: AtomicU64::new(0),
            bytes_hashed: AtomicU64::new(0),
            images_hashed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started: Mutex::new(Instant::now()),
        }
    }

    /// Zero every counter and restart the clock.
    pub(crate) fn reset(&self) {
        for counter in [
            &self.files_observed,
            &self.files_dispatched,
            &self.files_hashed,
            &self.bytes_hashed,
            &self.images_hashed,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub(crate) fn record_observed(&self) {
        self.files_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.files_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hashed(&self, bytes: u64) {
        self.files_hashed.fetch_add(1, Ordering::Relaxed);
        self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_image(&self) {
        self.images_hashed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter at once.
    pub fn snapshot(&self) -> EngineProgress {
        EngineProgress {
            files_observed: self.files_observed.load(Ordering::Relaxed),
            files_dispatched: self.files_dispatched.load(Ordering::Relaxed),
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            images_hashed: self.images_hashed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed: self
                .started
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .elapsed(),
        }
    }
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of an engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineProgress {
    /// Files handed to the engine by the walk.
    pub files_observed: u64,
    /// Files sent to the content hashing pool.
    pub files_dispatched: u64,
    /// Files whose content hash completed.
    pub files_hashed: u64,
    /// Bytes read by content hashing.
    pub bytes_hashed: u64,
    /// Images whose perceptual hash completed.
    pub images_hashed: u64,
    /// Unexpected per-file failures.
    pub errors: u64,
    /// Time since the run started.
    pub elapsed: Duration,
}

impl EngineProgress {
    /// Hashing rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Hashing throughput in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of dispatched files that finished hashing.
    pub fn hash_ratio(&self) -> f64 {
        if self.files_dispatched == 0 {
            return 1.0;
        }
        self.files_hashed as f64 / self.files_dispatched as f64
    }
}

/// Publishes progress snapshots to subscribers at a fixed cadence.
#[derive(Debug, Clone)]
pub(crate) struct ProgressReporter {
    counters: std::sync::Arc<ProgressCounters>,
    sender: broadcast::Sender<EngineProgress>,
    interval: u64,
}

impl ProgressReporter {
    pub(crate) fn new(
        counters: std::sync::Arc<ProgressCounters>,
        sender: broadcast::Sender<EngineProgress>,
        interval: u64,
    ) -> Self {
        Self {
            counters,
            sender,
            interval,
        }
    }

    /// Publish if `completed` lands on the reporting interval.
    pub(crate) fn tick(&self, completed: u64) {
        if self.interval > 0 && completed % self.interval == 0 {
            self.publish();
        }
    }

    /// Publish unconditionally. Having no subscribers is not an error.
    pub(crate) fn publish(&self) {
        let _ = self.sender.send(self.counters.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_snapshot() {
        let counters = ProgressCounters::new();
        counters.record_observed();
        counters.record_observed();
        counters.record_dispatched();
        counters.record_hashed(1024);
        counters.record_error();

        let progress = counters.snapshot();
        assert_eq!(progress.files_observed, 2);
        assert_eq!(progress.files_dispatched, 1);
        assert_eq!(progress.files_hashed, 1);
        assert_eq!(progress.bytes_hashed, 1024);
        assert_eq!(progress.errors, 1);
        assert_eq!(progress.hash_ratio(), 1.0);
    }

    #[test]
    fn test_reset_starts_over() {
        let counters = ProgressCounters::new();
        counters.record_observed();
        counters.record_hashed(64);
        std::thread::sleep(Duration::from_millis(20));
        let before = counters.snapshot().elapsed;

        counters.reset();
        let progress = counters.snapshot();
        assert_eq!(progress.files_observed, 0);
        assert_eq!(progress.bytes_hashed, 0);
        assert!(progress.elapsed < before);
    }

    #[test]
    fn test_rates_with_zero_elapsed() {
        let progress = EngineProgress {
            files_hashed: 10,
            ..EngineProgress::default()
        };
        assert_eq!(progress.files_per_second(), 0.0);
        assert_eq!(progress.bytes_per_second(), 0.0);
    }

    #[test]
    fn test_reporter_publishes_on_interval() {
        let counters = Arc::new(ProgressCounters::new());
        let (tx, mut rx) = broadcast::channel(16);
        let reporter = ProgressReporter::new(Arc::clone(&counters), tx, 3);

        for completed in 1..=7 {
            counters.record_hashed(1);
            reporter.tick(completed);
        }

        assert_eq!(rx.try_recv().unwrap().files_hashed, 3);
        assert_eq!(rx.try_recv().unwrap().files_hashed, 6);
        assert!(rx.try_recv().is_err());
    }
}
