//! Atomic counters for deletion handling.
//!
//! Each listener owns its own [`Metrics`]. Counters are incremented silently;
//! call [`Metrics::flush`] to emit them as a single `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters, no allocations, no locking.
#[derive(Debug)]
pub struct Metrics {
    events_received: AtomicU64,
    events_ignored: AtomicU64,
    builds_scheduled: AtomicU64,
    jobs_not_found: AtomicU64,
    events_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_ignored: AtomicU64::new(0),
            builds_scheduled: AtomicU64::new(0),
            jobs_not_found: AtomicU64::new(0),
            events_failed: AtomicU64::new(0),
        }
    }

    pub fn inc_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scheduled(&self) {
        self.builds_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_not_found(&self) {
        self.jobs_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_received = self.events_received(),
            events_ignored = self.events_ignored(),
            builds_scheduled = self.builds_scheduled(),
            jobs_not_found = self.jobs_not_found(),
            events_failed = self.events_failed(),
        );
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub fn events_ignored(&self) -> u64 {
        self.events_ignored.load(Ordering::Relaxed)
    }

    pub fn builds_scheduled(&self) -> u64 {
        self.builds_scheduled.load(Ordering::Relaxed)
    }

    pub fn jobs_not_found(&self) -> u64 {
        self.jobs_not_found.load(Ordering::Relaxed)
    }

    pub fn events_failed(&self) -> u64 {
        self.events_failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment_independently() {
        let m = Metrics::new();
        m.inc_received();
        m.inc_received();
        m.inc_scheduled();
        m.inc_failed();

        assert_eq!(m.events_received(), 2);
        assert_eq!(m.builds_scheduled(), 1);
        assert_eq!(m.events_failed(), 1);
        assert_eq!(m.events_ignored(), 0);
        assert_eq!(m.jobs_not_found(), 0);
    }

    #[test]
    fn test_flush_does_not_panic() {
        let m = Metrics::new();
        m.inc_not_found();
        m.flush();
    }
}
