//! Dispatcher metrics
//!
//! Atomic counters describing fan-out decisions. Outcomes are recorded per
//! sink by the sinks themselves; these only count what the dispatcher did.
//! All operations use relaxed ordering.

use std::sync::atomic::{AtomicU64, Ordering};

/// Fan-out counters
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Events handed to the dispatcher
    events_received: AtomicU64,

    /// Sink tasks spawned
    tasks_spawned: AtomicU64,

    /// Sinks skipped because of their minimum priority
    sinks_skipped: AtomicU64,

    /// Events no sink accepted
    events_unrouted: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            tasks_spawned: AtomicU64::new(0),
            sinks_skipped: AtomicU64::new(0),
            events_unrouted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_spawned(&self, count: u64) {
        self.tasks_spawned.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skipped(&self, count: u64) {
        self.sinks_skipped.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unrouted(&self) {
        self.events_unrouted.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            tasks_spawned: self.tasks_spawned.load(Ordering::Relaxed),
            sinks_skipped: self.sinks_skipped.load(Ordering::Relaxed),
            events_unrouted: self.events_unrouted.load(Ordering::Relaxed),
        }
    }
}

/// Copy of `DispatchMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub events_received: u64,
    pub tasks_spawned: u64,
    pub sinks_skipped: u64,
    pub events_unrouted: u64,
}
