//! Herald - Metrics
//!
//! Outcome counters for every sink, kept in three spaces at once.
//!
//! # Overview
//!
//! This crate provides:
//! - A process-local counter map (expvar style, served as JSON)
//! - Prometheus counter vectors on a registry owned by `MetricsRegistry`
//! - A fire-and-forget StatsD push to an optional external collector
//!
//! # Design Principles
//!
//! - **Injected**: components receive `Arc<MetricsRegistry>`; there is no
//!   global registry
//! - **Consistent**: a sink's local and Prometheus counters are written
//!   under the same per-sink lock
//! - **Non-blocking**: the StatsD push runs on a detached task and its
//!   failures never reach the caller
//!
//! # Recorder Pattern
//!
//! ```text
//! MetricsRegistry (Arc, shared)
//!     │
//!     ├──► sink_recorder("teams")  → SinkRecorder  (total / ok / error)
//!     ├──► input_recorder("http")  → InputRecorder (total / accepted / rejected)
//!     ├──► record_priority(p)      → priority histogram
//!     └──► track_dispatch()        → InFlightGuard (gauge, decremented on drop)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(MetricsRegistry::new("herald")?);
//! let recorder = registry.sink_recorder("teams");
//!
//! recorder.record_total();
//! recorder.record(Outcome::Ok);
//!
//! assert_eq!(registry.sink_snapshot("teams").unwrap().ok, 1);
//! ```

mod error;
mod recorder;
mod registry;
mod snapshot;
mod statsd;

pub use error::{MetricsError, Result};
pub use recorder::{InFlightGuard, InputOutcome, InputRecorder, Outcome, SinkRecorder};
pub use registry::{MetricsRegistry, PRIORITY_KEY};
pub use snapshot::{InputSnapshot, SinkSnapshot};
pub use statsd::StatsdPusher;

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering for performance)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Get the current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Atomic gauge that can move in both directions
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    /// Create a new gauge at 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}
