//! Dispatcher - per-event fan-out to every accepting sink
//!
//! For each event the dispatcher records the priority, then spawns one
//! task per sink whose minimum priority the event meets. Tasks never wait
//! on each other; a slow, failing or panicking sink leaves its siblings
//! untouched.
//!
//! ```text
//!                       ┌──→ task: teams.dispatch(&event)
//! Arc<Event> ──→ [Dispatcher] ──→ task: fission.dispatch(&event)
//!    │                  └──→ task: webhook.dispatch(&event)
//!    └──→ herald.priority[event.priority] += 1
//! ```

use std::sync::Arc;

use herald_metrics::MetricsRegistry;
use herald_protocol::Event;
use herald_sinks::Sink;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{PipelineError, Result};
use crate::metrics::{DispatchMetrics, DispatchSnapshot};

/// Fans events out to a fixed set of sinks
pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    registry: Arc<MetricsRegistry>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher over `sinks`
    ///
    /// # Errors
    ///
    /// `PipelineError::NoSinks` if `sinks` is empty.
    pub fn new(sinks: Vec<Arc<dyn Sink>>, registry: Arc<MetricsRegistry>) -> Result<Self> {
        if sinks.is_empty() {
            return Err(PipelineError::NoSinks);
        }

        Ok(Self {
            sinks,
            registry,
            metrics: Arc::new(DispatchMetrics::new()),
        })
    }

    /// Number of sinks
    #[inline]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Sink names in registration order
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Registry outcomes are recorded in
    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Fan-out counters
    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    /// Dispatch `event` to every accepting sink
    ///
    /// Returns immediately; each sink runs in its own spawned task. Must be
    /// called from within a tokio runtime.
    pub fn dispatch(&self, event: Arc<Event>) -> Dispatched {
        self.metrics.record_received();
        self.registry.record_priority(event.priority);

        let mut tasks = Vec::with_capacity(self.sinks.len());
        let mut skipped = 0u64;

        for sink in &self.sinks {
            if !sink.accepts(event.priority) {
                skipped += 1;
                debug!(
                    sink = %sink.name(),
                    priority = %event.priority,
                    minimum = %sink.minimum_priority(),
                    "event below sink minimum priority"
                );
                continue;
            }

            let sink = Arc::clone(sink);
            let event = Arc::clone(&event);
            let guard = self.registry.track_dispatch();
            let name = sink.name().to_owned();

            let handle = tokio::spawn(async move {
                let _in_flight = guard;
                sink.dispatch(&event).await;
            });
            tasks.push((name, handle));
        }

        self.metrics.record_spawned(tasks.len() as u64);
        self.metrics.record_skipped(skipped);
        if tasks.is_empty() {
            self.metrics.record_unrouted();
            debug!(rule = %event.rule, priority = %event.priority, "no sink accepted event");
        }

        Dispatched { tasks }
    }
}

/// Tasks spawned for one event
///
/// Dropping this detaches the tasks; they still run to completion.
#[must_use = "dropping detaches the dispatch tasks; call join() to wait for them"]
pub struct Dispatched {
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Dispatched {
    /// Number of sinks the event was sent to
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Names of the sinks the event was sent to
    pub fn sinks(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    /// Wait for every task
    ///
    /// All tasks are awaited even when one fails; the first failure is
    /// returned afterwards.
    pub async fn join(self) -> Result<()> {
        let mut first_failure = None;

        for (sink, handle) in self.tasks {
            if let Err(e) = handle.await {
                let message = if e.is_panic() {
                    "task panicked".to_owned()
                } else {
                    e.to_string()
                };
                error!(sink = %sink, error = %message, "dispatch task failed");
                first_failure.get_or_insert(PipelineError::TaskFailed { sink, message });
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;
