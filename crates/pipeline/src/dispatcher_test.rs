//! Dispatcher tests
//!
//! Fan-out, minimum-priority filtering, outcome isolation between sinks and
//! the priority histogram.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use herald_metrics::{MetricsRegistry, SinkRecorder};
use herald_protocol::{Event, Priority};
use herald_sinks::{BuildError, Sink, TransportError};

use crate::{Dispatcher, PipelineError};

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
}

struct TestSink {
    name: String,
    minimum_priority: Priority,
    behavior: Behavior,
    delay: Duration,
    recorder: SinkRecorder,
    delivered: AtomicUsize,
}

impl TestSink {
    fn new(registry: &MetricsRegistry, name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            minimum_priority: Priority::Debug,
            behavior,
            delay: Duration::ZERO,
            recorder: registry.sink_recorder(name),
            delivered: AtomicUsize::new(0),
        }
    }

    fn with_minimum(mut self, priority: Priority) -> Self {
        self.minimum_priority = priority;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Sink for TestSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_priority(&self) -> Priority {
        self.minimum_priority
    }

    fn recorder(&self) -> &SinkRecorder {
        &self.recorder
    }

    fn build_payload(&self, event: &Event) -> Result<Bytes, BuildError> {
        Ok(Bytes::from(event.rule.clone()))
    }

    async fn deliver(&self, _payload: Bytes) -> Result<String, TransportError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Succeed => Ok("Post OK".into()),
            Behavior::Fail => Err(TransportError::Status {
                sink: self.name.clone(),
                status: 500,
                body: "boom".into(),
            }),
            Behavior::Panic => panic!("sink exploded"),
        }
    }
}

fn event(priority: Priority) -> Arc<Event> {
    Arc::new(Event::new(
        "Write below etc",
        priority,
        "File below /etc opened for writing",
        "syscall",
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
    ))
}

fn registry() -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new("herald").unwrap())
}

fn outcomes(registry: &MetricsRegistry, sink: &str) -> (u64, u64, u64) {
    let s = registry.sink_snapshot(sink).unwrap();
    (s.total, s.ok, s.error)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_no_sinks_is_an_error() {
    let result = Dispatcher::new(Vec::new(), registry());
    assert!(matches!(result, Err(PipelineError::NoSinks)));
}

#[test]
fn test_sink_names_in_order() {
    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(TestSink::new(&registry, "webhook", Behavior::Succeed)),
        Arc::new(TestSink::new(&registry, "teams", Behavior::Succeed)),
    ];
    let dispatcher = Dispatcher::new(sinks, registry).unwrap();

    assert_eq!(dispatcher.sink_count(), 2);
    assert_eq!(dispatcher.sink_names(), vec!["webhook", "teams"]);
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn test_one_failing_sink_does_not_affect_others() {
    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(TestSink::new(&registry, "teams", Behavior::Succeed)),
        Arc::new(TestSink::new(&registry, "fission", Behavior::Fail)),
        Arc::new(TestSink::new(&registry, "webhook", Behavior::Succeed)),
    ];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let dispatched = dispatcher.dispatch(event(Priority::Critical));
    assert_eq!(dispatched.len(), 3);
    dispatched.join().await.unwrap();

    assert_eq!(outcomes(&registry, "teams"), (1, 1, 0));
    assert_eq!(outcomes(&registry, "fission"), (1, 0, 1));
    assert_eq!(outcomes(&registry, "webhook"), (1, 1, 0));
    assert_eq!(registry.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_once_under_concurrent_fan_out() {
    const EVENTS: u64 = 50;

    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(TestSink::new(&registry, "teams", Behavior::Succeed)),
        Arc::new(TestSink::new(&registry, "fission", Behavior::Fail)),
        Arc::new(TestSink::new(&registry, "webhook", Behavior::Succeed)),
    ];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let pending: Vec<_> = (0..EVENTS)
        .map(|_| dispatcher.dispatch(event(Priority::Error)))
        .collect();
    for dispatched in pending {
        dispatched.join().await.unwrap();
    }

    assert_eq!(outcomes(&registry, "teams"), (EVENTS, EVENTS, 0));
    assert_eq!(outcomes(&registry, "fission"), (EVENTS, 0, EVENTS));
    assert_eq!(outcomes(&registry, "webhook"), (EVENTS, EVENTS, 0));
    assert_eq!(registry.prometheus_output("fission", "error"), EVENTS);
    assert_eq!(registry.priority_snapshot()[&Priority::Error], EVENTS);
    assert_eq!(registry.in_flight(), 0);

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.events_received, EVENTS);
    assert_eq!(metrics.tasks_spawned, EVENTS * 3);
}

#[tokio::test]
async fn test_sinks_run_concurrently() {
    let registry = registry();
    let delay = Duration::from_millis(300);
    let sinks: Vec<Arc<dyn Sink>> = (0..3)
        .map(|i| {
            Arc::new(
                TestSink::new(&registry, &format!("slow_{i}"), Behavior::Succeed).with_delay(delay),
            ) as Arc<dyn Sink>
        })
        .collect();
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let started = Instant::now();
    dispatcher.dispatch(event(Priority::Alert)).join().await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn test_in_flight_while_running() {
    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(
        TestSink::new(&registry, "slow", Behavior::Succeed).with_delay(Duration::from_millis(200)),
    )];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let dispatched = dispatcher.dispatch(event(Priority::Alert));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.in_flight(), 1);

    dispatched.join().await.unwrap();
    assert_eq!(registry.in_flight(), 0);
}

#[tokio::test]
async fn test_panicking_sink_does_not_cancel_siblings() {
    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(TestSink::new(&registry, "broken", Behavior::Panic)),
        Arc::new(
            TestSink::new(&registry, "teams", Behavior::Succeed)
                .with_delay(Duration::from_millis(50)),
        ),
    ];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let result = dispatcher.dispatch(event(Priority::Alert)).join().await;

    match result {
        Err(PipelineError::TaskFailed { sink, .. }) => assert_eq!(sink, "broken"),
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    assert_eq!(outcomes(&registry, "teams"), (1, 1, 0));
    assert_eq!(registry.in_flight(), 0);
}

// ============================================================================
// Minimum priority
// ============================================================================

#[tokio::test]
async fn test_minimum_priority_filters_sinks() {
    let registry = registry();
    let teams = Arc::new(
        TestSink::new(&registry, "teams", Behavior::Succeed).with_minimum(Priority::Critical),
    );
    let webhook = Arc::new(TestSink::new(&registry, "webhook", Behavior::Succeed));
    let sinks: Vec<Arc<dyn Sink>> = vec![teams.clone(), webhook.clone()];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let dispatched = dispatcher.dispatch(event(Priority::Warning));
    assert_eq!(dispatched.sinks().collect::<Vec<_>>(), vec!["webhook"]);
    dispatched.join().await.unwrap();

    let dispatched = dispatcher.dispatch(event(Priority::Critical));
    assert_eq!(dispatched.len(), 2);
    dispatched.join().await.unwrap();

    assert_eq!(teams.delivered.load(Ordering::SeqCst), 1);
    assert_eq!(webhook.delivered.load(Ordering::SeqCst), 2);
    // skipped sinks record nothing
    assert_eq!(outcomes(&registry, "teams"), (1, 1, 0));
    assert_eq!(outcomes(&registry, "webhook"), (2, 2, 0));
    assert_eq!(dispatcher.metrics().sinks_skipped, 1);
}

#[tokio::test]
async fn test_event_no_sink_accepts_still_counts_priority() {
    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(
        TestSink::new(&registry, "teams", Behavior::Succeed).with_minimum(Priority::Emergency),
    )];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    let dispatched = dispatcher.dispatch(event(Priority::Debug));
    assert!(dispatched.is_empty());
    dispatched.join().await.unwrap();

    assert_eq!(registry.priority_snapshot()[&Priority::Debug], 1);
    assert_eq!(outcomes(&registry, "teams"), (0, 0, 0));
    assert_eq!(dispatcher.metrics().events_unrouted, 1);
}

// ============================================================================
// Priority histogram
// ============================================================================

#[tokio::test]
async fn test_priority_histogram() {
    let registry = registry();
    let sinks: Vec<Arc<dyn Sink>> =
        vec![Arc::new(TestSink::new(&registry, "teams", Behavior::Succeed))];
    let dispatcher = Dispatcher::new(sinks, Arc::clone(&registry)).unwrap();

    for priority in [Priority::Warning, Priority::Warning, Priority::Emergency] {
        dispatcher.dispatch(event(priority)).join().await.unwrap();
    }

    let histogram = registry.priority_snapshot();
    assert_eq!(histogram[&Priority::Warning], 2);
    assert_eq!(histogram[&Priority::Emergency], 1);
    assert_eq!(histogram[&Priority::Notice], 0);

    let vars = registry.expvar_json();
    assert_eq!(vars["herald.priority"]["warning"], 2);
}
