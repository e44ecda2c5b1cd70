//! Sink contract
//!
//! A sink turns an `Event` into one destination-specific document and
//! delivers it once. The provided `dispatch` method wraps both steps with
//! outcome recording and logging, so every implementation reports the
//! same way:
//!
//! ```text
//! dispatch(event)
//!   ├─ record total
//!   ├─ build_payload(event)  ──► BuildError ─┐
//!   ├─ deliver(payload)      ──► TransportError ─┤
//!   ├─ ok:    record ok,    info!(sink, confirmation)
//!   └─ error: record error, error!(sink, cause) ◄┘
//! ```
//!
//! `dispatch` never returns an error; the outcome lives in the counters and
//! the log.

use async_trait::async_trait;
use bytes::Bytes;
use herald_metrics::{Outcome, SinkRecorder};
use herald_protocol::{Event, Priority};
use tracing::{error, info};

use crate::error::{BuildError, DispatchError, TransportError};

#[async_trait]
pub trait Sink: Send + Sync {
    /// Configured sink name (metric key and log field)
    fn name(&self) -> &str;

    /// Events below this priority are not dispatched to this sink
    fn minimum_priority(&self) -> Priority;

    /// Outcome recorder bound to this sink
    fn recorder(&self) -> &SinkRecorder;

    /// Render the destination document
    ///
    /// Pure: the same event always yields the same bytes.
    fn build_payload(&self, event: &Event) -> Result<Bytes, BuildError>;

    /// Send a rendered document once; returns a confirmation for the log
    async fn deliver(&self, payload: Bytes) -> Result<String, TransportError>;

    /// Whether an event of `priority` should reach this sink
    fn accepts(&self, priority: Priority) -> bool {
        priority >= self.minimum_priority()
    }

    /// Build, deliver and record exactly one outcome
    async fn dispatch(&self, event: &Event) {
        self.recorder().record_total();

        let result: Result<String, DispatchError> = match self.build_payload(event) {
            Ok(payload) => self.deliver(payload).await.map_err(DispatchError::from),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(confirmation) => {
                self.recorder().record(Outcome::Ok);
                info!(sink = %self.name(), rule = %event.rule, "{confirmation}");
            }
            Err(e) => {
                self.recorder().record(Outcome::Error);
                error!(sink = %self.name(), rule = %event.rule, error = %e, "dispatch failed");
            }
        }
    }
}
