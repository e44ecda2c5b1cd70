//! Herald - Sinks
//!
//! Destination adapters that turn one `Event` into one outbound request.
//!
//! # Architecture
//!
//! Every sink implements [`Sink`]: a pure `build_payload` step and a
//! single-attempt `deliver` step. The provided `dispatch` method runs both
//! and records exactly one outcome per call.
//!
//! ```text
//! [Dispatcher] --Arc<Event>--> dispatch() --> build_payload --> Transport --> [Destination]
//!                                  |
//!                                  +--> SinkRecorder (expvar, Prometheus, StatsD)
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Destination | Transport |
//! |------|-------------|-----------|
//! | `teams` | Microsoft Teams incoming webhook (MessageCard) | HTTP |
//! | `fission` | Fission function router | HTTP or Kubernetes service proxy |
//! | `webhook` | Any HTTP endpoint (event JSON) | HTTP |
//!
//! # Example
//!
//! ```ignore
//! use herald_sinks::build_sinks;
//!
//! let sinks = build_sinks(&config, &registry).await?;
//! for sink in &sinks {
//!     if sink.accepts(event.priority) {
//!         sink.dispatch(&event).await;
//!     }
//! }
//! ```

pub mod error;
pub mod factory;
pub mod fission;
pub mod sink;
pub mod teams;
pub mod transport;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use error::{BuildError, DispatchError, SinkError, TransportError};
pub use factory::build_sinks;
pub use fission::FissionSink;
pub use sink::Sink;
pub use teams::TeamsSink;
pub use transport::{HttpTransport, KubeProxyTransport};
pub use webhook::WebhookSink;
