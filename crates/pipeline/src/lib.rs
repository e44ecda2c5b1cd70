//! Herald - Pipeline
//!
//! Connects ingestion to the sinks.
//!
//! # Architecture
//!
//! ```text
//! [Ingestion]                 [Dispatcher]                       [Sinks]
//!  POST / ──→ Arc<Event> ──→ priority histogram ──→ spawn ──┬──→ teams
//!                            minimum-priority filter        ├──→ fission
//!                                                           └──→ webhook
//! ```
//!
//! # Key Design
//!
//! - **Arc fan-out**: one `Arc<Event>` shared by every sink task
//! - **Independent tasks**: one `tokio::spawn` per sink per event; no task
//!   waits on another and no ordering holds across sinks
//! - **Single attempt**: outcomes are recorded by the sinks, no retries
//!
//! # Example
//!
//! ```ignore
//! use herald_pipeline::Dispatcher;
//!
//! let sinks = herald_sinks::build_sinks(&config, &registry).await?;
//! let dispatcher = Dispatcher::new(sinks, registry)?;
//!
//! // Fire and forget, or join() to wait for every sink
//! dispatcher.dispatch(Arc::new(event)).join().await?;
//! ```

mod dispatcher;
mod error;
mod metrics;

pub use dispatcher::{Dispatched, Dispatcher};
pub use error::{PipelineError, Result};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
