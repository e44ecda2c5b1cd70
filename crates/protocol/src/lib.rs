//! Herald Protocol - Core event types
//!
//! This crate provides the values that flow from ingestion to every sink:
//! - `Event` - One immutable alert (rule, priority, description, fields, tags)
//! - `Priority` - Ordered severity levels (Debug < ... < Emergency)
//! - `FieldValue` - Scalar values carried in `Event::output_fields`
//!
//! # Design Principles
//!
//! - **Immutable**: Events are built once by ingestion and shared as `Arc<Event>`
//! - **Deterministic**: Tags and fields use ordered collections so every
//!   payload built from the same event is byte-identical
//! - **Wire compatible**: Deserializes the JSON document emitted by Falco

mod error;
mod event;
mod priority;

pub use error::ProtocolError;
pub use event::{Event, FieldValue};
pub use priority::Priority;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
