//! Point-in-time copies of counter groups

use serde::Serialize;

/// Outcome counters of one sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkSnapshot {
    pub total: u64,
    pub ok: u64,
    pub error: u64,
}

/// Counters of one inbound channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputSnapshot {
    pub total: u64,
    pub accepted: u64,
    pub rejected: u64,
}
