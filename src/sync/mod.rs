// ABOUTME: Clock synchronization between room followers and the host
// ABOUTME: NTP-style midpoint offset estimation and probe scheduling

/// Probe cadence and timeout handling
pub mod engine;
/// Offset estimates and sync quality
pub mod offset;

pub use engine::SyncEngine;
pub use offset::{ClockSync, OffsetEstimate, SyncQuality};
