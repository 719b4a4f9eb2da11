// ABOUTME: Look-ahead beat scheduling
// ABOUTME: Poll timer, horizon draining, and the emitter/observer contracts

/// Sound emitter and beat observer contracts
pub mod emitter;
/// Look-ahead scheduler state machine
pub mod look_ahead;
/// Cancellable timers in clock seconds
pub mod timer;

pub use emitter::{BeatObserver, LogEmitter, SilentEmitter, SoundEmitter};
pub use look_ahead::{LookAheadScheduler, HORIZON_SECONDS, POLL_INTERVAL_SECONDS};
pub use timer::{RepeatingTimer, Timeout};
