// ABOUTME: Main library entry point for beatlink
// ABOUTME: Exports the metronome core, clock sync, room roles, and wire protocol

//! # beatlink
//!
//! Networked metronome: a look-ahead beat scheduler whose tempo, time
//! signature, subdivision, accent and sound set are shared across a room,
//! with one authoritative host and clock-synchronized followers.
//!
//! Sequencing and scheduling are pure state machines driven by a [`clock::Clock`];
//! the room roles run on a single task and talk through an ordered message
//! channel (WebSocket or in-memory).

#![warn(missing_docs)]

/// Monotonic clock sources
pub mod clock;
/// Runtime configuration
pub mod config;
/// Metronome instance
pub mod metronome;
/// Protocol implementation for the room message channel
pub mod protocol;
/// Host and follower roles
pub mod room;
/// Look-ahead scheduler for timed clicks
pub mod scheduler;
/// Beat sequencing state machine
pub mod sequencer;
/// Clock synchronization utilities
pub mod sync;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Config;
pub use metronome::Metronome;
pub use protocol::messages::Message;
pub use room::{ConnectionStatus, FollowerSession, HostRoom};
pub use scheduler::LookAheadScheduler;
pub use sequencer::{BeatSequencer, SoundCategory};
pub use sync::SyncEngine;

/// Result type for beatlink operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for beatlink
pub mod error {
    use thiserror::Error;

    /// Error types for beatlink operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// WebSocket-related error
        #[error("WebSocket error: {0}")]
        WebSocket(String),

        /// Protocol violation or parsing error
        #[error("Protocol error: {0}")]
        Protocol(String),

        /// Connection-related error
        #[error("Connection error: {0}")]
        Connection(String),

        /// Control value rejected before reaching the metronome
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        /// Configuration could not be loaded or failed validation
        #[error("Configuration error: {0}")]
        Config(String),

        /// Filesystem error while loading configuration
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }
}
