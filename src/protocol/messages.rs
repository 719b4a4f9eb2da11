// ABOUTME: Room protocol message type definitions and serialization
// ABOUTME: Supports tempo, playState, syncRequest/syncResponse, initialSync, ping/pong, etc.

use serde::{Deserialize, Serialize};

/// Top-level protocol message envelope
///
/// Serialized as a flat JSON object tagged by `type`, e.g.
/// `{"type":"tempo","value":120}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Host tempo changed
    Tempo {
        /// Beats per minute
        value: f64,
    },

    /// Host time signature changed
    TimeSignature {
        /// Beats per bar
        value: u32,
    },

    /// Host subdivision changed
    Subdivision {
        /// Sub-beats per beat (1, 2 or 4)
        value: u32,
    },

    /// Host accent setting changed
    Accent {
        /// Accent the first sub-beat of each bar
        value: bool,
    },

    /// Host started or stopped
    PlayState {
        /// True while playing
        value: bool,
    },

    /// Host switched sound sets
    Sound {
        /// Sound set id
        value: String,
    },

    /// Host reset to a stopped, zeroed grid
    Reset,

    /// Follower offset probe
    SyncRequest(SyncRequest),

    /// Host reply to a probe
    SyncResponse(SyncResponse),

    /// Join-time clock pair
    InitialSync(InitialSync),

    /// Liveness check
    Ping(Liveness),

    /// Liveness reply echoing the ping's timestamp
    Pong(Liveness),

    /// Any `type` this build does not know
    #[serde(other)]
    Unknown,
}

/// Follower offset probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Follower clock reading when the probe was sent
    pub client_time: f64,
}

/// Host reply to a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Host clock reading when the reply was built
    pub host_time: f64,
    /// Echo of the probe's `client_time`
    pub client_time: f64,
    /// Host sequencer state at `host_time`
    pub snapshot: MetronomeSnapshot,
}

/// Host sequencer state carried by a sync reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetronomeSnapshot {
    /// Host-clock time of the next sub-beat
    pub next_event_time: f64,
    /// Index of that sub-beat within the bar
    pub current_beat: u32,
    /// Beats per minute
    pub tempo: f64,
    /// Whether the host is playing
    pub running: bool,
    /// Active sound set
    pub sound_set_id: String,
}

/// Host clock pair pushed to a newly joined follower
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialSync {
    /// Host clock reading at join
    pub host_time: f64,
    /// Host-clock time of the next sub-beat
    pub next_event_time: f64,
}

/// Ping/pong payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Liveness {
    /// Sender's clock reading, echoed back unchanged
    pub timestamp: f64,
}
