// ABOUTME: Follower connection status indicator
// ABOUTME: Connected/Playing/Syncing/Disconnected as observed by the UI layer

use std::fmt;

/// What a follower's status indicator shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Linked to the host, not playing
    Connected,
    /// Linked to the host and playing
    Playing,
    /// A sync probe is awaiting its reply
    Syncing,
    /// The host link is gone
    Disconnected,
}

impl ConnectionStatus {
    /// Resting status for a live connection
    pub fn settled(running: bool) -> Self {
        if running {
            ConnectionStatus::Playing
        } else {
            ConnectionStatus::Connected
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Playing => "Playing",
            ConnectionStatus::Syncing => "Syncing...",
            ConnectionStatus::Disconnected => "Disconnected",
        };
        f.write_str(label)
    }
}
