// ABOUTME: Room roles: one authoritative host, any number of followers
// ABOUTME: Host/follower state machines, control commands, status, and async drivers

/// Host control commands
pub mod control;
/// Single-task event loops for both roles
pub mod driver;
/// Follower session
pub mod follower;
/// Host room
pub mod host;
/// Follower connection status
pub mod status;

pub use control::Control;
pub use driver::{run_follower, run_host, HostEvent};
pub use follower::FollowerSession;
pub use host::HostRoom;
pub use status::ConnectionStatus;

/// Identifies one follower connection on the host
pub type PeerId = uuid::Uuid;
