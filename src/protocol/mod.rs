// ABOUTME: Protocol implementation for the room message channel
// ABOUTME: Message types, JSON codec, transport capability, and WebSocket link

/// WebSocket link implementation
pub mod client;
/// JSON encoding and forward-compatible decoding
pub mod codec;
/// Protocol message type definitions and serialization
pub mod messages;
/// Send capability handed to the core
pub mod transport;

pub use messages::Message;
pub use transport::{ChannelTransport, RoomTransport};
