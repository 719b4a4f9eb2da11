// ABOUTME: Room transport send capability handed to the core
// ABOUTME: In-memory channel implementation shared by tests and the WebSocket link

use crate::error::Error;
use crate::protocol::messages::Message;
use tokio::sync::mpsc;

/// Fire-and-forget, ordered send half of a room connection
pub trait RoomTransport {
    /// Queue a message; an error means the connection is gone
    fn send(&mut self, message: Message) -> Result<(), Error>;
}

/// Transport backed by an unbounded tokio channel
///
/// Sending never blocks; whoever holds the receiver (a socket writer task
/// or a test) drains it in order.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelTransport {
    /// Wrap the send half of a channel
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Whether the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl RoomTransport for ChannelTransport {
    fn send(&mut self, message: Message) -> Result<(), Error> {
        self.tx
            .send(message)
            .map_err(|_| Error::Connection("peer channel closed".to_string()))
    }
}

/// Create a transport and the receiver that observes what it sends
pub fn channel() -> (ChannelTransport, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelTransport::new(tx), rx)
}
