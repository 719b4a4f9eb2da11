// ABOUTME: JSON text codec for room messages
// ABOUTME: Unknown message types decode to None so newer peers stay compatible

use crate::error::Error;
use crate::protocol::messages::Message;

/// Serialize a message to its JSON text frame
pub fn encode(message: &Message) -> Result<String, Error> {
    serde_json::to_string(message).map_err(|e| Error::Protocol(e.to_string()))
}

/// Parse a JSON text frame
///
/// Returns `Ok(None)` for a well-formed message whose `type` is unknown.
pub fn decode(text: &str) -> Result<Option<Message>, Error> {
    let message: Message = serde_json::from_str(text).map_err(|e| Error::Protocol(e.to_string()))?;
    match message {
        Message::Unknown => Ok(None),
        message => Ok(Some(message)),
    }
}
