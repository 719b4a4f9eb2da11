// ABOUTME: WebSocket link for the room protocol
// ABOUTME: Splits a socket into a send transport and an ordered inbound message channel

use crate::error::Error;
use crate::protocol::codec;
use crate::protocol::messages::Message;
use crate::protocol::transport::ChannelTransport;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message as WsMessage, WebSocketStream};

/// Both halves of a room connection
///
/// Dropping `inbound` does not close the socket; dropping the transport
/// (every clone) does, once queued messages are flushed.
pub struct RoomLink {
    /// Ordered send half
    pub transport: ChannelTransport,
    /// Decoded messages in arrival order; closes when the socket does
    pub inbound: mpsc::UnboundedReceiver<Message>,
}

/// Connect to a host as a follower
pub async fn connect(url: &str) -> Result<RoomLink, Error> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    log::info!("Connected to room host at {}", url);
    Ok(spawn_link(ws_stream))
}

/// Accept a follower connection on the host side
pub async fn accept(stream: TcpStream) -> Result<RoomLink, Error> {
    let peer = stream.peer_addr().ok();
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| Error::WebSocket(e.to_string()))?;

    log::info!("Accepted room follower from {:?}", peer);
    Ok(spawn_link(ws_stream))
}

/// Run reader and writer tasks for an established socket
pub fn spawn_link<S>(ws_stream: WebSocketStream<S>) -> RoomLink
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = match codec::encode(&message) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Dropping unencodable message: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(WsMessage::Text(text)).await {
                log::warn!("WebSocket send failed: {}", e);
                break;
            }
        }
        let _ = write.close().await;
    });

    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => match codec::decode(&text) {
                    Ok(Some(message)) => {
                        if inbound_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Ok(None) => log::debug!("Ignoring message of unknown type: {}", text),
                    Err(e) => log::debug!("Ignoring malformed message: {}", e),
                },
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("WebSocket receive failed: {}", e);
                    break;
                }
            }
        }
        log::info!("Room connection closed");
    });

    RoomLink {
        transport: ChannelTransport::new(outbound_tx),
        inbound: inbound_rx,
    }
}
