// ABOUTME: Async event loops running a host room or follower session on one task
// ABOUTME: Select over inbound messages and a sleep until the earliest armed timer

use crate::clock::Clock;
use crate::protocol::messages::Message;
use crate::protocol::ChannelTransport;
use crate::room::control::Control;
use crate::room::follower::FollowerSession;
use crate::room::host::HostRoom;
use crate::room::PeerId;
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything the host task reacts to besides its own timers
#[derive(Debug)]
pub enum HostEvent {
    /// A follower connected
    Joined {
        /// Id assigned to the connection
        peer: PeerId,
        /// Send half of the connection
        transport: ChannelTransport,
    },
    /// A follower sent a message
    Message {
        /// Sender
        peer: PeerId,
        /// Decoded message
        message: Message,
    },
    /// A follower's connection closed
    Left {
        /// Departed follower
        peer: PeerId,
    },
    /// Local command from the glue layer
    Control(Control),
}

async fn sleep_until_deadline(deadline: Option<f64>, now: f64) {
    match deadline {
        Some(deadline) => tokio::time::sleep(Duration::from_secs_f64((deadline - now).max(0.0))).await,
        None => std::future::pending::<()>().await,
    }
}

/// Run the host until `Control::Leave` or until every event sender is gone
pub async fn run_host<C: Clock>(room: &mut HostRoom<C>, events: &mut mpsc::UnboundedReceiver<HostEvent>) {
    loop {
        let now = room.metronome().now();
        let deadline = room.metronome().next_wakeup();

        tokio::select! {
            event = events.recv() => match event {
                Some(HostEvent::Joined { peer, transport }) => room.add_follower(peer, Box::new(transport)),
                Some(HostEvent::Message { peer, message }) => room.handle_message(peer, message),
                Some(HostEvent::Left { peer }) => {
                    room.remove_follower(peer);
                }
                Some(HostEvent::Control(Control::Leave)) | None => {
                    room.close();
                    return;
                }
                Some(HostEvent::Control(control)) => {
                    if let Err(e) = room.apply(control) {
                        log::warn!("Rejected control change: {}", e);
                    }
                }
            },
            _ = sleep_until_deadline(deadline, now) => {
                room.poll();
            }
        }
    }
}

/// Run a follower until the host link closes or the session disconnects
pub async fn run_follower<C: Clock>(
    session: &mut FollowerSession<C>,
    inbound: &mut mpsc::UnboundedReceiver<Message>,
) {
    while session.is_connected() {
        let now = session.metronome().now();
        let deadline = session.next_wakeup();

        tokio::select! {
            message = inbound.recv() => match message {
                Some(message) => session.handle_message(message),
                None => session.disconnect(),
            },
            _ = sleep_until_deadline(deadline, now) => {
                session.poll();
            }
        }
    }
}
