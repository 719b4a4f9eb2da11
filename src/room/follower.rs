// ABOUTME: Non-authoritative follower side of a room
// ABOUTME: Mirrors host broadcasts, probes the host clock, and tracks connection status

use crate::clock::Clock;
use crate::metronome::Metronome;
use crate::protocol::messages::{Liveness, Message, SyncResponse};
use crate::protocol::RoomTransport;
use crate::room::status::ConnectionStatus;
use crate::scheduler::timer::earliest;
use crate::sequencer::{validate_beats_per_bar, validate_subdivision, validate_tempo};
use crate::sync::SyncEngine;

/// Follower metronome bound to one host connection
pub struct FollowerSession<C: Clock> {
    metronome: Metronome<C>,
    transport: Box<dyn RoomTransport>,
    sync: SyncEngine,
    status: ConnectionStatus,
    last_ping_rtt: Option<f64>,
}

impl<C: Clock> FollowerSession<C> {
    /// Join through `transport`; the first probe is due immediately
    pub fn join(metronome: Metronome<C>, transport: Box<dyn RoomTransport>, sync: SyncEngine) -> Self {
        let mut session = Self {
            metronome,
            transport,
            sync,
            status: ConnectionStatus::Connected,
            last_ping_rtt: None,
        };
        session.sync.reset();
        session.sync.start(session.metronome.now());
        session
    }

    /// Reconnect after a disconnect, restarting the sync handshake
    pub fn rejoin(&mut self, transport: Box<dyn RoomTransport>) {
        self.metronome.stop();
        self.transport = transport;
        self.sync.reset();
        self.sync.start(self.metronome.now());
        self.status = ConnectionStatus::Connected;
        self.last_ping_rtt = None;
        log::info!("Rejoined room; sync restarted");
    }

    /// Local metronome
    pub fn metronome(&self) -> &Metronome<C> {
        &self.metronome
    }

    /// Local metronome, mutably
    pub fn metronome_mut(&mut self) -> &mut Metronome<C> {
        &mut self.metronome
    }

    /// Probe state and the latest offset estimate
    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    /// Current status indicator
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// False once the host link is gone
    pub fn is_connected(&self) -> bool {
        self.status != ConnectionStatus::Disconnected
    }

    /// Round trip measured by the last answered ping
    pub fn last_ping_rtt(&self) -> Option<f64> {
        self.last_ping_rtt
    }

    /// Apply one host message
    pub fn handle_message(&mut self, message: Message) {
        if !self.is_connected() {
            return;
        }

        match message {
            Message::Tempo { value } => match validate_tempo(value) {
                Ok(bpm) => self.metronome.set_tempo(bpm),
                Err(e) => log::warn!("Ignoring tempo from host: {}", e),
            },
            Message::TimeSignature { value } => match validate_beats_per_bar(value) {
                Ok(beats) => self.metronome.set_time_signature(beats),
                Err(e) => log::warn!("Ignoring time signature from host: {}", e),
            },
            Message::Subdivision { value } => match validate_subdivision(value) {
                Ok(subdivisions) => self.metronome.set_subdivision(subdivisions),
                Err(e) => log::warn!("Ignoring subdivision from host: {}", e),
            },
            Message::Accent { value } => self.metronome.set_accent(value),
            Message::Sound { value } => self.metronome.set_sound(&value),
            Message::PlayState { value } => {
                if value {
                    self.metronome.start();
                } else {
                    self.metronome.stop();
                }
                self.settle_status();
            }
            Message::Reset => {
                self.metronome.reset();
                self.settle_status();
            }
            Message::SyncResponse(response) => self.on_sync_response(&response),
            Message::InitialSync(initial) => {
                let now = self.metronome.now();
                let estimate = self.sync.on_bootstrap(initial.host_time, now);
                self.metronome.bootstrap(estimate, &initial, now);
                log::debug!("Bootstrapped offset {:.4}s from host", estimate.offset);
            }
            Message::Ping(ping) => self.send(Message::Pong(ping)),
            Message::Pong(pong) => {
                self.last_ping_rtt = Some(self.metronome.now() - pong.timestamp);
            }
            other => log::debug!("Ignoring {:?} from host", other),
        }
    }

    /// Run due scheduler polls, probes and probe timeouts
    pub fn poll(&mut self) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let emitted = self.metronome.poll();

        let now = self.metronome.now();
        if self.sync.poll_timeout(now) {
            self.settle_status();
        }
        if let Some(request) = self.sync.poll_probe(now) {
            self.status = ConnectionStatus::Syncing;
            self.send(Message::SyncRequest(request));
        }
        emitted
    }

    /// Local clock reading at which `poll` next has work
    pub fn next_wakeup(&self) -> Option<f64> {
        if !self.is_connected() {
            return None;
        }
        earliest([self.metronome.next_wakeup(), self.sync.next_deadline()])
    }

    /// Send a liveness check
    pub fn ping(&mut self) {
        let timestamp = self.metronome.now();
        self.send(Message::Ping(Liveness { timestamp }));
    }

    /// Local reset; not broadcast
    pub fn reset_local(&mut self) {
        self.metronome.reset();
        self.settle_status();
    }

    /// The link is gone: stop playing and stop probing
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.metronome.stop();
        self.sync.stop();
        self.status = ConnectionStatus::Disconnected;
        log::info!("Disconnected from room");
    }

    /// Leave the room voluntarily
    pub fn leave(&mut self) {
        self.disconnect();
    }

    fn on_sync_response(&mut self, response: &SyncResponse) {
        let now = self.metronome.now();
        let estimate = self.sync.on_response(response.client_time, response.host_time, now);
        self.metronome.reconcile(estimate, response, now);
        self.settle_status();
    }

    fn settle_status(&mut self) {
        if !self.sync.is_awaiting_reply() {
            self.status = ConnectionStatus::settled(self.metronome.is_running());
        }
    }

    fn send(&mut self, message: Message) {
        if let Err(e) = self.transport.send(message) {
            log::warn!("Lost connection to host: {}", e);
            self.disconnect();
        }
    }
}
