// ABOUTME: Authoritative host side of a room
// ABOUTME: Applies control changes locally, broadcasts them, and answers follower probes

use crate::clock::Clock;
use crate::error::Error;
use crate::metronome::Metronome;
use crate::protocol::messages::{InitialSync, Message, SyncResponse};
use crate::protocol::RoomTransport;
use crate::room::control::Control;
use crate::room::PeerId;
use crate::sequencer::{validate_beats_per_bar, validate_subdivision, validate_tempo};

struct FollowerLink {
    peer: PeerId,
    transport: Box<dyn RoomTransport>,
}

/// Host metronome plus the followers it broadcasts to
pub struct HostRoom<C: Clock> {
    metronome: Metronome<C>,
    followers: Vec<FollowerLink>,
}

impl<C: Clock> HostRoom<C> {
    /// Open a room around `metronome` with no followers
    pub fn new(metronome: Metronome<C>) -> Self {
        Self {
            metronome,
            followers: Vec::new(),
        }
    }

    /// Host metronome
    pub fn metronome(&self) -> &Metronome<C> {
        &self.metronome
    }

    /// Host metronome, mutably
    pub fn metronome_mut(&mut self) -> &mut Metronome<C> {
        &mut self.metronome
    }

    /// Number of linked followers
    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    /// Ids of linked followers, in join order
    pub fn follower_ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.followers.iter().map(|f| f.peer)
    }

    /// Register a follower and push the full current state to it
    ///
    /// A previous link under the same peer id is replaced.
    pub fn add_follower(&mut self, peer: PeerId, transport: Box<dyn RoomTransport>) {
        if self.remove_follower(peer) {
            log::info!("Follower {} rejoined; replacing old link", peer);
        }
        self.followers.push(FollowerLink { peer, transport });
        log::info!("Follower {} joined ({} in room)", peer, self.followers.len());

        let sequencer = self.metronome.sequencer();
        let bootstrap = [
            Message::Tempo {
                value: sequencer.tempo_bpm(),
            },
            Message::PlayState {
                value: self.metronome.is_running(),
            },
            Message::TimeSignature {
                value: sequencer.beats_per_bar(),
            },
            Message::Subdivision {
                value: sequencer.subdivisions_per_beat(),
            },
            Message::Accent {
                value: sequencer.accent_first_beat(),
            },
            Message::Sound {
                value: self.metronome.sound_set().to_string(),
            },
            Message::InitialSync(InitialSync {
                host_time: self.metronome.now(),
                next_event_time: sequencer.next_event_time(),
            }),
        ];
        for message in bootstrap {
            if self.send_to(peer, message).is_err() {
                break;
            }
        }
    }

    /// Forget a follower; returns whether it was present
    pub fn remove_follower(&mut self, peer: PeerId) -> bool {
        let before = self.followers.len();
        self.followers.retain(|f| f.peer != peer);
        let removed = self.followers.len() != before;
        if removed {
            log::info!("Follower {} left ({} in room)", peer, self.followers.len());
        }
        removed
    }

    /// Handle a message from a follower
    ///
    /// Followers are authoritative for nothing; only probes and liveness
    /// checks get an answer.
    pub fn handle_message(&mut self, from: PeerId, message: Message) {
        match message {
            Message::SyncRequest(request) => {
                let response = SyncResponse {
                    host_time: self.metronome.now(),
                    client_time: request.client_time,
                    snapshot: self.metronome.snapshot(),
                };
                let _ = self.send_to(from, Message::SyncResponse(response));
            }
            Message::Ping(ping) => {
                let _ = self.send_to(from, Message::Pong(ping));
            }
            Message::Pong(pong) => {
                let rtt = self.metronome.now() - pong.timestamp;
                log::debug!("Follower {} alive, RTT={:.2}ms", from, rtt * 1000.0);
            }
            other => log::debug!("Ignoring follower-originated {:?} from {}", other, from),
        }
    }

    /// Apply a glue-layer command; invalid values are rejected untouched
    pub fn apply(&mut self, control: Control) -> Result<(), Error> {
        match control {
            Control::SetTempo(bpm) => self.set_tempo(bpm)?,
            Control::SetPlaying(playing) => self.set_playing(playing),
            Control::TogglePlay => self.toggle_play(),
            Control::SetTimeSignature(beats) => self.set_time_signature(beats)?,
            Control::SetSubdivision(subdivisions) => self.set_subdivision(subdivisions)?,
            Control::SetAccent(accent) => self.set_accent(accent),
            Control::SetSound(sound_set) => self.set_sound(&sound_set),
            Control::Reset => self.reset(),
            Control::Leave => self.close(),
        }
        Ok(())
    }

    /// Validate, apply and broadcast a tempo
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), Error> {
        let bpm = validate_tempo(bpm)?;
        self.metronome.set_tempo(bpm);
        self.broadcast(Message::Tempo { value: bpm });
        Ok(())
    }

    /// Start or stop, then broadcast the resulting play state
    pub fn set_playing(&mut self, playing: bool) {
        if playing {
            self.metronome.start();
        } else {
            self.metronome.stop();
        }
        self.broadcast(Message::PlayState {
            value: self.metronome.is_running(),
        });
    }

    /// Flip the play state
    pub fn toggle_play(&mut self) {
        let playing = !self.metronome.is_running();
        self.set_playing(playing);
    }

    /// Validate, apply and broadcast beats per bar
    pub fn set_time_signature(&mut self, beats_per_bar: u32) -> Result<(), Error> {
        let beats = validate_beats_per_bar(beats_per_bar)?;
        self.metronome.set_time_signature(beats);
        self.broadcast(Message::TimeSignature { value: beats });
        Ok(())
    }

    /// Validate, apply and broadcast sub-beats per beat
    pub fn set_subdivision(&mut self, subdivisions_per_beat: u32) -> Result<(), Error> {
        let subdivisions = validate_subdivision(subdivisions_per_beat)?;
        self.metronome.set_subdivision(subdivisions);
        self.broadcast(Message::Subdivision { value: subdivisions });
        Ok(())
    }

    /// Apply and broadcast the accent setting
    pub fn set_accent(&mut self, accent_first_beat: bool) {
        self.metronome.set_accent(accent_first_beat);
        self.broadcast(Message::Accent {
            value: accent_first_beat,
        });
    }

    /// Apply and broadcast a sound set
    pub fn set_sound(&mut self, sound_set: &str) {
        self.metronome.set_sound(sound_set);
        self.broadcast(Message::Sound {
            value: sound_set.to_string(),
        });
    }

    /// Stop, zero the grid and tell followers to do the same
    pub fn reset(&mut self) {
        self.metronome.reset();
        self.broadcast(Message::Reset);
    }

    /// Stop playing and drop every follower link
    pub fn close(&mut self) {
        self.metronome.stop();
        let closed = self.followers.len();
        self.followers.clear();
        log::info!("Room closed; disconnected {} follower(s)", closed);
    }

    /// Drive the host's own scheduler
    pub fn poll(&mut self) -> usize {
        self.metronome.poll()
    }

    /// Send to every follower, dropping those whose link failed
    pub fn broadcast(&mut self, message: Message) {
        self.followers.retain_mut(|follower| match follower.transport.send(message.clone()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Dropping follower {}: {}", follower.peer, e);
                false
            }
        });
    }

    fn send_to(&mut self, peer: PeerId, message: Message) -> Result<(), Error> {
        let Some(index) = self.followers.iter().position(|f| f.peer == peer) else {
            log::debug!("No follower {} to send to", peer);
            return Ok(());
        };
        let result = self.followers[index].transport.send(message);
        if let Err(e) = &result {
            log::warn!("Dropping follower {}: {}", peer, e);
            self.followers.remove(index);
        }
        result
    }
}
