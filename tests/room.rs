use beatlink::protocol::messages::{InitialSync, Liveness, Message, SyncRequest};
use beatlink::protocol::transport::channel;
use beatlink::room::{Control, ConnectionStatus, FollowerSession, HostRoom};
use beatlink::scheduler::{SilentEmitter, SoundEmitter, HORIZON_SECONDS, POLL_INTERVAL_SECONDS};
use beatlink::sync::engine::PROBE_TIMEOUT_SECONDS;
use beatlink::{Clock, ManualClock, Metronome, SoundCategory, SyncEngine};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<Message> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

fn host_room(clock: &ManualClock) -> HostRoom<ManualClock> {
    HostRoom::new(Metronome::new(clock.clone(), Box::new(SilentEmitter)))
}

fn follower_session(clock: &ManualClock) -> (FollowerSession<ManualClock>, UnboundedReceiver<Message>) {
    let (transport, rx) = channel();
    let metronome = Metronome::new(clock.clone(), Box::new(SilentEmitter));
    let session = FollowerSession::join(metronome, Box::new(transport), SyncEngine::default());
    (session, rx)
}

/// Records each click with the local clock reading at trigger time
#[derive(Clone)]
struct ClickLog {
    clock: ManualClock,
    clicks: Rc<RefCell<Vec<(f64, f64)>>>,
}

impl ClickLog {
    fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            clicks: Rc::default(),
        }
    }

    fn len(&self) -> usize {
        self.clicks.borrow().len()
    }

    fn fire_times(&self) -> Vec<f64> {
        self.clicks.borrow().iter().map(|&(fire_time, _)| fire_time).collect()
    }
}

impl SoundEmitter for ClickLog {
    fn trigger(&mut self, fire_time: f64, _category: SoundCategory) {
        self.clicks.borrow_mut().push((fire_time, self.clock.now()));
    }
}

const STEP: f64 = 0.005;
/// True host clock reading minus follower clock reading
const CLOCK_GAP: f64 = 97.0;

/// A host and one follower on separate clocks
///
/// Messages sent during a step are delivered at its end, so each hop takes
/// one step.
struct TwoPeerRoom {
    host_clock: ManualClock,
    follower_clock: ManualClock,
    host: HostRoom<ManualClock>,
    follower: FollowerSession<ManualClock>,
    host_clicks: ClickLog,
    follower_clicks: ClickLog,
    peer: Uuid,
    host_inbox: UnboundedReceiver<Message>,
    follower_inbox: UnboundedReceiver<Message>,
}

impl TwoPeerRoom {
    fn with_host_playing() -> Self {
        let host_clock = ManualClock::new(3.0 + CLOCK_GAP);
        let follower_clock = ManualClock::new(3.0);
        let host_clicks = ClickLog::new(&host_clock);
        let follower_clicks = ClickLog::new(&follower_clock);

        let mut host = HostRoom::new(Metronome::new(host_clock.clone(), Box::new(host_clicks.clone())));
        host.set_playing(true);

        let (to_host, host_inbox) = channel();
        let follower = FollowerSession::join(
            Metronome::new(follower_clock.clone(), Box::new(follower_clicks.clone())),
            Box::new(to_host),
            SyncEngine::default(),
        );
        let peer = Uuid::new_v4();
        let (to_follower, follower_inbox) = channel();
        host.add_follower(peer, Box::new(to_follower));

        Self {
            host_clock,
            follower_clock,
            host,
            follower,
            host_clicks,
            follower_clicks,
            peer,
            host_inbox,
            follower_inbox,
        }
    }

    fn step(&mut self) {
        self.host.poll();
        self.follower.poll();
        self.host_clock.advance(STEP);
        self.follower_clock.advance(STEP);
        for message in drain(&mut self.host_inbox) {
            self.host.handle_message(self.peer, message);
        }
        for message in drain(&mut self.follower_inbox) {
            self.follower.handle_message(message);
        }
    }

    fn run_for(&mut self, seconds: f64) {
        let end = self.host_clock.now() + seconds;
        while self.host_clock.now() < end {
            self.step();
        }
    }

    /// Follower clicks from index `from` on must be handed out ahead of
    /// time and sound within one poll interval of a host click
    fn assert_follower_on_host_grid(&self, from: usize) {
        let host_times = self.host_clicks.fire_times();
        let last_host = host_times.last().copied().unwrap_or(f64::NEG_INFINITY);

        for &(fire_time, local_now) in &self.follower_clicks.clicks.borrow()[from..] {
            let lead = fire_time - local_now;
            assert!(
                (-POLL_INTERVAL_SECONDS..=HORIZON_SECONDS).contains(&lead),
                "click at {} handed out at {} ({}s ahead)",
                fire_time,
                local_now,
                lead
            );

            let on_host_clock = fire_time + CLOCK_GAP;
            if on_host_clock > last_host + POLL_INTERVAL_SECONDS {
                continue;
            }
            let nearest = host_times
                .iter()
                .map(|&h| (h - on_host_clock).abs())
                .fold(f64::INFINITY, f64::min);
            assert!(
                nearest <= POLL_INTERVAL_SECONDS,
                "follower click at host time {} is {}s off the host grid",
                on_host_clock,
                nearest
            );
        }
    }
}

#[test]
fn test_host_bootstraps_new_follower() {
    let clock = ManualClock::new(7.0);
    let mut host = host_room(&clock);
    host.set_tempo(100.0).unwrap();

    let (transport, mut rx) = channel();
    host.add_follower(Uuid::new_v4(), Box::new(transport));

    assert_eq!(
        drain(&mut rx),
        vec![
            Message::Tempo { value: 100.0 },
            Message::PlayState { value: false },
            Message::TimeSignature { value: 4 },
            Message::Subdivision { value: 1 },
            Message::Accent { value: true },
            Message::Sound {
                value: "click".to_string()
            },
            Message::InitialSync(InitialSync {
                host_time: 7.0,
                next_event_time: 0.0
            }),
        ]
    );
}

#[test]
fn test_host_broadcasts_validated_changes() {
    let clock = ManualClock::new(0.0);
    let mut host = host_room(&clock);
    let (a, mut rx_a) = channel();
    let (b, mut rx_b) = channel();
    host.add_follower(Uuid::new_v4(), Box::new(a));
    host.add_follower(Uuid::new_v4(), Box::new(b));
    drain(&mut rx_a);
    drain(&mut rx_b);

    host.set_tempo(90.0).unwrap();
    assert_eq!(drain(&mut rx_a), vec![Message::Tempo { value: 90.0 }]);
    assert_eq!(drain(&mut rx_b), vec![Message::Tempo { value: 90.0 }]);

    assert!(host.set_tempo(-1.0).is_err());
    assert!(host.set_tempo(f64::NAN).is_err());
    assert!(host.set_subdivision(3).is_err());
    assert!(host.set_time_signature(0).is_err());
    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(host.metronome().sequencer().tempo_bpm(), 90.0);

    host.apply(Control::SetAccent(false)).unwrap();
    host.apply(Control::TogglePlay).unwrap();
    assert_eq!(
        drain(&mut rx_b),
        vec![Message::Accent { value: false }, Message::PlayState { value: true }]
    );
    assert!(host.metronome().is_running());
}

#[test]
fn test_host_answers_probes_and_pings() {
    let clock = ManualClock::new(2.0);
    let mut host = host_room(&clock);
    let peer = Uuid::new_v4();
    let (transport, mut rx) = channel();
    host.add_follower(peer, Box::new(transport));
    host.set_playing(true);
    host.poll();
    drain(&mut rx);

    clock.set(2.3);
    host.handle_message(peer, Message::SyncRequest(SyncRequest { client_time: 1.0 }));
    host.handle_message(peer, Message::Ping(Liveness { timestamp: 0.5 }));

    let replies = drain(&mut rx);
    match &replies[0] {
        Message::SyncResponse(response) => {
            assert_eq!(response.host_time, 2.3);
            assert_eq!(response.client_time, 1.0);
            assert!(response.snapshot.running);
            assert_eq!(response.snapshot.next_event_time, 2.5);
            assert_eq!(response.snapshot.current_beat, 1);
        }
        other => panic!("Expected SyncResponse, got {:?}", other),
    }
    assert_eq!(replies[1], Message::Pong(Liveness { timestamp: 0.5 }));
}

#[test]
fn test_host_ignores_follower_control_messages() {
    let clock = ManualClock::new(0.0);
    let mut host = host_room(&clock);
    let peer = Uuid::new_v4();
    let (transport, _rx) = channel();
    host.add_follower(peer, Box::new(transport));

    host.handle_message(peer, Message::Tempo { value: 60.0 });
    host.handle_message(peer, Message::PlayState { value: true });
    assert_eq!(host.metronome().sequencer().tempo_bpm(), 120.0);
    assert!(!host.metronome().is_running());
}

#[test]
fn test_host_drops_failed_followers_and_dedupes() {
    let clock = ManualClock::new(0.0);
    let mut host = host_room(&clock);
    let staying = Uuid::new_v4();
    let leaving = Uuid::new_v4();

    let (first, _rx_first) = channel();
    let (second, mut rx_second) = channel();
    host.add_follower(staying, Box::new(first));
    host.add_follower(staying, Box::new(second));
    assert_eq!(host.follower_count(), 1);

    let (gone, rx_gone) = channel();
    host.add_follower(leaving, Box::new(gone));
    drop(rx_gone);

    host.set_accent(false);
    assert_eq!(host.follower_ids().collect::<Vec<_>>(), vec![staying]);
    assert_eq!(drain(&mut rx_second).last(), Some(&Message::Accent { value: false }));

    assert!(host.remove_follower(staying));
    assert!(!host.remove_follower(staying));
}

#[test]
fn test_host_close_stops_and_clears() {
    let clock = ManualClock::new(0.0);
    let mut host = host_room(&clock);
    let (transport, _rx) = channel();
    host.add_follower(Uuid::new_v4(), Box::new(transport));
    host.set_playing(true);

    host.apply(Control::Leave).unwrap();
    assert_eq!(host.follower_count(), 0);
    assert!(!host.metronome().is_running());
}

#[test]
fn test_host_reset_broadcasts() {
    let clock = ManualClock::new(1.0);
    let mut host = host_room(&clock);
    let (transport, mut rx) = channel();
    host.add_follower(Uuid::new_v4(), Box::new(transport));
    host.set_playing(true);
    drain(&mut rx);

    host.reset();
    assert_eq!(drain(&mut rx), vec![Message::Reset]);
    assert!(!host.metronome().is_running());
    assert_eq!(host.metronome().sequencer().next_event_time(), 0.0);
}

#[test]
fn test_follower_mirrors_broadcasts() {
    let clock = ManualClock::new(0.0);
    let (mut follower, _rx) = follower_session(&clock);
    assert_eq!(follower.status(), ConnectionStatus::Connected);

    follower.handle_message(Message::Tempo { value: 150.0 });
    follower.handle_message(Message::TimeSignature { value: 6 });
    follower.handle_message(Message::Subdivision { value: 2 });
    follower.handle_message(Message::Accent { value: false });
    follower.handle_message(Message::Sound {
        value: "rim".to_string(),
    });
    follower.handle_message(Message::PlayState { value: true });

    let metronome = follower.metronome();
    assert_eq!(metronome.sequencer().tempo_bpm(), 150.0);
    assert_eq!(metronome.sequencer().beats_per_bar(), 6);
    assert_eq!(metronome.sequencer().subdivisions_per_beat(), 2);
    assert!(!metronome.sequencer().accent_first_beat());
    assert_eq!(metronome.sound_set(), "rim");
    assert!(metronome.is_running());
    assert_eq!(follower.status(), ConnectionStatus::Playing);

    follower.handle_message(Message::PlayState { value: false });
    assert_eq!(follower.status(), ConnectionStatus::Connected);
}

#[test]
fn test_follower_drops_invalid_values() {
    let clock = ManualClock::new(0.0);
    let (mut follower, _rx) = follower_session(&clock);

    follower.handle_message(Message::Tempo { value: 0.0 });
    follower.handle_message(Message::Subdivision { value: 3 });
    follower.handle_message(Message::TimeSignature { value: 0 });
    follower.handle_message(Message::Unknown);

    let sequencer = follower.metronome().sequencer();
    assert_eq!(sequencer.tempo_bpm(), 120.0);
    assert_eq!(sequencer.subdivisions_per_beat(), 1);
    assert_eq!(sequencer.beats_per_bar(), 4);
}

#[test]
fn test_follower_probe_reply_settles_status() {
    let clock = ManualClock::new(0.0);
    let (mut follower, mut rx) = follower_session(&clock);

    follower.poll();
    assert_eq!(follower.status(), ConnectionStatus::Syncing);
    let probe = match drain(&mut rx).pop() {
        Some(Message::SyncRequest(request)) => request,
        other => panic!("Expected SyncRequest, got {:?}", other),
    };
    assert_eq!(probe.client_time, 0.0);

    clock.set(0.04);
    let mut host = host_room(&ManualClock::new(500.0));
    let peer = Uuid::new_v4();
    let (to_follower, mut host_rx) = channel();
    host.add_follower(peer, Box::new(to_follower));
    drain(&mut host_rx);
    host.handle_message(peer, Message::SyncRequest(probe));
    for message in drain(&mut host_rx) {
        follower.handle_message(message);
    }

    assert_eq!(follower.status(), ConnectionStatus::Connected);
    assert!(!follower.sync().is_awaiting_reply());
    assert!((follower.metronome().sync_offset() - (500.0 + 0.02 - 0.04)).abs() < 1e-9);

    // The cleared timeout never flips the status later
    clock.set(1.0);
    follower.poll();
    assert_eq!(follower.status(), ConnectionStatus::Connected);
}

#[test]
fn test_follower_probe_timeout_falls_back() {
    let clock = ManualClock::new(0.0);
    let (mut follower, _rx) = follower_session(&clock);
    follower.poll();
    follower.handle_message(Message::PlayState { value: true });
    assert_eq!(follower.status(), ConnectionStatus::Syncing);

    clock.set(PROBE_TIMEOUT_SECONDS / 2.0);
    follower.poll();
    assert_eq!(follower.status(), ConnectionStatus::Syncing);

    clock.set(PROBE_TIMEOUT_SECONDS);
    follower.poll();
    assert_eq!(follower.status(), ConnectionStatus::Playing);
}

#[test]
fn test_follower_disconnects_when_link_fails() {
    let clock = ManualClock::new(0.0);
    let (mut follower, rx) = follower_session(&clock);
    follower.handle_message(Message::PlayState { value: true });
    drop(rx);

    follower.poll();
    assert_eq!(follower.status(), ConnectionStatus::Disconnected);
    assert!(!follower.metronome().is_running());
    assert!(follower.next_wakeup().is_none());

    // Messages after the drop are ignored
    follower.handle_message(Message::PlayState { value: true });
    assert!(!follower.metronome().is_running());

    let (transport, mut rx) = channel();
    clock.set(4.0);
    follower.rejoin(Box::new(transport));
    assert_eq!(follower.status(), ConnectionStatus::Connected);
    assert_eq!(follower.sync().offset(), 0.0);
    assert_eq!(follower.next_wakeup(), Some(4.0));
    follower.poll();
    assert!(matches!(drain(&mut rx).as_slice(), [Message::SyncRequest(_)]));
}

#[test]
fn test_follower_reset_and_liveness() {
    let clock = ManualClock::new(2.0);
    let (mut follower, mut rx) = follower_session(&clock);
    follower.handle_message(Message::PlayState { value: true });

    follower.handle_message(Message::Reset);
    assert!(!follower.metronome().is_running());
    assert_eq!(follower.status(), ConnectionStatus::Connected);

    follower.handle_message(Message::Ping(Liveness { timestamp: 9.0 }));
    assert_eq!(drain(&mut rx), vec![Message::Pong(Liveness { timestamp: 9.0 })]);

    follower.ping();
    assert_eq!(drain(&mut rx), vec![Message::Ping(Liveness { timestamp: 2.0 })]);
    clock.set(2.03);
    follower.handle_message(Message::Pong(Liveness { timestamp: 2.0 }));
    assert!((follower.last_ping_rtt().unwrap() - 0.03).abs() < 1e-9);
}

#[test]
fn test_follower_clicks_land_on_host_grid_in_local_time() {
    let mut room = TwoPeerRoom::with_host_playing();
    room.run_for(3.0);

    assert!((room.follower.metronome().sync_offset() - CLOCK_GAP).abs() < STEP);
    assert!(room.follower_clicks.len() >= 5);
    room.assert_follower_on_host_grid(0);
}

#[test]
fn test_follower_resumes_on_grid_after_host_pause() {
    let mut room = TwoPeerRoom::with_host_playing();
    room.run_for(1.2);
    room.host.set_playing(false);
    room.run_for(0.7);
    assert!(!room.follower.metronome().is_running());

    let from = room.follower_clicks.len();
    room.host.set_playing(true);
    room.run_for(2.0);

    assert!(room.follower.metronome().is_running());
    let resumed = room.follower_clicks.len() - from;
    assert!((3..=5).contains(&resumed), "{} clicks in 2s at 120 bpm", resumed);
    room.assert_follower_on_host_grid(from);
}

#[test]
fn test_follower_follows_tempo_change_after_sync() {
    let mut room = TwoPeerRoom::with_host_playing();
    room.run_for(1.2);

    let from = room.follower_clicks.len();
    room.host.set_tempo(150.0).unwrap();
    room.run_for(3.0);

    assert_eq!(room.follower.metronome().sequencer().tempo_bpm(), 150.0);
    room.assert_follower_on_host_grid(from);
    let times = room.follower_clicks.fire_times();
    let last_gap = times[times.len() - 1] - times[times.len() - 2];
    assert!((last_gap - 0.4).abs() < 1e-9);
}

#[test]
fn test_control_parsing() {
    assert_eq!("tempo 96".parse::<Control>().unwrap(), Control::SetTempo(96.0));
    assert_eq!("play".parse::<Control>().unwrap(), Control::SetPlaying(true));
    assert_eq!("stop".parse::<Control>().unwrap(), Control::SetPlaying(false));
    assert_eq!("sig 3".parse::<Control>().unwrap(), Control::SetTimeSignature(3));
    assert_eq!("sub 4".parse::<Control>().unwrap(), Control::SetSubdivision(4));
    assert_eq!("accent off".parse::<Control>().unwrap(), Control::SetAccent(false));
    assert_eq!(
        "sound wood".parse::<Control>().unwrap(),
        Control::SetSound("wood".to_string())
    );
    assert_eq!("reset".parse::<Control>().unwrap(), Control::Reset);
    assert_eq!("leave".parse::<Control>().unwrap(), Control::Leave);

    assert!("tempo fast".parse::<Control>().is_err());
    assert!("tempo".parse::<Control>().is_err());
    assert!("accent maybe".parse::<Control>().is_err());
    assert!("dance".parse::<Control>().is_err());
    assert!("".parse::<Control>().is_err());
}
