// ABOUTME: One logical metronome instance
// ABOUTME: Owns sequencer, scheduler, sync offset and sound set; drives emitter and observers

use crate::clock::Clock;
use crate::config::Config;
use crate::protocol::messages::{InitialSync, MetronomeSnapshot, SyncResponse};
use crate::scheduler::{BeatObserver, LookAheadScheduler, SoundEmitter};
use crate::sequencer::BeatSequencer;
use crate::sync::OffsetEstimate;

/// Local beat generator whose state can be mirrored across a room
///
/// All mutation goes through `&mut self`, so one owner (the room task)
/// serializes control changes, sync corrections and polling.
pub struct Metronome<C: Clock> {
    clock: C,
    sequencer: BeatSequencer,
    scheduler: LookAheadScheduler,
    /// Estimated `host - local` clock difference; zero on the host
    sync_offset: f64,
    sound_set: String,
    emitter: Box<dyn SoundEmitter>,
    observers: Vec<Box<dyn BeatObserver>>,
}

impl<C: Clock> Metronome<C> {
    /// Create an idle metronome with default settings
    pub fn new(clock: C, emitter: Box<dyn SoundEmitter>) -> Self {
        Self::with_config(clock, emitter, &Config::default())
    }

    /// Create an idle metronome from a validated config
    pub fn with_config(clock: C, mut emitter: Box<dyn SoundEmitter>, config: &Config) -> Self {
        emitter.select_sound_set(&config.sound_set);
        Self {
            clock,
            sequencer: BeatSequencer::new(
                config.tempo_bpm,
                config.beats_per_bar,
                config.subdivisions_per_beat,
                config.accent_first_beat,
            ),
            scheduler: LookAheadScheduler::new(config.horizon_seconds, config.poll_interval_seconds),
            sync_offset: 0.0,
            sound_set: config.sound_set.clone(),
            emitter,
            observers: Vec::new(),
        }
    }

    /// Register a beat observer
    pub fn subscribe(&mut self, observer: impl BeatObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Clock the metronome reads
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Raw local clock reading
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Beat grid and parameters
    pub fn sequencer(&self) -> &BeatSequencer {
        &self.sequencer
    }

    /// Look-ahead scheduler state
    pub fn scheduler(&self) -> &LookAheadScheduler {
        &self.scheduler
    }

    /// Whether the scheduler is running
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Current `host - local` offset in seconds
    pub fn sync_offset(&self) -> f64 {
        self.sync_offset
    }

    /// Active sound set id
    pub fn sound_set(&self) -> &str {
        &self.sound_set
    }

    /// Change tempo; the grid is kept and the index restarts
    pub fn set_tempo(&mut self, tempo_bpm: f64) {
        log::debug!("Tempo -> {} bpm", tempo_bpm);
        self.sequencer.set_tempo(tempo_bpm);
    }

    /// Change beats per bar; the grid is kept and the index restarts
    pub fn set_time_signature(&mut self, beats_per_bar: u32) {
        log::debug!("Time signature -> {}/4", beats_per_bar);
        self.sequencer.set_beats_per_bar(beats_per_bar);
    }

    /// Change sub-beats per beat; the grid is kept and the index restarts
    pub fn set_subdivision(&mut self, subdivisions_per_beat: u32) {
        log::debug!("Subdivision -> {} per beat", subdivisions_per_beat);
        self.sequencer.set_subdivisions_per_beat(subdivisions_per_beat);
    }

    /// Toggle the bar-start accent
    pub fn set_accent(&mut self, accent_first_beat: bool) {
        self.sequencer.set_accent_first_beat(accent_first_beat);
    }

    /// Switch sound sets, forwarding real changes to the emitter
    pub fn set_sound(&mut self, sound_set: &str) {
        if self.sound_set != sound_set {
            log::debug!("Sound set -> {}", sound_set);
            self.sound_set = sound_set.to_string();
            self.emitter.select_sound_set(sound_set);
        }
    }

    /// Start playing from bar start at the current synced reading
    ///
    /// The first sub-beat lands at `now + sync_offset`, which is plain
    /// `now` on a host. No-op (returns false) when already running.
    pub fn start(&mut self) -> bool {
        let now = self.clock.now();
        if !self.scheduler.start(&mut self.sequencer, now, self.sync_offset) {
            return false;
        }
        log::info!("Metronome started at {:.3}s", now);
        self.notify_reset();
        true
    }

    /// Stop playing; no-op (returns false) when idle
    pub fn stop(&mut self) -> bool {
        if !self.scheduler.stop(&mut self.sequencer) {
            return false;
        }
        log::info!("Metronome stopped");
        self.notify_reset();
        true
    }

    /// Stop and return the grid to zero
    pub fn reset(&mut self) {
        self.scheduler.stop(&mut self.sequencer);
        self.sequencer.restart_at(0.0);
        log::info!("Metronome reset");
        self.notify_reset();
    }

    /// Run the scheduler if its poll is due; returns sub-beats emitted
    ///
    /// The grid runs in the host's time domain; the emitter is handed
    /// local clock readings.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let Self {
            sequencer,
            scheduler,
            sync_offset,
            emitter,
            observers,
            ..
        } = self;

        scheduler.poll(sequencer, now, *sync_offset, |event| {
            emitter.trigger(event.time - *sync_offset, event.category);
            for observer in observers.iter_mut() {
                observer.on_beat_changed(event.index);
            }
        })
    }

    /// Local clock reading at which `poll` next has work
    pub fn next_wakeup(&self) -> Option<f64> {
        self.scheduler.next_poll()
    }

    /// State a host reports in sync replies
    pub fn snapshot(&self) -> MetronomeSnapshot {
        MetronomeSnapshot {
            next_event_time: self.sequencer.next_event_time(),
            current_beat: self.sequencer.current_sub_beat(),
            tempo: self.sequencer.tempo_bpm(),
            running: self.is_running(),
            sound_set_id: self.sound_set.clone(),
        }
    }

    /// Store a new offset without touching the beat grid
    pub fn apply_offset(&mut self, offset: f64) {
        self.sync_offset = offset;
    }

    /// Align to the host after a completed probe
    ///
    /// The offset is always adopted. When both sides are running, the
    /// host's next event time is projected forward to `local_receipt` and
    /// the grid and sub-beat index realigned to it.
    pub fn reconcile(&mut self, estimate: OffsetEstimate, response: &SyncResponse, local_receipt: f64) {
        self.apply_offset(estimate.offset);
        self.set_sound(&response.snapshot.sound_set_id);

        if self.is_running() && response.snapshot.running {
            let projected = estimate.project_next_event_time(
                response.snapshot.next_event_time,
                response.host_time,
                local_receipt,
            );
            self.sequencer.realign(projected + estimate.offset, local_receipt);
            log::debug!(
                "Realigned to host: next event {:.4}s, sub-beat {}",
                self.sequencer.next_event_time(),
                self.sequencer.current_sub_beat()
            );
        }
    }

    /// Seed offset and, when playing, phase from the host's join-time pair
    pub fn bootstrap(&mut self, estimate: OffsetEstimate, initial: &InitialSync, local_now: f64) {
        self.apply_offset(estimate.offset);

        if self.is_running() {
            let projected =
                estimate.project_next_event_time(initial.next_event_time, initial.host_time, local_now);
            self.sequencer.realign(projected + estimate.offset, local_now);
        }
    }

    fn notify_reset(&mut self) {
        for observer in self.observers.iter_mut() {
            observer.on_beat_reset();
        }
    }
}
