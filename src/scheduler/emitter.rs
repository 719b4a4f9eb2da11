// ABOUTME: Collaborator contracts driven by the look-ahead scheduler
// ABOUTME: Sound emitters receive absolute fire times, observers receive beat indices

use crate::clock::MonotonicClock;
use crate::sequencer::SoundCategory;

/// Plays a click for each scheduled sub-beat
///
/// `trigger` must return immediately; the emitter itself delays playback
/// until `fire_time`.
pub trait SoundEmitter {
    /// Schedule one click at `fire_time`, a reading of the local clock
    fn trigger(&mut self, fire_time: f64, category: SoundCategory);

    /// Switch to another sound set; emitters without sets ignore it
    fn select_sound_set(&mut self, _sound_set: &str) {}
}

/// Notified synchronously as sub-beats are scheduled
pub trait BeatObserver {
    /// Sub-beat `index` was just scheduled
    fn on_beat_changed(&mut self, index: u32);

    /// Beat position went back to zero (start, stop, reset)
    fn on_beat_reset(&mut self) {
        self.on_beat_changed(0);
    }
}

impl<F: FnMut(u32)> BeatObserver for F {
    fn on_beat_changed(&mut self, index: u32) {
        self(index)
    }
}

/// Emitter that does nothing; for headless instances
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentEmitter;

impl SoundEmitter for SilentEmitter {
    fn trigger(&mut self, _fire_time: f64, _category: SoundCategory) {}
}

/// Emitter that logs each click at its exact fire instant
///
/// Each trigger spawns a tokio task sleeping until the fire time, so it
/// must be used inside a runtime.
#[derive(Debug, Clone)]
pub struct LogEmitter {
    clock: MonotonicClock,
    sound_set: String,
}

impl LogEmitter {
    /// Log clicks for `sound_set`, timed against `clock`
    pub fn new(clock: MonotonicClock, sound_set: impl Into<String>) -> Self {
        Self {
            clock,
            sound_set: sound_set.into(),
        }
    }
}

impl SoundEmitter for LogEmitter {
    fn trigger(&mut self, fire_time: f64, category: SoundCategory) {
        let at = self.clock.instant_at(fire_time);
        let sound_set = self.sound_set.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            log::info!("[{}] {:?} at {:.3}s", sound_set, category, fire_time);
        });
    }

    fn select_sound_set(&mut self, sound_set: &str) {
        self.sound_set = sound_set.to_string();
    }
}
