// ABOUTME: Beat sequencer state machine
// ABOUTME: Computes the time, index and sound category of every sub-beat

use crate::error::Error;
use crate::Result;

/// Subdivision counts accepted from the room
pub const SUPPORTED_SUBDIVISIONS: [u32; 3] = [1, 2, 4];

/// Which sound a sub-beat plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    /// First sub-beat of the bar with accenting enabled
    Accent,
    /// Sub-beat that starts a beat
    MainBeat,
    /// Sub-beat inside a beat
    Subdivision,
}

impl SoundCategory {
    /// Classify a sub-beat; accent takes priority over subdivision,
    /// subdivision over main beat
    pub fn classify(index: u32, subdivisions_per_beat: u32, accent_first_beat: bool) -> Self {
        let is_bar_accent = accent_first_beat && index == 0;
        let is_subdivision_tick = index % subdivisions_per_beat.max(1) != 0;

        if is_bar_accent {
            SoundCategory::Accent
        } else if is_subdivision_tick {
            SoundCategory::Subdivision
        } else {
            SoundCategory::MainBeat
        }
    }
}

/// One schedulable tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Absolute fire time in the clock domain (seconds)
    pub time: f64,
    /// Sub-beat index within the bar
    pub index: u32,
    /// Which click to play
    pub category: SoundCategory,
}

/// Reject tempos that are not finite and positive
pub fn validate_tempo(bpm: f64) -> Result<f64> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(Error::InvalidParameter(format!("tempo must be positive, got {bpm}")))
    }
}

/// Reject empty bars
pub fn validate_beats_per_bar(beats: u32) -> Result<u32> {
    if beats > 0 {
        Ok(beats)
    } else {
        Err(Error::InvalidParameter("beats per bar must be at least 1".to_string()))
    }
}

/// Accept only 1, 2 or 4 subdivisions
pub fn validate_subdivision(subdivisions: u32) -> Result<u32> {
    if SUPPORTED_SUBDIVISIONS.contains(&subdivisions) {
        Ok(subdivisions)
    } else {
        Err(Error::InvalidParameter(format!(
            "subdivision must be one of {SUPPORTED_SUBDIVISIONS:?}, got {subdivisions}"
        )))
    }
}

/// Pure sequencing state for one metronome
///
/// `advance` moves `next_event_time` forward by exactly one sub-beat and
/// wraps the sub-beat index at the end of the bar. Parameter setters reset
/// the index to bar start but leave `next_event_time` on its grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatSequencer {
    tempo_bpm: f64,
    beats_per_bar: u32,
    subdivisions_per_beat: u32,
    accent_first_beat: bool,
    current_sub_beat: u32,
    next_event_time: f64,
}

impl BeatSequencer {
    /// Create a sequencer at bar start with `next_event_time = 0`
    ///
    /// Inputs are expected to be validated already; zero counts are
    /// raised to one.
    pub fn new(
        tempo_bpm: f64,
        beats_per_bar: u32,
        subdivisions_per_beat: u32,
        accent_first_beat: bool,
    ) -> Self {
        debug_assert!(tempo_bpm.is_finite() && tempo_bpm > 0.0);
        Self {
            tempo_bpm,
            beats_per_bar: beats_per_bar.max(1),
            subdivisions_per_beat: subdivisions_per_beat.max(1),
            accent_first_beat,
            current_sub_beat: 0,
            next_event_time: 0.0,
        }
    }

    /// Beats per minute
    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    /// Beats per bar
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Sub-beats per beat
    pub fn subdivisions_per_beat(&self) -> u32 {
        self.subdivisions_per_beat
    }

    /// Whether sub-beat 0 is accented
    pub fn accent_first_beat(&self) -> bool {
        self.accent_first_beat
    }

    /// Index of the next sub-beat to schedule
    pub fn current_sub_beat(&self) -> u32 {
        self.current_sub_beat
    }

    /// Fire time of the next sub-beat
    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Sub-beats in one bar; the index period
    pub fn sub_beats_per_bar(&self) -> u32 {
        self.beats_per_bar * self.subdivisions_per_beat
    }

    /// Seconds between consecutive sub-beats
    pub fn sub_beat_duration(&self) -> f64 {
        60.0 / self.tempo_bpm / self.subdivisions_per_beat as f64
    }

    /// The sub-beat that `advance` is about to move past
    pub fn current_event(&self) -> BeatEvent {
        BeatEvent {
            time: self.next_event_time,
            index: self.current_sub_beat,
            category: SoundCategory::classify(
                self.current_sub_beat,
                self.subdivisions_per_beat,
                self.accent_first_beat,
            ),
        }
    }

    /// Step to the following sub-beat
    pub fn advance(&mut self) {
        self.next_event_time += self.sub_beat_duration();
        self.current_sub_beat = (self.current_sub_beat + 1) % self.sub_beats_per_bar();
    }

    /// Change tempo; resets the index, keeps the grid
    pub fn set_tempo(&mut self, tempo_bpm: f64) {
        debug_assert!(tempo_bpm.is_finite() && tempo_bpm > 0.0);
        self.tempo_bpm = tempo_bpm;
        self.current_sub_beat = 0;
    }

    /// Change beats per bar; resets the index, keeps the grid
    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        self.beats_per_bar = beats_per_bar.max(1);
        self.current_sub_beat = 0;
    }

    /// Change sub-beats per beat; resets the index, keeps the grid
    pub fn set_subdivisions_per_beat(&mut self, subdivisions_per_beat: u32) {
        self.subdivisions_per_beat = subdivisions_per_beat.max(1);
        self.current_sub_beat = 0;
    }

    /// Toggle the bar-start accent
    pub fn set_accent_first_beat(&mut self, accent_first_beat: bool) {
        self.accent_first_beat = accent_first_beat;
        self.current_sub_beat = 0;
    }

    /// Return to bar start with the next sub-beat due at `at`
    pub fn restart_at(&mut self, at: f64) {
        self.current_sub_beat = 0;
        self.next_event_time = at;
    }

    /// Zero the index without touching the grid
    pub fn rewind_bar(&mut self) {
        self.current_sub_beat = 0;
    }

    /// Move the grid to `next_event_time` and derive the index from how
    /// many sub-beats it lies ahead of `local_now`
    pub fn realign(&mut self, next_event_time: f64, local_now: f64) {
        self.next_event_time = next_event_time;

        let sub_beats_ahead = ((next_event_time - local_now) * self.tempo_bpm / 60.0
            * self.subdivisions_per_beat as f64)
            .floor();
        let period = self.sub_beats_per_bar();
        self.current_sub_beat = sub_beats_ahead.rem_euclid(period as f64) as u32 % period;
    }
}

impl Default for BeatSequencer {
    fn default() -> Self {
        Self::new(120.0, 4, 1, true)
    }
}
