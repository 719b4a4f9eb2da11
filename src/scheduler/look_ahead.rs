// ABOUTME: Look-ahead scheduler bridging the beat sequencer to real time
// ABOUTME: Polls on a coarse cadence and hands out every sub-beat inside the horizon

use crate::scheduler::timer::RepeatingTimer;
use crate::sequencer::{BeatEvent, BeatSequencer};

/// Look-ahead window in seconds
pub const HORIZON_SECONDS: f64 = 0.1;
/// Poll cadence in seconds
pub const POLL_INTERVAL_SECONDS: f64 = 0.025;

/// Idle/Running state plus the poll timer
///
/// The scheduler never reads a clock itself: callers pass the raw local
/// reading (which drives the poll timer) and the sync offset (which moves
/// the horizon into the host's time domain).
#[derive(Debug, Clone)]
pub struct LookAheadScheduler {
    running: bool,
    horizon: f64,
    poll: RepeatingTimer,
}

impl LookAheadScheduler {
    /// Idle scheduler; `horizon` must exceed `poll_interval`
    pub fn new(horizon: f64, poll_interval: f64) -> Self {
        debug_assert!(horizon > poll_interval);
        Self {
            running: false,
            horizon,
            poll: RepeatingTimer::new(poll_interval),
        }
    }

    /// Whether a poll is armed
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Look-ahead window in seconds
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Poll cadence in seconds
    pub fn poll_interval(&self) -> f64 {
        self.poll.period()
    }

    /// Deadline of the pending poll, `None` once stopped
    pub fn next_poll(&self) -> Option<f64> {
        self.poll.next_due()
    }

    /// Idle -> Running
    ///
    /// Restarts the sequencer at `now + offset`, the reading `poll` compares
    /// the grid against, and arms an immediate poll at local `now`. Returns
    /// false without touching anything when already running.
    pub fn start(&mut self, sequencer: &mut BeatSequencer, now: f64, offset: f64) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        sequencer.restart_at(now + offset);
        self.poll.arm_at(now);
        true
    }

    /// Running -> Idle
    ///
    /// Cancels the pending poll and rewinds to bar start. Returns false
    /// when already idle.
    pub fn stop(&mut self, sequencer: &mut BeatSequencer) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.poll.cancel();
        sequencer.rewind_bar();
        true
    }

    /// Run one poll if it is due
    ///
    /// Every sub-beat earlier than `now + offset + horizon` is passed to
    /// `emit` in time order and the sequencer advanced past it. Returns how
    /// many sub-beats were emitted.
    pub fn poll(
        &mut self,
        sequencer: &mut BeatSequencer,
        now: f64,
        offset: f64,
        mut emit: impl FnMut(BeatEvent),
    ) -> usize {
        if !self.running || !self.poll.fire_if_due(now) {
            return 0;
        }

        let effective_now = now + offset;
        let mut emitted = 0;
        while sequencer.next_event_time() < effective_now + self.horizon {
            emit(sequencer.current_event());
            sequencer.advance();
            emitted += 1;
        }
        emitted
    }
}

impl Default for LookAheadScheduler {
    fn default() -> Self {
        Self::new(HORIZON_SECONDS, POLL_INTERVAL_SECONDS)
    }
}
