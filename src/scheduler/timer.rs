// ABOUTME: Cancellable timers expressed in clock seconds
// ABOUTME: The owner polls them; an async driver sleeps until the earliest deadline

/// Repeating timer that fires, then re-arms one period after it fired
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingTimer {
    period: f64,
    next_due: Option<f64>,
}

impl RepeatingTimer {
    /// Create a disarmed timer
    pub fn new(period: f64) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    /// Time between firings
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Arm so the first firing happens at `at`
    pub fn arm_at(&mut self, at: f64) {
        self.next_due = Some(at);
    }

    /// Disarm; no further firings until re-armed
    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Whether a firing is pending
    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Deadline of the next firing, if armed
    pub fn next_due(&self) -> Option<f64> {
        self.next_due
    }

    /// Fire if the deadline has passed, rescheduling one period after `now`
    pub fn fire_if_due(&mut self, now: f64) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}

/// One-shot deadline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeout {
    deadline: Option<f64>,
}

impl Timeout {
    /// Create a cleared timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm to expire at `deadline`, replacing any earlier deadline
    pub fn arm(&mut self, deadline: f64) {
        self.deadline = Some(deadline);
    }

    /// Disarm without expiring
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if armed
    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Returns true exactly once, when `now` reaches the deadline
    pub fn expire_if_due(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    deadlines.into_iter().flatten().reduce(f64::min)
}
