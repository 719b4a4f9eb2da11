// ABOUTME: Follower-side sync engine
// ABOUTME: Periodic offset probes, pending-probe timeout, and estimate bookkeeping

use crate::protocol::messages::SyncRequest;
use crate::scheduler::timer::{earliest, RepeatingTimer, Timeout};
use crate::sync::offset::{ClockSync, OffsetEstimate};

/// Seconds between probes
pub const PROBE_INTERVAL_SECONDS: f64 = 5.0;
/// Seconds to wait for a reply before giving up on a probe
pub const PROBE_TIMEOUT_SECONDS: f64 = 0.5;

/// Drives the follower's probe cadence
///
/// The host never initiates: the follower sends a `syncRequest` every
/// probe interval and waits a bounded time for the matching reply.
#[derive(Debug)]
pub struct SyncEngine {
    clock_sync: ClockSync,
    probe: RepeatingTimer,
    timeout: Timeout,
    probe_timeout: f64,
    pending_client_time: Option<f64>,
}

impl SyncEngine {
    /// Idle engine probing every `probe_interval`, waiting `probe_timeout` for replies
    pub fn new(probe_interval: f64, probe_timeout: f64) -> Self {
        Self {
            clock_sync: ClockSync::new(),
            probe: RepeatingTimer::new(probe_interval),
            timeout: Timeout::new(),
            probe_timeout,
            pending_client_time: None,
        }
    }

    /// Begin probing; the first probe is due immediately
    pub fn start(&mut self, now: f64) {
        self.probe.arm_at(now);
    }

    /// Stop probing and drop any pending probe
    pub fn stop(&mut self) {
        self.probe.cancel();
        self.timeout.clear();
        self.pending_client_time = None;
    }

    /// Stop and forget all estimates, as on a fresh join
    pub fn reset(&mut self) {
        self.stop();
        self.clock_sync.clear();
    }

    /// Latest estimate and its age
    pub fn clock_sync(&self) -> &ClockSync {
        &self.clock_sync
    }

    /// Current offset (`host - local`), zero before the first estimate
    pub fn offset(&self) -> f64 {
        self.clock_sync.offset()
    }

    /// Whether a probe is waiting for its reply
    pub fn is_awaiting_reply(&self) -> bool {
        self.pending_client_time.is_some()
    }

    /// Earliest armed deadline (next probe or pending timeout)
    pub fn next_deadline(&self) -> Option<f64> {
        earliest([self.probe.next_due(), self.timeout.deadline()])
    }

    /// Produce a probe if one is due
    pub fn poll_probe(&mut self, now: f64) -> Option<SyncRequest> {
        if !self.probe.fire_if_due(now) {
            return None;
        }
        self.pending_client_time = Some(now);
        self.timeout.arm(now + self.probe_timeout);
        Some(SyncRequest { client_time: now })
    }

    /// True once when a pending probe has waited too long
    pub fn poll_timeout(&mut self, now: f64) -> bool {
        if !self.timeout.expire_if_due(now) {
            return false;
        }
        log::warn!(
            "Sync probe sent at {:.3}s got no reply within {:.3}s",
            self.pending_client_time.unwrap_or_default(),
            self.probe_timeout
        );
        self.pending_client_time = None;
        true
    }

    /// Fold a host reply into the estimate
    ///
    /// A reply echoing the pending probe's time clears its timeout. Late
    /// replies still yield a usable estimate.
    pub fn on_response(&mut self, client_time: f64, host_time: f64, local_receipt: f64) -> OffsetEstimate {
        if self.pending_client_time == Some(client_time) {
            self.pending_client_time = None;
            self.timeout.clear();
        } else {
            log::debug!("Sync reply for probe at {:.3}s arrived after its timeout", client_time);
        }

        let estimate = OffsetEstimate::from_probe(client_time, host_time, local_receipt);
        self.clock_sync.update(estimate, local_receipt);
        log::debug!(
            "Clock sync updated: RTT={:.2}ms, offset={:.4}s, quality={:?}",
            estimate.round_trip * 1000.0,
            estimate.offset,
            estimate.quality()
        );
        estimate
    }

    /// Seed the estimate from the host's join-time reading
    pub fn on_bootstrap(&mut self, host_time: f64, local_now: f64) -> OffsetEstimate {
        let estimate = OffsetEstimate::bootstrap(host_time, local_now);
        self.clock_sync.update(estimate, local_now);
        estimate
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(PROBE_INTERVAL_SECONDS, PROBE_TIMEOUT_SECONDS)
    }
}
