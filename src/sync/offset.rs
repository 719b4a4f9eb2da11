// ABOUTME: Clock offset estimation between a follower and the host
// ABOUTME: Midpoint round-trip estimate, host phase projection, and sync quality

/// Age after which an estimate counts as stale (three missed probes)
pub const STALE_AFTER_SECONDS: f64 = 15.0;

/// Clock synchronization quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncQuality {
    /// Good synchronization (RTT < 50ms)
    Good,
    /// Degraded synchronization (RTT 50-100ms)
    Degraded,
    /// Lost synchronization (RTT > 100ms or no sync)
    Lost,
}

impl SyncQuality {
    /// Grade a round trip; no measurement counts as lost
    pub fn from_round_trip(round_trip: Option<f64>) -> Self {
        match round_trip {
            Some(rtt) if rtt < 0.050 => SyncQuality::Good,
            Some(rtt) if rtt < 0.100 => SyncQuality::Degraded,
            _ => SyncQuality::Lost,
        }
    }
}

/// Result of one offset probe
///
/// Assumes the request and the reply spent equal time on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetEstimate {
    /// Seconds between sending the probe and receiving the reply
    pub round_trip: f64,
    /// Estimated `host_time - local_time`
    pub offset: f64,
}

impl OffsetEstimate {
    /// Estimate from a completed probe
    /// client_time = local reading when the probe was sent
    /// host_time = host reading when it replied
    /// local_receipt = local reading when the reply arrived
    pub fn from_probe(client_time: f64, host_time: f64, local_receipt: f64) -> Self {
        let round_trip = local_receipt - client_time;
        Self {
            round_trip,
            offset: host_time + round_trip / 2.0 - local_receipt,
        }
    }

    /// Estimate from an unsolicited host reading, latency taken as zero
    pub fn bootstrap(host_time: f64, local_now: f64) -> Self {
        Self::from_probe(local_now, host_time, local_now)
    }

    /// Carry the host's next event time forward by the time elapsed
    /// since the host read its clock
    pub fn project_next_event_time(
        &self,
        host_next_event_time: f64,
        host_time: f64,
        local_receipt: f64,
    ) -> f64 {
        let elapsed = local_receipt - (host_time - self.round_trip / 2.0);
        host_next_event_time + elapsed
    }

    /// Grade of this estimate's round trip
    pub fn quality(&self) -> SyncQuality {
        SyncQuality::from_round_trip(Some(self.round_trip))
    }
}

/// Latest clock synchronization state
#[derive(Debug, Default)]
pub struct ClockSync {
    latest: Option<OffsetEstimate>,

    /// Local reading when `latest` was computed (for staleness detection)
    last_update: Option<f64>,
}

impl ClockSync {
    /// Create an empty clock synchronization state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new estimate taken at local time `now`
    pub fn update(&mut self, estimate: OffsetEstimate, now: f64) {
        self.latest = Some(estimate);
        self.last_update = Some(now);
    }

    /// Forget everything; used when rejoining a room
    pub fn clear(&mut self) {
        self.latest = None;
        self.last_update = None;
    }

    /// Most recent estimate, if any
    pub fn latest(&self) -> Option<OffsetEstimate> {
        self.latest
    }

    /// Current offset, zero before the first estimate
    pub fn offset(&self) -> f64 {
        self.latest.map_or(0.0, |e| e.offset)
    }

    /// Round trip of the latest estimate
    pub fn round_trip(&self) -> Option<f64> {
        self.latest.map(|e| e.round_trip)
    }

    /// Get sync quality based on RTT
    pub fn quality(&self) -> SyncQuality {
        SyncQuality::from_round_trip(self.round_trip())
    }

    /// Check if sync is stale at local time `now`
    pub fn is_stale(&self, now: f64) -> bool {
        match self.last_update {
            Some(last) => now - last > STALE_AFTER_SECONDS,
            None => true,
        }
    }
}
