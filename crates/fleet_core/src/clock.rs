use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Wall-clock timestamps derived from the tokio clock.
///
/// The UTC anchor is taken once; later readings add the elapsed tokio time.
/// Under a paused tokio runtime timestamps therefore advance with virtual time,
/// which keeps booking expiry and trip durations consistent with ticks.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    anchor_wall: DateTime<Utc>,
    anchor_instant: Instant,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::anchored_at(Utc::now())
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor_instant: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.anchor_instant);
        let elapsed = TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero());
        self.anchor_wall + elapsed
    }
}
