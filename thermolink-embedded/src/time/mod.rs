use embassy_time::Instant;
use thermolink_api::TimeProvider;

/// Logical tick source: milliseconds since this clock was created, which on
/// hardware is effectively milliseconds since boot.
#[derive(Debug, Clone)]
pub struct UptimeClock {
    anchor: Instant,
}

impl UptimeClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for UptimeClock {
    fn uptime_ms(&self) -> u64 {
        self.anchor.elapsed().as_millis()
    }
}
