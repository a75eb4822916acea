use serde::{Deserialize, Serialize};

use crate::value::Centi;

/// One captured sensor reading. Immutable once created; the capture stamp is
/// a logical uptime tick, since no wall clock exists before network sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: Centi,
    pub humidity: Option<Centi>,
    pub supply_millivolts: Option<u16>,
    pub captured_at_ms: u64,
}

impl Reading {
    pub fn new(temperature: Centi, captured_at_ms: u64) -> Self {
        Self {
            temperature,
            humidity: None,
            supply_millivolts: None,
            captured_at_ms,
        }
    }

    pub fn with_humidity(mut self, humidity: Centi) -> Self {
        self.humidity = Some(humidity);
        self
    }

    pub fn with_supply_millivolts(mut self, millivolts: u16) -> Self {
        self.supply_millivolts = Some(millivolts);
        self
    }
}
