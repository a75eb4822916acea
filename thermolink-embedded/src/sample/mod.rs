use core::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use thermolink_api::{Centi, Reading};

use crate::link::ConnectionState;
use crate::schedule::{ScheduleState, TimerSlot};

/// What a driver hands back from one successful read. Integrity checks
/// (checksums, family codes) are the driver's job; a failed check is a read
/// error, never a `Measurement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub temperature: Centi,
    pub humidity: Option<Centi>,
    pub supply_millivolts: Option<u16>,
}

impl Measurement {
    pub fn new(temperature: Centi) -> Self {
        Self {
            temperature,
            humidity: None,
            supply_millivolts: None,
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

pub trait SensorDriver {
    type Error: fmt::Debug;

    fn read(&mut self) -> Result<Measurement, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleMode {
    /// Steady cadence of attempts for mains-powered deployments.
    Periodic,
    /// Sample until one reading is produced, then leave the rest of the
    /// cycle to the power controller.
    SingleShot,
}

/// Fires on the sample timer and reads the sensor only while the link is up.
/// A lost tick is simply lost; no backlog accumulates.
#[derive(Debug)]
pub struct SampleScheduler<D: SensorDriver> {
    driver: D,
    mode: SampleMode,
    interval_ms: u64,
}

impl<D: SensorDriver> SampleScheduler<D> {
    pub fn new(driver: D, mode: SampleMode, interval_ms: u64) -> Self {
        Self {
            driver,
            mode,
            interval_ms,
        }
    }

    pub fn mode(&self) -> SampleMode {
        self.mode
    }

    /// Sample-timer callback. Returns a stamped reading when the link was up
    /// and the driver read cleanly; the next tick is the only retry.
    pub fn on_tick(
        &mut self,
        link: ConnectionState,
        schedule: &mut ScheduleState,
        now_ms: u64,
    ) -> Option<Reading> {
        if link != ConnectionState::Connected {
            self.rearm(schedule, now_ms);
            return None;
        }

        let measurement = match self.driver.read() {
            Ok(measurement) => measurement,
            Err(err) => {
                warn!("sensor read failed: {err:?}");
                self.rearm(schedule, now_ms);
                return None;
            }
        };

        let mut reading = Reading::new(measurement.temperature, now_ms);
        reading.humidity = measurement.humidity;
        reading.supply_millivolts = measurement.supply_millivolts;

        match self.mode {
            SampleMode::Periodic => self.rearm(schedule, now_ms),
            SampleMode::SingleShot => {}
        }
        Some(reading)
    }

    fn rearm(&self, schedule: &mut ScheduleState, now_ms: u64) {
        schedule.arm(TimerSlot::Sample, now_ms + self.interval_ms);
    }
}
