use core::fmt;

use embassy_time::Duration;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::report::ReportOutcome;
use crate::schedule::{ScheduleState, TimerSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Awake, no report resolved yet.
    AwakePending,
    /// A report resolved; lingering so transport teardown can flush.
    AwakeDraining,
    /// Terminal. The next boot restarts the whole cycle.
    Asleep,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::AwakePending => write!(f, "awake-pending"),
            PowerState::AwakeDraining => write!(f, "awake-draining"),
            PowerState::Asleep => write!(f, "asleep"),
        }
    }
}

/// What the watchdog does when it expires with a report still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchdogPolicy {
    /// Sleep on schedule whatever the report state. Battery deployments
    /// want this: a cycle that cannot confirm its report is not worth
    /// staying awake for.
    ForceSleep,
    /// Keep deferring the watchdog while a report is in flight and only
    /// force sleep once nothing is pending.
    WaitForReport,
}

#[allow(async_fn_in_trait)]
pub trait PowerControl {
    type Error: fmt::Debug;

    /// Enters deep sleep for the given duration. On hardware this call does
    /// not return; execution resumes at the entry point on the next boot.
    async fn enter_low_power(&mut self, duration: Duration) -> Result<(), Self::Error>;
}

/// Decides when it is safe to power down: after a resolved report plus a
/// short linger, or on the watchdog deadline, whichever comes first.
#[derive(Debug)]
pub struct PowerCycleController {
    state: PowerState,
    linger_ms: u64,
    watchdog_ms: u64,
    sleep_duration_ms: u64,
    policy: WatchdogPolicy,
}

impl PowerCycleController {
    pub fn new(
        linger_ms: u64,
        watchdog_ms: u64,
        sleep_duration_ms: u64,
        policy: WatchdogPolicy,
    ) -> Self {
        Self {
            state: PowerState::AwakePending,
            linger_ms,
            watchdog_ms,
            sleep_duration_ms,
            policy,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn policy(&self) -> WatchdogPolicy {
        self.policy
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_millis(self.sleep_duration_ms)
    }

    pub fn arm_watchdog(&self, schedule: &mut ScheduleState, now_ms: u64) {
        schedule.arm(TimerSlot::Watchdog, now_ms + self.watchdog_ms);
    }

    /// Reacts to a resolved report: stop the polling cadence, give the
    /// transport a moment to flush, then sleep.
    pub fn observe(&mut self, outcome: ReportOutcome, schedule: &mut ScheduleState, now_ms: u64) {
        if self.state != PowerState::AwakePending || !outcome.is_terminal() {
            return;
        }

        self.transition(PowerState::AwakeDraining);
        schedule.disarm(TimerSlot::LinkPoll);
        schedule.disarm(TimerSlot::Sample);
        schedule.arm(TimerSlot::Linger, now_ms + self.linger_ms);
    }

    /// Linger-timer callback; yields the sleep request.
    pub fn on_linger(&mut self) -> Option<Duration> {
        if self.state != PowerState::AwakeDraining {
            return None;
        }
        self.transition(PowerState::Asleep);
        Some(self.sleep_duration())
    }

    /// Watchdog callback. Guarantees the cycle ends even when no report ever
    /// resolves.
    pub fn on_watchdog(
        &mut self,
        report_pending: bool,
        schedule: &mut ScheduleState,
        now_ms: u64,
    ) -> Option<Duration> {
        if self.state == PowerState::Asleep {
            return None;
        }

        if report_pending && self.policy == WatchdogPolicy::WaitForReport {
            debug!("watchdog deferred, report still pending");
            self.arm_watchdog(schedule, now_ms);
            return None;
        }

        info!("watchdog expired, forcing deep sleep");
        self.transition(PowerState::Asleep);
        Some(self.sleep_duration())
    }

    fn transition(&mut self, next: PowerState) {
        debug!("power {} -> {}", self.state, next);
        self.state = next;
    }
}
