use alloc::string::{String, ToString};

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Timer};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thermolink_api::{ChannelFields, TimeProvider, UpdateEndpoint};

use crate::error::Error;
use crate::link::{ConnectionState, LinkMonitor, StationInterface};
use crate::power::{PowerControl, PowerCycleController, PowerState, WatchdogPolicy};
use crate::report::{ReportDispatcher, ReportOutcome, Transport};
use crate::sample::{SampleMode, SampleScheduler, SensorDriver};
use crate::schedule::{ScheduleState, TimerSlot};

const DEFAULT_LINK_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 3_000;
const DEFAULT_LINGER_MS: u64 = 2_000;
const DEFAULT_WATCHDOG_MS: u64 = 60_000;
const DEFAULT_SLEEP_DURATION_MS: u64 = 60_000;

/// Static cycle configuration. Read-only once the node is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    pub server: String,
    pub api_key: String,
    pub fields: ChannelFields,
    pub mode: SampleMode,
    pub link_poll_interval_ms: u64,
    pub sample_interval_ms: u64,
    pub linger_ms: u64,
    pub watchdog_ms: u64,
    pub sleep_duration_ms: u64,
    pub watchdog_policy: WatchdogPolicy,
}

impl CycleConfig {
    pub fn new(server: &str, api_key: &str) -> Self {
        Self {
            server: server.to_string(),
            api_key: api_key.to_string(),
            fields: ChannelFields::default(),
            mode: SampleMode::Periodic,
            link_poll_interval_ms: DEFAULT_LINK_POLL_INTERVAL_MS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            linger_ms: DEFAULT_LINGER_MS,
            watchdog_ms: DEFAULT_WATCHDOG_MS,
            sleep_duration_ms: DEFAULT_SLEEP_DURATION_MS,
            watchdog_policy: WatchdogPolicy::ForceSleep,
        }
    }

    pub fn with_fields(mut self, fields: ChannelFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_intervals(mut self, link_poll_ms: u64, sample_ms: u64) -> Self {
        self.link_poll_interval_ms = link_poll_ms;
        self.sample_interval_ms = sample_ms;
        self
    }

    pub fn with_linger_ms(mut self, linger_ms: u64) -> Self {
        self.linger_ms = linger_ms;
        self
    }

    pub fn with_watchdog(mut self, watchdog_ms: u64, policy: WatchdogPolicy) -> Self {
        self.watchdog_ms = watchdog_ms;
        self.watchdog_policy = policy;
        self
    }

    pub fn with_sleep_duration_ms(mut self, sleep_ms: u64) -> Self {
        self.sleep_duration_ms = sleep_ms;
        self
    }
}

/// The cycle context: owns the four components, the timer table and the
/// clock, and wires the timer callbacks together. No state lives outside it.
pub struct Node<S, D, T, P, C>
where
    S: StationInterface,
    D: SensorDriver,
    T: Transport,
    P: PowerControl,
    C: TimeProvider,
{
    mode: SampleMode,
    link_poll_interval_ms: u64,
    sample_interval_ms: u64,
    monitor: LinkMonitor<S>,
    sampler: SampleScheduler<D>,
    dispatcher: ReportDispatcher<T>,
    power: PowerCycleController,
    power_control: P,
    clock: C,
    schedule: ScheduleState,
    started: bool,
}

impl<S, D, T, P, C> Node<S, D, T, P, C>
where
    S: StationInterface,
    D: SensorDriver,
    T: Transport,
    P: PowerControl,
    C: TimeProvider,
{
    pub fn new(
        config: CycleConfig,
        station: S,
        driver: D,
        transport: T,
        power_control: P,
        clock: C,
    ) -> Self {
        let endpoint =
            UpdateEndpoint::new(&config.server, &config.api_key).with_fields(config.fields.clone());

        Self {
            mode: config.mode,
            link_poll_interval_ms: config.link_poll_interval_ms,
            sample_interval_ms: config.sample_interval_ms,
            monitor: LinkMonitor::new(station, config.link_poll_interval_ms),
            sampler: SampleScheduler::new(driver, config.mode, config.sample_interval_ms),
            dispatcher: ReportDispatcher::new(transport, endpoint),
            power: PowerCycleController::new(
                config.linger_ms,
                config.watchdog_ms,
                config.sleep_duration_ms,
                config.watchdog_policy,
            ),
            power_control,
            clock,
            schedule: ScheduleState::new(),
            started: false,
        }
    }

    pub fn link_state(&self) -> ConnectionState {
        self.monitor.state()
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    pub fn report_outcome(&self) -> Option<ReportOutcome> {
        self.dispatcher.outcome()
    }

    pub fn schedule(&self) -> &ScheduleState {
        &self.schedule
    }

    /// One-time arming of the cycle timers; later calls are no-ops.
    pub fn init(&mut self) {
        if self.started {
            return;
        }

        let now = self.clock.uptime_ms();
        self.schedule
            .arm(TimerSlot::LinkPoll, now + self.link_poll_interval_ms);
        self.schedule
            .arm(TimerSlot::Sample, now + self.sample_interval_ms);
        if self.mode == SampleMode::SingleShot {
            self.power.arm_watchdog(&mut self.schedule, now);
        }
        self.started = true;
        info!("cycle armed in {:?} mode", self.mode);
    }

    /// The callback table: drains every due timer in order. Returns the
    /// sleep request once the power controller ends the cycle.
    pub fn process_due(&mut self, now_ms: u64) -> Option<Duration> {
        if self.mode == SampleMode::SingleShot {
            if let Some(outcome) = self.dispatcher.outcome() {
                self.power.observe(outcome, &mut self.schedule, now_ms);
            }
        }

        for slot in self.schedule.take_due(now_ms) {
            match slot {
                TimerSlot::LinkPoll => {
                    self.monitor.on_tick(&mut self.schedule, now_ms);
                }
                TimerSlot::Sample => {
                    let link = self.monitor.state();
                    if let Some(reading) = self.sampler.on_tick(link, &mut self.schedule, now_ms) {
                        let address = self.monitor.address();
                        if let Err(err) = self.dispatcher.submit(reading, address) {
                            warn!("reading dropped: {err}");
                        }
                    }
                }
                TimerSlot::Linger => {
                    if let Some(duration) = self.power.on_linger() {
                        return Some(duration);
                    }
                }
                TimerSlot::Watchdog => {
                    let pending = self.dispatcher.in_flight();
                    if let Some(duration) =
                        self.power.on_watchdog(pending, &mut self.schedule, now_ms)
                    {
                        return Some(duration);
                    }
                }
            }
        }
        None
    }

    /// Runs the cycle: forever in periodic mode, until deep sleep in
    /// single-shot mode.
    pub async fn run(&mut self) -> crate::Result<()> {
        self.init();

        loop {
            let now = self.clock.uptime_ms();
            if let Some(duration) = self.process_due(now) {
                return self.enter_sleep(duration).await;
            }

            if self.dispatcher.has_staged_request() {
                self.drive_report(now).await;
                continue;
            }

            let Some(deadline) = self.schedule.next_deadline() else {
                return Err(Error::NothingScheduled);
            };
            Timer::after(Duration::from_millis(deadline.saturating_sub(now))).await;
        }
    }

    /// Drives the staged request to completion. Under `ForceSleep` the wait
    /// is bounded by the watchdog deadline and an abandoned request is just
    /// one more transport casualty.
    async fn drive_report(&mut self, now_ms: u64) {
        let bound = match self.power.policy() {
            WatchdogPolicy::ForceSleep => self.schedule.deadline(TimerSlot::Watchdog),
            WatchdogPolicy::WaitForReport => None,
        };

        match bound {
            Some(deadline) => {
                let wait = Duration::from_millis(deadline.saturating_sub(now_ms));
                match select(self.dispatcher.drive(), Timer::after(wait)).await {
                    Either::First(outcome) => debug!("report drive finished: {outcome:?}"),
                    Either::Second(()) => debug!("report drive abandoned at watchdog deadline"),
                }
            }
            None => {
                let outcome = self.dispatcher.drive().await;
                debug!("report drive finished: {outcome:?}");
            }
        }
    }

    async fn enter_sleep(&mut self, duration: Duration) -> crate::Result<()> {
        info!("entering deep sleep for {} ms", duration.as_millis());
        match self.power_control.enter_low_power(duration).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("low-power entry failed: {err:?}");
                Err(Error::PowerControlFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::net::Ipv4Addr;

    use alloc::rc::Rc;

    use thermolink_api::Centi;

    use super::*;
    use crate::link::StationStatus;
    use crate::sample::Measurement;

    struct ConnectedStation;

    impl StationInterface for ConnectedStation {
        fn status(&self) -> StationStatus {
            StationStatus::GotIp
        }

        fn ip_address(&self) -> Ipv4Addr {
            Ipv4Addr::new(10, 0, 0, 9)
        }
    }

    struct SteadySensor;

    impl SensorDriver for SteadySensor {
        type Error = &'static str;

        fn read(&mut self) -> Result<Measurement, Self::Error> {
            Ok(Measurement::new(Centi::from_parts(22, 0)))
        }
    }

    struct OkTransport;

    impl Transport for OkTransport {
        type Error = &'static str;

        async fn get(&mut self, _url: &str) -> Result<u16, Self::Error> {
            Ok(200)
        }
    }

    struct NoopPower;

    impl PowerControl for NoopPower {
        type Error = core::convert::Infallible;

        async fn enter_low_power(&mut self, _duration: Duration) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[derive(Clone)]
    struct TestClock(Rc<Cell<u64>>);

    impl TimeProvider for TestClock {
        fn uptime_ms(&self) -> u64 {
            self.0.get()
        }
    }

    fn node(
        config: CycleConfig,
        clock: TestClock,
    ) -> Node<ConnectedStation, SteadySensor, OkTransport, NoopPower, TestClock> {
        Node::new(
            config,
            ConnectedStation,
            SteadySensor,
            OkTransport,
            NoopPower,
            clock,
        )
    }

    #[test]
    fn test_init_arms_cycle_timers() {
        let clock = TestClock(Rc::new(Cell::new(0)));

        let mut periodic = node(CycleConfig::new("example.org", "KEY"), clock.clone());
        periodic.init();
        assert!(periodic.schedule().is_armed(TimerSlot::LinkPoll));
        assert!(periodic.schedule().is_armed(TimerSlot::Sample));
        assert!(!periodic.schedule().is_armed(TimerSlot::Watchdog));

        let mut single_shot = node(
            CycleConfig::new("example.org", "KEY").with_mode(SampleMode::SingleShot),
            clock,
        );
        single_shot.init();
        assert!(single_shot.schedule().is_armed(TimerSlot::Watchdog));
    }

    #[test]
    fn test_init_is_one_time() {
        let cell = Rc::new(Cell::new(0));
        let mut node = node(
            CycleConfig::new("example.org", "KEY"),
            TestClock(cell.clone()),
        );

        node.init();
        let armed = node.schedule().deadline(TimerSlot::Sample);

        cell.set(10_000);
        node.init();
        assert_eq!(node.schedule().deadline(TimerSlot::Sample), armed);
    }

    #[test]
    fn test_due_sample_stages_a_report() {
        let cell = Rc::new(Cell::new(0));
        let mut node = node(
            CycleConfig::new("example.org", "KEY").with_intervals(2_000, 3_000),
            TestClock(cell.clone()),
        );
        node.init();

        assert!(node.process_due(2_000).is_none());
        assert_eq!(node.link_state(), ConnectionState::Connected);

        assert!(node.process_due(3_000).is_none());
        assert_eq!(node.report_outcome(), Some(ReportOutcome::Pending));
        assert!(node.dispatcher.has_staged_request());
    }

    #[test]
    fn test_sample_before_link_confirmation_is_lost() {
        let cell = Rc::new(Cell::new(0));
        let mut node = node(
            // sample fires before the first link poll
            CycleConfig::new("example.org", "KEY").with_intervals(4_000, 1_000),
            TestClock(cell.clone()),
        );
        node.init();

        assert!(node.process_due(1_000).is_none());
        assert_eq!(node.report_outcome(), None);
    }
}
