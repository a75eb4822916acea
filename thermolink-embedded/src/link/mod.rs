use core::fmt;
use core::net::Ipv4Addr;

use log::{debug, warn};

use crate::schedule::{ScheduleState, TimerSlot};

/// Raw station status reported by the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Idle,
    Connecting,
    WrongPassword,
    NoApFound,
    ConnectFail,
    GotIp,
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationStatus::Idle => write!(f, "idle"),
            StationStatus::Connecting => write!(f, "connecting"),
            StationStatus::WrongPassword => write!(f, "wrong password"),
            StationStatus::NoApFound => write!(f, "access point not found"),
            StationStatus::ConnectFail => write!(f, "connect failed"),
            StationStatus::GotIp => write!(f, "got ip"),
        }
    }
}

/// Connectivity as the rest of the cycle sees it. Written only by the
/// `LinkMonitor`; everyone else reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    ConnectError,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::ConnectError => write!(f, "connect error"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

pub trait StationInterface {
    fn status(&self) -> StationStatus;

    /// Address held by the station; unspecified (0.0.0.0) while none is
    /// assigned.
    fn ip_address(&self) -> Ipv4Addr;
}

/// Polls the station on a fixed cadence and derives the tri-state
/// connectivity signal. Recovery from `ConnectError` is left to the stack's
/// own auto-reconnect; the monitor just keeps polling.
#[derive(Debug)]
pub struct LinkMonitor<S: StationInterface> {
    station: S,
    state: ConnectionState,
    poll_interval_ms: u64,
}

impl<S: StationInterface> LinkMonitor<S> {
    pub fn new(station: S, poll_interval_ms: u64) -> Self {
        Self {
            station,
            state: ConnectionState::Connecting,
            poll_interval_ms,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Address to report as device telemetry, once one is held.
    pub fn address(&self) -> Option<Ipv4Addr> {
        let address = self.station.ip_address();
        if address.is_unspecified() {
            None
        } else {
            Some(address)
        }
    }

    /// Poll-timer callback. Re-arms the poll slot on every call, whatever
    /// the outcome.
    pub fn on_tick(&mut self, schedule: &mut ScheduleState, now_ms: u64) -> ConnectionState {
        let status = self.station.status();
        let next = match status {
            StationStatus::GotIp => {
                if self.station.ip_address().is_unspecified() {
                    // the stack can claim an address before it holds one
                    warn!("station reports got-ip with an empty address");
                    ConnectionState::ConnectError
                } else {
                    ConnectionState::Connected
                }
            }
            StationStatus::WrongPassword | StationStatus::NoApFound | StationStatus::ConnectFail => {
                ConnectionState::ConnectError
            }
            StationStatus::Idle | StationStatus::Connecting => ConnectionState::Connecting,
        };

        if next != self.state {
            debug!("link {} -> {} (station: {})", self.state, next, status);
        }
        self.state = next;

        schedule.arm(TimerSlot::LinkPoll, now_ms + self.poll_interval_ms);
        self.state
    }
}
