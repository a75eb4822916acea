use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    ReportInFlight,
    NothingScheduled,
    PowerControlFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ReportInFlight => write!(f, "A report is already in flight"),
            Error::NothingScheduled => write!(f, "No timer armed and no report in flight"),
            Error::PowerControlFailed => write!(f, "Low-power entry failed"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
