use core::fmt;
use core::net::Ipv4Addr;

use alloc::string::String;
use log::{info, warn};
use thermolink_api::{Reading, UpdateEndpoint};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// The server answered outside the success range.
    Status(u16),
    /// The request never produced a response.
    Transport,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Status(code) => write!(f, "server answered {code}"),
            ReportError::Transport => write!(f, "transport failure"),
        }
    }
}

/// Outcome of one submitted report. Transitions from `Pending` to a terminal
/// state exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Pending,
    Success,
    Failure(ReportError),
}

impl ReportOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportOutcome::Pending)
    }
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    type Error: fmt::Debug;

    /// Issues a GET and resolves to the response status code.
    async fn get(&mut self, url: &str) -> Result<u16, Self::Error>;
}

/// Formats readings into update requests and tracks the single in-flight
/// outcome. Retry is not this component's business; the next sampling cycle
/// is the retry.
#[derive(Debug)]
pub struct ReportDispatcher<T: Transport> {
    transport: T,
    endpoint: UpdateEndpoint,
    staged_url: Option<String>,
    outcome: Option<ReportOutcome>,
}

impl<T: Transport> ReportDispatcher<T> {
    pub fn new(transport: T, endpoint: UpdateEndpoint) -> Self {
        Self {
            transport,
            endpoint,
            staged_url: None,
            outcome: None,
        }
    }

    /// Outcome of the most recently submitted report, if any was submitted.
    pub fn outcome(&self) -> Option<ReportOutcome> {
        self.outcome
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.outcome, Some(ReportOutcome::Pending))
    }

    pub fn has_staged_request(&self) -> bool {
        self.staged_url.is_some()
    }

    /// Consumes a reading and stages its update request. A reading can be
    /// submitted while the previous outcome is terminal, never while one is
    /// still pending.
    pub fn submit(&mut self, reading: Reading, device_ip: Option<Ipv4Addr>) -> crate::Result<()> {
        if self.in_flight() {
            return Err(Error::ReportInFlight);
        }

        let url = self.endpoint.update_url(&reading, device_ip);
        info!("report staged: {url}");
        self.outcome = Some(ReportOutcome::Pending);
        self.staged_url = Some(url);
        Ok(())
    }

    /// Performs the staged request. Resolution goes through `resolve`, so a
    /// completion can land at most once however this future is raced.
    pub async fn drive(&mut self) -> ReportOutcome {
        let Some(url) = self.staged_url.take() else {
            return self.outcome.unwrap_or(ReportOutcome::Pending);
        };

        match self.transport.get(&url).await {
            Ok(status) => self.resolve(status),
            Err(err) => {
                warn!("report transport failed: {err:?}");
                self.fail(ReportError::Transport);
            }
        }
        self.outcome.unwrap_or(ReportOutcome::Pending)
    }

    /// Completion handler. Runs at most once per submitted report; late or
    /// duplicate completions are logged and dropped.
    pub fn resolve(&mut self, status: u16) {
        if (200..300).contains(&status) {
            self.finish(ReportOutcome::Success);
        } else {
            self.finish(ReportOutcome::Failure(ReportError::Status(status)));
        }
    }

    pub fn fail(&mut self, reason: ReportError) {
        self.finish(ReportOutcome::Failure(reason));
    }

    fn finish(&mut self, terminal: ReportOutcome) {
        match self.outcome {
            Some(ReportOutcome::Pending) => {
                match terminal {
                    ReportOutcome::Success => info!("report confirmed"),
                    ReportOutcome::Failure(reason) => warn!("report failed: {reason}"),
                    ReportOutcome::Pending => return,
                }
                self.outcome = Some(terminal);
                self.staged_url = None;
            }
            _ => warn!("report completion ignored, nothing pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use thermolink_api::Centi;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        requests: Vec<String>,
        status: u16,
        broken: bool,
    }

    impl Transport for RecordingTransport {
        type Error = &'static str;

        async fn get(&mut self, url: &str) -> Result<u16, Self::Error> {
            self.requests.push(url.to_string());
            if self.broken {
                Err("connection refused")
            } else {
                Ok(self.status)
            }
        }
    }

    fn dispatcher(status: u16, broken: bool) -> ReportDispatcher<RecordingTransport> {
        let transport = RecordingTransport {
            requests: Vec::new(),
            status,
            broken,
        };
        ReportDispatcher::new(transport, UpdateEndpoint::new("example.org", "KEY"))
    }

    fn reading() -> Reading {
        Reading::new(Centi::from_parts(19, 5), 4_000)
    }

    #[tokio::test]
    async fn test_success_status_resolves_success() {
        let mut dispatcher = dispatcher(200, false);

        dispatcher.submit(reading(), None).unwrap();
        assert_eq!(dispatcher.outcome(), Some(ReportOutcome::Pending));

        assert_eq!(dispatcher.drive().await, ReportOutcome::Success);
        assert_eq!(
            dispatcher.transport.requests,
            ["http://example.org/update?key=KEY&field1=19.05"]
        );
    }

    #[tokio::test]
    async fn test_error_status_resolves_failure() {
        let mut dispatcher = dispatcher(500, false);

        dispatcher.submit(reading(), None).unwrap();
        assert_eq!(
            dispatcher.drive().await,
            ReportOutcome::Failure(ReportError::Status(500))
        );
    }

    #[tokio::test]
    async fn test_transport_error_resolves_failure() {
        let mut dispatcher = dispatcher(0, true);

        dispatcher.submit(reading(), None).unwrap();
        assert_eq!(
            dispatcher.drive().await,
            ReportOutcome::Failure(ReportError::Transport)
        );
    }

    #[test]
    fn test_completion_lands_at_most_once() {
        let mut dispatcher = dispatcher(200, false);
        dispatcher.submit(reading(), None).unwrap();

        dispatcher.resolve(200);
        assert_eq!(dispatcher.outcome(), Some(ReportOutcome::Success));

        // a late duplicate completion must not overwrite the outcome
        dispatcher.resolve(503);
        assert_eq!(dispatcher.outcome(), Some(ReportOutcome::Success));
    }

    #[test]
    fn test_second_submit_rejected_while_pending() {
        let mut dispatcher = dispatcher(200, false);

        dispatcher.submit(reading(), None).unwrap();
        assert_eq!(
            dispatcher.submit(reading(), None),
            Err(Error::ReportInFlight)
        );

        // a terminal outcome frees the dispatcher for the next cycle
        dispatcher.resolve(200);
        assert!(!dispatcher.has_staged_request());
        assert!(dispatcher.submit(reading(), None).is_ok());
    }

    #[tokio::test]
    async fn test_drive_without_staged_request_is_a_no_op() {
        let mut dispatcher = dispatcher(200, false);

        assert_eq!(dispatcher.drive().await, ReportOutcome::Pending);
        assert!(dispatcher.transport.requests.is_empty());
    }
}
