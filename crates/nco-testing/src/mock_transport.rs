//! In-memory transport for unit testing.
//!
//! Responses are scripted per command text. Each dial produces a fresh
//! [`MockConn`]; counters on [`MockTransportStats`] record how many dials,
//! logins, closes and sent commands the code under test performed.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tds_channel::{
    Channel, Conn, DialInfo, Done, DoneStatus, EedError, ExtendedError, LoginConfig, Package, Row,
    RowFormat, TranState, Transport, TransportError, Value,
};
use tokio_util::sync::CancellationToken;

/// Scripted response to one command.
#[derive(Clone)]
pub enum MockResponse {
    /// Yield these packages, then end of stream.
    Packages(Vec<Package>),

    /// Yield these packages, then fail with the error.
    Fail {
        /// Packages yielded before the failure.
        packages: Vec<Package>,
        /// Error returned after the packages.
        error: TransportError,
    },

    /// Reject the outbound package.
    SendFailure(TransportError),

    /// Never answer; reads block until the connection lifetime is canceled.
    Stall,

    /// Wait before producing the inner response.
    Delayed {
        /// Time to wait before the first package.
        delay: Duration,
        /// Response produced after the wait.
        response: Box<MockResponse>,
    },

    /// Compute the response from the command text.
    Custom(Arc<dyn Fn(&str) -> MockResponse + Send + Sync>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packages(p) => f.debug_tuple("Packages").field(&p.len()).finish(),
            Self::Fail { packages, error } => f
                .debug_struct("Fail")
                .field("packages", &packages.len())
                .field("error", error)
                .finish(),
            Self::SendFailure(e) => f.debug_tuple("SendFailure").field(e).finish(),
            Self::Stall => f.write_str("Stall"),
            Self::Delayed { delay, response } => f
                .debug_struct("Delayed")
                .field("delay", delay)
                .field("response", response)
                .finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Rows under the given columns, closed by a completed final marker.
    pub fn rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let mut packages = Vec::with_capacity(rows.len() + 2);
        packages.push(Package::RowFormat(RowFormat::from_names(columns)));
        packages.extend(rows.into_iter().map(|r| Package::Row(Row::new(r))));
        packages.push(Package::Done(Done::completed(count)));
        Self::Packages(packages)
    }

    /// Affected row count with no result set.
    pub fn affected(count: u32) -> Self {
        Self::Packages(vec![Package::Done(Done::completed(count))])
    }

    /// Server error detail followed by a completed error marker.
    pub fn error(number: i32, message: impl Into<String>) -> Self {
        Self::Packages(vec![
            Package::Eed(ExtendedError::new(number, message)),
            Package::Done(Done::new(DoneStatus::ERROR, TranState::Completed, 0)),
        ])
    }

    /// Arbitrary package script.
    pub fn packages(packages: Vec<Package>) -> Self {
        Self::Packages(packages)
    }

    /// Packages followed by a transport failure.
    pub fn fail_after(packages: Vec<Package>, error: TransportError) -> Self {
        Self::Fail { packages, error }
    }

    /// Delay another response.
    pub fn delayed(delay: Duration, response: MockResponse) -> Self {
        Self::Delayed {
            delay,
            response: Box::new(response),
        }
    }
}

/// Single read step of a scripted response.
#[derive(Debug)]
enum Step {
    Package(Package),
    Error(TransportError),
    Sleep(Duration),
    Stall,
}

fn script(response: MockResponse, cmd: &str, steps: &mut VecDeque<Step>) -> Option<TransportError> {
    match response {
        MockResponse::Packages(packages) => {
            steps.extend(packages.into_iter().map(Step::Package));
        }
        MockResponse::Fail { packages, error } => {
            steps.extend(packages.into_iter().map(Step::Package));
            steps.push_back(Step::Error(error));
        }
        MockResponse::SendFailure(error) => return Some(error),
        MockResponse::Stall => steps.push_back(Step::Stall),
        MockResponse::Delayed { delay, response } => {
            steps.push_back(Step::Sleep(delay));
            return script(*response, cmd, steps);
        }
        MockResponse::Custom(f) => return script(f(cmd), cmd, steps),
    }
    None
}

/// Counters recorded by a [`MockTransport`].
#[derive(Debug, Default)]
pub struct MockTransportStats {
    dials: AtomicUsize,
    logins: AtomicUsize,
    closes: AtomicUsize,
    live: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl MockTransportStats {
    /// Successful dials.
    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Successful logins.
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Explicit `close` calls.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Connections dialed and not yet dropped.
    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Command texts of all language packages sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[derive(Debug, Default)]
struct MockConfig {
    responses: HashMap<String, MockResponse>,
    default_response: Option<MockResponse>,
    dial_failure: Option<TransportError>,
    login_failure: Option<TransportError>,
    dial_delay: Option<Duration>,
    login_delay: Option<Duration>,
    close_failure: Option<TransportError>,
}

/// Builder for [`MockTransport`].
#[derive(Debug)]
pub struct MockTransportBuilder {
    config: MockConfig,
}

impl MockTransportBuilder {
    /// Create a builder whose unmatched commands get an empty completed marker.
    pub fn new() -> Self {
        Self {
            config: MockConfig {
                default_response: Some(MockResponse::affected(0)),
                ..MockConfig::default()
            },
        }
    }

    /// Add a response for a specific command.
    pub fn with_response(mut self, cmd: impl Into<String>, response: MockResponse) -> Self {
        self.config.responses.insert(cmd.into(), response);
        self
    }

    /// Set the response for unmatched commands.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.config.default_response = Some(response);
        self
    }

    /// Fail every dial with the error.
    pub fn with_dial_failure(mut self, error: TransportError) -> Self {
        self.config.dial_failure = Some(error);
        self
    }

    /// Fail every login with the error.
    pub fn with_login_failure(mut self, error: TransportError) -> Self {
        self.config.login_failure = Some(error);
        self
    }

    /// Fail every explicit close with the error.
    pub fn with_close_failure(mut self, error: TransportError) -> Self {
        self.config.close_failure = Some(error);
        self
    }

    /// Wait before completing each dial.
    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.config.dial_delay = Some(delay);
        self
    }

    /// Wait before completing each login.
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.config.login_delay = Some(delay);
        self
    }

    /// Build the transport.
    pub fn build(self) -> MockTransport {
        MockTransport {
            config: Arc::new(Mutex::new(self.config)),
            stats: Arc::new(MockTransportStats::default()),
        }
    }
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory transport with scripted responses.
///
/// Clones share configuration and counters.
#[derive(Debug, Clone)]
pub struct MockTransport {
    config: Arc<Mutex<MockConfig>>,
    stats: Arc<MockTransportStats>,
}

impl MockTransport {
    /// Create a new builder.
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// Shared counters.
    pub fn stats(&self) -> &MockTransportStats {
        &self.stats
    }

    /// Replace the response for a command on an existing transport.
    pub fn set_response(&self, cmd: impl Into<String>, response: MockResponse) {
        self.config.lock().responses.insert(cmd.into(), response);
    }

    /// Change the login failure on an existing transport.
    pub fn set_login_failure(&self, error: Option<TransportError>) {
        self.config.lock().login_failure = error;
    }
}

impl Transport for MockTransport {
    type Conn = MockConn;

    async fn dial(
        &self,
        info: &DialInfo,
        lifetime: CancellationToken,
    ) -> Result<MockConn, TransportError> {
        let (delay, failure) = {
            let config = self.config.lock();
            (config.dial_delay, config.dial_failure.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }

        tracing::trace!(address = %info.address, "mock dial");
        self.stats.dials.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockConn {
            config: Arc::clone(&self.config),
            stats: Arc::clone(&self.stats),
            lifetime,
            closed: false,
        })
    }
}

/// Connection produced by [`MockTransport`].
#[derive(Debug)]
pub struct MockConn {
    config: Arc<Mutex<MockConfig>>,
    stats: Arc<MockTransportStats>,
    lifetime: CancellationToken,
    closed: bool,
}

impl Conn for MockConn {
    type Channel = MockChannel;

    async fn new_channel(&mut self) -> Result<MockChannel, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(MockChannel {
            config: Arc::clone(&self.config),
            stats: Arc::clone(&self.stats),
            lifetime: self.lifetime.clone(),
            steps: VecDeque::new(),
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        if self.lifetime.is_cancelled() {
            return Err(TransportError::Canceled);
        }
        match self.config.lock().close_failure.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for MockConn {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Channel produced by [`MockConn`].
#[derive(Debug)]
pub struct MockChannel {
    config: Arc<Mutex<MockConfig>>,
    stats: Arc<MockTransportStats>,
    lifetime: CancellationToken,
    steps: VecDeque<Step>,
}

impl Channel for MockChannel {
    async fn login(&mut self, config: &LoginConfig) -> Result<(), TransportError> {
        let (delay, failure) = {
            let config = self.config.lock();
            (config.login_delay, config.login_failure.clone())
        };
        if let Some(delay) = delay {
            tokio::select! {
                _ = self.lifetime.cancelled() => return Err(TransportError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }
        tracing::trace!(user = %config.user, "mock login");
        self.stats.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_package(&mut self, package: Package) -> Result<(), TransportError> {
        if self.lifetime.is_cancelled() {
            return Err(TransportError::Canceled);
        }
        let language = match package {
            Package::Language(language) => language,
            other => {
                return Err(TransportError::Protocol(format!(
                    "unexpected outbound package 0x{:02X}",
                    other.token_type()
                )));
            }
        };

        let response = {
            let config = self.config.lock();
            config
                .responses
                .get(&language.cmd)
                .or(config.default_response.as_ref())
                .cloned()
        };
        let Some(response) = response else {
            return Err(TransportError::Server(EedError::new(vec![ExtendedError::new(
                102,
                format!("no scripted response for: {}", language.cmd),
            )])));
        };

        if let Some(error) = script(response, &language.cmd, &mut self.steps) {
            return Err(error);
        }
        self.stats.sent.lock().push(language.cmd);
        Ok(())
    }

    async fn next_package(&mut self) -> Result<Package, TransportError> {
        loop {
            if self.lifetime.is_cancelled() {
                return Err(TransportError::Canceled);
            }
            match self.steps.pop_front() {
                Some(Step::Package(package)) => return Ok(package),
                Some(Step::Error(error)) => return Err(error),
                Some(Step::Sleep(delay)) => {
                    tokio::select! {
                        _ = self.lifetime.cancelled() => return Err(TransportError::Canceled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Some(Step::Stall) => {
                    self.lifetime.cancelled().await;
                    return Err(TransportError::Canceled);
                }
                None => return Err(TransportError::Eof),
            }
        }
    }

    fn reset(&mut self) {
        self.steps.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn open(transport: &MockTransport) -> (MockConn, MockChannel) {
        let mut conn = transport
            .dial(&DialInfo::new("mock:4100"), CancellationToken::new())
            .await
            .unwrap();
        let channel = conn.new_channel().await.unwrap();
        (conn, channel)
    }

    #[tokio::test]
    async fn test_rows_response_ends_with_eof() {
        let transport = MockTransport::builder()
            .with_response("q", MockResponse::rows(["a"], vec![vec![Value::Int(1)]]))
            .build();
        let (_conn, mut channel) = open(&transport).await;

        channel.send_package(Package::language("q")).await.unwrap();
        assert!(matches!(channel.next_package().await, Ok(Package::RowFormat(_))));
        assert!(matches!(channel.next_package().await, Ok(Package::Row(_))));
        assert!(matches!(channel.next_package().await, Ok(Package::Done(_))));
        assert!(channel.next_package().await.unwrap_err().is_eof());
        assert_eq!(transport.stats().sent(), vec!["q".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_response_sees_command_text() {
        let transport = MockTransport::builder()
            .with_default_response(MockResponse::Custom(Arc::new(|cmd| {
                MockResponse::affected(u32::try_from(cmd.len()).unwrap())
            })))
            .build();
        let (_conn, mut channel) = open(&transport).await;

        channel.send_package(Package::language("select 1")).await.unwrap();
        assert!(matches!(
            channel.next_package().await,
            Ok(Package::Done(done)) if done.count == 8
        ));
    }

    #[tokio::test]
    async fn test_set_response_replaces_script() {
        let transport = MockTransport::builder()
            .with_response("q", MockResponse::affected(1))
            .build();
        let (_conn, mut channel) = open(&transport).await;

        transport.set_response("q", MockResponse::SendFailure(TransportError::Closed));
        assert!(matches!(
            channel.send_package(Package::language("q")).await,
            Err(TransportError::Closed)
        ));
        assert!(transport.stats().sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_delay_yields_to_cancellation() {
        let transport = MockTransport::builder()
            .with_login_delay(Duration::from_secs(30))
            .build();
        let lifetime = CancellationToken::new();
        let mut conn = transport
            .dial(&DialInfo::new("mock:4100"), lifetime.clone())
            .await
            .unwrap();
        let mut channel = conn.new_channel().await.unwrap();

        let cancel = {
            let lifetime = lifetime.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                lifetime.cancel();
            })
        };
        let err = channel.login(&LoginConfig::new("root", "secret")).await.unwrap_err();
        assert!(matches!(err, TransportError::Canceled));
        assert_eq!(transport.stats().logins(), 0);
        cancel.await.unwrap();
    }

    #[tokio::test]
    async fn test_live_connections_tracks_drop() {
        let transport = MockTransport::builder().build();
        let (conn, _channel) = open(&transport).await;
        assert_eq!(transport.stats().live_connections(), 1);
        drop(conn);
        assert_eq!(transport.stats().live_connections(), 0);
    }

    #[tokio::test]
    async fn test_close_after_cancel_reports_canceled() {
        let transport = MockTransport::builder().build();
        let lifetime = CancellationToken::new();
        let mut conn = transport
            .dial(&DialInfo::new("mock:4100"), lifetime.clone())
            .await
            .unwrap();
        lifetime.cancel();
        assert!(matches!(conn.close().await, Err(TransportError::Canceled)));
    }
}
