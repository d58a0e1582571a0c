//! Test utilities for restclient crates.

use std::io;
use std::sync::{Arc, Mutex, Once};

use restclient_log::{LogConfig, LogLevel};
use serde::Serialize;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub use wiremock;

/// HTTP mock server wrapper with convenience methods.
pub struct TestHttpServer {
    server: MockServer,
}

impl TestHttpServer {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the server URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get URL for a specific path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Get URL for a path with `user:password@` credentials embedded.
    pub fn url_with_credentials(&self, user: &str, password: &str, path: &str) -> String {
        format!(
            "http://{}:{}@{}{}",
            user,
            password,
            self.server.address(),
            path
        )
    }

    /// Register a response for a method and path.
    pub async fn respond(&self, verb: &str, endpoint: &str, response: ResponseTemplate) {
        Mock::given(method(verb))
            .and(path(endpoint))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Register an endpoint that returns a text body.
    pub async fn text(&self, verb: &str, endpoint: &str, status: u16, body: &str) {
        self.respond(
            verb,
            endpoint,
            ResponseTemplate::new(status).set_body_string(body),
        )
        .await;
    }

    /// Register an endpoint that returns JSON.
    pub async fn json<T: Serialize>(&self, verb: &str, endpoint: &str, response: &T) {
        self.respond(
            verb,
            endpoint,
            ResponseTemplate::new(200).set_body_json(response),
        )
        .await;
    }

    /// Get all received requests.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// The single request received so far.
    ///
    /// Panics unless exactly one request arrived.
    pub async fn only_request(&self) -> Request {
        let mut received = self.received_requests().await;
        assert_eq!(
            received.len(),
            1,
            "Expected exactly one request, got {}",
            received.len()
        );
        received.remove(0)
    }
}

/// Install a debug-level subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let config = LogConfig {
            level: LogLevel::Debug,
            ..LogConfig::from_env()
        };
        // Another subscriber may already be installed by the harness.
        let _ = restclient_log::init(config);
    });
}

/// Formatted log output collected in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        let bytes = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture trace-level output on the current thread until the guard drops.
///
/// Spawned tasks are only covered when they are polled on this thread, as
/// with the default current-thread `#[tokio::test]` runtime.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
