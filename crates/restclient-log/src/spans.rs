//! Request spans and timing.

use std::future::Future;
use tracing::{field, info_span, Instrument, Span};

/// Create a span for one dispatched request.
///
/// `status` starts empty and is filled in with [`record_status`] once the
/// response head arrives. Callers must pass a URL with credentials removed.
pub fn request_span(verb: &str, url: &str) -> Span {
    info_span!("request", verb = %verb, url = %url, status = field::Empty)
}

/// Record the response status on a request span.
pub fn record_status(span: &Span, status: u16) {
    span.record("status", status);
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

/// Log an error inside the current span.
pub fn record_error(error: &dyn std::error::Error) {
    tracing::warn!(error = %error, "request failed");
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
    }
}
