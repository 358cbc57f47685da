use tracing::{field, Instrument, Span};

use crate::error::TransportError;
use crate::transport::{Request, Response, Transport};

/// The `http.method` field added to the attempt span
pub const HTTP_METHOD: &str = "http.method";
/// The `http.scheme` field added to the attempt span
pub const HTTP_SCHEME: &str = "http.scheme";
/// The `http.host` field added to the attempt span
pub const HTTP_HOST: &str = "http.host";
/// The `http.path` field added to the attempt span
pub const HTTP_PATH: &str = "http.path";
/// The `http.status_code` field added to the attempt span
pub const HTTP_STATUS_CODE: &str = "http.status_code";
/// The `otel.status_code` field added to the attempt span
pub const OTEL_STATUS_CODE: &str = "otel.status_code";
/// The `error.message` field added to the attempt span
pub const ERROR_MESSAGE: &str = "error.message";

/// Wraps a [`Transport`] so every attempt runs in its own `tracing` span.
///
/// The span never records the query string: token exchange URLs carry the client secret there.
#[derive(Debug, Clone)]
pub struct TracingTransport<T> {
    inner: T,
}

impl<T: Transport> TracingTransport<T> {
    pub fn new(inner: T) -> Self {
        TracingTransport { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn attempt_span(req: &Request) -> Span {
    tracing::info_span!(
        "HTTP request",
        http.method = %req.method,
        http.scheme = req.url.scheme(),
        http.host = req.url.host_str().unwrap_or(""),
        http.path = req.url.path(),
        otel.kind = "client",
        otel.status_code = field::Empty,
        http.status_code = field::Empty,
        error.message = field::Empty,
    )
}

/// Records the outcome of one attempt on its span.
pub fn record_outcome(span: &Span, outcome: &Result<Response, TransportError>) {
    match outcome {
        Ok(res) => {
            span.record(HTTP_STATUS_CODE, u64::from(res.status.as_u16()));
            if res.status.is_client_error() || res.status.is_server_error() {
                span.record(OTEL_STATUS_CODE, "ERROR");
            } else {
                span.record(OTEL_STATUS_CODE, "OK");
            }
        }
        Err(err) => {
            let message = err.to_string();
            span.record(OTEL_STATUS_CODE, "ERROR");
            span.record(ERROR_MESSAGE, message.as_str());
        }
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for TracingTransport<T> {
    async fn send(&self, req: Request) -> Result<Response, TransportError> {
        let span = attempt_span(&req);
        let outcome = self.inner.send(req).instrument(span.clone()).await;
        record_outcome(&span, &outcome);
        outcome
    }
}
