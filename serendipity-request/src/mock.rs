//! A scripted [`Transport`] for tests.
//!
//! Attempt `n` gets the `n`-th scripted outcome, after its request passed the `n`-th
//! validator (if there is one).

use std::sync::{Arc, Mutex, MutexGuard};

use http::{Method, StatusCode};
use thiserror::Error;

use crate::error::TransportError;
use crate::transport::{Request, Response, Transport};

/// Expectations for the request of one attempt. Unset fields are not checked.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Shows up in the failure message, easier for identification.
    pub name: String,
    pub expected_method: Option<Method>,
    pub expected_url_path: Option<String>,
    pub expected_body: Option<String>,
    /// Check that the body contains `expected_body` instead of matching it exactly.
    pub body_contains: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation did not pass: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl Validator {
    pub fn validate(&self, req: &Request) -> Result<(), ValidationError> {
        let fail = |what: &str| {
            Err(ValidationError {
                reason: format!("{} does not match validator (name: {})", what, self.name),
            })
        };
        if let Some(method) = &self.expected_method {
            if &req.method != method {
                return fail("method");
            }
        }
        if let Some(path) = &self.expected_url_path {
            if req.url.path() != path.as_str() {
                return fail("url path");
            }
        }
        if let Some(expected) = &self.expected_body {
            let body = req
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            let matches = if self.body_contains {
                body.contains(expected.as_str())
            } else {
                &body == expected
            };
            if !matches {
                return fail("body");
            }
        }
        Ok(())
    }
}

/// Script of a [`MockTransport`].
#[derive(Debug, Default)]
pub struct MockOpts {
    pub responses: Vec<Result<Response, TransportError>>,
    pub validators: Vec<Validator>,
    /// Status answered once the script runs out. Defaults to 200 with a `{}` body.
    pub default_status: Option<StatusCode>,
}

#[derive(Debug, Default)]
struct MockState {
    responses: Vec<Option<Result<Response, TransportError>>>,
    validators: Vec<Validator>,
    default_status: Option<StatusCode>,
    requests: Vec<Request>,
}

/// Clones share the same script and recorded calls.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(opts: MockOpts) -> Self {
        let state = MockState {
            responses: opts.responses.into_iter().map(Some).collect(),
            validators: opts.validators,
            default_status: opts.default_status,
            requests: Vec::new(),
        };
        MockTransport {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Scripts one response per `(status, body)` pair.
    pub fn with_responses<'a, I>(responses: I) -> Self
    where
        I: IntoIterator<Item = (u16, &'a str)>,
    {
        let responses = responses
            .into_iter()
            .map(|(status, body)| {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                Ok(Response::new(status, body.to_owned()))
            })
            .collect();
        Self::new(MockOpts {
            responses,
            ..MockOpts::default()
        })
    }

    /// Number of requests sent so far.
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Copies of every request sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // a poisoned script only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, req: Request) -> Result<Response, TransportError> {
        let mut state = self.lock();
        let attempt = state.requests.len();
        state.requests.push(req.clone());

        if let Some(validator) = state.validators.get(attempt) {
            validator
                .validate(&req)
                .map_err(|e| TransportError::Other(e.into()))?;
        }
        match state.responses.get_mut(attempt).and_then(Option::take) {
            Some(outcome) => outcome,
            None => {
                let status = state.default_status.unwrap_or(StatusCode::OK);
                Ok(Response::new(status, "{}"))
            }
        }
    }
}
