use std::fmt;

use http::StatusCode;
use reqwest::Url;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A failure of a single attempt below the HTTP status layer: the request never produced a
/// response at all.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error from the underlying reqwest client
    #[error("Request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Any other transport implementation failed
    #[error("Transport error: {0}")]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    pub fn other<E>(err: E) -> Self
    where
        E: 'static + Send + Sync + std::error::Error,
    {
        TransportError::Other(err.into())
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        match self {
            TransportError::Other(_) => None,
            TransportError::Reqwest(e) => e.url(),
        }
    }

    /// Strip the related url from this error. Refresh and token exchange URLs carry the
    /// client secret in their query.
    pub fn without_url(self) -> Self {
        match self {
            TransportError::Other(_) => self,
            TransportError::Reqwest(e) => e.without_url().into(),
        }
    }

    /// Returns true if the error is from a type Builder.
    pub fn is_builder(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_builder(),
        }
    }

    /// Returns true if the error is from a `RedirectPolicy`.
    pub fn is_redirect(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_redirect(),
        }
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_timeout(),
        }
    }

    /// Returns true if the error is related to the request
    pub fn is_request(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_request(),
        }
    }

    /// Returns true if the error is related to connect
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_connect(),
        }
    }

    /// Returns true if the error is related to the request or response body
    pub fn is_body(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_body(),
        }
    }

    /// Returns true if the error is related to decoding the response's body
    pub fn is_decode(&self) -> bool {
        match self {
            TransportError::Other(_) => false,
            TransportError::Reqwest(e) => e.is_decode(),
        }
    }
}

/// The server answered with a status of 400 or above that the retry strategy did not retry.
///
/// The decoded error body is not part of this error, it travels next to it in
/// [`Failure::reason`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("bad status code: {}", .code.as_u16())]
pub struct BadStatusError {
    code: StatusCode,
}

impl BadStatusError {
    pub fn new(code: StatusCode) -> Self {
        Self { code }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }
}

/// Everything a logical call through [`RequestExecutor`](crate::RequestExecutor) can fail with.
#[derive(Error, Debug)]
pub enum Error {
    /// The last attempt never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    BadStatus(#[from] BadStatusError),
    /// Every attempt allowed by the retry budget was classified as transient.
    #[error("max retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    /// The success body did not match the caller's result type.
    #[error("unable to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unable to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid header: {0}")]
    InvalidHeader(#[from] http::Error),
    #[error("call cancelled")]
    Cancelled,
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Returns the status code if the server rejected the call.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::BadStatus(e) => Some(e.code()),
            _ => None,
        }
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Error::RetriesExhausted { .. })
    }
}

/// The error of a logical call plus the decoded error body, when the server sent one that
/// matched the caller's reason type.
#[derive(Debug)]
pub struct Failure<R> {
    pub error: Error,
    pub reason: Option<R>,
}

impl<R> fmt::Display for Failure<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<R: fmt::Debug> std::error::Error for Failure<R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<R> Failure<R> {
    pub fn into_error(self) -> Error {
        self.error
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.error.status()
    }
}

impl<R> From<Error> for Failure<R> {
    fn from(error: Error) -> Self {
        Failure {
            error,
            reason: None,
        }
    }
}
