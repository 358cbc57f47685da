use http::StatusCode;
use serde_json::Value;
use serendipity_request::BadStatusError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Strava accepted the request but rejected the access token.
    ///
    /// Only domain calls produce this, and only for a 401. The client answers it with a refresh
    /// and a replay, so callers see it once the replay budget is spent.
    #[error("invalid tokens")]
    Unauthorized,
    /// Any other status of 400 or above. `reason` holds the error body when it was JSON.
    #[error("unable to {what} due to bad status code ({}): {}", .status.code().as_u16(), display_reason(.reason))]
    BadStatus {
        what: &'static str,
        status: BadStatusError,
        reason: Option<Value>,
    },
    #[error(transparent)]
    Request(serendipity_request::Error),
    /// The refresh forced by a rejected token failed, so the call was not replayed.
    #[error("unable to refresh access token: {0}")]
    Refresh(#[source] Box<Error>),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn display_reason(reason: &Option<Value>) -> String {
    reason
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "<no reason>".to_string())
}

impl Error {
    /// Returns the HTTP status Strava answered with, if the error came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Error::BadStatus { status, .. } => Some(status.code()),
            Error::Request(e) => e.status(),
            Error::Refresh(e) => e.status(),
            Error::InvalidUrl(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// The decoded error body of a bad status, if Strava sent one.
    pub fn reason(&self) -> Option<&Value> {
        match self {
            Error::BadStatus { reason, .. } => reason.as_ref(),
            _ => None,
        }
    }
}
