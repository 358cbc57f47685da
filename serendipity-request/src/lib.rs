//! This crate provides [`RequestExecutor`], which turns one HTTP call plus a retry budget into a
//! decoded result or a typed failure.
//!
//! The network sits behind the [`Transport`] trait (implemented for [`reqwest::Client`]), which
//! attempts are sent through. A [`RetryableStrategy`] classifies every attempt; transient ones
//! are retried after a fixed wait until the budget runs out.
//!
//! ```no_run
//! use serde::Deserialize;
//! use serendipity_request::{default_http_client, CallContext, RequestExecutor};
//!
//! #[derive(Deserialize)]
//! struct Athlete {
//!     id: i64,
//! }
//!
//! async fn run() -> anyhow::Result<()> {
//!     let executor = RequestExecutor::default_for(default_http_client()?);
//!     let url = "https://www.strava.com/api/v3/athlete".parse()?;
//!     let athlete: Athlete = executor
//!         .get(url)
//!         .bearer_auth("my_access_token")
//!         .send::<_, serde_json::Value>(&CallContext::new())
//!         .await
//!         .map_err(|failure| failure.into_error())?;
//!     println!("athlete {}", athlete.id);
//!     Ok(())
//! }
//! ```
mod config;
mod context;
mod error;
mod executor;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod retryable;
mod retryable_strategy;
mod trace;
mod transport;

pub use config::{RetryConfig, DEFAULT_RETRIES, DEFAULT_RETRY_INTERVAL};
pub use context::CallContext;
pub use error::{BadStatusError, Error, Failure, Result, TransportError};
pub use executor::{ExecutorBuilder, RequestBuilder, RequestExecutor};
pub use retryable::Retryable;
pub use retryable_strategy::{
    default_on_request_failure, default_on_request_success, transient_on_request_failure,
    DefaultRetryableStrategy, RetryableStrategy, TransientFailureStrategy,
};
pub use trace::{
    record_outcome, TracingTransport, ERROR_MESSAGE, HTTP_HOST, HTTP_METHOD, HTTP_PATH,
    HTTP_SCHEME, HTTP_STATUS_CODE, OTEL_STATUS_CODE,
};
pub use transport::{default_http_client, Request, Response, Transport, DEFAULT_TIMEOUT};

pub use reqwest::Url;
