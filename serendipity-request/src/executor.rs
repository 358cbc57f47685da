use std::convert::TryFrom;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RetryConfig;
use crate::context::CallContext;
use crate::error::{BadStatusError, Error, Failure, TransportError};
use crate::retryable::Retryable;
use crate::retryable_strategy::{DefaultRetryableStrategy, RetryableStrategy};
use crate::transport::{Request, Response, Transport};

/// An `ExecutorBuilder` is used to build a [`RequestExecutor`].
pub struct ExecutorBuilder {
    transport: Arc<dyn Transport>,
    headers: HeaderMap,
    config: RetryConfig,
    strategy: Arc<dyn RetryableStrategy>,
}

impl ExecutorBuilder {
    /// Starts from no static headers, the default retry budget and [`DefaultRetryableStrategy`].
    pub fn new<T: Transport>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Same as [`new`](Self::new) for a transport that is already shared.
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        ExecutorBuilder {
            transport,
            headers: HeaderMap::new(),
            config: RetryConfig::default(),
            strategy: Arc::new(DefaultRetryableStrategy),
        }
    }

    /// Adds a header sent with every request of the built executor.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Number of retries after the first attempt.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Fixed wait between two attempts.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the strategy deciding which attempts are retried.
    pub fn with_strategy<S: RetryableStrategy>(self, strategy: S) -> Self {
        self.with_arc_strategy(Arc::new(strategy))
    }

    pub fn with_arc_strategy(mut self, strategy: Arc<dyn RetryableStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns a `RequestExecutor` using this builder configuration.
    pub fn build(self) -> RequestExecutor {
        RequestExecutor {
            transport: self.transport,
            headers: self.headers,
            config: self.config,
            strategy: self.strategy,
        }
    }
}

/// Turns one HTTP call plus a retry budget into a decoded result or a typed failure.
///
/// The executor itself holds no per-call state and is cheap to clone. Each call is described by
/// a [`RequestBuilder`] which is consumed when sent, so one request plan serves exactly one
/// logical call.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    headers: HeaderMap,
    config: RetryConfig,
    strategy: Arc<dyn RetryableStrategy>,
}

impl RequestExecutor {
    pub fn builder<T: Transport>(transport: T) -> ExecutorBuilder {
        ExecutorBuilder::new(transport)
    }

    /// The executor the API clients use: JSON content type, 2 retries 2 seconds apart, retrying
    /// server errors only.
    pub fn default_for<T: Transport>(transport: T) -> Self {
        ExecutorBuilder::new(transport)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .build()
    }

    pub fn config(&self) -> RetryConfig {
        self.config
    }

    /// Convenience method to make a `GET` request to a URL.
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    ///
    /// Without a [`json`](RequestBuilder::json) body the request carries `{}`.
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a request with the `Method` and `Url`.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = Request::new(method, url);
        request.headers = self.headers.clone();
        RequestBuilder {
            executor: self.clone(),
            request: Ok(request),
        }
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // skipping transport and strategy, they are opaque
        f.debug_struct("RequestExecutor")
            .field("headers", &self.headers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The plan of one logical call. Does nothing until [`send`](Self::send) consumes it.
#[must_use = "RequestBuilder does nothing until you 'send' it"]
pub struct RequestBuilder {
    executor: RequestExecutor,
    request: Result<Request, Error>,
}

impl RequestBuilder {
    fn map(self, f: impl FnOnce(Request) -> Result<Request, Error>) -> Self {
        RequestBuilder {
            request: self.request.and_then(f),
            ..self
        }
    }

    /// Add a `Header` to this Request, replacing the executor's value for the same name.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|mut req| {
            let name = HeaderName::try_from(key).map_err(|e| Error::InvalidHeader(e.into()))?;
            let value = HeaderValue::try_from(value).map_err(|e| Error::InvalidHeader(e.into()))?;
            req.headers.insert(name, value);
            Ok(req)
        })
    }

    /// Enable HTTP bearer authentication. The header value is marked sensitive.
    pub fn bearer_auth<T: Display>(self, token: T) -> Self {
        self.map(|mut req| {
            let mut value = HeaderValue::try_from(format!("Bearer {}", token))
                .map_err(|e| Error::InvalidHeader(e.into()))?;
            value.set_sensitive(true);
            req.headers.insert(AUTHORIZATION, value);
            Ok(req)
        })
    }

    /// Appends form-url-encoded query pairs to the URL.
    ///
    /// This appends and does not overwrite: the same key given twice shows up twice.
    pub fn query<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.map(|mut req| {
            req.url.query_pairs_mut().extend_pairs(pairs);
            Ok(req)
        })
    }

    /// Send a JSON body.
    ///
    /// # Errors
    ///
    /// Serialization can fail if `T`'s implementation of `Serialize` decides to
    /// fail, or if `T` contains a map with non-string keys. The failure surfaces from
    /// [`send`](Self::send) as [`Error::Encode`].
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        self.map(|mut req| {
            let body = serde_json::to_vec(json).map_err(Error::Encode)?;
            req.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            req.body = Some(Bytes::from(body));
            Ok(req)
        })
    }

    /// Runs the call through the retry loop and decodes the final response.
    ///
    /// `T` is the shape of a successful body. `R` is the shape of an error body: when the
    /// final status is 400 or above it is decoded into [`Failure::reason`], and a body that
    /// doesn't fit `R` just leaves the reason empty.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the final attempt never got a response,
    /// - [`Error::BadStatus`] for a non-retried status of 400 or above,
    /// - [`Error::RetriesExhausted`] if every allowed attempt was retryable,
    /// - [`Error::Decode`] if a successful body doesn't fit `T`,
    /// - [`Error::Cancelled`] / [`Error::DeadlineExceeded`] when `ctx` ends first.
    pub async fn send<T, R>(self, ctx: &CallContext) -> Result<T, Failure<R>>
    where
        T: DeserializeOwned,
        R: DeserializeOwned,
    {
        let RequestBuilder { executor, request } = self;
        let mut request = request?;
        if request.body.is_none() && request.method == Method::POST {
            request.body = Some(Bytes::from_static(b"{}"));
        }

        let RetryConfig {
            retries,
            retry_interval,
        } = executor.config;
        let mut attempt: u32 = 0;
        while attempt <= retries {
            tracing::debug!(
                method = %request.method,
                path = request.url.path(),
                attempt,
                "sending request"
            );
            let outcome = ctx.run(executor.transport.send(request.clone())).await?;
            if let Some(Retryable::Transient) = executor.strategy.handle(&outcome) {
                attempt += 1;
                if attempt <= retries {
                    tracing::warn!(
                        "Retry attempt #{}. Sleeping {:?} before the next attempt",
                        attempt,
                        retry_interval
                    );
                    ctx.sleep(retry_interval).await?;
                }
                continue;
            }
            return decode_outcome(outcome);
        }

        tracing::error!(
            path = request.url.path(),
            attempts = attempt,
            "max retries exhausted"
        );
        Err(Error::RetriesExhausted { attempts: attempt }.into())
    }
}

/// Final result handling of a call whose last attempt was not retried.
fn decode_outcome<T, R>(outcome: Result<Response, TransportError>) -> Result<T, Failure<R>>
where
    T: DeserializeOwned,
    R: DeserializeOwned,
{
    let response = outcome.map_err(Error::from)?;
    if response.status.as_u16() >= 400 {
        return Err(Failure {
            error: BadStatusError::new(response.status).into(),
            reason: decode_body(&response.body).ok(),
        });
    }
    decode_body(&response.body).map_err(|e| Error::Decode(e).into())
}

// An empty body decodes like `null`, so `()` and `Option<_>` fit bodiless responses.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    if body.is_empty() {
        serde_json::from_slice(b"null")
    } else {
        serde_json::from_slice(body)
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
