use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use reqwest::{Client, Url};

use crate::error::TransportError;

/// The timeout [`default_http_client`] applies to every request it sends.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// One HTTP request as handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// One HTTP response with its body already read in full.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Response {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Anything that can send one request and hand back one response or error.
///
/// [`RequestExecutor`](crate::RequestExecutor) is generic over this so tests can swap the
/// network for a scripted sequence of responses.
///
/// # Example
///
/// ```
/// use serendipity_request::{Request, Response, Transport, TransportError};
/// use http::StatusCode;
///
/// struct AlwaysTeapot;
///
/// #[async_trait::async_trait]
/// impl Transport for AlwaysTeapot {
///     async fn send(&self, _req: Request) -> Result<Response, TransportError> {
///         Ok(Response::new(StatusCode::IM_A_TEAPOT, "{}"))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Transport: 'static + Send + Sync {
    async fn send(&self, req: Request) -> Result<Response, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, req: Request) -> Result<Response, TransportError> {
        (**self).send(req).await
    }
}

#[async_trait::async_trait]
impl Transport for Client {
    async fn send(&self, req: Request) -> Result<Response, TransportError> {
        let mut inner = reqwest::Request::new(req.method, req.url);
        *inner.headers_mut() = req.headers;
        *inner.body_mut() = req.body.map(reqwest::Body::from);

        let res = self.execute(inner).await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// Builds the reqwest client used when nothing else is injected.
pub fn default_http_client() -> reqwest::Result<Client> {
    Client::builder().timeout(DEFAULT_TIMEOUT).build()
}
