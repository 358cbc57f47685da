use crate::error::TransportError;
use crate::retryable::Retryable;
use crate::transport::Response;

/// A strategy to create a [`Retryable`] from the outcome of one attempt.
///
/// The outcome of an attempt could be:
/// - [`Response`] in case the request has been sent and a response received. This could however
///   still mean that the server responded with an erroneous status, for example 500.
/// - [`TransportError`] in this case the request actually failed and there is no response to
///   look at. This could, for example, be caused by a timeout on the connection.
///
/// Only [`Retryable::Transient`] makes the executor try again. Closures with the same shape as
/// [`handle`](Self::handle) are strategies too.
///
/// Example:
///
/// ```
/// use serendipity_request::{default_on_request_failure, ExecutorBuilder, Response, Retryable, RetryableStrategy, TransportError};
///
/// // Retry whenever the server asks us to slow down, otherwise do nothing.
/// struct Retry429;
/// impl RetryableStrategy for Retry429 {
///     fn handle(&self, res: &Result<Response, TransportError>) -> Option<Retryable> {
///         match res {
///             Ok(success) if success.status() == 429 => Some(Retryable::Transient),
///             Ok(_) => None,
///             Err(error) => default_on_request_failure(error),
///         }
///     }
/// }
///
/// let executor = ExecutorBuilder::new(reqwest::Client::new())
///     .retries(3)
///     .with_strategy(Retry429)
///     .build();
/// ```
pub trait RetryableStrategy: 'static + Send + Sync {
    fn handle(&self, res: &Result<Response, TransportError>) -> Option<Retryable>;
}

impl<F> RetryableStrategy for F
where
    F: Fn(&Result<Response, TransportError>) -> Option<Retryable> + Send + Sync + 'static,
{
    fn handle(&self, res: &Result<Response, TransportError>) -> Option<Retryable> {
        (self)(res)
    }
}

/// The default [`RetryableStrategy`]: retries server errors and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryableStrategy;

impl RetryableStrategy for DefaultRetryableStrategy {
    fn handle(&self, res: &Result<Response, TransportError>) -> Option<Retryable> {
        match res {
            Ok(success) => default_on_request_success(success),
            Err(error) => default_on_request_failure(error),
        }
    }
}

/// Retries server errors and the network failures [`transient_on_request_failure`] accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientFailureStrategy;

impl RetryableStrategy for TransientFailureStrategy {
    fn handle(&self, res: &Result<Response, TransportError>) -> Option<Retryable> {
        match res {
            Ok(success) => default_on_request_success(success),
            Err(error) => transient_on_request_failure(error),
        }
    }
}

/// Default request success retry strategy.
///
/// Will only retry if the status was 500 or above, which includes the non-standard 6XX-9XX range.
/// A 4XX status is fatal.
///
/// Note that success here means that the request finished without interruption, not that it was
/// logically OK.
pub fn default_on_request_success(success: &Response) -> Option<Retryable> {
    let status = success.status();
    if status.as_u16() >= 500 {
        Some(Retryable::Transient)
    } else if status.is_client_error() {
        Some(Retryable::Fatal)
    } else {
        None
    }
}

/// Default request failure retry strategy.
///
/// Never retries: a failed attempt has no response to judge, so the error is handed back to the
/// caller untouched.
pub fn default_on_request_failure(_error: &TransportError) -> Option<Retryable> {
    Some(Retryable::Fatal)
}

/// Request failure retry strategy for callers that accept retrying network errors.
///
/// Will only retry if the request failed due to a network error
pub fn transient_on_request_failure(error: &TransportError) -> Option<Retryable> {
    let error = match error {
        // A custom transport failed in a way we can't look into.
        TransportError::Other(_) => return Some(Retryable::Fatal),
        TransportError::Reqwest(error) => error,
    };
    if error.is_timeout() || error.is_connect() {
        Some(Retryable::Transient)
    } else if error.is_body() || error.is_decode() || error.is_builder() || error.is_redirect() {
        Some(Retryable::Fatal)
    } else if error.is_request() {
        // hyper::Error(IncompleteMessage) is not correctly handled by reqwest, look for it in the
        // source chain.
        if let Some(hyper_error) = get_source_error_type::<hyper::Error>(error) {
            // IncompleteMessage: the connection was cut halfway through a well formatted
            // response. Canceled: the connection was gracefully closed on the server side.
            if hyper_error.is_incomplete_message() || hyper_error.is_canceled() {
                Some(Retryable::Transient)
            } else if let Some(io_error) = get_source_error_type::<std::io::Error>(hyper_error) {
                Some(classify_io_error(io_error))
            } else {
                Some(Retryable::Fatal)
            }
        } else {
            Some(Retryable::Fatal)
        }
    } else {
        None
    }
}

fn classify_io_error(error: &std::io::Error) -> Retryable {
    match error.kind() {
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
            Retryable::Transient
        }
        _ => Retryable::Fatal,
    }
}

/// Downcasts the given err source into T.
fn get_source_error_type<T: std::error::Error + 'static>(
    err: &dyn std::error::Error,
) -> Option<&T> {
    let mut source = err.source();

    while let Some(err) = source {
        if let Some(err) = err.downcast_ref::<T>() {
            return Some(err);
        }

        source = err.source();
    }
    None
}
