use crate::error::TransportError;
use crate::retryable_strategy::{DefaultRetryableStrategy, RetryableStrategy};
use crate::transport::Response;

/// Classification of an error/status returned by request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryable {
    /// The failure was due to something that might resolve in the future.
    Transient,
    /// Unresolvable error.
    Fatal,
}

impl Retryable {
    /// Try to map an attempt outcome into `Retryable` using [`DefaultRetryableStrategy`].
    ///
    /// Returns `None` if the outcome does not contain any errors.
    pub fn from_outcome(res: &Result<Response, TransportError>) -> Option<Self> {
        DefaultRetryableStrategy.handle(res)
    }
}
