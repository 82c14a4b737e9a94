use std::time::Duration;

use crate::HttpMethod;

/// Boxed error produced by a [`Transport`](crate::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum WebClientError {
    /// A body was attached to a method that does not carry one.
    #[error("unsupported request type: {method} does not accept a request body")]
    UnsupportedMethod { method: HttpMethod },
    /// The request description was rejected before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// 4xx response. `body` is the server-provided detail text.
    #[error("client error {status}: {body}")]
    ClientError { status: u16, body: String },
    /// 5xx response. `body` is the server-provided detail text.
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    /// A single attempt timed out. Carries the cycle bound when the pipeline
    /// deadline fired, or the time spent when the transport's own socket
    /// timeout fired first.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Connectivity-level failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// The success payload could not be decoded into the requested shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// The task driving an eager future was aborted or panicked.
    #[error("request task was cancelled before completing")]
    Cancelled,
    /// An eager future was requested outside a tokio runtime.
    #[error("no tokio runtime available to drive the request")]
    NoRuntime,
}

impl WebClientError {
    /// Returns `true` for failures that may succeed on a later attempt:
    /// timeouts, transport failures and 5xx responses.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport(_) | Self::ServerError { .. }
        )
    }

    /// Returns `true` for failures produced by an attempt (as opposed to a
    /// request that was rejected before sending).
    pub(crate) fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Transport(_)
                | Self::ServerError { .. }
                | Self::ClientError { .. }
        )
    }

    /// HTTP status carried by classified 4xx/5xx failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ClientError { status, .. } | Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
