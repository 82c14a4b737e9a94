//! Lazy and eager delivery of a request's outcome.

use std::{
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    task::{Context, Poll},
};

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::{client::log_failure, RequestExecutor, RequestSpec, Result, WebClientError};

/// Turns the success payload into the caller's requested shape.
pub(crate) type Decoder<T> = fn(String) -> Result<T>;

fn decode_text(body: String) -> Result<String> {
    Ok(body)
}

fn decode_json<T: DeserializeOwned>(body: String) -> Result<T> {
    serde_json::from_str(&body)
        .map_err(|err| WebClientError::Decode(format!("invalid response JSON: {err}; body: {body}")))
}

/// Cold, re-runnable request.
///
/// Nothing is sent until [`LazyResult::run`] is called or the value is
/// awaited. Each run is a fresh attempt sequence against the same spec.
/// Dropping an in-flight run drops the transport call with it.
pub struct LazyResult<T = String> {
    executor: RequestExecutor,
    spec: RequestSpec,
    decode: Decoder<T>,
}

impl<T> Clone for LazyResult<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            spec: self.spec.clone(),
            decode: self.decode,
        }
    }
}

impl<T> fmt::Debug for LazyResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResult")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl LazyResult<String> {
    pub(crate) fn new(executor: RequestExecutor, spec: RequestSpec) -> Self {
        Self {
            executor,
            spec,
            decode: decode_text,
        }
    }

    /// Decodes the success payload as JSON into `T` instead of returning the
    /// raw text.
    pub fn json<T: DeserializeOwned>(self) -> LazyResult<T> {
        LazyResult {
            executor: self.executor,
            spec: self.spec,
            decode: decode_json::<T>,
        }
    }
}

impl<T> LazyResult<T> {
    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// Runs the full pipeline: validate, send, classify, time out, retry.
    pub async fn run(&self) -> Result<T> {
        self.executor.run(&self.spec, self.decode).await
    }
}

impl<T: Send + 'static> LazyResult<T> {
    /// Starts the request now on the current tokio runtime.
    ///
    /// Outside a runtime the returned future resolves to
    /// [`WebClientError::NoRuntime`].
    pub fn spawn(self) -> EagerFuture<T> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => EagerFuture {
                state: EagerState::Running(handle.spawn(async move { self.run().await })),
            },
            Err(_) => {
                let err = WebClientError::NoRuntime;
                log_failure(&self.spec, &err);
                EagerFuture {
                    state: EagerState::Failed(Some(err)),
                }
            }
        }
    }
}

impl<T: Send + 'static> IntoFuture for LazyResult<T> {
    type Output = Result<T>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.run().await })
    }
}

enum EagerState<T> {
    Running(JoinHandle<Result<T>>),
    Failed(Option<WebClientError>),
}

/// Hot, single-shot request already running in the background.
///
/// Resolves exactly once with the pipeline's terminal outcome. Dropping it
/// does not stop the request; call [`EagerFuture::abort`] for that.
pub struct EagerFuture<T = String> {
    state: EagerState<T>,
}

impl<T> fmt::Debug for EagerFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerFuture")
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<T> EagerFuture<T> {
    /// Aborts the background task. A pending await resolves to
    /// [`WebClientError::Cancelled`].
    pub fn abort(&self) {
        if let EagerState::Running(handle) = &self.state {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            EagerState::Running(handle) => handle.is_finished(),
            EagerState::Failed(_) => true,
        }
    }
}

impl<T> Future for EagerFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            EagerState::Running(handle) => match Pin::new(handle).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(_join_error)) => Poll::Ready(Err(WebClientError::Cancelled)),
                Poll::Pending => Poll::Pending,
            },
            EagerState::Failed(err) => {
                Poll::Ready(Err(err.take().unwrap_or(WebClientError::Cancelled)))
            }
        }
    }
}
