use std::{fmt, sync::Arc};

use tokio::time::{sleep, timeout, Instant};

use crate::{
    result::Decoder,
    transport::{ReqwestTransport, Transport, TransportResponse},
    ClientOptions, EagerFuture, LazyResult, RequestSpec, Result, TransportOptions, WebClientError,
};

#[derive(Clone)]
/// Applies cycle timeout, status classification and retry-with-backoff to
/// requests sent through a shared [`Transport`].
///
/// The executor holds no mutable state; clone it freely and call it from
/// any number of tasks.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    options: ClientOptions,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transport", &"<dyn Transport>")
            .field("options", &self.options)
            .finish()
    }
}

impl RequestExecutor {
    /// Creates an executor over `transport` with default options.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Creates an executor over an already shared transport.
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            options: ClientOptions::default(),
        }
    }

    /// Creates an executor over a [`ReqwestTransport`] with default socket
    /// settings.
    pub fn reqwest() -> Result<Self> {
        Ok(Self::new(ReqwestTransport::new()?))
    }

    pub fn with_transport_options(options: &TransportOptions) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::with_options(options)?))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns a cold result for `spec`. Nothing is sent until it is run or
    /// awaited, and every run repeats the whole pipeline.
    pub fn execute(&self, spec: RequestSpec) -> LazyResult<String> {
        LazyResult::new(self.clone(), spec)
    }

    /// Starts `spec` immediately on the current tokio runtime.
    pub fn execute_async(&self, spec: RequestSpec) -> EagerFuture<String> {
        self.execute(spec).spawn()
    }

    /// Runs the pipeline once and decodes the payload. Terminal failures are
    /// logged here and nowhere else.
    pub(crate) async fn run<T>(&self, spec: &RequestSpec, decode: Decoder<T>) -> Result<T> {
        let result = match self.send_with_retry(spec).await {
            Ok(body) => decode(body),
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            log_failure(spec, err);
        }
        result
    }

    async fn send_with_retry(&self, spec: &RequestSpec) -> Result<String> {
        spec.validate()?;

        let mut attempt = 0usize;
        loop {
            match self.send_once(spec).await {
                Ok(body) => {
                    if attempt > 0 {
                        tracing::debug!(
                            method = %spec.method(),
                            uri = spec.uri(),
                            "request succeeded after {} attempts",
                            attempt + 1
                        );
                    }
                    return Ok(body);
                }
                Err(err) => {
                    if self.options.retry.retry_on.should_retry(&err)
                        && attempt < self.options.retry.max_retries
                    {
                        self.wait_before_retry(attempt, &err).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One send-classify cycle under the cycle timeout.
    async fn send_once(&self, spec: &RequestSpec) -> Result<String> {
        let request = spec.to_transport_request()?;
        let limit = self.options.timeout();
        let started = Instant::now();

        let response = match timeout(limit, self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            // A socket-level timeout fired before the cycle bound.
            Ok(Err(err)) if is_transport_timeout(err.as_ref()) => {
                return Err(WebClientError::Timeout(started.elapsed()))
            }
            Ok(Err(err)) => return Err(WebClientError::Transport(err)),
            Err(_elapsed) => return Err(WebClientError::Timeout(limit)),
        };

        classify(response)
    }

    /// Waits before the next retry attempt without blocking the worker.
    async fn wait_before_retry(&self, attempt: usize, err: &WebClientError) {
        let delay = self.options.retry.delay_for(attempt);
        tracing::debug!(
            "attempt {} failed ({err}); retrying after {} ms",
            attempt + 1,
            delay.as_millis()
        );
        sleep(delay).await;
    }
}

pub(crate) fn log_failure(spec: &RequestSpec, err: &WebClientError) {
    tracing::error!(
        method = %spec.method(),
        uri = spec.uri(),
        "request failed: {err}"
    );
}

/// 2xx/3xx yield the body; 4xx and 5xx become classified failures carrying
/// the body as detail.
fn classify(response: TransportResponse) -> Result<String> {
    let TransportResponse { status, body } = response;
    if status.is_client_error() {
        return Err(WebClientError::ClientError {
            status: status.as_u16(),
            body,
        });
    }
    if status.is_server_error() {
        return Err(WebClientError::ServerError {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn is_transport_timeout(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(reqwest::Error::is_timeout)
}
