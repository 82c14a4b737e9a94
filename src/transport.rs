//! The capability that actually puts a request on the wire.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{header::HeaderMap, StatusCode};

use crate::{error::BoxError, HttpMethod, Result, WebClientError};

/// One outbound call, fully materialized.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Status and fully-read body of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends a request and returns the response, or fails at connectivity level.
///
/// Non-2xx responses are not errors here; classification happens in
/// [`RequestExecutor`](crate::RequestExecutor). Implementations own
/// connection pooling and socket-level timeouts and must be safe to share
/// across concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, BoxError>;
}

/// Socket-level settings for [`ReqwestTransport`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportOptions {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// How long an idle pooled connection is kept, in milliseconds.
    pub pool_idle_timeout_ms: u64,
    /// Upper bound on idle pooled connections per host.
    pub pool_max_idle_per_host: usize,
    /// Overrides the default `User-Agent`.
    pub user_agent: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            pool_idle_timeout_ms: 90_000,
            pool_max_idle_per_host: usize::MAX,
            user_agent: None,
        }
    }
}

#[derive(Clone)]
/// [`Transport`] backed by a pooled `reqwest::Client`.
///
/// Build it once and share it; clones reuse the same connection pool.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Creates a transport with [`TransportOptions::default`].
    pub fn new() -> Result<Self> {
        Self::with_options(&TransportOptions::default())
    }

    pub fn with_options(options: &TransportOptions) -> Result<Self> {
        Self::from_builder(Self::client_builder(options))
    }

    /// Returns a `reqwest::ClientBuilder` preconfigured from `options`.
    ///
    /// Use this to add settings (proxies, root certificates, default
    /// headers) before handing the builder to [`ReqwestTransport::from_builder`].
    pub fn client_builder(options: &TransportOptions) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(options.connect_timeout_ms))
            .read_timeout(Duration::from_millis(options.read_timeout_ms))
            .pool_idle_timeout(Duration::from_millis(options.pool_idle_timeout_ms))
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            // 3xx responses are returned to the caller, never followed.
            .redirect(reqwest::redirect::Policy::none());
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder
    }

    pub fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self> {
        let http = builder
            .build()
            .map_err(|err| WebClientError::Transport(Box::new(err)))?;
        Ok(Self::from_client(http))
    }

    /// Wraps an existing client, sharing its pool.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, BoxError> {
        let mut builder = self
            .http
            .request(request.method.into(), &request.uri)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
