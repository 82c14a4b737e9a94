//! `webclient-executor` wraps one outbound HTTP call in a uniform policy:
//! status classification, a per-attempt cycle timeout, and retry with
//! exponential backoff.
//!
//! Build a [`RequestSpec`], then hand it to a [`RequestExecutor`]:
//! - [`RequestExecutor::execute`] returns a cold [`LazyResult`]
//! - [`RequestExecutor::execute_async`] returns a hot [`EagerFuture`]
//!
//! ```no_run
//! use webclient_executor::{RequestExecutor, RequestSpec};
//!
//! # async fn demo() -> webclient_executor::Result<()> {
//! let executor = RequestExecutor::reqwest()?;
//! let spec = RequestSpec::get("https://example.com/health").build()?;
//! let body = executor.execute(spec).await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
mod error;
mod method;
mod options;
mod request;
mod result;
mod transport;

pub use async_trait::async_trait;
pub use body::{BodyInserter, BytesInserter, FormInserter};
pub use client::RequestExecutor;
pub use error::{BoxError, WebClientError};
pub use method::HttpMethod;
pub use options::{ClientOptions, RetryOn, RetryPolicy};
pub use request::{Body, HeaderMutator, RequestSpec, RequestSpecBuilder};
pub use result::{EagerFuture, LazyResult};
pub use transport::{
    ReqwestTransport, Transport, TransportOptions, TransportRequest, TransportResponse,
};

pub type Result<T> = std::result::Result<T, WebClientError>;

/// Terminal outcome of one pipeline run: the success payload or the last
/// failure.
pub type ResponseOutcome = Result<String>;
