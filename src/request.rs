use std::{fmt, sync::Arc};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;

use crate::{transport::TransportRequest, BodyInserter, HttpMethod, Result, WebClientError};

/// Function applied to the outgoing header map of every attempt.
pub type HeaderMutator = Arc<dyn Fn(&mut HeaderMap) + Send + Sync>;

/// Request body. The variants are alternative encodings of the same logical
/// payload; a request carries at most one.
#[derive(Clone)]
pub enum Body {
    /// Typed payload, already serialized to a JSON tree.
    Json(serde_json::Value),
    /// Raw text, sent as `text/plain`.
    Text(String),
    /// Caller-supplied writer.
    Inserter(Arc<dyn BodyInserter>),
}

impl Body {
    fn encode(&self) -> Result<(Vec<u8>, Option<HeaderValue>)> {
        match self {
            Self::Json(value) => {
                let bytes = serde_json::to_vec(value).map_err(|err| {
                    WebClientError::InvalidRequest(format!("could not encode JSON body: {err}"))
                })?;
                Ok((bytes, Some(HeaderValue::from_static("application/json"))))
            }
            Self::Text(text) => Ok((
                text.clone().into_bytes(),
                Some(HeaderValue::from_static("text/plain;charset=UTF-8")),
            )),
            Self::Inserter(inserter) => Ok((inserter.write()?, inserter.content_type())),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Inserter(_) => "inserter",
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Inserter(_) => f.write_str("Inserter(..)"),
        }
    }
}

/// Fully described, not-yet-sent request.
///
/// Cheap to clone; a [`LazyResult`](crate::LazyResult) replays the same spec
/// on every run.
#[derive(Clone)]
pub struct RequestSpec {
    method: HttpMethod,
    uri: String,
    headers: HeaderMap,
    header_mutator: Option<HeaderMutator>,
    body: Option<Body>,
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field(
                "header_mutator",
                &self.header_mutator.as_ref().map(|_| "<fn>"),
            )
            .field("body", &self.body)
            .finish()
    }
}

impl RequestSpec {
    /// Starts building a request for `method` and an absolute `uri`.
    pub fn builder(method: HttpMethod, uri: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            header_mutator: None,
            body: None,
            error: None,
        }
    }

    pub fn get(uri: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Get, uri)
    }

    pub fn post(uri: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Post, uri)
    }

    pub fn put(uri: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Put, uri)
    }

    pub fn patch(uri: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Patch, uri)
    }

    pub fn delete(uri: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Delete, uri)
    }

    pub fn options(uri: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Options, uri)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Rejects a body on a method that does not carry one.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.body.is_some() && !self.method.accepts_body() {
            return Err(WebClientError::UnsupportedMethod {
                method: self.method,
            });
        }
        Ok(())
    }

    /// Materializes the transport call for one attempt.
    ///
    /// Headers are applied in order: static headers, then the mutator. The
    /// body's content type is only added when neither set one.
    pub(crate) fn to_transport_request(&self) -> Result<TransportRequest> {
        let mut headers = self.headers.clone();
        if let Some(mutator) = &self.header_mutator {
            mutator(&mut headers);
        }

        let body = match &self.body {
            Some(body) => {
                let (bytes, content_type) = body.encode()?;
                if let Some(content_type) = content_type {
                    if !headers.contains_key(CONTENT_TYPE) {
                        headers.insert(CONTENT_TYPE, content_type);
                    }
                }
                Some(bytes)
            }
            None => None,
        };

        Ok(TransportRequest {
            method: self.method,
            uri: self.uri.clone(),
            headers,
            body,
        })
    }
}

/// Builder for [`RequestSpec`].
///
/// Errors (invalid header, second body, unencodable payload) are deferred
/// to [`RequestSpecBuilder::build`].
pub struct RequestSpecBuilder {
    method: HttpMethod,
    uri: String,
    headers: HeaderMap,
    header_mutator: Option<HeaderMutator>,
    body: Option<Body>,
    error: Option<WebClientError>,
}

impl RequestSpecBuilder {
    /// Adds a static header, appending to any existing values.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let header_name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(header_name) => header_name,
            Err(err) => {
                return self.fail(WebClientError::InvalidRequest(format!(
                    "invalid header name '{name}': {err}"
                )))
            }
        };
        match HeaderValue::from_str(value) {
            Ok(header_value) => {
                self.headers.append(header_name, header_value);
                self
            }
            Err(err) => self.fail(WebClientError::InvalidRequest(format!(
                "invalid value for header '{name}': {err}"
            ))),
        }
    }

    /// Registers a header mutator. Successive mutators run in registration
    /// order.
    pub fn headers<F>(mut self, mutator: F) -> Self
    where
        F: Fn(&mut HeaderMap) + Send + Sync + 'static,
    {
        let composed: HeaderMutator = match self.header_mutator.take() {
            Some(previous) => Arc::new(move |headers: &mut HeaderMap| {
                previous(headers);
                mutator(headers);
            }),
            None => Arc::new(mutator),
        };
        self.header_mutator = Some(composed);
        self
    }

    /// Attaches a typed payload serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => self.with_body(Body::Json(value)),
            Err(err) => self.fail(WebClientError::InvalidRequest(format!(
                "could not encode JSON body: {err}"
            ))),
        }
    }

    /// Attaches a raw text body.
    pub fn text(self, body: impl Into<String>) -> Self {
        self.with_body(Body::Text(body.into()))
    }

    /// Attaches a body written by `inserter`.
    pub fn inserter(self, inserter: impl BodyInserter + 'static) -> Self {
        self.with_body(Body::Inserter(Arc::new(inserter)))
    }

    /// Attaches an already-built body.
    pub fn body(self, body: Body) -> Self {
        self.with_body(body)
    }

    /// Finishes the request description.
    ///
    /// Fails with [`WebClientError::InvalidRequest`] when the URI is not an
    /// absolute URL, a header was invalid, or more than one body form was
    /// supplied.
    pub fn build(self) -> Result<RequestSpec> {
        if let Some(err) = self.error {
            return Err(err);
        }
        url::Url::parse(&self.uri).map_err(|err| {
            WebClientError::InvalidRequest(format!("invalid uri '{}': {err}", self.uri))
        })?;

        Ok(RequestSpec {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            header_mutator: self.header_mutator,
            body: self.body,
        })
    }

    fn with_body(mut self, body: Body) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.body.as_ref().map(Body::kind) {
            Some(existing) => {
                let message = format!(
                    "request already has a {existing} body; cannot also attach a {} body",
                    body.kind()
                );
                self.fail(WebClientError::InvalidRequest(message))
            }
            None => {
                self.body = Some(body);
                self
            }
        }
    }

    fn fail(mut self, err: WebClientError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }
}
