//! Pluggable request body writers.

use reqwest::header::HeaderValue;

use crate::{Result, WebClientError};

/// Writes a request body without going through serde.
///
/// An inserter is asked for its bytes once per attempt, so it must be
/// replayable.
pub trait BodyInserter: Send + Sync {
    /// Content type sent with the body, if any.
    fn content_type(&self) -> Option<HeaderValue>;

    /// Produces the encoded body.
    fn write(&self) -> Result<Vec<u8>>;
}

/// `application/x-www-form-urlencoded` body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormInserter {
    fields: Vec<(String, String)>,
}

impl FormInserter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Repeated names are kept in insertion order.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for FormInserter
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(fields: [(K, V); N]) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl BodyInserter for FormInserter {
    fn content_type(&self) -> Option<HeaderValue> {
        Some(HeaderValue::from_static(
            "application/x-www-form-urlencoded",
        ))
    }

    fn write(&self) -> Result<Vec<u8>> {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.fields)
            .finish();
        Ok(encoded.into_bytes())
    }
}

/// Raw bytes with a caller-chosen content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesInserter {
    bytes: Vec<u8>,
    content_type: Option<HeaderValue>,
}

impl BytesInserter {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    /// Sets the content type. Fails if `value` is not a valid header value.
    pub fn with_content_type(mut self, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|err| {
            WebClientError::InvalidRequest(format!("invalid content type '{value}': {err}"))
        })?;
        self.content_type = Some(value);
        Ok(self)
    }
}

impl BodyInserter for BytesInserter {
    fn content_type(&self) -> Option<HeaderValue> {
        self.content_type.clone()
    }

    fn write(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}
