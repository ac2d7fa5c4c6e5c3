//! HTTP response head handling.
//!
//! The response head is owned by the transport exchange and stays mutable until
//! the exchange serializes it, which happens exactly once: on the first body
//! write, on the first flush, or when the exchange is closed.

use http::{HeaderMap, HeaderValue, StatusCode, Version, header};

use crate::ensure;
use crate::protocol::TransportError;

/// Status, reason phrase and header block of one HTTP response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    reason: Option<String>,
    version: Version,
    headers: HeaderMap,
}

impl ResponseHead {
    /// Creates a `200 OK` head answering a request of the given version.
    pub fn new(version: Version) -> Self {
        Self { status: StatusCode::OK, reason: None, version, headers: HeaderMap::new() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The explicit reason phrase, if one was set.
    pub fn reason_phrase(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason_phrase(&mut self, reason: Option<String>) {
        self.reason = reason;
    }

    /// The reason phrase written on the status line: the explicit one if set,
    /// otherwise the canonical phrase of the status code.
    pub fn effective_reason(&self) -> &str {
        self.reason.as_deref().or_else(|| self.status.canonical_reason()).unwrap_or("")
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Parses the `Content-Length` header.
    ///
    /// Returns `Ok(None)` when the header is absent and an error when it is present
    /// but does not hold a single decimal length.
    pub fn content_length(&self) -> Result<Option<u64>, TransportError> {
        let mut values = self.headers.get_all(header::CONTENT_LENGTH).iter();
        let Some(value) = values.next() else {
            return Ok(None);
        };

        ensure!(values.next().is_none(), TransportError::invalid_head("multiple content-length headers"));

        value
            .to_str()
            .ok()
            .and_then(|str| str.trim().parse::<u64>().ok())
            .map(Some)
            .ok_or_else(|| TransportError::invalid_head(format!("invalid content-length: {value:?}")))
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    /// Returns false for statuses that never carry a body: 1xx, `204` and `304`.
    ///
    /// Such responses are sent without any framing header.
    pub fn allows_body(&self) -> bool {
        !(self.status.is_informational() || self.status == StatusCode::NO_CONTENT || self.status == StatusCode::NOT_MODIFIED)
    }

    /// Drops every header and the reason phrase, and sets `status`.
    pub fn reset(&mut self, status: StatusCode) {
        self.headers.clear();
        self.reason = None;
        self.status = status;
    }
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self::new(Version::HTTP_11)
    }
}
