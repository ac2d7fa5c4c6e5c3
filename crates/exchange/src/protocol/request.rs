//! HTTP request header handling.
//!
//! Wraps the standard `http::Request` type with the accessors a transport
//! exchange hands to the request pipeline.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// The parsed head of one HTTP request.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - The raw request target, its path and its query as sent by the client
/// - Mutable access to the header block for pipeline stages that rewrite it
///
/// The URI is fixed once the header is built, so the request target is
/// rendered once, in the form the client sent it.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
    raw_target: String,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a mutable reference to the request's headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// The escaped absolute path of the request target.
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// The escaped query of the request target, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    /// The escaped request target as it appeared on the request line, e.g.
    /// `/index.html?a=1`, `http://host/index.html` for a proxy request, `*` for a
    /// server-wide `OPTIONS` or `host:port` for `CONNECT`.
    pub fn raw_target(&self) -> &str {
        &self.raw_target
    }
}

impl RequestHeader {
    fn new(inner: Request<()>) -> Self {
        let raw_target = inner.uri().to_string();
        Self { inner, raw_target }
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self::new(Request::from_parts(parts, ()))
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Method, Version};

    use super::*;

    fn header(target: &str) -> RequestHeader {
        Request::builder()
            .method(Method::GET)
            .uri(target)
            .version(Version::HTTP_11)
            .header(http::header::HOST, "127.0.0.1:8080")
            .header(http::header::ACCEPT, "*/*")
            .body(())
            .unwrap()
            .into()
    }

    #[test]
    fn origin_form_target() {
        let header = header("/index/?a=1&b=2&a=3");

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.path(), "/index/");
        assert_eq!(header.query(), Some("a=1&b=2&a=3"));
        assert_eq!(header.raw_target(), "/index/?a=1&b=2&a=3");
        assert_eq!(header.headers().len(), 2);
        assert_eq!(header.headers().get(http::header::ACCEPT), Some(&HeaderValue::from_static("*/*")));
    }

    #[test]
    fn escaped_path_is_kept_raw() {
        let header = header("/files/a%20b.txt");

        assert_eq!(header.path(), "/files/a%20b.txt");
        assert_eq!(header.query(), None);
    }

    #[test]
    fn absolute_form_target_is_kept_whole() {
        let header = header("http://example.com:8080/p?q=1");

        assert_eq!(header.raw_target(), "http://example.com:8080/p?q=1");
        assert_eq!(header.path(), "/p");
        assert_eq!(header.query(), Some("q=1"));
    }

    #[test]
    fn authority_and_asterisk_targets() {
        assert_eq!(header("example.com:443").raw_target(), "example.com:443");
        assert_eq!(header("*").raw_target(), "*");
    }

    #[test]
    fn headers_are_mutable() {
        let mut header = header("/");
        header.headers_mut().append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        assert_eq!(header.headers().get("X-Forwarded-For"), Some(&HeaderValue::from_static("10.0.0.1")));
    }
}
