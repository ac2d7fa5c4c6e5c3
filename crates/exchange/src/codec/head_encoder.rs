//! Response head encoder.
//!
//! Serializes the status line and header block of a [`ResponseHead`]. Framing headers
//! (`Content-Length`, `Transfer-Encoding`) are never copied from the head: the encoder
//! writes the one matching the [`PayloadSize`] decided at commit time, so the wire
//! always agrees with how the body is actually framed.

use crate::protocol::{PayloadSize, ResponseHead, TransportError};

use bytes::{BufMut, BytesMut};

use http::{Version, header};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP/1.0 and HTTP/1.1 response heads.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadEncoder;

impl<'a> Encoder<(&'a ResponseHead, PayloadSize)> for HeadEncoder {
    type Error = TransportError;

    fn encode(&mut self, item: (&'a ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, payload_size) = item;

        let version = match head.version() {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(TransportError::invalid_head(format!("unsupported http version {v:?}")));
            }
        };

        let reason = head.effective_reason();
        if reason.bytes().any(|b| b == b'\r' || b == b'\n') {
            return Err(TransportError::invalid_head("reason phrase contains a line break"));
        }

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} {}\r\n", version, head.status().as_str(), reason)?;

        for (header_name, header_value) in head.headers() {
            if *header_name == header::CONTENT_LENGTH || *header_name == header::TRANSFER_ENCODING {
                continue;
            }
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }

        match payload_size {
            _ if !head.allows_body() => {}
            PayloadSize::Length(n) => write!(FastWrite(dst), "content-length: {n}\r\n")?,
            PayloadSize::Chunked => dst.put_slice(b"transfer-encoding: chunked\r\n"),
            PayloadSize::Empty => dst.put_slice(b"content-length: 0\r\n"),
            PayloadSize::UntilClose => dst.put_slice(b"connection: close\r\n"),
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writes straight into a `BytesMut` that already has room reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, StatusCode};

    fn encode(head: &ResponseHead, payload_size: PayloadSize) -> String {
        let mut dst = BytesMut::new();
        HeadEncoder.encode((head, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn fixed_length_head() {
        let mut head = ResponseHead::default();
        head.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        head.set_content_length(99);

        let expected = "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 12\r\n\r\n";
        assert_eq!(encode(&head, PayloadSize::Length(12)), expected);
    }

    #[test]
    fn chunked_head_drops_stale_length() {
        let mut head = ResponseHead::default();
        head.set_content_length(10);

        let expected = "HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n";
        assert_eq!(encode(&head, PayloadSize::Chunked), expected);
    }

    #[test]
    fn empty_head_with_reason() {
        let mut head = ResponseHead::new(Version::HTTP_10);
        head.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        head.set_reason_phrase(Some("Boom".to_string()));

        let expected = "HTTP/1.0 500 Boom\r\ncontent-length: 0\r\n\r\n";
        assert_eq!(encode(&head, PayloadSize::Empty), expected);
    }

    #[test]
    fn bodiless_statuses_have_no_framing_header() {
        for status in [StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED] {
            let mut head = ResponseHead::default();
            head.set_status(status);
            head.set_content_length(0);

            let expected = format!("HTTP/1.1 {} {}\r\n\r\n", status.as_str(), status.canonical_reason().unwrap());
            assert_eq!(encode(&head, PayloadSize::Empty), expected);
            assert_eq!(encode(&head, PayloadSize::Length(0)), expected);
        }
    }

    #[test]
    fn multi_valued_headers_keep_order() {
        let mut head = ResponseHead::default();
        head.headers_mut().append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        head.headers_mut().append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let encoded = encode(&head, PayloadSize::Empty);
        let first = encoded.find("set-cookie: a=1").unwrap();
        let second = encoded.find("set-cookie: b=2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn rejects_http2() {
        let head = ResponseHead::new(Version::HTTP_2);
        let mut dst = BytesMut::new();

        let result = HeadEncoder.encode((&head, PayloadSize::Empty), &mut dst);
        assert!(matches!(result, Err(TransportError::InvalidHead { .. })));
    }

    #[test]
    fn rejects_reason_with_line_break() {
        let mut head = ResponseHead::default();
        head.set_reason_phrase(Some("OK\r\nx-injected: 1".to_string()));
        let mut dst = BytesMut::new();

        let result = HeadEncoder.encode((&head, PayloadSize::Empty), &mut dst);
        assert!(matches!(result, Err(TransportError::InvalidHead { .. })));
    }
}
