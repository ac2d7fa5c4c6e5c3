use std::fmt;

use async_trait::async_trait;
use bytes::BytesMut;
use http::uri::Scheme;
use http::{HeaderValue, Version, header};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, warn};

use crate::codec::{HeadEncoder, PayloadEncoder};
use crate::exchange::{ConnectionInfo, TransportExchange};
use crate::protocol::{PayloadItem, PayloadSize, RequestHeader, ResponseHead, TransportError};

/// An HTTP/1.x transport exchange over tokio reader and writer halves.
///
/// The response head is serialized lazily. The body framing is decided at that
/// moment from the head:
/// - `Content-Length` set: fixed length
/// - no length, HTTP/1.1: chunked
/// - no length, HTTP/1.0: delimited by closing the connection
/// - closed before any write: empty body with `Content-Length: 0`
///
/// A `Date` header is added on commit unless one is already present.
///
/// # Type Parameters
///
/// * `R`: The request body reader
/// * `W`: The response writer
pub struct HttpExchange<R, W> {
    connection: ConnectionInfo,
    scheme: Scheme,
    request: RequestHeader,
    body: R,
    response: ResponseHead,
    writer: W,
    buf: BytesMut,
    output: Output,
}

#[derive(Debug)]
enum Output {
    Pending,
    Streaming(PayloadEncoder),
    Closed,
}

impl<R, W> HttpExchange<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    /// Creates an exchange answering `request`, whose response version follows the
    /// request version.
    pub fn new(connection: ConnectionInfo, request: RequestHeader, body: R, writer: W) -> Self {
        let response = ResponseHead::new(request.version());
        Self {
            connection,
            scheme: Scheme::HTTP,
            request,
            body,
            response,
            writer,
            buf: BytesMut::new(),
            output: Output::Pending,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn commit(&mut self, closing: bool) -> Result<(), TransportError> {
        match self.output {
            Output::Closed => Err(TransportError::Closed),
            Output::Streaming(_) => Ok(()),
            Output::Pending => {
                let payload_size = if closing || !self.response.allows_body() {
                    PayloadSize::Empty
                } else {
                    match self.response.content_length()? {
                        Some(length) => PayloadSize::Length(length),
                        None if self.response.version() == Version::HTTP_10 => PayloadSize::UntilClose,
                        None => PayloadSize::Chunked,
                    }
                };

                self.stamp_date();
                HeadEncoder.encode((&self.response, payload_size), &mut self.buf)?;
                debug!(status = %self.response.status(), ?payload_size, "response head committed");

                self.output = Output::Streaming(PayloadEncoder::from(payload_size));
                Ok(())
            }
        }
    }

    fn stamp_date(&mut self) {
        if self.response.headers().contains_key(header::DATE) {
            return;
        }

        let mut date = faf_http_date::get_date_buff_no_key();
        faf_http_date::get_date_no_key(&mut date);
        if let Ok(value) = HeaderValue::from_bytes(&date[..]) {
            self.response.headers_mut().insert(header::DATE, value);
        }
    }

    async fn drain(&mut self) -> Result<(), TransportError> {
        if self.buf.is_empty() {
            return Ok(());
        }

        let result = self.writer.write_all(&self.buf).await;
        self.buf.clear();
        result.map_err(TransportError::from)
    }

    async fn finish_output(&mut self) -> Result<(), TransportError> {
        if matches!(self.output, Output::Pending) {
            self.commit(true)?;
        }

        if let Output::Streaming(encoder) = &mut self.output {
            encoder.encode(PayloadItem::<&[u8]>::Eof, &mut self.buf)?;
        }

        self.drain().await?;
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> TransportExchange for HttpExchange<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    fn scheme(&self) -> &str {
        self.scheme.as_str()
    }

    fn request(&self) -> &RequestHeader {
        &self.request
    }

    fn request_mut(&mut self) -> &mut RequestHeader {
        &mut self.request
    }

    fn request_body(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut self.body
    }

    fn response(&self) -> &ResponseHead {
        &self.response
    }

    fn response_mut(&mut self) -> &mut ResponseHead {
        &mut self.response
    }

    fn is_committed(&self) -> bool {
        !matches!(self.output, Output::Pending)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if data.is_empty() {
            return match self.output {
                Output::Closed => Err(TransportError::Closed),
                _ => Ok(()),
            };
        }

        self.commit(false)?;
        if let Output::Streaming(encoder) = &mut self.output {
            encoder.encode(PayloadItem::Chunk(data), &mut self.buf)?;
        }
        self.drain().await
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.commit(false)?;
        self.drain().await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if matches!(self.output, Output::Closed) {
            return Ok(());
        }

        let result = self.finish_output().await;
        self.output = Output::Closed;
        result
    }

    async fn abort(&mut self) {
        self.output = Output::Closed;
        self.buf.clear();
        if let Err(e) = self.writer.shutdown().await {
            warn!(cause = %e, connection_id = self.connection.id(), "failed to shut down aborted exchange");
        }
    }
}

impl<R, W> fmt::Debug for HttpExchange<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExchange")
            .field("connection", &self.connection)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}
