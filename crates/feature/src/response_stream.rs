//! The response body stream handed to the pipeline.

use bytes::BytesMut;
use micro_exchange::exchange::TransportExchange;

use crate::FeatureError;
use crate::lifecycle::Lifecycle;

/// Where response body bytes go.
#[derive(Debug)]
pub(crate) enum BodySink {
    /// Collected in memory and sent with a `Content-Length` on completion.
    Buffer(BytesMut),
    /// Forwarded to the transport as they are written.
    Direct,
}

impl BodySink {
    pub(crate) fn buffered_len(&self) -> usize {
        match self {
            BodySink::Buffer(buf) => buf.len(),
            BodySink::Direct => 0,
        }
    }
}

/// A write sink that starts the response on first use.
///
/// Every operation runs the starting chain first (a no-op once the response has
/// started), so the head is final before the first body byte is observed.
pub struct ResponseStream<'a> {
    lifecycle: &'a mut Lifecycle,
    exchange: &'a mut dyn TransportExchange,
    sink: &'a mut BodySink,
}

impl<'a> ResponseStream<'a> {
    pub(crate) fn new(lifecycle: &'a mut Lifecycle, exchange: &'a mut dyn TransportExchange, sink: &'a mut BodySink) -> Self {
        Self { lifecycle, exchange, sink }
    }

    /// Returns true while bytes are collected in memory.
    pub fn is_buffered(&self) -> bool {
        matches!(*self.sink, BodySink::Buffer(_))
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), FeatureError> {
        self.start().await?;
        match &mut *self.sink {
            BodySink::Buffer(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            BodySink::Direct => Ok(self.exchange.write(data).await?),
        }
    }

    pub async fn flush(&mut self) -> Result<(), FeatureError> {
        self.start().await?;
        match *self.sink {
            BodySink::Buffer(_) => Ok(()),
            BodySink::Direct => Ok(self.exchange.flush().await?),
        }
    }

    /// Reads nothing: the buffered sink is positioned at its end, and the direct
    /// sink cannot be read at all.
    pub async fn read(&mut self, _buf: &mut [u8]) -> Result<usize, FeatureError> {
        self.start().await?;
        match *self.sink {
            BodySink::Buffer(_) => Ok(0),
            BodySink::Direct => Err(FeatureError::unsupported("the response body is write only")),
        }
    }

    async fn start(&mut self) -> Result<(), FeatureError> {
        self.lifecycle.start(self.exchange.response_mut()).await
    }
}

impl std::fmt::Debug for ResponseStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("lifecycle", &self.lifecycle)
            .field("sink", &self.sink)
            .field("committed", &self.exchange.is_committed())
            .finish_non_exhaustive()
    }
}
