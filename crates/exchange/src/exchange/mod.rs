//! The transport exchange boundary.
//!
//! A transport exchange is one request and one response of a single connection
//! turn, as produced by the socket level listener. The request side is already
//! parsed; the response side is unbuffered: the head is committed by the first
//! body write (or flush, or close) and cannot change afterwards.
//!
//! # Components
//!
//! - [`TransportExchange`]: the object safe boundary trait consumed by the
//!   feature adapter
//! - [`ConnectionInfo`]: identity and endpoints of the underlying connection
//! - [`HttpExchange`]: an HTTP/1.x implementation over tokio reader and writer halves

mod connection_info;
mod http_exchange;

pub use connection_info::ConnectionInfo;
pub use http_exchange::HttpExchange;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::protocol::{RequestHeader, ResponseHead, TransportError};

/// One request/response pair of a connection.
///
/// Implementations own the response output exclusively. The head returned by
/// [`response_mut`](TransportExchange::response_mut) stays editable after the
/// commit, but edits made after that point never reach the wire.
#[async_trait]
pub trait TransportExchange: Send {
    fn connection(&self) -> &ConnectionInfo;

    /// The URI scheme the request arrived on.
    fn scheme(&self) -> &str {
        "http"
    }

    fn request(&self) -> &RequestHeader;

    fn request_mut(&mut self) -> &mut RequestHeader;

    /// The request body, read straight from the connection.
    fn request_body(&mut self) -> &mut (dyn AsyncRead + Send + Unpin);

    fn response(&self) -> &ResponseHead;

    fn response_mut(&mut self) -> &mut ResponseHead;

    /// Returns true once the response head has been serialized.
    fn is_committed(&self) -> bool;

    /// Writes body bytes, committing the head first if needed.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Flushes written bytes to the peer, committing the head first if needed.
    async fn flush(&mut self) -> Result<(), TransportError>;

    /// Finishes the response and releases the connection.
    ///
    /// A head that was never committed is sent with an empty body. Calling
    /// `close` on a closed exchange does nothing.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Tears the connection down without completing the body framing.
    async fn abort(&mut self);
}
