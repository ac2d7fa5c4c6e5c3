//! The capability traits a request pipeline works through.
//!
//! A pipeline stage asks only for what it needs, e.g. `impl ResponseFeature`
//! for a stage that adds headers, or `impl SendFileFeature` for a static file
//! handler. [`FeatureContext`](crate::FeatureContext) implements all of them
//! for one exchange.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use async_trait::async_trait;
use http::{Method, StatusCode};
use micro_exchange::protocol::ResponseHead;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::CallbackFuture;
use crate::{FeatureError, HeaderView, ResponseStream};

/// Identity and endpoints of the underlying connection.
///
/// All values are fixed by the transport; the setters always fail.
pub trait ConnectionFeature {
    fn connection_id(&self) -> &str;

    fn remote_addr(&self) -> IpAddr;

    fn remote_port(&self) -> u16;

    fn local_addr(&self) -> IpAddr;

    fn local_port(&self) -> u16;

    fn set_connection_id(&mut self, _id: String) -> Result<(), FeatureError> {
        Err(FeatureError::unsupported("the connection id is fixed by the transport"))
    }

    fn set_remote_addr(&mut self, _addr: SocketAddr) -> Result<(), FeatureError> {
        Err(FeatureError::unsupported("the remote address is fixed by the transport"))
    }

    fn set_local_addr(&mut self, _addr: SocketAddr) -> Result<(), FeatureError> {
        Err(FeatureError::unsupported("the local address is fixed by the transport"))
    }
}

/// Request metadata and body.
pub trait RequestFeature {
    /// The protocol version, e.g. `HTTP/1.1`.
    fn protocol(&self) -> &'static str;

    fn scheme(&self) -> &str;

    fn set_scheme(&mut self, scheme: String);

    fn method(&self) -> &Method;

    fn set_method(&mut self, _method: Method) -> Result<(), FeatureError> {
        Err(FeatureError::unsupported("the request method is fixed by the transport"))
    }

    /// The mount point of the application. Always empty: the pipeline sees the
    /// whole path.
    fn path_base(&self) -> &str {
        ""
    }

    fn set_path_base(&mut self, _path_base: String) -> Result<(), FeatureError> {
        Err(FeatureError::unsupported("the path base is fixed by the transport"))
    }

    /// The unescaped absolute path.
    fn path(&self) -> &str;

    /// Rewrites the path seen by later pipeline stages.
    fn set_path(&mut self, path: String);

    /// The escaped query including its leading `?`, or an empty string.
    fn query_string(&self) -> String;

    /// The request target exactly as it appeared on the request line.
    fn raw_target(&self) -> &str;

    fn request_headers(&mut self) -> HeaderView<'_>;

    fn request_body(&mut self) -> &mut (dyn AsyncRead + Send + Unpin);
}

/// Response status, headers, body and lifecycle.
pub trait ResponseFeature {
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    fn reason_phrase(&self) -> Option<&str>;

    fn set_reason_phrase(&mut self, reason: Option<String>);

    fn response_headers(&mut self) -> HeaderView<'_>;

    fn has_started(&self) -> bool;

    /// Registers a callback run right before the response head is committed.
    ///
    /// Callbacks run last registered first. Fails once the response has started.
    fn on_starting<F, S>(&mut self, callback: F, state: S) -> Result<(), FeatureError>
    where
        F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send + 'static,
        S: Send + 'static;

    /// Registers a callback run once the response has been completed.
    ///
    /// Callbacks run last registered first. Fails once the response has completed.
    fn on_completed<F, S>(&mut self, callback: F, state: S) -> Result<(), FeatureError>
    where
        F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send + 'static,
        S: Send + 'static;

    fn response_body(&mut self) -> ResponseStream<'_>;
}

/// Buffering control.
pub trait BufferingFeature {
    /// Requests are never buffered, so this does nothing.
    fn disable_request_buffering(&mut self) {}

    /// Sends body writes straight to the transport instead of collecting them.
    ///
    /// Fails with [`FeatureError::AlreadyStarted`] once the response has started.
    fn disable_response_buffering(&mut self) -> Result<(), FeatureError>;
}

/// Whole or partial file transfer.
#[async_trait]
pub trait SendFileFeature {
    /// Starts the response and schedules `count` bytes of `path`, beginning at
    /// `offset`, as the response body. A missing `count` means "up to the end".
    ///
    /// The file is opened immediately; the bytes are copied when the response
    /// completes, checking `cancellation` between chunks.
    async fn send_file(
        &mut self,
        path: &Path,
        offset: u64,
        count: Option<u64>,
        cancellation: CancellationToken,
    ) -> Result<(), FeatureError>;
}
