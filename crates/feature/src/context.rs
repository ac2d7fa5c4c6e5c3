//! The per-exchange feature context.
//!
//! [`FeatureContext`] owns one transport exchange and drives its response
//! through the lifecycle:
//!
//! 1. The pipeline reads the request and writes the response through the
//!    capability traits in [`features`](crate::features).
//! 2. The first body access starts the response and runs the starting chain.
//! 3. [`complete`](FeatureContext::complete) runs the completed chain, then the
//!    finish action (flush the buffer, nothing, or send a file), then closes the
//!    exchange.
//!
//! The exchange is finalized exactly once: either one `close` or, when the
//! response cannot be finished cleanly, one `abort`.

use std::fmt;
use std::io::SeekFrom;
use std::mem;
use std::net::IpAddr;
use std::path::Path;

use async_trait::async_trait;
use bytes::BytesMut;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode, Version};
use micro_exchange::exchange::TransportExchange;
use micro_exchange::protocol::{ResponseHead, TransportError};
use percent_encoding::percent_decode_str;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::features::{BufferingFeature, ConnectionFeature, RequestFeature, ResponseFeature, SendFileFeature};
use crate::lifecycle::{CallbackFuture, Lifecycle, ResponseState};
use crate::response_stream::BodySink;
use crate::{BoundedSource, FeatureError, FeatureOptions, HeaderView, ResponseStream, ensure};

/// The single operation run when the response completes.
enum FinishAction {
    FlushBuffer,
    Nothing,
    SendFile(FileTransfer),
}

struct FileTransfer {
    file: File,
    offset: u64,
    count: u64,
    cancellation: CancellationToken,
}

/// The capability bundle of one exchange.
pub struct FeatureContext {
    exchange: Box<dyn TransportExchange>,
    options: FeatureOptions,
    lifecycle: Lifecycle,
    sink: BodySink,
    finish: FinishAction,
    scheme: String,
    path: String,
    finalized: bool,
}

impl FeatureContext {
    pub fn new<E: TransportExchange + 'static>(exchange: E, options: FeatureOptions) -> Self {
        let scheme = exchange.scheme().to_string();
        let path = percent_decode_str(exchange.request().path()).decode_utf8_lossy().into_owned();
        let sink = BodySink::Buffer(BytesMut::with_capacity(options.response_buffer_capacity()));

        Self {
            exchange: Box::new(exchange),
            options,
            lifecycle: Lifecycle::new(),
            sink,
            finish: FinishAction::FlushBuffer,
            scheme,
            path,
            finalized: false,
        }
    }

    pub fn state(&self) -> ResponseState {
        self.lifecycle.state()
    }

    pub fn options(&self) -> &FeatureOptions {
        &self.options
    }

    /// Starts the response, running the starting chain once.
    pub async fn start(&mut self) -> Result<(), FeatureError> {
        self.lifecycle.start(self.exchange.response_mut()).await
    }

    /// Completes the response and closes the exchange.
    ///
    /// Transport failures while finishing are logged and the connection is
    /// aborted; they are not reported back since the pipeline has already
    /// returned. Callback failures and cancellation are reported, after the
    /// exchange has been finalized. A callback failure before the head was
    /// committed turns the response into an empty `500`, like a failed pipeline.
    /// Calling this again does nothing.
    pub async fn complete(&mut self) -> Result<(), FeatureError> {
        if self.finalized {
            return Ok(());
        }

        let result = match self.lifecycle.complete(self.exchange.response_mut()).await {
            Ok(()) => self.finish().await,
            Err(e) => {
                if !self.exchange.is_committed() {
                    self.replace_with_error_response();
                }
                if self.lifecycle.state() != ResponseState::Completed {
                    self.run_completed().await;
                }
                Err(e)
            }
        };
        self.finalize(result).await
    }

    /// Answers a failed pipeline.
    ///
    /// Before the head is committed the response is replaced by an empty `500`
    /// and closed; afterwards the status can no longer change and the connection
    /// is aborted. The completed chain runs in both cases, the starting chain
    /// never does.
    pub async fn fail(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        if self.exchange.is_committed() {
            warn!("response already started, aborting the connection");
            self.run_completed().await;
            self.exchange.abort().await;
            return;
        }

        self.replace_with_error_response();
        self.lifecycle.skip_start();

        self.run_completed().await;
        self.close().await;
    }

    /// Turns the uncommitted response into an empty `500`, dropping any buffered body.
    fn replace_with_error_response(&mut self) {
        let head = self.exchange.response_mut();
        head.reset(StatusCode::INTERNAL_SERVER_ERROR);
        head.set_content_length(0);
        if let BodySink::Buffer(buf) = &mut self.sink {
            buf.clear();
        }
        self.finish = FinishAction::Nothing;
    }

    async fn run_completed(&mut self) {
        if let Err(e) = self.lifecycle.complete(self.exchange.response_mut()).await {
            error!(cause = %e, "completed callback failed");
        }
    }

    async fn finalize(&mut self, result: Result<(), FeatureError>) -> Result<(), FeatureError> {
        self.finalized = true;

        match result {
            Ok(()) => {
                self.close().await;
                Ok(())
            }
            Err(FeatureError::Transport { source }) => {
                log_transport_error(&source);
                self.exchange.abort().await;
                Ok(())
            }
            Err(FeatureError::Cancelled) => {
                debug!("response transfer cancelled, aborting the connection");
                self.exchange.abort().await;
                Err(FeatureError::Cancelled)
            }
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.exchange.close().await {
            log_transport_error(&e);
        }
    }

    async fn finish(&mut self) -> Result<(), FeatureError> {
        match mem::replace(&mut self.finish, FinishAction::Nothing) {
            FinishAction::Nothing => Ok(()),
            FinishAction::FlushBuffer => {
                let body = match &mut self.sink {
                    BodySink::Buffer(buf) => buf.split().freeze(),
                    BodySink::Direct => return Ok(()),
                };

                let head = self.exchange.response_mut();
                if head.allows_body() {
                    head.set_content_length(body.len() as u64);
                }
                if !body.is_empty() {
                    self.exchange.write(&body).await?;
                }
                self.exchange.flush().await?;
                Ok(())
            }
            FinishAction::SendFile(transfer) => self.transfer_file(transfer).await,
        }
    }

    async fn transfer_file(&mut self, transfer: FileTransfer) -> Result<(), FeatureError> {
        let FileTransfer { mut file, offset, count, cancellation } = transfer;

        let head = self.exchange.response_mut();
        head.set_content_length(count);
        if !head.headers().contains_key(CONTENT_TYPE) {
            let octet_stream =
                HeaderValue::from_str(mime::APPLICATION_OCTET_STREAM.as_ref()).map_err(FeatureError::invalid_header)?;
            head.headers_mut().insert(CONTENT_TYPE, octet_stream);
        }

        file.seek(SeekFrom::Start(offset)).await.map_err(FeatureError::io)?;
        let mut source = BoundedSource::new(file, count);
        let mut chunk = vec![0u8; self.options.send_file_chunk_size()];

        loop {
            if cancellation.is_cancelled() {
                return Err(FeatureError::Cancelled);
            }

            let n = source.read(&mut chunk).await.map_err(FeatureError::io)?;
            if n == 0 {
                break;
            }
            self.exchange.write(&chunk[..n]).await?;
        }

        if source.remaining() > 0 {
            warn!(missing = source.remaining(), "file ended before the scheduled byte count");
        }
        self.exchange.flush().await?;
        Ok(())
    }
}

fn log_transport_error(e: &TransportError) {
    if e.is_disconnect() {
        info!(cause = %e, "client disconnected before the response completed");
    } else {
        error!(cause = %e, "failed to finish the response");
    }
}

/// Resolves the byte count of a file transfer against the file length.
fn resolve_range(offset: u64, count: Option<u64>, length: u64) -> Result<u64, FeatureError> {
    let invalid = FeatureError::InvalidRange { offset, count, length };
    ensure!(offset <= length, invalid);

    let available = length - offset;
    match count {
        None => Ok(available),
        Some(count) => {
            ensure!(count <= available, invalid);
            Ok(count)
        }
    }
}

impl Drop for FeatureContext {
    fn drop(&mut self) {
        if !self.finalized {
            warn!(connection = self.exchange.connection().id(), "feature context dropped before the response completed");
        }
    }
}

impl fmt::Debug for FeatureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureContext")
            .field("connection", self.exchange.connection())
            .field("lifecycle", &self.lifecycle)
            .field("sink", &self.sink)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl ConnectionFeature for FeatureContext {
    fn connection_id(&self) -> &str {
        self.exchange.connection().id()
    }

    fn remote_addr(&self) -> IpAddr {
        self.exchange.connection().remote_addr().ip()
    }

    fn remote_port(&self) -> u16 {
        self.exchange.connection().remote_addr().port()
    }

    fn local_addr(&self) -> IpAddr {
        self.exchange.connection().local_addr().ip()
    }

    fn local_port(&self) -> u16 {
        self.exchange.connection().local_addr().port()
    }
}

impl RequestFeature for FeatureContext {
    fn protocol(&self) -> &'static str {
        match self.exchange.request().version() {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2",
            Version::HTTP_3 => "HTTP/3",
            _ => "HTTP/1.1",
        }
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn set_scheme(&mut self, scheme: String) {
        self.scheme = scheme;
    }

    fn method(&self) -> &Method {
        self.exchange.request().method()
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
    }

    fn query_string(&self) -> String {
        match self.exchange.request().query() {
            Some(query) => format!("?{query}"),
            None => String::new(),
        }
    }

    fn raw_target(&self) -> &str {
        self.exchange.request().raw_target()
    }

    fn request_headers(&mut self) -> HeaderView<'_> {
        HeaderView::new(self.exchange.request_mut().headers_mut())
    }

    fn request_body(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        self.exchange.request_body()
    }
}

impl ResponseFeature for FeatureContext {
    fn status(&self) -> StatusCode {
        self.exchange.response().status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.exchange.response_mut().set_status(status);
    }

    fn reason_phrase(&self) -> Option<&str> {
        self.exchange.response().reason_phrase()
    }

    fn set_reason_phrase(&mut self, reason: Option<String>) {
        self.exchange.response_mut().set_reason_phrase(reason);
    }

    fn response_headers(&mut self) -> HeaderView<'_> {
        HeaderView::new(self.exchange.response_mut().headers_mut())
    }

    fn has_started(&self) -> bool {
        self.lifecycle.has_started()
    }

    fn on_starting<F, S>(&mut self, callback: F, state: S) -> Result<(), FeatureError>
    where
        F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send + 'static,
        S: Send + 'static,
    {
        self.lifecycle.on_starting(callback, state)
    }

    fn on_completed<F, S>(&mut self, callback: F, state: S) -> Result<(), FeatureError>
    where
        F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send + 'static,
        S: Send + 'static,
    {
        self.lifecycle.on_completed(callback, state)
    }

    fn response_body(&mut self) -> ResponseStream<'_> {
        ResponseStream::new(&mut self.lifecycle, self.exchange.as_mut(), &mut self.sink)
    }
}

impl BufferingFeature for FeatureContext {
    fn disable_response_buffering(&mut self) -> Result<(), FeatureError> {
        ensure!(!self.lifecycle.has_started(), FeatureError::AlreadyStarted);
        self.sink = BodySink::Direct;
        self.finish = FinishAction::Nothing;
        Ok(())
    }
}

#[async_trait]
impl SendFileFeature for FeatureContext {
    async fn send_file(
        &mut self,
        path: &Path,
        offset: u64,
        count: Option<u64>,
        cancellation: CancellationToken,
    ) -> Result<(), FeatureError> {
        self.start().await?;

        let file = File::open(path).await.map_err(FeatureError::io)?;
        let length = file.metadata().await.map_err(FeatureError::io)?.len();
        let count = resolve_range(offset, count, length)?;

        if self.sink.buffered_len() > 0 {
            debug!(discarded = self.sink.buffered_len(), "file transfer replaces the buffered response body");
        }
        debug!(path = %path.display(), offset, count, "file transfer scheduled");
        self.finish = FinishAction::SendFile(FileTransfer { file, offset, count, cancellation });
        Ok(())
    }
}
