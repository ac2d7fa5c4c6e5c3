//! An in-memory transport exchange that records every call made on it.

use std::io::{self, Cursor};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{Request, Version};
use micro_exchange::exchange::{ConnectionInfo, TransportExchange};
use micro_exchange::protocol::{RequestHeader, ResponseHead, TransportError};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Callback(&'static str),
    Commit { status: u16, content_length: Option<u64> },
    Write(Vec<u8>),
    Flush,
    Close,
    Abort,
}

/// A shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub(crate) struct Events {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl Events {
    pub(crate) fn push(&self, event: Event) {
        self.inner.lock().unwrap().push(event);
    }

    /// Drains the log.
    pub(crate) fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.inner.lock().unwrap())
    }

    /// The body bytes written so far.
    pub(crate) fn body(&self) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::Write(data) => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub(crate) fn count(&self, event: &Event) -> usize {
        self.inner.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

#[derive(Debug)]
pub(crate) struct RecordingExchange {
    connection: ConnectionInfo,
    request: RequestHeader,
    body: Cursor<Vec<u8>>,
    response: ResponseHead,
    committed: bool,
    closed: bool,
    fail_writes: bool,
    cancel_on_write: Option<CancellationToken>,
    events: Events,
}

impl RecordingExchange {
    pub(crate) fn new(target: &str) -> Self {
        let request = Request::builder()
            .uri(target)
            .version(Version::HTTP_11)
            .header(http::header::HOST, "localhost")
            .body(())
            .unwrap();

        Self {
            connection: ConnectionInfo::new("conn-7", "10.0.0.1:50000".parse().unwrap(), "10.0.0.2:8080".parse().unwrap()),
            request: request.into(),
            body: Cursor::new(Vec::new()),
            response: ResponseHead::new(Version::HTTP_11),
            committed: false,
            closed: false,
            fail_writes: false,
            cancel_on_write: None,
            events: Events::default(),
        }
    }

    pub(crate) fn with_body(mut self, body: &[u8]) -> Self {
        self.body = Cursor::new(body.to_vec());
        self
    }

    /// Makes every write fail as if the peer reset the connection.
    pub(crate) fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Cancels `token` right after the first body write lands.
    pub(crate) fn cancelling_on_write(mut self, token: CancellationToken) -> Self {
        self.cancel_on_write = Some(token);
        self
    }

    pub(crate) fn events(&self) -> Events {
        self.events.clone()
    }

    fn commit(&mut self) {
        if !self.committed {
            self.committed = true;
            self.events.push(Event::Commit {
                status: self.response.status().as_u16(),
                content_length: self.response.content_length().ok().flatten(),
            });
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed { Err(TransportError::Closed) } else { Ok(()) }
    }
}

#[async_trait]
impl TransportExchange for RecordingExchange {
    fn connection(&self) -> &ConnectionInfo {
        &self.connection
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
        self.committed
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        if self.fail_writes {
            return Err(io::Error::from(io::ErrorKind::ConnectionReset).into());
        }
        self.commit();
        if !data.is_empty() {
            self.events.push(Event::Write(data.to_vec()));
            if let Some(token) = self.cancel_on_write.take() {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.commit();
        self.events.push(Event::Flush);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.commit();
        self.closed = true;
        self.events.push(Event::Close);
        Ok(())
    }

    async fn abort(&mut self) {
        self.closed = true;
        self.events.push(Event::Abort);
    }
}
