//! Response lifecycle: the `NotStarted → Started → Completed` state machine and
//! its two callback chains.
//!
//! Both chains are append-only while open and run exactly once, in reverse
//! registration order, each callback awaited before the next one begins. A chain
//! is sealed the moment it starts running: the state flips first, so a
//! registration attempted from inside a running callback is already rejected.

use std::fmt;
use std::mem;

use futures::future::BoxFuture;
use micro_exchange::protocol::ResponseHead;
use tracing::trace;

use crate::{BoxError, FeatureError, ensure};

/// The future returned by a lifecycle callback.
pub type CallbackFuture<'a> = BoxFuture<'a, Result<(), BoxError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    NotStarted,
    Started,
    Completed,
}

trait LifecycleCallback: Send {
    fn invoke<'a>(self: Box<Self>, head: &'a mut ResponseHead) -> CallbackFuture<'a>;
}

/// A callback together with the state captured when it was registered.
struct CallbackEntry<F, S> {
    action: F,
    state: S,
}

impl<F, S> LifecycleCallback for CallbackEntry<F, S>
where
    F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send,
    S: Send,
{
    fn invoke<'a>(self: Box<Self>, head: &'a mut ResponseHead) -> CallbackFuture<'a> {
        let CallbackEntry { action, state } = *self;
        action(head, state)
    }
}

type Chain = Vec<Box<dyn LifecycleCallback>>;

pub struct Lifecycle {
    state: ResponseState,
    on_starting: Chain,
    on_completed: Chain,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { state: ResponseState::NotStarted, on_starting: Vec::new(), on_completed: Vec::new() }
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    pub fn has_started(&self) -> bool {
        self.state != ResponseState::NotStarted
    }

    /// Queues `callback` to run when the response starts.
    pub fn on_starting<F, S>(&mut self, callback: F, state: S) -> Result<(), FeatureError>
    where
        F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send + 'static,
        S: Send + 'static,
    {
        ensure!(self.state == ResponseState::NotStarted, FeatureError::registration("the response has already started"));
        self.on_starting.push(Box::new(CallbackEntry { action: callback, state }));
        Ok(())
    }

    /// Queues `callback` to run when the response completes.
    pub fn on_completed<F, S>(&mut self, callback: F, state: S) -> Result<(), FeatureError>
    where
        F: for<'a> FnOnce(&'a mut ResponseHead, S) -> CallbackFuture<'a> + Send + 'static,
        S: Send + 'static,
    {
        ensure!(self.state != ResponseState::Completed, FeatureError::registration("the response has already completed"));
        self.on_completed.push(Box::new(CallbackEntry { action: callback, state }));
        Ok(())
    }

    /// Moves to `Started` and runs the starting chain. Does nothing once started.
    ///
    /// The first failing callback stops the chain; the state stays `Started`.
    pub async fn start(&mut self, head: &mut ResponseHead) -> Result<(), FeatureError> {
        if self.state != ResponseState::NotStarted {
            return Ok(());
        }
        self.state = ResponseState::Started;
        run_chain("starting", mem::take(&mut self.on_starting), head).await
    }

    /// Moves to `Completed`, starting first if needed, and runs the completed chain.
    /// Does nothing once completed.
    pub async fn complete(&mut self, head: &mut ResponseHead) -> Result<(), FeatureError> {
        if self.state == ResponseState::Completed {
            return Ok(());
        }
        self.start(head).await?;
        self.state = ResponseState::Completed;
        run_chain("completed", mem::take(&mut self.on_completed), head).await
    }

    /// Moves to `Started` without running the starting chain.
    ///
    /// Used when the response is replaced wholesale, e.g. by an error response.
    pub fn skip_start(&mut self) {
        if self.state == ResponseState::NotStarted {
            self.state = ResponseState::Started;
            self.on_starting.clear();
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state)
            .field("on_starting", &self.on_starting.len())
            .field("on_completed", &self.on_completed.len())
            .finish()
    }
}

async fn run_chain(name: &'static str, chain: Chain, head: &mut ResponseHead) -> Result<(), FeatureError> {
    trace!(chain = name, callbacks = chain.len(), "running lifecycle callbacks");
    for callback in chain.into_iter().rev() {
        callback.invoke(head).await.map_err(FeatureError::callback)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::FutureExt;
    use http::{HeaderValue, StatusCode};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn push<'a>(log: Log, name: &'static str) -> CallbackFuture<'a> {
        async move {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        }
        .boxed()
    }

    fn noop(_: &mut ResponseHead, (): ()) -> CallbackFuture<'_> {
        async { Ok(()) }.boxed()
    }

    fn record(lifecycle: &mut Lifecycle, log: &Log, starting: bool, name: &'static str) {
        let log = log.clone();
        if starting {
            lifecycle.on_starting(move |_, name| push(log, name), name).unwrap();
        } else {
            lifecycle.on_completed(move |_, name| push(log, name), name).unwrap();
        }
    }

    #[tokio::test]
    async fn chains_run_in_reverse_registration_order() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();

        for name in ["A", "B", "C"] {
            record(&mut lifecycle, &log, true, name);
        }
        for name in ["a", "b", "c"] {
            record(&mut lifecycle, &log, false, name);
        }

        lifecycle.start(&mut head).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);

        lifecycle.complete(&mut head).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A", "c", "b", "a"]);
    }

    #[tokio::test]
    async fn start_runs_the_chain_once() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();
        record(&mut lifecycle, &log, true, "A");

        lifecycle.start(&mut head).await.unwrap();
        lifecycle.start(&mut head).await.unwrap();
        lifecycle.complete(&mut head).await.unwrap();
        lifecycle.complete(&mut head).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["A"]);
        assert_eq!(lifecycle.state(), ResponseState::Completed);
    }

    #[tokio::test]
    async fn complete_starts_implicitly() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();
        record(&mut lifecycle, &log, true, "starting");
        record(&mut lifecycle, &log, false, "completed");

        lifecycle.complete(&mut head).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["starting", "completed"]);
    }

    #[tokio::test]
    async fn late_registration_fails() {
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();

        lifecycle.start(&mut head).await.unwrap();
        assert!(lifecycle.has_started());
        assert!(matches!(lifecycle.on_starting(noop, ()), Err(FeatureError::Registration { .. })));
        assert!(lifecycle.on_completed(noop, ()).is_ok());

        lifecycle.complete(&mut head).await.unwrap();
        assert!(matches!(lifecycle.on_completed(noop, ()), Err(FeatureError::Registration { .. })));
    }

    #[tokio::test]
    async fn starting_callbacks_edit_the_head() {
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();

        lifecycle
            .on_starting(
                |head, value| {
                    async move {
                        head.set_status(StatusCode::ACCEPTED);
                        head.headers_mut().insert("x-trace", value);
                        Ok(())
                    }
                    .boxed()
                },
                HeaderValue::from_static("abc"),
            )
            .unwrap();

        lifecycle.start(&mut head).await.unwrap();

        assert_eq!(head.status(), StatusCode::ACCEPTED);
        assert_eq!(head.headers().get("x-trace").unwrap(), "abc");
    }

    #[tokio::test]
    async fn failing_callback_stops_the_chain() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();

        record(&mut lifecycle, &log, true, "A");
        lifecycle
            .on_starting(|_, ()| async { Err::<(), BoxError>("boom".into()) }.boxed(), ())
            .unwrap();

        let err = lifecycle.start(&mut head).await.unwrap_err();

        assert!(matches!(err, FeatureError::Callback { .. }));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(lifecycle.state(), ResponseState::Started);
    }

    #[tokio::test]
    async fn skip_start_drops_the_starting_chain() {
        let log = Log::default();
        let mut lifecycle = Lifecycle::new();
        let mut head = ResponseHead::default();
        record(&mut lifecycle, &log, true, "starting");
        record(&mut lifecycle, &log, false, "completed");

        lifecycle.skip_start();
        lifecycle.complete(&mut head).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["completed"]);
    }
}
