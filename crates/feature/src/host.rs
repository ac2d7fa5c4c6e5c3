//! Runs a request pipeline against transport exchanges.

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use micro_exchange::exchange::TransportExchange;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::features::ConnectionFeature;
use crate::{BoxError, FeatureContext, FeatureError, FeatureOptions};

/// The request pipeline entry point.
#[async_trait]
pub trait Application: Send + Sync {
    async fn process_request(&self, ctx: &mut FeatureContext) -> Result<(), BoxError>;
}

/// An [`Application`] backed by a function, see [`application_fn`].
pub struct ApplicationFn<F> {
    f: F,
}

impl<F> fmt::Debug for ApplicationFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationFn").finish_non_exhaustive()
    }
}

/// Wraps `f` into an [`Application`].
///
/// ```no_run
/// use futures::FutureExt;
/// use micro_feature::application_fn;
/// use micro_feature::features::ResponseFeature;
///
/// let app = application_fn(|ctx| {
///     async move {
///         ctx.response_body().write(b"hello").await?;
///         Ok(())
///     }
///     .boxed()
/// });
/// ```
pub fn application_fn<F>(f: F) -> ApplicationFn<F>
where
    F: for<'a> Fn(&'a mut FeatureContext) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    ApplicationFn { f }
}

#[async_trait]
impl<F> Application for ApplicationFn<F>
where
    F: for<'a> Fn(&'a mut FeatureContext) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn process_request(&self, ctx: &mut FeatureContext) -> Result<(), BoxError> {
        (self.f)(ctx).await
    }
}

pub struct HostBuilder {
    application: Option<Box<dyn Application>>,
    options: FeatureOptions,
}

impl HostBuilder {
    fn new() -> Self {
        Self { application: None, options: FeatureOptions::default() }
    }

    pub fn application(mut self, application: impl Application + 'static) -> Self {
        self.application = Some(Box::new(application));
        self
    }

    pub fn options(mut self, options: FeatureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Host, HostBuildError> {
        let application = self.application.ok_or(HostBuildError::MissingApplication)?;
        Ok(Host { application, options: self.options })
    }
}

impl fmt::Debug for HostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuilder")
            .field("application", &self.application.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum HostBuildError {
    #[error("application must be set")]
    MissingApplication,
}

/// Drives one [`FeatureContext`] per exchange through the application.
pub struct Host {
    application: Box<dyn Application>,
    options: FeatureOptions,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").field("options", &self.options).finish_non_exhaustive()
    }
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Processes one exchange to the end.
    ///
    /// A successful pipeline run completes the response. A failed one is answered
    /// with an empty `500` if nothing has been sent yet, or by aborting the
    /// connection otherwise. The exchange is closed or aborted exactly once.
    pub async fn handle<E: TransportExchange + 'static>(&self, exchange: E) {
        let mut ctx = FeatureContext::new(exchange, self.options.clone());

        match self.application.process_request(&mut ctx).await {
            Ok(()) => match ctx.complete().await {
                Ok(()) => debug!(connection = ctx.connection_id(), "response completed"),
                Err(FeatureError::Cancelled) => debug!(connection = ctx.connection_id(), "response cancelled"),
                Err(e) => error!(connection = ctx.connection_id(), cause = %e, "failed to complete response"),
            },
            Err(e) => {
                if e.downcast_ref::<FeatureError>().is_some_and(FeatureError::is_disconnect) {
                    info!(connection = ctx.connection_id(), cause = %e, "client disconnected during request processing");
                } else {
                    error!(connection = ctx.connection_id(), cause = %e, "request pipeline failed");
                }
                ctx.fail().await;
            }
        }
    }
}
