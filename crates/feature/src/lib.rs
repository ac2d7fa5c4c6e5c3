//! Adapts a raw HTTP transport exchange to a capability oriented request pipeline
//!
//! A socket level listener hands over one parsed request and one unbuffered
//! response per connection turn (a [`TransportExchange`]). This crate wraps it in
//! a [`FeatureContext`] that the request pipeline works through:
//!
//! - the response head is committed only when the first body byte is about to
//!   be sent, exactly once
//! - "starting" and "completed" callback chains run in reverse registration order
//! - the body is buffered in memory by default and sent with a `Content-Length`,
//!   or written straight through once buffering is disabled
//! - whole or partial files are sent through a length bounded source
//! - multi-valued headers are exposed through a name → values [`HeaderView`]
//!
//! # Example
//!
//! ```no_run
//! use futures::FutureExt;
//! use http::{Request, StatusCode, Version};
//! use micro_exchange::exchange::{ConnectionInfo, HttpExchange};
//! use micro_feature::features::ResponseFeature;
//! use micro_feature::{Host, application_fn};
//!
//! # async fn run() {
//! let host = Host::builder()
//!     .application(application_fn(|ctx| {
//!         async move {
//!             ctx.set_status(StatusCode::OK);
//!             ctx.response_headers().set("content-type", ["text/plain"])?;
//!             ctx.response_body().write(b"Hello World!").await?;
//!             Ok(())
//!         }
//!         .boxed()
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let (_client, server) = tokio::io::duplex(64 * 1024);
//! let (reader, writer) = tokio::io::split(server);
//! let request = Request::builder().uri("/").version(Version::HTTP_11).body(()).unwrap();
//! let connection = ConnectionInfo::new("1", "127.0.0.1:50000".parse().unwrap(), "127.0.0.1:8080".parse().unwrap());
//!
//! host.handle(HttpExchange::new(connection, request.into(), reader, writer)).await;
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`features`]: the narrow capability traits seen by the pipeline
//! - [`FeatureContext`]: implements them for one exchange and owns the lifecycle
//! - [`ResponseStream`]: the body sink that starts the response on first use
//! - [`Host`]: runs an [`Application`] against exchanges and applies the error policy
//!
//! [`TransportExchange`]: micro_exchange::exchange::TransportExchange

mod bounded_source;
mod context;
mod error;
pub mod features;
mod header_view;
mod host;
mod lifecycle;
mod options;
mod response_stream;
#[cfg(test)]
mod testing;
mod utils;

pub use bounded_source::BoundedSource;
pub use context::FeatureContext;
pub use error::{BoxError, FeatureError};
pub use header_view::{HeaderView, Iter as HeaderIter};
pub use host::{Application, ApplicationFn, Host, HostBuildError, HostBuilder, application_fn};
pub use lifecycle::{CallbackFuture, Lifecycle, ResponseState};
pub use options::{DEFAULT_RESPONSE_BUFFER_CAPACITY, DEFAULT_SEND_FILE_CHUNK_SIZE, FeatureOptions, FeatureOptionsBuilder};
pub use response_stream::ResponseStream;

pub(crate) use utils::ensure;
