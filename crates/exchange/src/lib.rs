//! The per-connection HTTP transport exchange
//!
//! This crate defines the boundary between a socket level HTTP listener and the
//! request pipeline adapter in `micro-feature`: one parsed request plus one
//! unbuffered response, per connection turn.
//!
//! # Features
//!
//! - Object safe [`exchange::TransportExchange`] trait
//! - Deferred, exactly-once response head commit
//! - Fixed length, chunked and close-delimited body framing
//! - Typed transport errors that single out peer disconnects
//!
//! # Example
//!
//! ```no_run
//! use http::{Request, Version};
//! use micro_exchange::exchange::{ConnectionInfo, HttpExchange, TransportExchange};
//!
//! # async fn run() -> Result<(), micro_exchange::protocol::TransportError> {
//! let (client, server) = tokio::io::duplex(64 * 1024);
//! let (reader, writer) = tokio::io::split(server);
//!
//! let request = Request::builder().uri("/hello").version(Version::HTTP_11).body(()).unwrap();
//! let connection = ConnectionInfo::new("1", "127.0.0.1:50000".parse().unwrap(), "127.0.0.1:8080".parse().unwrap());
//! let mut exchange = HttpExchange::new(connection, request.into(), reader, writer);
//!
//! exchange.response_mut().set_content_length(12);
//! exchange.write(b"Hello World!").await?;
//! exchange.close().await?;
//! # drop(client);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`exchange`]: the boundary trait and the HTTP/1.x implementation
//! - [`protocol`]: request/response head types and errors
//! - [`codec`]: response head and body serialization
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS, keep-alive policy or request parsing; those belong to the listener

pub mod codec;
pub mod exchange;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
