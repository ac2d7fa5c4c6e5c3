//! Response body framing.
//!
//! - [`ChunkedEncoder`]: `Transfer-Encoding: chunked` framing (RFC 7230)
//! - [`LengthEncoder`]: `Content-Length` framing that never exceeds the declared length
//! - [`PayloadEncoder`]: picks one of the above, a close-delimited passthrough, or no
//!   body at all, from the [`PayloadSize`](crate::protocol::PayloadSize) decided
//!   when the head was committed

mod chunked_encoder;
mod length_encoder;
mod payload_encoder;

pub use payload_encoder::PayloadEncoder;
