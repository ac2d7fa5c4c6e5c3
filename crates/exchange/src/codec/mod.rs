//! Response serialization for [`HttpExchange`](crate::exchange::HttpExchange).
//!
//! - [`HeadEncoder`]: writes the status line and header block, adding the framing
//!   header that matches the chosen [`PayloadSize`](crate::protocol::PayloadSize)
//! - [`PayloadEncoder`]: frames body bytes as fixed length, chunked or
//!   close-delimited payload

mod body;
mod head_encoder;

pub use body::PayloadEncoder;
pub use head_encoder::HeadEncoder;
