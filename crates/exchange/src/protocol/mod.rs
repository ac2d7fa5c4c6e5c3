//! Request and response head types shared by every transport exchange.
//!
//! # Components
//!
//! - [`RequestHeader`]: the parsed request line and header block of one exchange
//! - [`ResponseHead`]: the mutable status, reason phrase and header block of the
//!   response, serialized once when the first body byte is written
//! - [`PayloadSize`] and [`PayloadItem`]: body framing information consumed by the
//!   response codec
//! - [`TransportError`]: the typed I/O failure surfaced by an exchange

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::TransportError;
