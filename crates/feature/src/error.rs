use std::error::Error;
use std::io;

use micro_exchange::protocol::TransportError;
use thiserror::Error;

/// The error type a request pipeline hands back to the host.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum FeatureError {
    /// A lifecycle callback was registered after its phase already ran.
    #[error("cannot register callback: {reason}")]
    Registration { reason: String },

    /// The operation is not available on this exchange, e.g. mutating a field
    /// fixed by the transport or writing to a read-only source.
    #[error("unsupported operation: {reason}")]
    Unsupported { reason: String },

    #[error("the response has already started")]
    AlreadyStarted,

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("range at offset {offset} with count {count:?} is outside of a {length} byte file")]
    InvalidRange { offset: u64, count: Option<u64>, length: u64 },

    #[error("lifecycle callback failed: {source}")]
    Callback { source: BoxError },

    #[error("the operation was cancelled")]
    Cancelled,

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },
}

impl FeatureError {
    pub fn registration<S: ToString>(str: S) -> Self {
        Self::Registration { reason: str.to_string() }
    }

    pub fn unsupported<S: ToString>(str: S) -> Self {
        Self::Unsupported { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn callback(source: BoxError) -> Self {
        Self::Callback { source }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Transport { source: TransportError::from(e.into()) }
    }

    /// Returns true if this error reports a peer that went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, FeatureError::Transport { source } if source.is_disconnect())
    }
}
