use std::io;
use std::io::ErrorKind;
use thiserror::Error;

/// An I/O failure observed at the transport boundary.
///
/// A peer that goes away mid-response is reported as [`TransportError::Disconnected`]
/// so callers can tell client behavior apart from genuine faults without digging
/// into the wrapped `io::Error`.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("peer disconnected: {source}")]
    Disconnected { source: io::Error },

    #[error("the exchange has already been closed")]
    Closed,

    #[error("invalid response head: {reason}")]
    InvalidHead { reason: String },

    #[error("io error: {source}")]
    Io { source: io::Error },
}

impl TransportError {
    pub fn invalid_head<S: ToString>(str: S) -> Self {
        Self::InvalidHead { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::from(e.into())
    }

    /// Returns true if the peer reset or abandoned the connection.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, TransportError::Disconnected { .. })
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        match source.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
                Self::Disconnected { source }
            }
            _ => Self::Io { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_disconnect() {
        for kind in [ErrorKind::ConnectionReset, ErrorKind::ConnectionAborted, ErrorKind::BrokenPipe] {
            let error = TransportError::from(io::Error::from(kind));
            assert!(error.is_disconnect(), "{kind:?} should be a disconnect");
        }
    }

    #[test]
    fn other_io_is_not_disconnect() {
        let error = TransportError::io(io::Error::from(ErrorKind::PermissionDenied));
        assert!(!error.is_disconnect());
        assert!(matches!(error, TransportError::Io { .. }));
    }
}
