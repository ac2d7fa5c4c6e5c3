use std::net::SocketAddr;

/// Identity and endpoints of the connection an exchange belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    id: String,
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl ConnectionInfo {
    pub fn new(id: impl Into<String>, remote_addr: SocketAddr, local_addr: SocketAddr) -> Self {
        Self { id: id.into(), remote_addr, local_addr }
    }

    /// The trace identifier the listener assigned to this connection.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
