//! Transport capability consumed by the server lifecycle.
//!
//! The lifecycle never touches sockets directly. It asks a [`Transport`] to:
//! - bind a listening resource to an address
//! - mark it ready to accept
//! - accept exactly one connection, returned as independent read and write halves
//!
//! Closing is expressed by ownership: dropping the listener releases it, and
//! dropping both halves releases the connection.
//!
//! Implementations:
//! - `tcp`: `socket2` for bind/listen, `tokio` for accept and I/O
//! - `mock`: scripted transport for lifecycle tests (test builds only)

pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;

pub use tcp::TcpTransport;

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

/// A connection handed over by [`Transport::accept`].
///
/// The two halves may be driven concurrently from different tasks: one reader
/// and one writer, never two of either.
#[derive(Debug)]
pub struct Accepted<R, W> {
    pub reader: R,
    pub writer: W,
    pub peer: SocketAddr,
}

/// Listen, accept and split connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resource bound to an address but not yet accepting.
    type Bound: Send;
    /// Resource ready to accept connections.
    type Listener: Send + Sync;
    /// Read half of an accepted connection.
    type Reader: AsyncRead + Unpin + Send + 'static;
    /// Write half of an accepted connection.
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Acquire a resource bound to `addr`.
    fn bind(&self, addr: SocketAddr) -> io::Result<Self::Bound>;

    /// Mark a bound resource ready to accept, with the given backlog.
    fn listen(&self, bound: Self::Bound, backlog: i32) -> io::Result<Self::Listener>;

    /// Address the listener actually ended up on (resolves port 0).
    fn local_addr(&self, listener: &Self::Listener) -> io::Result<SocketAddr>;

    /// Wait for one peer to connect.
    async fn accept(
        &self,
        listener: &Self::Listener,
    ) -> io::Result<Accepted<Self::Reader, Self::Writer>>;
}
