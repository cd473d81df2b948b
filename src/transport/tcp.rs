//! TCP transport.
//!
//! Bind and listen are separate `socket2` calls so each can fail with its own
//! error; the listening socket is then handed to tokio for accepting.

use super::{Accepted, Transport};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tracing::debug;

/// Plain TCP over the operating system's sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    type Bound = Socket;
    type Listener = TcpListener;
    type Reader = OwnedReadHalf;
    type Writer = OwnedWriteHalf;

    fn bind(&self, addr: SocketAddr) -> io::Result<Socket> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        Ok(socket)
    }

    fn listen(&self, bound: Socket, backlog: i32) -> io::Result<TcpListener> {
        bound.listen(backlog)?;
        TcpListener::from_std(bound.into())
    }

    fn local_addr(&self, listener: &TcpListener) -> io::Result<SocketAddr> {
        listener.local_addr()
    }

    async fn accept(
        &self,
        listener: &TcpListener,
    ) -> io::Result<Accepted<OwnedReadHalf, OwnedWriteHalf>> {
        let (stream, peer) = listener.accept().await?;
        stream.set_nodelay(true)?;
        debug!(peer = %peer, "Accepted TCP connection");

        let (reader, writer) = stream.into_split();
        Ok(Accepted {
            reader,
            writer,
            peer,
        })
    }
}
