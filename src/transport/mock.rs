//! Scripted transport for exercising the lifecycle without sockets.
//!
//! Each step can be told to fail, and the accepted connection is a pair of
//! `tokio_test::io::Mock` streams whose reads and writes are scripted by the test.

use super::{Accepted, Transport};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::io::Mock;

/// Keeps the open-resource count accurate for as long as it is alive.
#[derive(Debug)]
pub(crate) struct ResourceGuard(Arc<AtomicUsize>);

impl ResourceGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        ResourceGuard(Arc::clone(counter))
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub(crate) struct MockListener {
    addr: SocketAddr,
    _guard: ResourceGuard,
}

type ScriptedAccept = io::Result<(Mock, Mock)>;

pub(crate) struct MockTransport {
    bind_error: Option<io::ErrorKind>,
    listen_error: Option<io::ErrorKind>,
    accept: Mutex<Option<ScriptedAccept>>,
    peer: SocketAddr,
    open_listeners: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Transport whose single accept yields `reader` and `writer`.
    pub(crate) fn new(reader: Mock, writer: Mock) -> Self {
        Self::scripted(Ok((reader, writer)))
    }

    pub(crate) fn failing_bind(kind: io::ErrorKind) -> Self {
        let mut transport = Self::scripted(Err(io::ErrorKind::Other.into()));
        transport.bind_error = Some(kind);
        transport
    }

    pub(crate) fn failing_listen(kind: io::ErrorKind) -> Self {
        let mut transport = Self::scripted(Err(io::ErrorKind::Other.into()));
        transport.listen_error = Some(kind);
        transport
    }

    pub(crate) fn failing_accept(kind: io::ErrorKind) -> Self {
        Self::scripted(Err(kind.into()))
    }

    /// Count of bound or listening resources not yet released.
    pub(crate) fn open_listeners(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.open_listeners)
    }

    fn scripted(accept: ScriptedAccept) -> Self {
        Self {
            bind_error: None,
            listen_error: None,
            accept: Mutex::new(Some(accept)),
            peer: "10.0.0.2:50000".parse().unwrap(),
            open_listeners: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Bound = MockListener;
    type Listener = MockListener;
    type Reader = Mock;
    type Writer = Mock;

    fn bind(&self, addr: SocketAddr) -> io::Result<MockListener> {
        if let Some(kind) = self.bind_error {
            return Err(kind.into());
        }
        Ok(MockListener {
            addr,
            _guard: ResourceGuard::acquire(&self.open_listeners),
        })
    }

    fn listen(&self, bound: MockListener, _backlog: i32) -> io::Result<MockListener> {
        if let Some(kind) = self.listen_error {
            return Err(kind.into());
        }
        Ok(bound)
    }

    fn local_addr(&self, listener: &MockListener) -> io::Result<SocketAddr> {
        Ok(listener.addr)
    }

    async fn accept(&self, _listener: &MockListener) -> io::Result<Accepted<Mock, Mock>> {
        let scripted = self
            .accept
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(io::ErrorKind::NotConnected.into()));
        let (reader, writer) = scripted?;
        Ok(Accepted {
            reader,
            writer,
            peer: self.peer,
        })
    }
}
