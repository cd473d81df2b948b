//! Server lifecycle for a single connection.
//!
//! [`Server`] binds, listens and accepts exactly one peer, then spawns the
//! receive and transmit loops against that connection. The returned
//! [`Session`] owns the listener, the connection handle and both task
//! handles, and tears everything down in [`Session::shutdown`].
//!
//! ```text
//! Created → Bound → Listening → Accepting → Serving → ShuttingDown → Closed
//! ```
//!
//! Any startup failure releases what was acquired so far and ends in `Closed`
//! without spawning anything.

use crate::connection::ConnectionHandle;
use crate::error::{ServerError, TaskError, TransportError};
use crate::message::Message;
use crate::queue::ConcurrentQueue;
use crate::receive::{receive_loop, ReceiveStats, DEFAULT_BUFFER_SIZE};
use crate::transmit::{transmit_loop, TransmitSettings, TransmitStats};
use crate::transport::{Accepted, Transport};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 1145;

/// Default backlog handed to listen.
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Default time shutdown waits for the loops before aborting them.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle position of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Bound,
    Listening,
    Accepting,
    Serving,
    ShuttingDown,
    Closed,
}

/// Runtime settings for one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub backlog: i32,
    /// Largest chunk a single read can produce.
    pub buffer_size: usize,
    pub transmit: TransmitSettings,
    pub shutdown_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            backlog: DEFAULT_BACKLOG,
            buffer_size: DEFAULT_BUFFER_SIZE,
            transmit: TransmitSettings::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// A server that has not yet accepted its connection.
pub struct Server<T: Transport> {
    transport: T,
    settings: ServerSettings,
    inbound: Arc<ConcurrentQueue<Message>>,
    outbound: Arc<ConcurrentQueue<Message>>,
    state: LifecycleState,
}

impl<T: Transport> Server<T> {
    /// Create a new server instance with empty queues.
    pub fn new(transport: T, settings: ServerSettings) -> Self {
        Server {
            transport,
            settings,
            inbound: Arc::new(ConcurrentQueue::new()),
            outbound: Arc::new(ConcurrentQueue::new()),
            state: LifecycleState::Created,
        }
    }

    /// Queue the receive loop fills; the application pops from it.
    pub fn inbound(&self) -> Arc<ConcurrentQueue<Message>> {
        Arc::clone(&self.inbound)
    }

    /// Queue the application pushes replies onto; the transmit loop drains it.
    pub fn outbound(&self) -> Arc<ConcurrentQueue<Message>> {
        Arc::clone(&self.outbound)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Bind, listen, wait for one peer and start serving it.
    pub async fn start(self) -> Result<Session<T>, ServerError> {
        self.listen()?.accept().await
    }

    /// Bind the configured address and start listening, without accepting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen(mut self) -> Result<Listening<T>, ServerError> {
        let addr = self.settings.listen;

        let bound = match self.transport.bind(addr) {
            Ok(bound) => bound,
            Err(source) => {
                self.enter(LifecycleState::Closed);
                return Err(ServerError::Bind { addr, source });
            }
        };
        self.enter(LifecycleState::Bound);

        // A failed listen consumes and drops the bound resource.
        let listener = match self.transport.listen(bound, self.settings.backlog) {
            Ok(listener) => listener,
            Err(source) => {
                self.enter(LifecycleState::Closed);
                return Err(ServerError::Listen { addr, source });
            }
        };
        self.enter(LifecycleState::Listening);

        let local_addr = self.transport.local_addr(&listener).unwrap_or(addr);
        info!(address = %local_addr, backlog = self.settings.backlog, "Listening");

        Ok(Listening {
            server: self,
            listener,
            local_addr,
        })
    }

    fn enter(&mut self, next: LifecycleState) {
        debug!(from = ?self.state, to = ?next, "Lifecycle transition");
        self.state = next;
    }
}

/// A server whose listener is ready but has not accepted its peer yet.
pub struct Listening<T: Transport> {
    server: Server<T>,
    listener: T::Listener,
    local_addr: SocketAddr,
}

impl<T: Transport> Listening<T> {
    pub fn state(&self) -> LifecycleState {
        self.server.state
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn inbound(&self) -> Arc<ConcurrentQueue<Message>> {
        self.server.inbound()
    }

    pub fn outbound(&self) -> Arc<ConcurrentQueue<Message>> {
        self.server.outbound()
    }

    /// Wait for exactly one peer, then spawn the receive and transmit loops.
    ///
    /// On failure the listener is released and nothing is spawned.
    pub async fn accept(self) -> Result<Session<T>, ServerError> {
        let Listening {
            mut server,
            listener,
            local_addr,
        } = self;

        server.enter(LifecycleState::Accepting);
        info!(address = %local_addr, "Waiting for client to connect");

        let accepted = server.transport.accept(&listener).await;
        let Accepted {
            reader,
            writer,
            peer,
        } = match accepted {
            Ok(accepted) => accepted,
            Err(source) => {
                drop(listener);
                server.enter(LifecycleState::Closed);
                return Err(ServerError::Accept {
                    addr: local_addr,
                    source,
                });
            }
        };
        info!(peer = %peer, address = %local_addr, "Client connected");

        let connection = Arc::new(ConnectionHandle::new(peer));

        let receive = tokio::spawn(receive_loop(
            reader,
            Arc::clone(&connection),
            Arc::clone(&server.inbound),
            server.settings.buffer_size,
        ));
        let transmit = tokio::spawn(transmit_loop(
            writer,
            Arc::clone(&connection),
            Arc::clone(&server.outbound),
            server.settings.transmit,
        ));
        server.enter(LifecycleState::Serving);

        Ok(Session {
            listener: Some(listener),
            local_addr,
            connection,
            inbound: server.inbound,
            outbound: server.outbound,
            receive: Some(receive),
            transmit: Some(transmit),
            shutdown_timeout: server.settings.shutdown_timeout,
            state: LifecycleState::Serving,
        })
    }
}

/// Outcome of both loops after shutdown.
#[derive(Debug)]
pub struct ShutdownReport {
    pub receive: Result<ReceiveStats, TaskError>,
    pub transmit: Result<TransmitStats, TaskError>,
}

impl ShutdownReport {
    /// Check if both loops ended without error.
    pub fn is_clean(&self) -> bool {
        self.receive.is_ok() && self.transmit.is_ok()
    }
}

/// A connection being served.
///
/// Dropping a session without calling [`shutdown`](Session::shutdown) still
/// closes the listener and the connection, so the loops wind down on their
/// own; it just does not wait for them.
pub struct Session<T: Transport> {
    listener: Option<T::Listener>,
    local_addr: SocketAddr,
    connection: Arc<ConnectionHandle>,
    inbound: Arc<ConcurrentQueue<Message>>,
    outbound: Arc<ConcurrentQueue<Message>>,
    receive: Option<JoinHandle<Result<ReceiveStats, TransportError>>>,
    transmit: Option<JoinHandle<Result<TransmitStats, TransportError>>>,
    shutdown_timeout: Duration,
    state: LifecycleState,
}

impl<T: Transport> Session<T> {
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.connection.peer_addr()
    }

    /// Liveness handle of the served connection.
    pub fn connection(&self) -> &Arc<ConnectionHandle> {
        &self.connection
    }

    pub fn inbound(&self) -> Arc<ConcurrentQueue<Message>> {
        Arc::clone(&self.inbound)
    }

    pub fn outbound(&self) -> Arc<ConcurrentQueue<Message>> {
        Arc::clone(&self.outbound)
    }

    /// Wait until the connection is closed by the peer, a loop or shutdown.
    pub async fn closed(&self) {
        self.connection.closed().await;
    }

    /// Release the listening resource.
    ///
    /// Returns `false` if it was already released.
    pub fn close_listener(&mut self) -> bool {
        match self.listener.take() {
            Some(listener) => {
                drop(listener);
                info!(address = %self.local_addr, "Listener closed");
                true
            }
            None => false,
        }
    }

    /// Stop serving: close the listener and the connection, then wait for
    /// both loops to finish.
    ///
    /// Each loop gets until the shutdown timeout to stop; one that does not is
    /// aborted and reported as [`TaskError::Aborted`].
    pub async fn shutdown(mut self) -> ShutdownReport {
        debug!(from = ?self.state, to = ?LifecycleState::ShuttingDown, "Lifecycle transition");
        self.state = LifecycleState::ShuttingDown;

        self.close_listener();
        self.connection.close();

        let deadline = Instant::now() + self.shutdown_timeout;
        let receive = join_loop("receive", self.receive.take(), deadline).await;
        let transmit = join_loop("transmit", self.transmit.take(), deadline).await;

        debug!(from = ?self.state, to = ?LifecycleState::Closed, "Lifecycle transition");
        self.state = LifecycleState::Closed;

        let report = ShutdownReport { receive, transmit };
        info!(
            peer = %self.connection.peer_addr(),
            clean = report.is_clean(),
            "Server shut down"
        );
        report
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.listener.take();
        self.connection.close();
    }
}

async fn join_loop<S>(
    name: &'static str,
    handle: Option<JoinHandle<Result<S, TransportError>>>,
    deadline: Instant,
) -> Result<S, TaskError> {
    let Some(mut handle) = handle else {
        return Err(TaskError::Aborted(name));
    };

    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(result)) => result.map_err(TaskError::from),
        Ok(Err(e)) if e.is_panic() => {
            warn!(task = name, error = %e, "Loop task panicked");
            Err(TaskError::Panicked(name))
        }
        Ok(Err(e)) => {
            warn!(task = name, error = %e, "Loop task was cancelled");
            Err(TaskError::Cancelled(name))
        }
        Err(_) => {
            warn!(task = name, "Loop did not stop in time, aborting");
            handle.abort();
            let _ = handle.await;
            Err(TaskError::Aborted(name))
        }
    }
}
