//! Shared state of the accepted connection.
//!
//! The socket itself is split: the receive loop owns the read half and the
//! transmit loop owns the write half. What both halves (and the session) share
//! is this handle, which records whether the connection is still usable and
//! lets any party close it exactly once.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Both loops may use the connection.
    Open,
    /// Closed by the peer, a loop's error path or shutdown.
    Closed,
}

/// Liveness handle shared by the session and both connection loops.
#[derive(Debug)]
pub struct ConnectionHandle {
    peer: SocketAddr,
    closed: AtomicBool,
    stop: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle for a freshly accepted connection.
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            closed: AtomicBool::new(false),
            stop: CancellationToken::new(),
        }
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Current state.
    pub fn state(&self) -> ConnState {
        if self.is_closed() {
            ConnState::Closed
        } else {
            ConnState::Open
        }
    }

    /// Check if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection closed and wake everything waiting on [`closed`].
    ///
    /// Returns `true` for the call that performed the close and `false` for
    /// every later call.
    ///
    /// [`closed`]: ConnectionHandle::closed
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stop.cancel();
        debug!(peer = %self.peer, "Connection closed");
        true
    }

    /// Wait until the connection is closed.
    pub async fn closed(&self) {
        self.stop.cancelled().await;
    }
}
