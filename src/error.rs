//! Error types for server startup and the connection loops.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Startup failures. Each one aborts startup before any loop is spawned.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("listen failed on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("accept failed on {addr}: {source}")]
    Accept {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// I/O failure on the accepted connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
}

/// Outcome of joining a connection loop that did not finish cleanly.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{0} loop panicked")]
    Panicked(&'static str),
    #[error("{0} loop was cancelled")]
    Cancelled(&'static str),
    #[error("{0} loop did not stop within the shutdown timeout and was aborted")]
    Aborted(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_server_error_keeps_source() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:1145".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "bind failed on 127.0.0.1:1145: in use");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_task_error_from_transport() {
        let err: TaskError =
            TransportError::Send(io::Error::new(io::ErrorKind::BrokenPipe, "pipe")).into();
        assert!(matches!(err, TaskError::Transport(TransportError::Send(_))));
        assert_eq!(err.to_string(), "send failed: pipe");
    }
}
