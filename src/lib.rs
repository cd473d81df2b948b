//! queue-server: a single-connection TCP server built around two queues.
//!
//! Socket I/O is decoupled from message processing:
//! - the receive loop turns every received chunk into a [`Message`] on the
//!   inbound queue
//! - the transmit loop sends whatever the application pushes onto the
//!   outbound queue
//!
//! [`Server`] accepts exactly one peer and runs both loops as tokio tasks;
//! the [`Session`] it returns owns the connection and joins the loops on
//! shutdown.

pub mod config;
pub mod connection;
pub mod echo;
pub mod error;
pub mod message;
pub mod queue;
pub mod receive;
pub mod server;
pub mod transmit;
pub mod transport;

pub use connection::{ConnState, ConnectionHandle};
pub use error::{ServerError, TaskError, TransportError};
pub use message::Message;
pub use queue::ConcurrentQueue;
pub use server::{LifecycleState, Listening, Server, ServerSettings, Session, ShutdownReport};
pub use transmit::{TransmitSettings, WaitStrategy};
pub use transport::{Accepted, TcpTransport, Transport};
