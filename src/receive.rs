//! Receive loop: connection read half → inbound queue.
//!
//! Every successful read becomes exactly one [`Message`]; chunk boundaries are
//! whatever the transport delivered and are never reassembled.

use crate::connection::ConnectionHandle;
use crate::error::TransportError;
use crate::message::Message;
use crate::queue::ConcurrentQueue;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

/// Default size of a single read, matching the largest chunk one message holds.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Counters reported when the receive loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub messages: u64,
    pub bytes: u64,
}

/// Read chunks until the peer closes, a read fails, or the connection is
/// closed by someone else.
///
/// An orderly close (zero-length read) and an external close both end the
/// loop with `Ok`. A read failure closes the connection and ends it with
/// [`TransportError::Receive`].
pub async fn receive_loop<R>(
    mut reader: R,
    connection: Arc<ConnectionHandle>,
    inbound: Arc<ConcurrentQueue<Message>>,
    buffer_size: usize,
) -> Result<ReceiveStats, TransportError>
where
    R: AsyncRead + Unpin,
{
    let peer = connection.peer_addr();
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut stats = ReceiveStats::default();

    loop {
        let read = tokio::select! {
            biased;
            _ = connection.closed() => {
                debug!(peer = %peer, messages = stats.messages, "Receive loop stopped by close");
                return Ok(stats);
            }
            read = reader.read(&mut buffer) => read,
        };

        match read {
            Ok(0) => {
                debug!(peer = %peer, messages = stats.messages, "Peer closed connection");
                connection.close();
                return Ok(stats);
            }
            Ok(n) => {
                trace!(peer = %peer, len = n, "Received chunk");
                inbound.push(Message::copy_from_slice(&buffer[..n]));
                stats.messages += 1;
                stats.bytes += n as u64;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Receive failed");
                connection.close();
                return Err(TransportError::Receive(e));
            }
        }
    }
}
