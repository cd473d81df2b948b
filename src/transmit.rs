//! Transmit loop: outbound queue → connection write half.
//!
//! When the outbound queue is empty the loop waits before checking again. Two
//! wait strategies exist:
//! - `Poll`: sleep a fixed interval, then retry
//! - `Notify`: wake on the next push, bounded by the same interval
//!
//! Either way the wait also races the connection's close signal, so the loop
//! never keeps polling a connection that is no longer usable. Writes are not
//! raced: once a message leaves the queue it is either sent or reported as a
//! send failure.

use crate::connection::ConnectionHandle;
use crate::error::TransportError;
use crate::message::Message;
use crate::queue::ConcurrentQueue;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

/// Default delay between empty-queue checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How the transmit loop waits while the outbound queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    /// Sleep the poll interval between checks.
    #[default]
    Poll,
    /// Wake as soon as something is pushed.
    Notify,
}

/// Transmit loop tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitSettings {
    pub poll_interval: Duration,
    pub strategy: WaitStrategy,
}

impl Default for TransmitSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            strategy: WaitStrategy::Poll,
        }
    }
}

/// Counters reported when the transmit loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmitStats {
    pub messages: u64,
    pub bytes: u64,
}

/// Send outbound messages in push order until the connection is closed or a
/// write fails.
///
/// A write failure closes the connection and ends the loop with
/// [`TransportError::Send`]. Otherwise the loop ends with `Ok` once the
/// connection is closed, after half-closing the write side.
pub async fn transmit_loop<W>(
    mut writer: W,
    connection: Arc<ConnectionHandle>,
    outbound: Arc<ConcurrentQueue<Message>>,
    settings: TransmitSettings,
) -> Result<TransmitStats, TransportError>
where
    W: AsyncWrite + Unpin,
{
    let peer = connection.peer_addr();
    let mut stats = TransmitStats::default();

    while !connection.is_closed() {
        let Some(message) = outbound.try_pop() else {
            tokio::select! {
                _ = connection.closed() => {}
                _ = wait_for_work(&outbound, settings) => {}
            }
            continue;
        };

        // A popped message is written out in full even if the connection is
        // closed meanwhile; shutdown's deadline bounds a write that never ends.
        if let Err(e) = writer.write_all(&message).await {
            warn!(peer = %peer, error = %e, "Send failed");
            connection.close();
            return Err(TransportError::Send(e));
        }

        trace!(peer = %peer, len = message.len(), "Sent message");
        stats.messages += 1;
        stats.bytes += message.len() as u64;
    }

    if let Err(e) = writer.shutdown().await {
        debug!(peer = %peer, error = %e, "Write side shutdown failed");
    }
    debug!(peer = %peer, messages = stats.messages, "Transmit loop stopped");
    Ok(stats)
}

async fn wait_for_work(outbound: &ConcurrentQueue<Message>, settings: TransmitSettings) {
    match settings.strategy {
        WaitStrategy::Poll => tokio::time::sleep(settings.poll_interval).await,
        WaitStrategy::Notify => {
            let _ = tokio::time::timeout(settings.poll_interval, outbound.wait_for_push()).await;
        }
    }
}
