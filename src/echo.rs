//! Echo application.
//!
//! The default consumer run by the binary: every inbound message is pushed
//! back onto the outbound queue unchanged. No storage, no parsing; useful for
//! checking that bytes move through both loops intact.

use crate::connection::ConnectionHandle;
use crate::message::Message;
use crate::queue::ConcurrentQueue;
use std::sync::Arc;
use tracing::{debug, trace};

/// Echo inbound messages until the connection closes.
///
/// Returns the number of messages echoed. This must be the only task waiting
/// on pushes to `inbound`.
pub async fn echo_loop(
    inbound: Arc<ConcurrentQueue<Message>>,
    outbound: Arc<ConcurrentQueue<Message>>,
    connection: Arc<ConnectionHandle>,
) -> u64 {
    let mut echoed = 0;

    loop {
        echoed += echo_pending(&inbound, &outbound);

        tokio::select! {
            _ = connection.closed() => break,
            _ = inbound.wait_for_push() => {}
        }
    }

    // Pushes that raced the close are still echoed.
    echoed += echo_pending(&inbound, &outbound);

    debug!(echoed, "Echo loop stopped");
    echoed
}

fn echo_pending(inbound: &ConcurrentQueue<Message>, outbound: &ConcurrentQueue<Message>) -> u64 {
    let mut echoed = 0;
    while let Some(message) = inbound.try_pop() {
        trace!(len = message.len(), "Echoing message");
        outbound.push(message);
        echoed += 1;
    }
    echoed
}
