//! queue-server: accept one TCP client and echo everything it sends.
//!
//! The echo application stands in for real message processing: it drains the
//! inbound queue onto the outbound queue. Configuration via CLI arguments or
//! TOML file.

use queue_server::config::Config;
use queue_server::echo::echo_loop;
use queue_server::{Server, TcpTransport};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        backlog = config.backlog,
        buffer_size = config.buffer_size,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        strategy = ?config.strategy,
        "Starting queue-server"
    );

    let server = Server::new(TcpTransport, config.server_settings());
    let inbound = server.inbound();
    let outbound = server.outbound();

    let session = tokio::select! {
        session = server.start() => session?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested before a client connected");
            return Ok(());
        }
    };

    let echo = tokio::spawn(echo_loop(
        inbound,
        outbound,
        Arc::clone(session.connection()),
    ));

    tokio::select! {
        _ = session.closed() => info!("Connection closed"),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
        }
    }

    let report = session.shutdown().await;
    let echoed = echo.await?;

    match &report.receive {
        Ok(stats) => info!(messages = stats.messages, bytes = stats.bytes, "Receive loop finished"),
        Err(e) => warn!(error = %e, "Receive loop failed"),
    }
    match &report.transmit {
        Ok(stats) => info!(messages = stats.messages, bytes = stats.bytes, "Transmit loop finished"),
        Err(e) => warn!(error = %e, "Transmit loop failed"),
    }
    info!(echoed, "Server stopped");

    Ok(())
}
