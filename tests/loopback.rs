//! End-to-end checks over real loopback TCP.

use queue_server::echo::echo_loop;
use queue_server::{
    LifecycleState, Server, ServerError, ServerSettings, TcpTransport, TransmitSettings,
    WaitStrategy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn loopback_settings(strategy: WaitStrategy) -> ServerSettings {
    ServerSettings {
        listen: "127.0.0.1:0".parse().unwrap(),
        transmit: TransmitSettings {
            poll_interval: Duration::from_millis(10),
            strategy,
        },
        shutdown_timeout: Duration::from_secs(2),
        ..ServerSettings::default()
    }
}

async fn read_exactly(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("reply should arrive")
        .unwrap();
    buf
}

#[tokio::test]
async fn echo_round_trip() {
    for strategy in [WaitStrategy::Poll, WaitStrategy::Notify] {
        let listening = Server::new(TcpTransport, loopback_settings(strategy))
            .listen()
            .unwrap();
        let addr = listening.local_addr();
        let inbound = listening.inbound();
        let outbound = listening.outbound();

        let (session, mut client) =
            tokio::join!(listening.accept(), async { TcpStream::connect(addr).await.unwrap() });
        let session = session.unwrap();
        assert_eq!(session.state(), LifecycleState::Serving);
        assert_eq!(session.peer_addr(), client.local_addr().unwrap());

        let echo = tokio::spawn(echo_loop(inbound, outbound, Arc::clone(session.connection())));

        client.write_all(b"hello").await.unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"hello");
        client.write_all(b"again").await.unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"again");

        let report = tokio::time::timeout(Duration::from_secs(3), session.shutdown())
            .await
            .expect("shutdown must finish");
        assert!(report.is_clean());
        assert_eq!(report.transmit.unwrap().bytes, 10);
        assert_eq!(echo.await.unwrap(), 2);

        // Server half-closed its write side; the client sees end of stream.
        let mut rest = Vec::new();
        let n = tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}

#[tokio::test]
async fn client_disconnect_winds_down_session() {
    let listening = Server::new(TcpTransport, loopback_settings(WaitStrategy::Poll))
        .listen()
        .unwrap();
    let addr = listening.local_addr();
    let inbound = listening.inbound();

    let (session, mut client) =
        tokio::join!(listening.accept(), async { TcpStream::connect(addr).await.unwrap() });
    let session = session.unwrap();

    client.write_all(b"last words").await.unwrap();
    drop(client);

    tokio::time::timeout(Duration::from_secs(2), session.closed())
        .await
        .expect("peer close should close the session's connection");

    let report = session.shutdown().await;
    assert!(report.is_clean());

    let received: Vec<u8> = inbound
        .drain()
        .iter()
        .flat_map(|m| m.to_vec())
        .collect();
    assert_eq!(received, b"last words");
}

#[tokio::test]
async fn shutdown_is_bounded_with_idle_connection() {
    let listening = Server::new(TcpTransport, loopback_settings(WaitStrategy::Poll))
        .listen()
        .unwrap();
    let addr = listening.local_addr();

    let (session, _client) =
        tokio::join!(listening.accept(), async { TcpStream::connect(addr).await.unwrap() });
    let session = session.unwrap();

    // Nothing is ever pushed and the client never sends.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = tokio::time::timeout(Duration::from_secs(1), session.shutdown())
        .await
        .expect("shutdown must not hang on an idle connection");
    assert!(report.is_clean());
}

#[tokio::test]
async fn second_bind_on_same_port_fails() {
    let first = Server::new(TcpTransport, loopback_settings(WaitStrategy::Poll))
        .listen()
        .unwrap();

    let settings = ServerSettings {
        listen: first.local_addr(),
        ..loopback_settings(WaitStrategy::Poll)
    };
    let err = Server::new(TcpTransport, settings).listen().err().unwrap();
    assert!(matches!(
        err,
        ServerError::Bind { .. } | ServerError::Listen { .. }
    ));
}
