//! End-to-end exercise of the session against a loopback mock instrument.

use chroma_scpi::{InstrumentConfig, InstrumentSession, MockInstrument, ScpiError};
use std::net::SocketAddr;
use std::time::Duration;

const GREETING: &[u8] = b"READY\n";
const IDN_REPLY: &[u8] = b"ACME,Model1,SN123,v1.0\n";

fn config_for(addr: SocketAddr) -> InstrumentConfig {
    InstrumentConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        query_delay: Duration::ZERO,
        close_delay: Duration::ZERO,
        connect_timeout: Some(Duration::from_secs(5)),
        read_timeout: Some(Duration::from_secs(5)),
        ..InstrumentConfig::default()
    }
}

#[tokio::test]
async fn test_ten_query_session_end_to_end() {
    let mock = MockInstrument::spawn(GREETING, IDN_REPLY).await.unwrap();
    let config = config_for(mock.addr());

    let mut session = InstrumentSession::connect(&config).await.unwrap();
    assert_eq!(session.greeting().unwrap().as_ref(), GREETING);

    // The same fixed command, ten round-trips, responses in order.
    let mut lines = Vec::new();
    for n in 1..=config.query_count {
        let response = session.query(config.command.as_bytes()).await.unwrap();
        assert_eq!(response.as_ref(), IDN_REPLY);
        lines.push(format!(
            "{} :: {}",
            n,
            String::from_utf8_lossy(&response).trim_end()
        ));
    }

    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "1 :: ACME,Model1,SN123,v1.0");
    assert_eq!(lines[9], "10 :: ACME,Model1,SN123,v1.0");

    session.close().await;
    assert!(!session.is_connected());

    // Every command arrived verbatim, one per round-trip.
    let commands = mock.commands().await;
    assert_eq!(commands.len(), 10);
    assert!(commands.iter().all(|c| c.as_slice() == b"*IDN?".as_slice()));
}

#[tokio::test]
async fn test_connect_failure_leaves_a_dead_session_to_query() {
    // Bind then drop a listener so the port refuses connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = config_for(addr);
    let err = InstrumentSession::connect(&config).await.unwrap_err();
    assert!(matches!(err, ScpiError::Connect { .. }));

    // The caller may still drive the query loop against a dead session; the
    // first query fails without anything crossing the wire.
    let mut session = InstrumentSession::disconnected(&config);
    let err = session.query(config.command.as_bytes()).await.unwrap_err();
    assert!(matches!(err, ScpiError::NotConnected { .. }));

    // Close on a session that never connected is a harmless no-op.
    session.close().await;
    session.close().await;
}

#[tokio::test]
async fn test_dropped_instrument_fails_receive_then_send() {
    let mock = MockInstrument::spawn(GREETING, IDN_REPLY).await.unwrap();
    let mut config = config_for(mock.addr());
    // Leave room between send and receive so the teardown is fully visible
    // to the client before it reads or writes again.
    config.query_delay = Duration::from_millis(50);

    let mut session = InstrumentSession::connect(&config).await.unwrap();
    drop(mock);

    // The first query gets its command out, then finds the connection gone
    // at the receive.
    let err = session.query(config.command.as_bytes()).await.unwrap_err();
    assert!(matches!(
        err,
        ScpiError::Receive { .. } | ScpiError::ConnectionClosed { .. }
    ));

    // With the reset processed, the next query dies at the send.
    let err = session.query(config.command.as_bytes()).await.unwrap_err();
    assert!(matches!(err, ScpiError::Send { .. }));

    session.close().await;
}

#[tokio::test]
async fn test_custom_command_and_count() {
    let mock = MockInstrument::spawn(GREETING, &b"63804\n"[..]).await.unwrap();
    let mut config = config_for(mock.addr());
    config.command = "SYST:VERS?".to_string();
    config.query_count = 3;

    let mut session = InstrumentSession::connect(&config).await.unwrap();
    for _ in 0..config.query_count {
        let response = session.query(config.command.as_bytes()).await.unwrap();
        assert_eq!(response.as_ref(), b"63804\n");
    }
    session.close().await;

    assert_eq!(mock.commands().await.len(), 3);
}
