//! Integration tests for the client connection against a scripted server
//!
//! A plain UDP socket on loopback plays the server: it reads the client's
//! frames and answers with hand-written datagrams, so these tests exercise
//! the real socket, the receive task and the event queue together.

use assert_approx_eq::assert_approx_eq;
use client::config::ClientConfig;
use client::events::ClientEvent;
use client::match_state::{MatchOutcome, MatchView};
use client::network::Connection;
use client::search::{ConnectionPhase, MatchSearch};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;

const WAIT: Duration = Duration::from_secs(2);

struct FakeServer {
    socket: UdpSocket,
}

impl FakeServer {
    async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket }
    }

    fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// Next frame that is not a heartbeat.
    async fn recv(&self) -> (String, SocketAddr) {
        loop {
            let (text, from) = self.recv_any().await;
            if !text.starts_with("Ping:") {
                return (text, from);
            }
        }
    }

    async fn recv_any(&self) -> (String, SocketAddr) {
        let mut buf = [0u8; 1024];
        let (len, from) = timeout(WAIT, self.socket.recv_from(&mut buf))
            .await
            .expect("server timed out waiting for a frame")
            .unwrap();
        (String::from_utf8_lossy(&buf[..len]).into_owned(), from)
    }

    async fn send(&self, text: &str, to: SocketAddr) {
        self.socket.send_to(text.as_bytes(), to).await.unwrap();
    }

    /// Nothing but heartbeats arrives within `quiet`.
    async fn expect_silence(&self, quiet: Duration) {
        let mut buf = [0u8; 1024];
        loop {
            match timeout(quiet, self.socket.recv_from(&mut buf)).await {
                Err(_) => return,
                Ok(Ok((len, _))) => {
                    let text = String::from_utf8_lossy(&buf[..len]);
                    assert!(text.starts_with("Ping:"), "unexpected frame {:?}", text);
                }
                Ok(Err(e)) => panic!("server socket error: {}", e),
            }
        }
    }
}

fn test_config(server: SocketAddr) -> ClientConfig {
    ClientConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        receive_timeout: Duration::from_millis(50),
        heartbeat_interval: Duration::from_millis(50),
        shutdown_timeout: Duration::from_millis(500),
        ..ClientConfig::default().with_server(server)
    }
}

async fn next_event(connection: &mut Connection) -> ClientEvent {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        if let Some(event) = connection.next_event() {
            return event;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no event arrived in time"
        );
        sleep(Duration::from_millis(5)).await;
    }
}

/// Runs discovery and the `OK` / `ID` exchange, returning the client's address.
async fn handshake(server: &FakeServer, connection: &mut Connection, id: u8) -> SocketAddr {
    connection.discover().await;
    let (text, client) = server.recv().await;
    assert_eq!(text, "Conexion");

    server.send("OK", client).await;
    server.send(&format!("ID:{}", id), client).await;
    assert_eq!(next_event(connection).await, ClientEvent::Connected(id));
    client
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn handshake_assigns_identity_and_latches_server() {
        let server = FakeServer::bind().await;
        let mut connection = assert_ok!(Connection::open(test_config(server.addr())).await);

        let client = handshake(&server, &mut connection, 1).await;

        let snapshot = connection.session();
        assert_eq!(snapshot.player_id, Some(1));
        assert_eq!(snapshot.server_addr, server.addr());
        assert_eq!(Some(client), connection.local_addr());
        assert!(connection.is_connected());

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn disconnect_repeats_frame_then_resets_session() {
        let server = FakeServer::bind().await;
        let mut connection = assert_ok!(Connection::open(test_config(server.addr())).await);
        handshake(&server, &mut connection, 1).await;

        connection.disconnect().await;

        for _ in 0..3 {
            let (text, _) = server.recv().await;
            assert_eq!(text, "Disconnect:1");
        }
        server.expect_silence(Duration::from_millis(200)).await;

        assert!(!connection.is_open());
        assert_eq!(connection.player_id(), None);
        assert!(!connection.session().handshake_complete);

        // A second disconnect is a no-op.
        connection.disconnect().await;
        server.expect_silence(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn reconnect_opens_a_fresh_endpoint() {
        let server = FakeServer::bind().await;
        let mut connection = assert_ok!(Connection::open(test_config(server.addr())).await);
        handshake(&server, &mut connection, 0).await;

        assert_ok!(connection.reconnect().await);
        assert!(connection.is_open());
        assert_eq!(connection.player_id(), None);

        let client = handshake(&server, &mut connection, 1).await;
        assert_eq!(Some(client), connection.local_addr());
        assert_eq!(connection.player_id(), Some(1));

        connection.disconnect().await;
    }
}

/// HEARTBEAT AND LIVENESS TESTS
mod heartbeat_tests {
    use super::*;

    #[tokio::test]
    async fn ping_starts_after_identity_and_pong_keeps_server_alive() {
        let server = FakeServer::bind().await;
        let config = ClientConfig {
            liveness_timeout: Duration::from_millis(400),
            ..test_config(server.addr())
        };
        let mut connection = assert_ok!(Connection::open(config).await);

        // No identity yet, so no heartbeat.
        server.expect_silence(Duration::from_millis(150)).await;

        let client = handshake(&server, &mut connection, 0).await;
        let (text, _) = server.recv_any().await;
        assert_eq!(text, "Ping:0");

        for _ in 0..6 {
            server.send("Pong", client).await;
            sleep(Duration::from_millis(100)).await;
        }
        assert!(connection.is_server_alive());
        assert_eq!(connection.check_liveness(), None);

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn silent_server_is_reported_lost() {
        let server = FakeServer::bind().await;
        let config = ClientConfig {
            liveness_timeout: Duration::from_millis(200),
            ..test_config(server.addr())
        };
        let mut connection = assert_ok!(Connection::open(config).await);
        handshake(&server, &mut connection, 1).await;

        sleep(Duration::from_millis(300)).await;
        assert!(!connection.is_server_alive());
        assert_eq!(connection.check_liveness(), Some(ClientEvent::ConnectionLost));

        connection.disconnect().await;
    }
}

/// GAMEPLAY TRAFFIC TESTS
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn input_frames_carry_signed_key_codes() {
        let server = FakeServer::bind().await;
        let mut connection = assert_ok!(Connection::open(test_config(server.addr())).await);

        // Without an identity nothing is sent.
        connection.send_input(shared::KEY_W).await;
        server.expect_silence(Duration::from_millis(100)).await;

        handshake(&server, &mut connection, 1).await;

        connection.send_input(shared::KEY_W).await;
        connection.send_input(-shared::KEY_W).await;
        assert_eq!(server.recv().await.0, "Input:1:51");
        assert_eq!(server.recv().await.0, "Input:1:-51");

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn every_allowed_key_reaches_the_server_signed() {
        let server = FakeServer::bind().await;
        let mut connection = assert_ok!(Connection::open(test_config(server.addr())).await);
        handshake(&server, &mut connection, 0).await;

        for code in shared::ALLOWED_KEYS {
            connection.send_input(code).await;
            connection.send_input(-code).await;

            assert_eq!(server.recv().await.0, format!("Input:0:{}", code));
            assert_eq!(server.recv().await.0, format!("Input:0:-{}", code));
        }

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn malformed_datagrams_do_not_stop_the_receive_task() {
        let server = FakeServer::bind().await;
        let mut connection = assert_ok!(Connection::open(test_config(server.addr())).await);
        let client = handshake(&server, &mut connection, 0).await;

        server.send("", client).await;
        server.send("Dinero:abc:0", client).await;
        server.send("Vida:50:9", client).await;
        server.send("Movimiento:1,2", client).await;
        server.send("Mystery:1:2", client).await;
        server.send("Dinero:250:0", client).await;

        assert_eq!(
            next_event(&mut connection).await,
            ClientEvent::Money {
                player: 0,
                value: 250
            }
        );
        assert_eq!(connection.next_event(), None);

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn search_and_match_screens_follow_server_traffic() {
        let server = FakeServer::bind().await;
        let config = ClientConfig {
            found_dwell: Duration::ZERO,
            starting_dwell: Duration::ZERO,
            ..test_config(server.addr())
        };
        let mut connection = assert_ok!(Connection::open(config.clone()).await);
        let mut search = MatchSearch::new(&config);

        connection.discover().await;
        let (_, client) = server.recv().await;
        server.send("OK", client).await;
        server.send("ID:1", client).await;
        server.send("Comienza", client).await;

        let deadline = tokio::time::Instant::now() + WAIT;
        while search.phase() != ConnectionPhase::InMatch {
            assert!(tokio::time::Instant::now() < deadline, "match never started");
            connection.poll_events(&mut search);
            search.update(Duration::from_millis(16));
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(search.player_id(), Some(1));

        let mut view = MatchView::new(search.player_id());
        server.send("Movimiento:Vector2(10.0,20.0):(30.0,40.0):90:180", client).await;
        server.send("Gas:42.5:1", client).await;
        server.send("Delivery:100,200,32,32:1:500:1", client).await;
        server.send("GameOver:1", client).await;

        while !view.is_finished() {
            assert!(tokio::time::Instant::now() < deadline, "match never ended");
            connection.poll_events(&mut view);
            sleep(Duration::from_millis(5)).await;
        }

        let local = view.local_player().unwrap();
        assert_eq!(local.position, shared::Vec2::new(30.0, 40.0));
        assert_approx_eq!(local.fuel, 42.5);
        assert_eq!(view.delivery_status(1), "Order: DANGEROUS $500");
        assert_eq!(view.outcome(), Some(MatchOutcome::Winner(1)));

        connection.disconnect().await;
    }
}
