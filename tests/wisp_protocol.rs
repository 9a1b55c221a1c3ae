//! End-to-end scenarios against a real server instance, a real WebSocket
//! client, and real loopback TCP/UDP sockets, driving full protocol
//! flows rather than unit-level pieces.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wisp_server::codec::{self, CloseReason, PacketType};
use wisp_server::stream::DEFAULT_CREDIT;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server instance on an OS-assigned loopback port and return a
/// connected WebSocket client plus that port, so each test gets full
/// isolation without fighting over a fixed address.
async fn spawn_session(buffer_size: u32) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(wisp_server::server::accept_loop(listener, buffer_size));

    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn recv_binary(client: &mut Client) -> Vec<u8> {
    match tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("websocket closed unexpectedly")
        .unwrap()
    {
        Message::Binary(bytes) => bytes,
        other => panic!("expected a binary frame, got {other:?}"),
    }
}

async fn send_binary(client: &mut Client, bytes: Vec<u8>) {
    client.send(Message::Binary(bytes)).await.unwrap();
}

fn connect_payload(kind: u8, port: u16, host: &str) -> Vec<u8> {
    let mut payload = vec![kind];
    payload.extend_from_slice(&port.to_le_bytes());
    payload.extend_from_slice(host.as_bytes());
    payload
}

/// A minimal TCP echo listener for S1/S5: accepts one connection, echoes
/// whatever it reads, and reports its bound port.
async fn spawn_tcp_echo() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        loop {
            match sock.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    if sock.write_all(&buf[..n]).await.is_err() {
                        return;
                    }
                }
            }
        }
    });
    port
}

#[tokio::test]
async fn initial_handshake_advertises_configured_credit() {
    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let frame = recv_binary(&mut client).await;
    let packet = codec::decode(&frame).unwrap();
    assert_eq!(packet.kind, PacketType::Continue);
    assert_eq!(packet.stream_id, 0);
    assert_eq!(packet.payload, DEFAULT_CREDIT.to_le_bytes());
}

/// TCP echo: CONTINUE precedes DATA, and an echoed payload round-trips.
#[tokio::test]
async fn s1_tcp_echo_round_trip() {
    let echo_port = spawn_tcp_echo().await;
    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let _initial = recv_binary(&mut client).await;

    let connect = codec::encode(
        PacketType::Connect,
        1,
        &connect_payload(0x01, echo_port, "127.0.0.1"),
    );
    send_binary(&mut client, connect).await;

    let continue_bytes = recv_binary(&mut client).await;
    let continue_frame = codec::decode(&continue_bytes).unwrap();
    assert_eq!(continue_frame.kind, PacketType::Continue);
    assert_eq!(continue_frame.stream_id, 1);
    assert_eq!(continue_frame.payload, DEFAULT_CREDIT.to_le_bytes());

    let data = codec::encode(PacketType::Data, 1, b"hello");
    send_binary(&mut client, data).await;

    let echoed_bytes = recv_binary(&mut client).await;
    let echoed = codec::decode(&echoed_bytes).unwrap();
    assert_eq!(echoed.kind, PacketType::Data);
    assert_eq!(echoed.stream_id, 1);
    assert_eq!(echoed.payload, b"hello");
}

/// Connection refused: CLOSE/REFUSED, no CONTINUE, id never enters any
/// visible state the client can act on.
#[tokio::test]
async fn s2_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let refused_port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let _initial = recv_binary(&mut client).await;

    let connect = codec::encode(
        PacketType::Connect,
        1,
        &connect_payload(0x01, refused_port, "127.0.0.1"),
    );
    send_binary(&mut client, connect).await;

    let response_bytes = recv_binary(&mut client).await;
    let response = codec::decode(&response_bytes).unwrap();
    assert_eq!(response.kind, PacketType::Close);
    assert_eq!(response.stream_id, 1);
    assert_eq!(response.payload, &[CloseReason::Refused.to_byte()]);
}

/// DNS failure on UDP CONNECT: CLOSE/UNREACHABLE.
#[tokio::test]
async fn s3_udp_dns_failure() {
    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let _initial = recv_binary(&mut client).await;

    let connect = codec::encode(
        PacketType::Connect,
        2,
        &connect_payload(0x02, 53, "no.such.invalid"),
    );
    send_binary(&mut client, connect).await;

    let response_bytes = recv_binary(&mut client).await;
    let response = codec::decode(&response_bytes).unwrap();
    assert_eq!(response.kind, PacketType::Close);
    assert_eq!(response.stream_id, 2);
    assert_eq!(response.payload, &[CloseReason::Unreachable.to_byte()]);
}

/// Client-initiated CLOSE: no echoed CLOSE, and a DATA sent for the same
/// id afterward is dropped rather than answered.
#[tokio::test]
async fn s4_client_close_silences_the_stream() {
    let echo_port = spawn_tcp_echo().await;
    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let _initial = recv_binary(&mut client).await;

    let connect = codec::encode(
        PacketType::Connect,
        1,
        &connect_payload(0x01, echo_port, "127.0.0.1"),
    );
    send_binary(&mut client, connect).await;
    let _continue = recv_binary(&mut client).await;

    let close = codec::encode(PacketType::Close, 1, &[CloseReason::Normal.to_byte()]);
    send_binary(&mut client, close).await;

    // Give the server a beat to process the CLOSE, then probe with DATA
    // for the same id: it must be dropped silently, producing no frame.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let probe = codec::encode(PacketType::Data, 1, b"post-close");
    send_binary(&mut client, probe).await;

    let result = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
    assert!(result.is_err(), "expected no frame after client CLOSE, got one");
}

/// Upstream EOF: the pump observes a clean close and the session answers
/// with CLOSE/NORMAL (this implementation's documented choice for the
/// EOF branch, see DESIGN.md).
#[tokio::test]
async fn s5_upstream_eof_emits_close_normal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        sock.write_all(b"bye").await.unwrap();
        // Drop without reading further: half-closes from the server's POV.
    });

    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let _initial = recv_binary(&mut client).await;

    let connect = codec::encode(PacketType::Connect, 1, &connect_payload(0x01, port, "127.0.0.1"));
    send_binary(&mut client, connect).await;
    let _continue = recv_binary(&mut client).await;

    let data_bytes = recv_binary(&mut client).await;
    let data = codec::decode(&data_bytes).unwrap();
    assert_eq!(data.kind, PacketType::Data);
    assert_eq!(data.payload, b"bye");

    let close_bytes = recv_binary(&mut client).await;
    let close = codec::decode(&close_bytes).unwrap();
    assert_eq!(close.kind, PacketType::Close);
    assert_eq!(close.stream_id, 1);
    assert_eq!(close.payload, &[CloseReason::Normal.to_byte()]);
}

/// Abrupt session teardown: closing the WebSocket tears down every live
/// upstream socket. Verified two ways: the TCP peer observes its
/// connection actually close (EOF on its side), and a UDP datagram sent
/// just before teardown still reached the peer, proving the stream was
/// live right up until the session ended and not silently dead already.
#[tokio::test]
async fn s6_session_teardown_closes_upstream_sockets() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tcp_port = listener.local_addr().unwrap().port();
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 16];
        loop {
            match sock.read(&mut buf).await {
                Ok(0) | Err(_) => {
                    let _ = closed_tx.send(());
                    return;
                }
                Ok(_) => continue,
            }
        }
    });

    let udp_peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let udp_port = udp_peer.local_addr().unwrap().port();

    let mut client = spawn_session(DEFAULT_CREDIT).await;
    let _initial = recv_binary(&mut client).await;

    let connect_tcp = codec::encode(
        PacketType::Connect,
        1,
        &connect_payload(0x01, tcp_port, "127.0.0.1"),
    );
    send_binary(&mut client, connect_tcp).await;
    let _continue = recv_binary(&mut client).await;

    let connect_udp = codec::encode(
        PacketType::Connect,
        2,
        &connect_payload(0x02, udp_port, "127.0.0.1"),
    );
    send_binary(&mut client, connect_udp).await;

    // UDP streams get no per-stream CONTINUE; confirm a datagram sent
    // through the stream actually reaches the peer before tearing down.
    let probe = codec::encode(PacketType::Data, 2, b"ping");
    send_binary(&mut client, probe).await;
    let mut buf = [0u8; 16];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), udp_peer.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"ping");

    // Abruptly end the session.
    client.close(None).await.unwrap();
    drop(client);

    tokio::time::timeout(Duration::from_secs(2), closed_rx)
        .await
        .expect("server never closed the upstream TCP socket after session teardown")
        .unwrap();
}
