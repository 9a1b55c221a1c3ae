//! Transport adapter: a uniform surface over TCP and UDP sockets, modeled
//! as a sum type with one variant per transport rather than a trait
//! object, since the server only ever needs these two concrete kinds and
//! a `match` gives exhaustiveness for free.
//!
//! A connected transport is immediately split into a read half (owned by
//! the egress pump) and a write half (owned by the ingress dispatcher) so
//! inbound and outbound data can proceed without a lock. TCP uses
//! `tokio::net::TcpStream::into_split`; UDP has no independent read/write
//! halves, so both sides share one `Arc<UdpSocket>`.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream, UdpSocket};

use crate::error::ConnectError;

/// Cap on a single TCP read.
const TCP_READ_CAP: usize = 64 * 1024;
const UDP_READ_CAP: usize = 65535;

/// Read result distinguishing clean EOF from a live I/O error, matching
/// tokio's own 0-byte-read-means-EOF convention for `AsyncRead`.
pub enum ReadOutcome {
    Data(Vec<u8>),
    Eof,
}

/// Read half of an established transport.
#[derive(Debug)]
pub enum TransportReader {
    Tcp(OwnedReadHalf),
    Udp(Arc<UdpSocket>),
}

/// Write half of an established transport.
#[derive(Debug)]
pub enum TransportWriter {
    Tcp(OwnedWriteHalf),
    Udp(Arc<UdpSocket>, SocketAddr),
}

impl TransportReader {
    pub async fn read(&mut self) -> std::io::Result<ReadOutcome> {
        match self {
            TransportReader::Tcp(half) => {
                let mut buf = vec![0u8; TCP_READ_CAP];
                let n = half.read(&mut buf).await?;
                if n == 0 {
                    Ok(ReadOutcome::Eof)
                } else {
                    buf.truncate(n);
                    Ok(ReadOutcome::Data(buf))
                }
            }
            TransportReader::Udp(socket) => {
                let mut buf = vec![0u8; UDP_READ_CAP];
                let n = socket.recv(&mut buf).await?;
                buf.truncate(n);
                Ok(ReadOutcome::Data(buf))
            }
        }
    }
}

impl TransportWriter {
    pub async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            TransportWriter::Tcp(half) => half.write_all(bytes).await,
            TransportWriter::Udp(socket, remote) => {
                socket.send_to(bytes, *remote).await.map(|_| ())
            }
        }
    }
}

/// Resolve `host`, establish a TCP connection, and split it into read/write
/// halves. Classifies failure into a `ConnectError`.
pub async fn connect_tcp(
    host: &str,
    port: u16,
) -> Result<(TransportReader, TransportWriter), ConnectError> {
    let addr = resolve_one(host, port).await?;
    let stream = TcpStream::connect(addr)
        .await
        .map_err(ConnectError::from_io)?;
    let (read, write) = stream.into_split();
    Ok((TransportReader::Tcp(read), TransportWriter::Tcp(write)))
}

/// Resolve `host` and bind an unconnected UDP socket whose default peer is
/// the resolved address. No packets flow yet.
pub async fn open_udp(
    host: &str,
    port: u16,
) -> Result<(TransportReader, TransportWriter), ConnectError> {
    let remote = resolve_one(host, port).await?;
    let local_any = if remote.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(local_any)
        .await
        .map_err(ConnectError::from_io)?;
    let socket = Arc::new(socket);
    Ok((
        TransportReader::Udp(Arc::clone(&socket)),
        TransportWriter::Udp(socket, remote),
    ))
}

async fn resolve_one(host: &str, port: u16) -> Result<SocketAddr, ConnectError> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|e| ConnectError::Unreachable(e.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| ConnectError::Unreachable(format!("no addresses for {host}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_tcp_refused_classifies_as_refused() {
        // Bind then immediately drop to free a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect_tcp(&addr.ip().to_string(), addr.port())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::Refused));
    }

    #[tokio::test]
    async fn open_udp_resolves_ip_literal() {
        let (_reader, writer) = open_udp("127.0.0.1", 9).await.unwrap();
        assert!(matches!(writer, TransportWriter::Udp(_, _)));
    }

    #[tokio::test]
    async fn tcp_echo_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(&buf).await.unwrap();
        });

        let (mut reader, mut writer) = connect_tcp(&addr.ip().to_string(), addr.port())
            .await
            .unwrap();
        writer.write(b"hello").await.unwrap();
        match reader.read().await.unwrap() {
            ReadOutcome::Data(data) => assert_eq!(data, b"hello"),
            ReadOutcome::Eof => panic!("unexpected eof"),
        }
    }
}
