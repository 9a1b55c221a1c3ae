//! Session supervisor: one instance per accepted WebSocket connection,
//! running the `Opening -> Running -> Draining -> Closed` state machine.
//!
//! The WebSocket sink is owned by a single dedicated writer task, reached
//! only through an mpsc channel, so program order of sends on that
//! channel is the only thing that determines wire order. The ingress
//! side (this task) owns the stream table outright; nothing ever locks
//! it.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::codec;
use crate::dispatcher::{self, DispatchContext};
use crate::error::SessionError;
use crate::metrics::SessionMetrics;
use crate::stream::CONTROL_STREAM_ID;
use crate::table::StreamTable;

/// Everything that can cross from the ingress task to the writer task:
/// an encoded Wisp frame to ship as a binary message, or a WebSocket
/// control frame the ingress loop decided to answer.
pub enum WriterCommand {
    Frame(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Depth of the writer command queue. Bounded so a stalled client
/// eventually backpressures the pumps feeding it, rather than letting
/// memory grow without limit.
const WRITER_QUEUE_DEPTH: usize = 256;

/// Run one session to completion: negotiate, pump frames in both
/// directions, and tear everything down on EOF, error, or client close.
pub async fn run(socket: TcpStream, buffer_size: u32) {
    let peer = socket.peer_addr().ok();
    let ws = match tokio_tungstenite::accept_async(socket).await {
        Ok(ws) => ws,
        Err(err) => {
            log::debug!("websocket handshake failed: {err}");
            return;
        }
    };
    log::info!("session opened: {peer:?}");

    let (mut sink, mut stream) = ws.split();
    let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_QUEUE_DEPTH);

    let writer_task = tokio::spawn(async move {
        while let Some(cmd) = writer_rx.recv().await {
            let result = match cmd {
                WriterCommand::Frame(bytes) => sink.send(Message::Binary(bytes)).await,
                WriterCommand::Pong(data) => sink.send(Message::Pong(data)).await,
                WriterCommand::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if let Err(err) = result {
                // Terminal for this session; the ingress loop notices
                // once the writer task drops the channel.
                log::debug!("{}", SessionError::WsSend(err.to_string()));
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut table = StreamTable::new();
    let metrics = Arc::new(SessionMetrics::new());
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();

    // Running: announce the session-wide initial CONTINUE credit.
    let initial = codec::encode_continue(CONTROL_STREAM_ID, buffer_size);
    if writer_tx.send(WriterCommand::Frame(initial)).await.is_err() {
        writer_task.abort();
        return;
    }

    loop {
        let mut ctx = DispatchContext {
            table: &mut table,
            frames: &writer_tx,
            exits: &exit_tx,
            credit: buffer_size,
            metrics: &metrics,
        };

        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Binary(bytes))) => {
                        match codec::decode(&bytes) {
                            Ok(packet) => dispatcher::dispatch(packet, &mut ctx).await,
                            Err(err) => {
                                metrics.record_malformed_frame();
                                log::debug!("dropping malformed frame: {err}");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = writer_tx.send(WriterCommand::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        log::debug!("ignoring non-binary websocket message");
                    }
                    Some(Err(err)) => {
                        // Terminal for the session, never for an
                        // individual stream.
                        let err = SessionError::WsReceive(err.to_string());
                        log::debug!("{err}, entering draining");
                        break;
                    }
                }
            }
            exited = exit_rx.recv() => {
                if let Some((stream_id, exit)) = exited {
                    dispatcher::handle_pump_exit(stream_id, exit, &mut ctx).await;
                }
            }
        }
    }

    // Draining: best-effort close of every live upstream socket.
    table.drain();
    let _ = writer_tx.send(WriterCommand::Close).await;
    let _ = writer_task.await;
    log::info!("session closed: {peer:?} ({})", metrics.snapshot());
}
