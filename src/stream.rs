//! Stream record: the per-stream state the session's ingress dispatcher
//! keeps in its table, plus the egress pump that owns the other half of
//! the same transport.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec::{self, CloseReason, StreamKind};
use crate::metrics::SessionMetrics;
use crate::session::WriterCommand;
use crate::transport::TransportReader;
use crate::transport::TransportWriter;

/// Stream id 0 is reserved for session-scoped control frames. No CONNECT
/// may claim it.
pub const CONTROL_STREAM_ID: u32 = 0;

/// Default initial CONTINUE credit, overridden by `--buffer-size`.
pub const DEFAULT_CREDIT: u32 = 32;

/// Everything the session needs to know about one live stream. Owned
/// exclusively by the ingress task; all access is serialized through the
/// session, never shared behind a lock.
pub struct StreamRecord {
    pub kind: StreamKind,
    writer: TransportWriter,
    pump: JoinHandle<()>,
}

impl StreamRecord {
    pub fn new(kind: StreamKind, writer: TransportWriter, pump: JoinHandle<()>) -> Self {
        StreamRecord { kind, writer, pump }
    }

    /// Forward a client DATA payload to the upstream transport, relying
    /// on the transport's own bounded kernel buffering rather than an
    /// extra application-level queue.
    pub async fn write(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.writer.write(payload).await
    }

    /// Tear down this stream: abort the pump and drop the writer, closing
    /// the upstream socket. Idempotent from the caller's point of view,
    /// since aborting an already-finished task is a no-op.
    pub fn shutdown(self) {
        self.pump.abort();
    }
}

/// Message an egress pump sends back to the session when its stream ends,
/// so the session (the sole owner of the stream table) can remove the
/// entry and forward a CLOSE to the client. Uses the same "don't share
/// state, send a message" discipline as the channel-owned WebSocket
/// writer in `session.rs`, applied here to pump termination.
pub enum PumpExit {
    Eof,
    Error,
}

/// Spawn the egress pump for one stream: read from upstream in a loop,
/// encode each chunk as a DATA frame, and hand it to the session's writer
/// task over `frames`. On EOF or I/O error, report back over `exits` and
/// stop; the session turns that into a CLOSE frame and a table removal.
pub fn spawn_pump(
    stream_id: u32,
    mut reader: TransportReader,
    frames: mpsc::Sender<WriterCommand>,
    exits: mpsc::UnboundedSender<(u32, PumpExit)>,
    metrics: Arc<SessionMetrics>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match reader.read().await {
                Ok(crate::transport::ReadOutcome::Data(data)) => {
                    metrics.record_bytes_out(data.len());
                    let frame = codec::encode(codec::PacketType::Data, stream_id, &data);
                    if frames.send(WriterCommand::Frame(frame)).await.is_err() {
                        // Writer task is gone; the session is shutting down.
                        return;
                    }
                }
                Ok(crate::transport::ReadOutcome::Eof) => {
                    let _ = exits.send((stream_id, PumpExit::Eof));
                    return;
                }
                Err(err) => {
                    log::debug!("stream {stream_id}: upstream read error: {err}");
                    let _ = exits.send((stream_id, PumpExit::Error));
                    return;
                }
            }
        }
    })
}

/// Map a pump's exit reason to a CLOSE reason code: a clean EOF is
/// `NORMAL`, any I/O error is `NETWORK_ERROR`.
pub fn close_reason_for(exit: &PumpExit) -> CloseReason {
    match exit {
        PumpExit::Eof => CloseReason::Normal,
        PumpExit::Error => CloseReason::NetworkError,
    }
}
