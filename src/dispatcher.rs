//! Ingress dispatcher: turns one decoded Wisp packet into stream-table
//! mutations and upstream I/O. Runs entirely inside the session task, so
//! the table is never shared and every branch here can mutate it
//! directly without a lock.

use tokio::sync::mpsc;

use std::sync::Arc;

use crate::codec::{self, CloseReason, Packet, PacketType};
use crate::metrics::SessionMetrics;
use crate::session::WriterCommand;
use crate::stream::{self, PumpExit, StreamRecord, CONTROL_STREAM_ID};
use crate::table::StreamTable;
use crate::transport;

/// Shared context an ingress dispatch call needs: the table it mutates,
/// the channel to the session's writer task, the channel pumps use to
/// report their own exit, and the configured initial CONTINUE credit.
pub struct DispatchContext<'a> {
    pub table: &'a mut StreamTable,
    pub frames: &'a mpsc::Sender<WriterCommand>,
    pub exits: &'a mpsc::UnboundedSender<(u32, PumpExit)>,
    pub credit: u32,
    pub metrics: &'a Arc<SessionMetrics>,
}

/// Handle one packet already decoded off the WebSocket. Never returns an
/// error: every failure this layer can hit is either a dropped malformed
/// frame (logged) or a CLOSE sent back to the client. Malformed or
/// invalid packets never tear down the session itself.
pub async fn dispatch(packet: Packet<'_>, ctx: &mut DispatchContext<'_>) {
    match packet.kind {
        PacketType::Connect => handle_connect(packet.stream_id, packet.payload, ctx).await,
        PacketType::Data => handle_data(packet.stream_id, packet.payload, ctx).await,
        PacketType::Close => handle_close(packet.stream_id, ctx),
        PacketType::Continue => {
            log::debug!("stream {}: ignoring client-sent CONTINUE", packet.stream_id);
        }
    }
}

async fn handle_connect(stream_id: u32, payload: &[u8], ctx: &mut DispatchContext<'_>) {
    if stream_id == CONTROL_STREAM_ID || ctx.table.contains(stream_id) {
        log::debug!("stream {stream_id}: CONNECT on reserved or in-use id");
        send_close(ctx, stream_id, CloseReason::Invalid).await;
        return;
    }

    let request = match codec::parse_connect(payload) {
        Ok(request) => request,
        Err(err) => {
            log::debug!("stream {stream_id}: malformed CONNECT payload: {err}");
            send_close(ctx, stream_id, CloseReason::Invalid).await;
            return;
        }
    };

    let established = match request.kind {
        codec::StreamKind::Tcp => transport::connect_tcp(request.host, request.port).await,
        codec::StreamKind::Udp => transport::open_udp(request.host, request.port).await,
    };

    let (reader, writer) = match established {
        Ok(halves) => halves,
        Err(err) => {
            log::debug!("stream {stream_id}: CONNECT to {}:{} failed: {err}", request.host, request.port);
            send_close(ctx, stream_id, err.close_reason()).await;
            return;
        }
    };

    // Send the per-stream CONTINUE before the pump exists at all: the
    // pump's first DATA frame goes through this same sender, and program
    // order on a single mpsc sender guarantees the CONTINUE lands first
    // only if this send is issued before the pump can enqueue anything.
    if request.kind == codec::StreamKind::Tcp {
        let frame = codec::encode_continue(stream_id, ctx.credit);
        let _ = ctx.frames.send(WriterCommand::Frame(frame)).await;
    }

    let pump = stream::spawn_pump(
        stream_id,
        reader,
        ctx.frames.clone(),
        ctx.exits.clone(),
        ctx.metrics.clone(),
    );
    let record = StreamRecord::new(request.kind, writer, pump);
    ctx.table
        .insert(stream_id, record)
        .expect("checked above: id is free and non-zero");
    ctx.metrics.record_stream_opened();
}

async fn handle_data(stream_id: u32, payload: &[u8], ctx: &mut DispatchContext<'_>) {
    let Some(record) = ctx.table.get_mut(stream_id) else {
        log::debug!("stream {stream_id}: DATA for unknown stream, dropping");
        return;
    };
    if let Err(err) = record.write(payload).await {
        log::debug!("stream {stream_id}: upstream write failed: {err}");
        ctx.table.remove(stream_id);
        ctx.metrics.record_stream_closed();
        send_close(ctx, stream_id, CloseReason::NetworkError).await;
    } else {
        ctx.metrics.record_bytes_in(payload.len());
    }
}

fn handle_close(stream_id: u32, ctx: &mut DispatchContext<'_>) {
    // Client-initiated close: tear down locally, no echo.
    if ctx.table.contains(stream_id) {
        ctx.table.remove(stream_id);
        ctx.metrics.record_stream_closed();
    }
}

/// Called by the session loop when a pump reports it has ended, turning
/// that into a CLOSE frame and a table removal.
pub async fn handle_pump_exit(stream_id: u32, exit: PumpExit, ctx: &mut DispatchContext<'_>) {
    let reason = stream::close_reason_for(&exit);
    ctx.table.remove(stream_id);
    ctx.metrics.record_stream_closed();
    send_close(ctx, stream_id, reason).await;
}

async fn send_close(ctx: &mut DispatchContext<'_>, stream_id: u32, reason: CloseReason) {
    let frame = codec::encode_close(stream_id, reason);
    let _ = ctx.frames.send(WriterCommand::Frame(frame)).await;
}
