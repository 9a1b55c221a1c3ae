//! Session metrics: lightweight atomic counters surfaced through debug
//! logging, in the spirit of `bandwidth.rs`'s network instrumentation,
//! without the bandwidth enforcement that module adds on top.
//!
//! These counters exist purely for observability; nothing in the
//! dispatcher or pump reads them back to make a decision.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session counters, one instance shared (via `Arc`) between the
/// ingress task and every egress pump it spawns.
#[derive(Default)]
pub struct SessionMetrics {
    malformed_frames: AtomicU64,
    streams_opened: AtomicU64,
    streams_closed: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_malformed_frame(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_closed(&self) {
        self.streams_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes_in(&self, n: usize) {
        self.bytes_in.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_bytes_out(&self, n: usize) {
        self.bytes_out.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Snapshot the counters for a one-line debug summary at session close.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_closed: self.streams_closed.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub malformed_frames: u64,
    pub streams_opened: u64,
    pub streams_closed: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "streams opened={} closed={}, bytes in={} out={}, malformed frames={}",
            self.streams_opened, self.streams_closed, self.bytes_in, self.bytes_out, self.malformed_frames
        )
    }
}
