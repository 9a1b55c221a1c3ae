//! Stream table: the map from stream id to live stream record, owned by a
//! single task so no lock is ever needed.

use std::collections::HashMap;

use crate::stream::{StreamRecord, CONTROL_STREAM_ID};

/// Errors enforcing the table's invariants: ids are unique while a stream
/// is live, and id 0 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// CONNECT named id 0, or an id already present in the table.
    IdInUse,
}

#[derive(Default)]
pub struct StreamTable {
    streams: HashMap<u32, StreamRecord>,
}

impl StreamTable {
    pub fn new() -> Self {
        StreamTable::default()
    }

    /// Insert a newly connected stream. Rejects id 0 and ids already in
    /// use; a CONNECT naming either is a protocol error handled by the
    /// caller.
    pub fn insert(&mut self, stream_id: u32, record: StreamRecord) -> Result<(), TableError> {
        if stream_id == CONTROL_STREAM_ID || self.streams.contains_key(&stream_id) {
            return Err(TableError::IdInUse);
        }
        self.streams.insert(stream_id, record);
        Ok(())
    }

    pub fn get_mut(&mut self, stream_id: u32) -> Option<&mut StreamRecord> {
        self.streams.get_mut(&stream_id)
    }

    pub fn contains(&self, stream_id: u32) -> bool {
        self.streams.contains_key(&stream_id)
    }

    /// Remove and tear down a stream in one step: removal and socket close
    /// are a single atomic action from the table's point of view, so
    /// nothing else can observe a half-removed entry.
    pub fn remove(&mut self, stream_id: u32) {
        if let Some(record) = self.streams.remove(&stream_id) {
            record.shutdown();
        }
    }

    /// Tear down every live stream: best-effort close of all upstream
    /// sockets, leaving the table empty.
    pub fn drain(&mut self) {
        for (_, record) in self.streams.drain() {
            record.shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
