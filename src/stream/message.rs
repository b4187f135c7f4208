//! Broadcast messages and their Server-Sent-Events wire format.
//!
//! ```text
//! event: file_update
//! data: {"unit":"box",...}
//! id: 5f0c2c1e-...
//!
//! ```

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::unit::DerivedData;

/// Kind of a broadcast message, rendered as the SSE `event:` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Fresh derived data for a changed unit
    FileUpdate,
    /// Heartbeat sent while no update is pending
    KeepAlive,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileUpdate => "file_update",
            Self::KeepAlive => "keep_alive",
        }
    }
}

/// Immutable envelope pushed to streaming clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage {
    kind: EventKind,
    payload: String,
    id: String,
}

impl BroadcastMessage {
    /// Update message carrying a snapshot's JSON body.
    pub fn update(data: &DerivedData) -> Self {
        Self::new(EventKind::FileUpdate, data.to_json())
    }

    /// Heartbeat message carrying the per-stream counter.
    pub fn heartbeat(counter: u64) -> Self {
        Self::new(EventKind::KeepAlive, counter.to_string())
    }

    fn new(kind: EventKind, payload: String) -> Self {
        Self {
            kind,
            payload,
            id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Render as one SSE record terminated by a blank line.
    ///
    /// Multi-line payloads are split across several `data:` lines, which the
    /// client joins back with `\n`.
    pub fn to_sse(&self) -> String {
        let mut record = String::with_capacity(self.payload.len() + 64);
        let _ = writeln!(record, "event: {}", self.kind.as_str());
        for line in self.payload.split('\n') {
            let _ = writeln!(record, "data: {line}");
        }
        let _ = writeln!(record, "id: {}", self.id);
        record.push('\n');
        record
    }

    /// Write the record and flush, so it leaves the process immediately.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.to_sse().as_bytes())?;
        writer.flush()
    }
}
