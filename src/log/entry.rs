use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{LogIndex, LogTerm, TermIndexPair};

/// Opaque user data carried by a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LogPayload {
    data: Vec<u8>,
}

impl LogPayload {
    pub fn create_from_string(s: &str) -> Self {
        Self {
            data: s.as_bytes().to_vec(),
        }
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

/// Entries the log writes for its own bookkeeping. They occupy an index like
/// any other entry but are never handed to the state machine as user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum LogMetaPayload {
    /// Written by a new leader as the first entry of its term.
    FirstEntryOfTerm {
        leader: String,
        participants: Vec<String>,
    },
    UpdateParticipantsConfig {
        generation: u64,
        participants: Vec<String>,
    },
    Ping {
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum EntryPayload {
    Payload(LogPayload),
    Meta(LogMetaPayload),
}

impl From<LogPayload> for EntryPayload {
    fn from(payload: LogPayload) -> Self {
        EntryPayload::Payload(payload)
    }
}

impl From<LogMetaPayload> for EntryPayload {
    fn from(meta: LogMetaPayload) -> Self {
        EntryPayload::Meta(meta)
    }
}

/// The unit handed to storage: term, index and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PersistingLogEntry {
    term: LogTerm,
    index: LogIndex,
    payload: EntryPayload,
}

impl PersistingLogEntry {
    pub fn new(term: LogTerm, index: LogIndex, payload: impl Into<EntryPayload>) -> Self {
        Self {
            term,
            index,
            payload: payload.into(),
        }
    }

    pub fn log_term(&self) -> LogTerm {
        self.term
    }

    pub fn log_index(&self) -> LogIndex {
        self.index
    }

    pub fn term_index_pair(&self) -> TermIndexPair {
        TermIndexPair::new(self.term, self.index)
    }

    pub fn payload(&self) -> &EntryPayload {
        &self.payload
    }

    pub fn log_payload(&self) -> Option<&LogPayload> {
        match &self.payload {
            EntryPayload::Payload(payload) => Some(payload),
            EntryPayload::Meta(_) => None,
        }
    }

    pub fn meta(&self) -> Option<&LogMetaPayload> {
        match &self.payload {
            EntryPayload::Payload(_) => None,
            EntryPayload::Meta(meta) => Some(meta),
        }
    }

    pub fn has_payload(&self) -> bool {
        self.log_payload().is_some()
    }

    pub fn has_meta(&self) -> bool {
        self.meta().is_some()
    }

    /// Rough memory footprint, used for metrics only.
    pub fn approx_byte_size(&self) -> usize {
        let payload_size = match &self.payload {
            EntryPayload::Payload(payload) => payload.byte_size(),
            // meta entries are small and rare
            EntryPayload::Meta(_) => 64,
        };
        std::mem::size_of::<LogTerm>() + std::mem::size_of::<LogIndex>() + payload_size
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard();
        Ok(bincode::encode_to_vec(self, config)?)
    }

    pub fn deserialize(data: &[u8]) -> Result<(Self, usize)> {
        let config = bincode::config::standard();
        Ok(bincode::decode_from_slice(data, config).map_err(|e| {
            warn!("Failed to deserialize log entry: {}", e);
            e
        })?)
    }
}

/// A [`PersistingLogEntry`] plus bookkeeping that only lives in memory.
#[derive(Debug, Clone)]
pub struct InMemoryLogEntry {
    entry: Arc<PersistingLogEntry>,
    insert_tp: Instant,
    wait_for_sync: bool,
}

impl InMemoryLogEntry {
    pub fn new(entry: PersistingLogEntry, insert_tp: Instant, wait_for_sync: bool) -> Self {
        Self {
            entry: Arc::new(entry),
            insert_tp,
            wait_for_sync,
        }
    }

    pub fn entry(&self) -> &PersistingLogEntry {
        &self.entry
    }

    pub fn log_index(&self) -> LogIndex {
        self.entry.log_index()
    }

    pub fn log_term(&self) -> LogTerm {
        self.entry.log_term()
    }

    pub fn insert_tp(&self) -> Instant {
        self.insert_tp
    }

    pub fn wait_for_sync(&self) -> bool {
        self.wait_for_sync
    }
}
