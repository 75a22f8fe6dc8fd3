use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::log::PersistingLogEntry;
use crate::types::{LogIndex, LogRange};

use super::{LogStorage, SyncHandle, WriteOptions};

#[derive(Clone, Debug)]
pub struct MemoryLogStoreOptions {
    /// Maximum number of requests the writer drains per round.
    pub batch_size: usize,
    /// Index of the first entry the store expects.
    pub first_index: LogIndex,
}

impl Default for MemoryLogStoreOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            first_index: LogIndex::new(1),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreOp {
    Append(Vec<PersistingLogEntry>),
    RemoveFront(LogIndex),
}

pub struct StoreOpRequest {
    pub op: StoreOp,
    /// Set for requests that are acknowledged only after they were applied.
    pub response_tx: Option<oneshot::Sender<StorageResult<LogIndex>>>,
}

/// Entries encoded the way they would be written out.
struct Table {
    first_index: LogIndex,
    entries: VecDeque<Vec<u8>>,
}

impl Table {
    fn range(&self) -> LogRange {
        LogRange::new(self.first_index, self.first_index + self.entries.len() as u64)
    }

    fn append(&mut self, entries: &[PersistingLogEntry]) -> StorageResult<LogIndex> {
        let mut expected = self.range().to;
        let mut encoded = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.log_index() != expected {
                return Err(StorageError::Consistency(format!(
                    "append expected index {}, got {}",
                    expected,
                    entry.log_index()
                )));
            }
            encoded.push(entry.serialize()?);
            expected = expected + 1;
        }
        self.entries.extend(encoded);
        Ok(expected - 1)
    }

    fn remove_front(&mut self, stop: LogIndex) -> LogIndex {
        let range = self.range();
        if stop > range.to {
            self.entries.clear();
            self.first_index = stop;
        } else if stop > range.from {
            self.entries
                .drain(..LogIndex::distance(range.from, stop) as usize);
            self.first_index = stop;
        }
        self.first_index
    }

    fn read(&self, range: LogRange) -> StorageResult<Vec<PersistingLogEntry>> {
        let range = self.range().intersect(&range);
        let skip = LogIndex::distance(self.first_index, range.from) as usize;
        self.entries
            .iter()
            .skip(skip)
            .take(range.count() as usize)
            .zip(range)
            .map(|(bytes, index)| {
                PersistingLogEntry::deserialize(bytes)
                    .map(|(entry, _)| entry)
                    .map_err(|e| {
                        warn!("Failed to decode persisted entry {}: {}", index, e);
                        StorageError::DataCorruption(index)
                    })
            })
            .collect()
    }
}

/// Storage collaborator that keeps the persisted entries in memory.
///
/// Requests go through an unbounded channel to a writer task started with
/// [`MemoryLogStore::start`], which applies them strictly in order.
#[derive(Clone)]
pub struct MemoryLogStore {
    options: MemoryLogStoreOptions,
    table: Arc<RwLock<Table>>,
    op_sender: mpsc::UnboundedSender<StoreOpRequest>,
}

impl MemoryLogStore {
    /// Create the store and the receiver that has to be passed to `start`.
    pub fn new(
        options: MemoryLogStoreOptions,
    ) -> (Self, mpsc::UnboundedReceiver<StoreOpRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let table = Table {
            first_index: options.first_index,
            entries: VecDeque::new(),
        };
        let store = Self {
            options,
            table: Arc::new(RwLock::new(table)),
            op_sender: tx,
        };
        (store, rx)
    }

    /// Spawns the writer task on the current tokio runtime.
    pub fn start(&self, mut receiver: mpsc::UnboundedReceiver<StoreOpRequest>) {
        let table = self.table.clone();
        let batch_size = self.options.batch_size.max(1);

        tokio::spawn(async move {
            loop {
                let mut buf = Vec::with_capacity(batch_size);
                let size = receiver.recv_many(&mut buf, batch_size).await;
                if size == 0 {
                    debug!("Log store receiver closed");
                    break;
                }

                let results: Vec<StorageResult<LogIndex>> = {
                    let mut table = table.write();
                    buf.iter()
                        .map(|req| match &req.op {
                            StoreOp::Append(entries) => table.append(entries),
                            StoreOp::RemoveFront(stop) => Ok(table.remove_front(*stop)),
                        })
                        .collect()
                };

                for (req, result) in buf.into_iter().zip(results) {
                    if let Err(e) = &result {
                        warn!("Log store operation failed: {}", e);
                    }
                    if let Some(tx) = req.response_tx {
                        let _ = tx.send(result);
                    }
                }
            }
        });
    }

    /// Queues `op`. Without `wait_for_sync` the returned handle is already
    /// resolved; empty appends act as barriers and always wait for the writer.
    fn schedule(&self, op: StoreOp, options: WriteOptions) -> StorageResult<SyncHandle> {
        let queued_ack = match &op {
            _ if options.wait_for_sync => None,
            StoreOp::Append(entries) => entries.last().map(|entry| entry.log_index()),
            StoreOp::RemoveFront(stop) => Some(*stop),
        };
        let (response_tx, handle) = match queued_ack {
            Some(index) => (None, SyncHandle::ready(Ok(index))),
            None => {
                let (tx, handle) = SyncHandle::channel();
                (Some(tx), handle)
            }
        };

        let request = StoreOpRequest { op, response_tx };
        self.op_sender.send(request).map_err(|e| {
            warn!("Failed to send log store request: {}", e);
            StorageError::ChannelClosed
        })?;
        Ok(handle)
    }
}

impl LogStorage for MemoryLogStore {
    fn schedule_append(
        &self,
        entries: Vec<PersistingLogEntry>,
        options: WriteOptions,
    ) -> StorageResult<SyncHandle> {
        self.schedule(StoreOp::Append(entries), options)
    }

    fn schedule_remove_front(
        &self,
        stop: LogIndex,
        options: WriteOptions,
    ) -> StorageResult<SyncHandle> {
        self.schedule(StoreOp::RemoveFront(stop), options)
    }

    fn read_entries(&self, range: LogRange) -> StorageResult<Vec<PersistingLogEntry>> {
        self.table.read().read(range)
    }

    fn persisted_range(&self) -> LogRange {
        self.table.read().range()
    }

    fn read_persisted(&self) -> StorageResult<(LogRange, Vec<PersistingLogEntry>)> {
        let table = self.table.read();
        let range = table.range();
        Ok((range, table.read(range)?))
    }
}
