//! Storage collaborator of the in-memory log manager.
//!
//! The manager never writes to disk itself. It hands every new entry to a
//! [`LogStorage`] while holding its guard; implementations must only enqueue
//! the work and return, and report durability through the [`SyncHandle`].

mod memory;

use tokio::sync::oneshot;

use crate::error::{StorageError, StorageResult};
use crate::log::PersistingLogEntry;
use crate::types::{LogIndex, LogRange};

pub use memory::{MemoryLogStore, MemoryLogStoreOptions, StoreOp, StoreOpRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Acknowledge only once the data is durable. Otherwise the handle
    /// resolves as soon as the operation has been queued.
    pub wait_for_sync: bool,
}

/// Completion of a scheduled storage operation. Resolves to the last index
/// covered by the operation.
#[derive(Debug)]
pub struct SyncHandle {
    rx: oneshot::Receiver<StorageResult<LogIndex>>,
}

impl SyncHandle {
    pub fn channel() -> (oneshot::Sender<StorageResult<LogIndex>>, SyncHandle) {
        let (tx, rx) = oneshot::channel();
        (tx, SyncHandle { rx })
    }

    /// A handle that is already resolved.
    pub fn ready(result: StorageResult<LogIndex>) -> SyncHandle {
        let (tx, handle) = Self::channel();
        let _ = tx.send(result);
        handle
    }

    /// Non-blocking check, `None` while the operation is still pending.
    pub fn try_wait(&mut self) -> Option<StorageResult<LogIndex>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(StorageError::ChannelClosed)),
        }
    }

    pub async fn wait(self) -> StorageResult<LogIndex> {
        self.rx.await.map_err(|_| StorageError::ChannelClosed)?
    }

    /// Blocks the current thread. Must not be called from async code.
    pub fn blocking_wait(self) -> StorageResult<LogIndex> {
        self.rx
            .blocking_recv()
            .map_err(|_| StorageError::ChannelClosed)?
    }
}

pub trait LogStorage: Send + Sync {
    /// Enqueues `entries` for appending. Must not block.
    fn schedule_append(
        &self,
        entries: Vec<PersistingLogEntry>,
        options: WriteOptions,
    ) -> StorageResult<SyncHandle>;

    /// Enqueues removal of every entry before `stop`. Must not block.
    fn schedule_remove_front(
        &self,
        stop: LogIndex,
        options: WriteOptions,
    ) -> StorageResult<SyncHandle>;

    /// Reads back entries that have already been persisted.
    fn read_entries(&self, range: LogRange) -> StorageResult<Vec<PersistingLogEntry>>;

    /// Index range of the persisted entries.
    fn persisted_range(&self) -> LogRange;

    /// The persisted range together with all of its entries, taken from one
    /// consistent state of the storage. Operations that are still queued may
    /// move the range right after this returns.
    fn read_persisted(&self) -> StorageResult<(LogRange, Vec<PersistingLogEntry>)>;
}
