//! Guarded owner of the current in-memory log and the commit index.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::context::LoggerContext;
use crate::error::{ErrorHandler, ErrorSeverity, ManagerError, ManagerResult, StorageError};
use crate::guarded::Guarded;
use crate::log::{
    EntryPayload, InMemoryLog, InMemoryLogEntry, LogRangeIterator, PersistingLogEntry,
};
use crate::metrics::LogMetrics;
use crate::storage::{LogStorage, SyncHandle, WriteOptions};
use crate::types::{LogIndex, LogRange, LogTerm, TermIndexPair};

/// Commit index bookkeeping the replication layer relies on.
pub trait LogManager: Send + Sync {
    fn get_commit_index(&self) -> LogIndex;

    /// Sets a new commit index and returns the previous one. The new index
    /// must be strictly greater; anything else aborts.
    fn update_commit_index(&self, new_index: LogIndex) -> LogIndex;
}

/// Outcome of [`InMemoryLogManager::append_log_entry`].
#[derive(Debug)]
pub struct InsertLogEntryResult {
    pub index: LogIndex,
    /// If set, the entry must not count towards the commit index before
    /// `sync` has resolved.
    pub wait_for_sync: bool,
    pub sync: SyncHandle,
}

#[derive(Debug)]
struct GuardedData {
    log: InMemoryLog,
    commit_index: LogIndex,
}

pub struct InMemoryLogManager {
    ctx: LoggerContext,
    guarded: Guarded<GuardedData>,
    storage: Arc<dyn LogStorage>,
    metrics: Arc<dyn LogMetrics>,
}

impl InMemoryLogManager {
    pub fn new(
        ctx: LoggerContext,
        storage: Arc<dyn LogStorage>,
        metrics: Arc<dyn LogMetrics>,
    ) -> Self {
        Self::with_log(ctx, InMemoryLog::new(), storage, metrics)
    }

    /// Starts from an existing log, e.g. one handed over by a previous leader.
    pub fn with_log(
        ctx: LoggerContext,
        log: InMemoryLog,
        storage: Arc<dyn LogStorage>,
        metrics: Arc<dyn LogMetrics>,
    ) -> Self {
        Self {
            ctx: ctx.with("component", "in-memory-log-manager"),
            guarded: Guarded::new(GuardedData {
                log,
                commit_index: LogIndex::ZERO,
            }),
            storage,
            metrics,
        }
    }

    /// Rebuilds the log from everything the storage has persisted.
    pub fn recover(
        ctx: LoggerContext,
        storage: Arc<dyn LogStorage>,
        metrics: Arc<dyn LogMetrics>,
    ) -> ManagerResult<Self> {
        let (range, entries) = storage.read_persisted()?;
        let log = InMemoryLog::from_persisted_entries(range.from, entries, Instant::now());
        info!("{} recovered log {}", ctx, log.get_index_range());
        Ok(Self::with_log(ctx, log, storage, metrics))
    }

    /// Current snapshot. It never changes afterwards, no matter what the
    /// manager does next.
    pub fn get_in_memory_log(&self) -> InMemoryLog {
        self.guarded.get_locked_guard().log.clone()
    }

    /// Appends a new entry at the next free index and schedules it with the
    /// storage. If scheduling fails the log is left as it was.
    pub fn append_log_entry(
        &self,
        payload: impl Into<EntryPayload>,
        term: LogTerm,
        insert_tp: Instant,
        wait_for_sync: bool,
    ) -> ManagerResult<InsertLogEntryResult> {
        let payload = payload.into();
        let mut data = self.guarded.get_locked_guard();

        let index = data.log.get_next_index();
        let entry = PersistingLogEntry::new(term, index, payload);
        let approx_bytes = entry.approx_byte_size();
        let in_memory = InMemoryLogEntry::new(entry.clone(), insert_tp, wait_for_sync);
        let new_log = data.log.append_entry(&self.ctx, in_memory);

        let sync = self
            .storage
            .schedule_append(vec![entry], WriteOptions { wait_for_sync })
            .map_err(|e| self.report_storage_failure("append", e))?;

        data.log = new_log;
        drop(data);

        self.metrics.entry_appended(index, approx_bytes);
        debug!("{} appended entry ({}:{})", self.ctx, term, index);
        Ok(InsertLogEntryResult {
            index,
            wait_for_sync,
            sync,
        })
    }

    /// Releases every entry before `stop` from memory and storage. Entries
    /// that are not committed yet are kept. Returns the first index that is
    /// still held.
    pub fn release_memory(&self, stop: LogIndex) -> ManagerResult<LogIndex> {
        let mut data = self.guarded.get_locked_guard();
        let stop = stop.min(data.commit_index + 1);
        let old_range = data.log.get_index_range();
        if stop <= old_range.from {
            return Ok(old_range.from);
        }

        self.storage
            .schedule_remove_front(stop, WriteOptions::default())
            .map_err(|e| self.report_storage_failure("release", e))?;

        data.log = data.log.release(stop);
        let new_first = data.log.get_first_index();
        drop(data);

        let released = LogIndex::distance(old_range.from, new_first);
        self.metrics.entries_released(released);
        debug!(
            "{} released {} entries, log now starts at {}",
            self.ctx, released, new_first
        );
        Ok(new_first)
    }

    pub fn get_term_index_pair(&self, index: LogIndex) -> Option<TermIndexPair> {
        let log = self.get_in_memory_log();
        log.get_entry_by_index(index)
            .map(|entry| entry.entry().term_index_pair())
    }

    /// Entries from `from` up to and including the commit index, for the
    /// state machine applier.
    pub fn get_committed_iterator_from(&self, from: LogIndex) -> LogRangeIterator {
        let (log, commit_index) = self
            .guarded
            .do_under_lock(|data| (data.log.clone(), data.commit_index));
        let bounds = LogRange::new(from, (commit_index + 1).max(from));
        log.get_iterator_range(bounds)
    }

    /// Consumes the manager and hands out its final log.
    pub fn resign(self) -> InMemoryLog {
        let data = self.guarded.into_inner();
        info!(
            "{} resigning with log {} and commit index {}",
            self.ctx,
            data.log.get_index_range(),
            data.commit_index
        );
        data.log
    }

    fn report_storage_failure(&self, operation: &str, e: StorageError) -> ManagerError {
        let ctx = &self.ctx;
        match e.severity() {
            ErrorSeverity::Fatal => error!("{} storage {} failed: {}", ctx, operation, e.context()),
            ErrorSeverity::Recoverable => {
                warn!("{} storage {} failed: {}", ctx, operation, e.context())
            }
            ErrorSeverity::Ignorable => debug!("{} storage {} failed: {}", ctx, operation, e.context()),
        }
        ManagerError::Storage(e)
    }
}

impl LogManager for InMemoryLogManager {
    fn get_commit_index(&self) -> LogIndex {
        self.guarded.get_locked_guard().commit_index
    }

    fn update_commit_index(&self, new_index: LogIndex) -> LogIndex {
        let old_index = self.guarded.do_under_lock(|data| {
            let old_index = data.commit_index;
            assert!(
                new_index > old_index,
                "{} commit index must increase: old = {}, new = {}",
                self.ctx,
                old_index,
                new_index
            );
            data.commit_index = new_index;
            old_index
        });
        self.metrics.commit_index_updated(new_index);
        debug!(
            "{} commit index {} -> {}",
            self.ctx, old_index, new_index
        );
        old_index
    }
}
