//! In-memory core of a replicated log.
//!
//! The leader keeps its log as an immutable [`InMemoryLog`] snapshot that is
//! replaced on every change. Readers take a snapshot and never block writers.
//! All changes go through the [`InMemoryLogManager`], which also hands new
//! entries to a [`LogStorage`] and tracks the commit index.

pub mod context;
pub mod error;
pub mod guarded;
pub mod log;
pub mod manager;
pub mod metrics;
pub mod storage;
pub mod types;

pub use context::LoggerContext;
pub use error::{
    ErrorHandler, ErrorSeverity, LogError, ManagerError, ManagerResult, StorageError,
    StorageResult,
};
pub use guarded::Guarded;
pub use log::{
    EntryPayload, InMemoryLog, InMemoryLogEntry, InMemoryLogIterator, LogMetaPayload, LogPayload,
    LogRangeIterator, PersistingLogEntry,
};
pub use manager::{InMemoryLogManager, InsertLogEntryResult, LogManager};
pub use metrics::{LogMetrics, LogMetricsCounters, NoopMetrics};
pub use storage::{LogStorage, MemoryLogStore, MemoryLogStoreOptions, SyncHandle, WriteOptions};
pub use types::{LogId, LogIndex, LogRange, LogTerm, TermIndexPair};
