use std::sync::Arc;

use thiserror::Error;

use crate::types::LogIndex;

/// Errors raised by the log value types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("Invalid log range [{from}, {to})")]
    InvalidRange { from: LogIndex, to: LogIndex },
}

/// Errors reported by the storage collaborator.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(Arc<anyhow::Error>),

    #[error("Log entry at index {0} not found")]
    LogNotFound(LogIndex),

    #[error("Corrupted data at index {0}")]
    DataCorruption(LogIndex),

    #[error("Consistency check failed: {0}")]
    Consistency(String),

    #[error("Storage channel closed")]
    ChannelClosed,
}

/// Errors surfaced by the in-memory log manager to its caller.
#[derive(Debug, Clone, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The collaborator is unusable, the replication layer has to rebuild it.
    Fatal,
    /// The caller may retry the operation.
    Recoverable,
    Ignorable,
}

pub trait ErrorHandler {
    fn severity(&self) -> ErrorSeverity;
    fn context(&self) -> String;
}

impl ErrorHandler for StorageError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            StorageError::Io(_) => ErrorSeverity::Fatal,
            StorageError::LogNotFound(_) => ErrorSeverity::Recoverable,
            StorageError::DataCorruption(_) => ErrorSeverity::Fatal,
            StorageError::Consistency(_) => ErrorSeverity::Fatal,
            StorageError::ChannelClosed => ErrorSeverity::Recoverable,
        }
    }

    fn context(&self) -> String {
        match self {
            StorageError::Io(e) => format!("IO error: {}", e),
            StorageError::LogNotFound(idx) => format!("Log entry at index {} not found", idx),
            StorageError::DataCorruption(idx) => format!("Data corruption at index {}", idx),
            StorageError::Consistency(msg) => format!("Consistency check failed: {}", msg),
            StorageError::ChannelClosed => "Storage writer is gone".to_string(),
        }
    }
}

impl ErrorHandler for ManagerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ManagerError::Storage(e) => e.severity(),
        }
    }

    fn context(&self) -> String {
        match self {
            ManagerError::Storage(e) => e.context(),
        }
    }
}

impl From<anyhow::Error> for StorageError {
    fn from(e: anyhow::Error) -> Self {
        StorageError::Io(Arc::new(e))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
pub type ManagerResult<T> = Result<T, ManagerError>;
