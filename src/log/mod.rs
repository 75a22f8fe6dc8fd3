//! In-memory replicated log.
//!
//! # Module Structure
//!
//! - `entry`: payloads and the persisted / in-memory entry types
//! - `rope`: persistent sequence the log is built on
//! - `in_memory`: the immutable [`InMemoryLog`] value
//! - `iterator`: lazy iterators over windows of a log

mod entry;
mod in_memory;
mod iterator;
mod rope;

#[cfg(test)]
mod tests;

pub use entry::{EntryPayload, InMemoryLogEntry, LogMetaPayload, LogPayload, PersistingLogEntry};
pub use in_memory::InMemoryLog;
pub use iterator::{InMemoryLogIterator, LogRangeIterator};
