use crate::types::LogRange;

use super::entry::{InMemoryLogEntry, PersistingLogEntry};
use super::rope::Cursor;

/// Lazy, single-pass iterator over a window of an [`InMemoryLog`](super::InMemoryLog).
///
/// The iterator owns the nodes it walks, so it stays valid after the log it
/// was created from has been dropped or superseded.
#[derive(Debug)]
pub struct LogRangeIterator {
    range: LogRange,
    cursor: Cursor<InMemoryLogEntry>,
}

impl LogRangeIterator {
    pub(crate) fn new(range: LogRange, cursor: Cursor<InMemoryLogEntry>) -> Self {
        Self { range, cursor }
    }

    /// The window this iterator covers. Degenerate (`[x, x)`) when the
    /// requested bounds did not overlap the log.
    pub fn range(&self) -> LogRange {
        self.range
    }
}

impl Iterator for LogRangeIterator {
    type Item = PersistingLogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next().map(|entry| entry.entry().clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

/// Like [`LogRangeIterator`], but yields the in-memory entries themselves.
#[derive(Debug)]
pub struct InMemoryLogIterator {
    range: LogRange,
    cursor: Cursor<InMemoryLogEntry>,
}

impl InMemoryLogIterator {
    pub(crate) fn new(range: LogRange, cursor: Cursor<InMemoryLogEntry>) -> Self {
        Self { range, cursor }
    }

    pub fn range(&self) -> LogRange {
        self.range
    }
}

impl Iterator for InMemoryLogIterator {
    type Item = InMemoryLogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}
