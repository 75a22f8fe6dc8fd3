use std::fmt::{self, Write as _};
use std::time::Instant;

use tracing::trace;

use crate::context::LoggerContext;
use crate::types::{LogIndex, LogRange, LogTerm, TermIndexPair};

use super::entry::{InMemoryLogEntry, PersistingLogEntry};
use super::iterator::{InMemoryLogIterator, LogRangeIterator};
use super::rope::Rope;

const UNBOUNDED: LogIndex = LogIndex::new(u64::MAX);

/// Immutable, structurally shared view of a contiguous part of the log.
///
/// Entries are gap free and their terms never decrease with the index. No
/// method changes `self`: appending, slicing and releasing all return a new
/// log that shares untouched nodes with the old one. Cloning is O(1), so every
/// reader can hold its own snapshot for as long as it needs.
#[derive(Clone)]
pub struct InMemoryLog {
    first_index: LogIndex,
    entries: Rope<InMemoryLogEntry>,
}

impl Default for InMemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryLog")
            .field("range", &self.get_index_range())
            .finish()
    }
}

impl InMemoryLog {
    /// Empty log whose first entry will get index 1.
    pub fn new() -> Self {
        Self::starting_at(LogIndex::new(1))
    }

    /// Empty log whose first entry will get index `first`.
    pub fn starting_at(first: LogIndex) -> Self {
        Self {
            first_index: first,
            entries: Rope::new(),
        }
    }

    /// Builds a log from entries that must be index contiguous. The first index
    /// is taken from the first entry; an empty input gives [`InMemoryLog::new`].
    pub fn from_entries(entries: impl IntoIterator<Item = InMemoryLogEntry>) -> Self {
        let entries: Vec<InMemoryLogEntry> = entries.into_iter().collect();
        match entries.first() {
            None => Self::new(),
            Some(first) => {
                let ctx = LoggerContext::new();
                Self::starting_at(first.log_index()).append(&ctx, entries)
            }
        }
    }

    /// Rebuilds the in-memory log from entries read back from storage.
    pub fn from_persisted_entries(
        first: LogIndex,
        entries: impl IntoIterator<Item = PersistingLogEntry>,
        insert_tp: Instant,
    ) -> Self {
        let ctx = LoggerContext::new().with("phase", "recovery");
        Self::starting_at(first).append(
            &ctx,
            entries
                .into_iter()
                .map(|entry| InMemoryLogEntry::new(entry, insert_tp, false)),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_index_range(&self) -> LogRange {
        LogRange::new(self.first_index, self.get_next_index())
    }

    pub fn get_first_index(&self) -> LogIndex {
        self.first_index
    }

    /// Index the next appended entry has to carry.
    pub fn get_next_index(&self) -> LogIndex {
        self.first_index + self.entries.len() as u64
    }

    /// Panics on an empty log.
    pub fn get_last_index(&self) -> LogIndex {
        self.expect_last_entry().log_index()
    }

    /// Panics on an empty log.
    pub fn get_last_term(&self) -> LogTerm {
        self.expect_last_entry().log_term()
    }

    pub fn get_first_entry(&self) -> Option<InMemoryLogEntry> {
        self.entries.first().cloned()
    }

    pub fn get_last_entry(&self) -> Option<InMemoryLogEntry> {
        self.entries.last().cloned()
    }

    pub fn get_last_term_index_pair(&self) -> Option<TermIndexPair> {
        self.entries
            .last()
            .map(|entry| entry.entry().term_index_pair())
    }

    /// `None` if `index` was released or has not been appended yet.
    pub fn get_entry_by_index(&self, index: LogIndex) -> Option<InMemoryLogEntry> {
        if !self.get_index_range().contains(index) {
            return None;
        }
        self.entries.get(self.position_of(index)).cloned()
    }

    pub fn get_term_of_index(&self, index: LogIndex) -> Option<LogTerm> {
        self.get_entry_by_index(index).map(|entry| entry.log_term())
    }

    /// Returns this log extended by `entry`, which must carry
    /// [`get_next_index`](Self::get_next_index). Anything else is a bug in the
    /// caller and aborts.
    #[must_use]
    pub fn append_entry(&self, ctx: &LoggerContext, entry: InMemoryLogEntry) -> Self {
        let expected = self.get_next_index();
        assert!(
            entry.log_index() == expected,
            "{} gap detected while appending to log {}: expected index {}, got {}",
            ctx,
            self.get_index_range(),
            expected,
            entry.log_index()
        );
        trace!(
            "{} append entry {}",
            ctx,
            entry.entry().term_index_pair()
        );
        Self {
            first_index: self.first_index,
            entries: self.entries.push_back(entry),
        }
    }

    /// Bulk form of [`append_entry`](Self::append_entry). The entries must
    /// start at the next index and be contiguous among themselves. Terms are
    /// not checked here; keeping them monotonic is up to the caller.
    #[must_use]
    pub fn append(
        &self,
        ctx: &LoggerContext,
        entries: impl IntoIterator<Item = InMemoryLogEntry>,
    ) -> Self {
        let entries: Vec<InMemoryLogEntry> = entries.into_iter().collect();
        let mut expected = self.get_next_index();
        for entry in &entries {
            assert!(
                entry.log_index() == expected,
                "{} gap detected while appending to log {}: expected index {}, got {}",
                ctx,
                self.get_index_range(),
                expected,
                entry.log_index()
            );
            expected = expected + 1;
        }
        if entries.is_empty() {
            return self.clone();
        }
        trace!(
            "{} append {} entries at {}",
            ctx,
            entries.len(),
            self.get_next_index()
        );
        Self {
            first_index: self.first_index,
            entries: self.entries.extend(entries),
        }
    }

    /// Appends another log without copying its entries.
    #[must_use]
    pub fn append_log(&self, ctx: &LoggerContext, other: &InMemoryLog) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        assert!(
            other.get_first_index() == self.get_next_index(),
            "{} gap detected while appending log {} to log {}",
            ctx,
            other.get_index_range(),
            self.get_index_range()
        );
        Self {
            first_index: self.first_index,
            entries: self.entries.concat(&other.entries),
        }
    }

    /// Sub-log over the intersection of this log with `[from, to)`. An empty
    /// intersection yields an empty log.
    #[must_use]
    pub fn slice(&self, from: LogIndex, to: LogIndex) -> Self {
        self.restrict_to(LogRange::new(from, to.max(from)))
    }

    /// Drops every entry before `from`. Releasing at or before the first index
    /// returns an equal log; releasing past the next index yields an empty log
    /// that starts at `from`.
    #[must_use]
    pub fn release(&self, from: LogIndex) -> Self {
        self.restrict_to(LogRange::new(from, UNBOUNDED))
    }

    /// Drops every entry at or after `start`.
    #[must_use]
    pub fn remove_back(&self, start: LogIndex) -> Self {
        let start = start.max(self.first_index);
        self.restrict_to(LogRange::new(self.first_index, start))
    }

    fn restrict_to(&self, bounds: LogRange) -> Self {
        let range = self.get_index_range().intersect(&bounds);
        if range == self.get_index_range() {
            return self.clone();
        }
        if range.is_empty() {
            return Self::starting_at(range.from);
        }
        Self {
            first_index: range.from,
            entries: self
                .entries
                .drop_front(self.position_of(range.from))
                .take(range.count() as usize),
        }
    }

    /// Iterates over the entries in `range`, clamped to this log.
    pub fn get_iterator_range(&self, range: LogRange) -> LogRangeIterator {
        let range = self.get_index_range().intersect(&range);
        LogRangeIterator::new(range, self.cursor_over(range))
    }

    pub fn get_iterator_from(&self, from: LogIndex) -> LogRangeIterator {
        self.get_iterator_range(LogRange::new(from, UNBOUNDED))
    }

    pub fn get_in_memory_iterator_from(&self, from: LogIndex) -> InMemoryLogIterator {
        let range = self
            .get_index_range()
            .intersect(&LogRange::new(from, UNBOUNDED));
        InMemoryLogIterator::new(range, self.cursor_over(range))
    }

    /// First index whose entry has `term`.
    pub fn get_first_index_of_term(&self, term: LogTerm) -> Option<LogIndex> {
        let position = self.partition_point(|t| t < term);
        self.index_if_term(position, term)
    }

    /// Last index whose entry has `term`.
    pub fn get_last_index_of_term(&self, term: LogTerm) -> Option<LogIndex> {
        let position = self.partition_point(|t| t <= term).checked_sub(1)?;
        self.index_if_term(position, term)
    }

    /// Human readable listing of the entries. Not a storage format.
    pub fn dump(&self) -> String {
        let mut out = format!("InMemoryLog {} [", self.get_index_range());
        for (i, entry) in self.entries.cursor(0, self.len()).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{}", entry.entry().term_index_pair());
        }
        out.push(']');
        out
    }

    fn expect_last_entry(&self) -> &InMemoryLogEntry {
        match self.entries.last() {
            Some(entry) => entry,
            None => panic!(
                "last entry requested on empty log starting at {}",
                self.first_index
            ),
        }
    }

    fn position_of(&self, index: LogIndex) -> usize {
        LogIndex::distance(self.first_index, index) as usize
    }

    fn cursor_over(&self, range: LogRange) -> super::rope::Cursor<InMemoryLogEntry> {
        self.entries
            .cursor(self.position_of(range.from), range.count() as usize)
    }

    /// First position whose term does not satisfy `pred`. Relies on terms
    /// being sorted along the log.
    fn partition_point(&self, pred: impl Fn(LogTerm) -> bool) -> usize {
        let (mut low, mut high) = (0, self.len());
        while low < high {
            let mid = low + (high - low) / 2;
            match self.entries.get(mid) {
                Some(entry) if pred(entry.log_term()) => low = mid + 1,
                _ => high = mid,
            }
        }
        low
    }

    fn index_if_term(&self, position: usize, term: LogTerm) -> Option<LogIndex> {
        let entry = self.entries.get(position)?;
        (entry.log_term() == term).then(|| entry.log_index())
    }
}
