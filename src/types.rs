use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::{Add, Sub};

use crate::error::LogError;

/// Position of an entry in the replicated log.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub struct LogIndex(u64);

impl LogIndex {
    pub const ZERO: LogIndex = LogIndex(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn saturating_decrement(self, delta: u64) -> Self {
        Self(self.0.saturating_sub(delta))
    }

    /// Number of indexes in `[a, b)`, zero if `b <= a`.
    pub fn distance(a: LogIndex, b: LogIndex) -> u64 {
        b.0.saturating_sub(a.0)
    }
}

impl Display for LogIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LogIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<LogIndex> for u64 {
    fn from(value: LogIndex) -> Self {
        value.0
    }
}

/// Saturates at `u64::MAX`.
impl Add<u64> for LogIndex {
    type Output = LogIndex;

    fn add(self, rhs: u64) -> Self::Output {
        LogIndex(self.0.saturating_add(rhs))
    }
}

impl Sub<u64> for LogIndex {
    type Output = LogIndex;

    fn sub(self, rhs: u64) -> Self::Output {
        LogIndex(self.0.saturating_sub(rhs))
    }
}

/// Leadership epoch of an entry. Never decreases along the log.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub struct LogTerm(u64);

impl LogTerm {
    pub const ZERO: LogTerm = LogTerm(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for LogTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LogTerm {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<LogTerm> for u64 {
    fn from(value: LogTerm) -> Self {
        value.0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct TermIndexPair {
    pub term: LogTerm,
    pub index: LogIndex,
}

impl TermIndexPair {
    pub fn new(term: LogTerm, index: LogIndex) -> Self {
        Self { term, index }
    }
}

impl Display for TermIndexPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.term, self.index)
    }
}

/// Half-open interval `[from, to)` of log indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct LogRange {
    pub from: LogIndex,
    pub to: LogIndex,
}

impl LogRange {
    /// Panics if `from > to`. Use [`LogRange::try_new`] for untrusted bounds.
    pub fn new(from: LogIndex, to: LogIndex) -> Self {
        assert!(from <= to, "invalid log range [{}, {})", from, to);
        Self { from, to }
    }

    pub fn try_new(from: LogIndex, to: LogIndex) -> Result<Self, LogError> {
        if from > to {
            return Err(LogError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// The empty range `[at, at)`.
    pub fn empty_at(at: LogIndex) -> Self {
        Self { from: at, to: at }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    pub fn count(&self) -> u64 {
        LogIndex::distance(self.from, self.to)
    }

    pub fn contains(&self, index: LogIndex) -> bool {
        self.from <= index && index < self.to
    }

    /// Clamped intersection. Disjoint ranges produce `[max_from, max_from)`.
    pub fn intersect(&self, other: &LogRange) -> LogRange {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        if from > to {
            LogRange::empty_at(from)
        } else {
            LogRange { from, to }
        }
    }

    pub fn iter(&self) -> LogRangeIter {
        LogRangeIter {
            current: self.from,
            end: self.to,
        }
    }
}

impl Display for LogRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

impl IntoIterator for LogRange {
    type Item = LogIndex;
    type IntoIter = LogRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct LogRangeIter {
    current: LogIndex,
    end: LogIndex,
}

impl Iterator for LogRangeIter {
    type Item = LogIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let index = self.current;
        self.current = self.current + 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = LogIndex::distance(self.current, self.end) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LogRangeIter {}

/// Identifies one replicated-log stream, e.g. one shard of a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct LogId {
    pub database: String,
    pub id: u64,
}

impl LogId {
    pub fn new(database: impl Into<String>, id: u64) -> Self {
        Self {
            database: database.into(),
            id,
        }
    }
}

impl Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/L{}", self.database, self.id)
    }
}
