use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::LogIndex;

/// Write-only sink for replicated-log metrics.
pub trait LogMetrics: Send + Sync {
    fn commit_index_updated(&self, index: LogIndex);
    fn entry_appended(&self, index: LogIndex, approx_bytes: usize);
    fn entries_released(&self, count: u64);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl LogMetrics for NoopMetrics {
    fn commit_index_updated(&self, _index: LogIndex) {}
    fn entry_appended(&self, _index: LogIndex, _approx_bytes: usize) {}
    fn entries_released(&self, _count: u64) {}
}

/// Plain atomic counters.
#[derive(Debug, Default)]
pub struct LogMetricsCounters {
    pub commit_index: AtomicU64,
    pub appended_entries: AtomicU64,
    pub appended_bytes: AtomicU64,
    pub released_entries: AtomicU64,
}

impl LogMetricsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index.load(Ordering::Relaxed)
    }

    pub fn appended_entries(&self) -> u64 {
        self.appended_entries.load(Ordering::Relaxed)
    }

    pub fn appended_bytes(&self) -> u64 {
        self.appended_bytes.load(Ordering::Relaxed)
    }

    pub fn released_entries(&self) -> u64 {
        self.released_entries.load(Ordering::Relaxed)
    }
}

impl LogMetrics for LogMetricsCounters {
    fn commit_index_updated(&self, index: LogIndex) {
        // updates may be reported out of order
        self.commit_index.fetch_max(index.value(), Ordering::Relaxed);
    }

    fn entry_appended(&self, _index: LogIndex, approx_bytes: usize) {
        self.appended_entries.fetch_add(1, Ordering::Relaxed);
        self.appended_bytes
            .fetch_add(approx_bytes as u64, Ordering::Relaxed);
    }

    fn entries_released(&self, count: u64) {
        self.released_entries.fetch_add(count, Ordering::Relaxed);
    }
}
