//! Unit tests for the in-memory log.

#[cfg(test)]
mod in_memory_log_tests {
    use std::time::Instant;

    use crate::context::LoggerContext;
    use crate::log::*;
    use crate::types::{LogIndex, LogRange, LogTerm, TermIndexPair};

    fn idx(value: u64) -> LogIndex {
        LogIndex::new(value)
    }

    fn range(from: u64, to: u64) -> LogRange {
        LogRange::new(idx(from), idx(to))
    }

    fn create_test_entry(index: u64, term: u64) -> InMemoryLogEntry {
        InMemoryLogEntry::new(
            PersistingLogEntry::new(
                LogTerm::new(term),
                idx(index),
                LogPayload::create_from_string(&format!("command_{}", index)),
            ),
            Instant::now(),
            false,
        )
    }

    /// Log starting at `first` with `count` entries per `(term, count)` pair.
    fn create_log_with_terms(first: u64, distribution: &[(u64, u64)]) -> InMemoryLog {
        let mut entries = Vec::new();
        let mut index = first;
        for &(term, count) in distribution {
            for _ in 0..count {
                entries.push(create_test_entry(index, term));
                index += 1;
            }
        }
        InMemoryLog::starting_at(idx(first)).append(&LoggerContext::new(), entries)
    }

    fn indexes(iter: impl Iterator<Item = PersistingLogEntry>) -> Vec<u64> {
        iter.map(|e| e.log_index().value()).collect()
    }

    #[test]
    fn test_empty_log() {
        let log = InMemoryLog::new();
        assert!(log.is_empty());
        assert_eq!(log.get_index_range(), range(1, 1));
        assert_eq!(log.get_first_index(), idx(1));
        assert_eq!(log.get_next_index(), idx(1));
        assert!(log.get_first_entry().is_none());
        assert!(log.get_last_entry().is_none());
        assert!(log.get_last_term_index_pair().is_none());
        assert!(log.get_entry_by_index(idx(1)).is_none());
    }

    #[test]
    #[should_panic(expected = "empty log")]
    fn test_last_index_of_empty_log_panics() {
        let _ = InMemoryLog::new().get_last_index();
    }

    #[test]
    #[should_panic(expected = "empty log")]
    fn test_last_term_of_empty_log_panics() {
        let _ = InMemoryLog::starting_at(idx(5)).get_last_term();
    }

    #[test]
    fn test_append_single_entry() {
        let ctx = LoggerContext::new();
        let log = InMemoryLog::new();
        let entry = InMemoryLogEntry::new(
            PersistingLogEntry::new(LogTerm::new(1), idx(1), LogPayload::create_from_string("foo")),
            Instant::now(),
            false,
        );
        let log = log.append_entry(&ctx, entry);

        assert_eq!(log.get_index_range(), range(1, 2));
        let first = log.get_first_entry().unwrap();
        let last = log.get_last_entry().unwrap();
        assert_eq!(first.entry(), last.entry());
        assert_eq!(first.log_index(), idx(1));
        assert_eq!(first.entry().log_payload().unwrap().as_slice(), b"foo");
        assert_eq!(log.get_last_term(), LogTerm::new(1));
        assert_eq!(log.get_last_index(), idx(1));
    }

    #[test]
    #[should_panic(expected = "gap detected")]
    fn test_append_entry_with_gap_panics() {
        let log = create_log_with_terms(1, &[(1, 3)]);
        let _ = log.append_entry(&LoggerContext::new(), create_test_entry(5, 1));
    }

    #[test]
    #[should_panic(expected = "gap detected")]
    fn test_append_entry_overlapping_panics() {
        let log = create_log_with_terms(1, &[(1, 3)]);
        let _ = log.append_entry(&LoggerContext::new(), create_test_entry(3, 1));
    }

    #[test]
    fn test_bulk_append_extends_range() {
        let ctx = LoggerContext::new();
        let log = create_log_with_terms(10, &[(1, 4)]);
        let next = log.get_next_index().value();
        let appended = log.append(&ctx, (next..next + 6).map(|i| create_test_entry(i, 2)));

        assert_eq!(appended.get_index_range(), range(10, 20));
        assert_eq!(appended.get_index_range().to, log.get_index_range().to + 6);
        assert_eq!(appended.get_last_term(), LogTerm::new(2));
        // the old value is unaffected
        assert_eq!(log.get_index_range(), range(10, 14));
    }

    #[test]
    fn test_bulk_append_empty_is_noop() {
        let log = create_log_with_terms(3, &[(1, 2)]);
        let same = log.append(&LoggerContext::new(), Vec::new());
        assert_eq!(same.get_index_range(), log.get_index_range());
    }

    #[test]
    #[should_panic(expected = "gap detected")]
    fn test_bulk_append_wrong_start_panics() {
        let log = create_log_with_terms(1, &[(1, 5)]);
        let _ = log.append(&LoggerContext::new(), vec![create_test_entry(7, 1)]);
    }

    #[test]
    #[should_panic(expected = "gap detected")]
    fn test_bulk_append_non_contiguous_panics() {
        let log = create_log_with_terms(1, &[(1, 5)]);
        let _ = log.append(
            &LoggerContext::new(),
            vec![create_test_entry(6, 1), create_test_entry(8, 1)],
        );
    }

    #[test]
    fn test_append_does_not_check_terms() {
        let log = create_log_with_terms(1, &[(5, 2)]);
        let log = log.append_entry(&LoggerContext::new(), create_test_entry(3, 4));
        assert_eq!(log.get_last_term(), LogTerm::new(4));
    }

    #[test]
    fn test_append_log_shares_structure() {
        let ctx = LoggerContext::new();
        let head = create_log_with_terms(1, &[(1, 40)]);
        let tail = create_log_with_terms(41, &[(2, 40)]);
        let joined = head.append_log(&ctx, &tail);
        assert_eq!(joined.get_index_range(), range(1, 81));
        assert_eq!(joined.get_term_of_index(idx(41)), Some(LogTerm::new(2)));
        assert_eq!(joined.get_term_of_index(idx(40)), Some(LogTerm::new(1)));
    }

    #[test]
    fn test_index_range_matches_size() {
        for first in [1, 5, 100] {
            for count in [0, 1, 31, 32, 33, 100] {
                let log = create_log_with_terms(first, &[(1, count)]);
                assert_eq!(log.get_index_range(), range(first, first + count));
                assert_eq!(log.len() as u64, count);
            }
        }
    }

    #[test]
    fn test_get_entry_by_index() {
        let log = create_log_with_terms(5, &[(1, 10)]);
        for i in 5..15 {
            assert_eq!(log.get_entry_by_index(idx(i)).unwrap().log_index(), idx(i));
        }
        assert!(log.get_entry_by_index(idx(4)).is_none());
        assert!(log.get_entry_by_index(idx(15)).is_none());
        assert!(log.get_entry_by_index(idx(0)).is_none());
    }

    #[test]
    fn test_slice() {
        let log = create_log_with_terms(1, &[(1, 20)]);
        let cases = [(5, 10), (0, 4), (15, 40), (0, 100), (30, 40), (7, 7), (21, 21)];
        for (from, to) in cases {
            let slice = log.slice(idx(from), idx(to));
            assert_eq!(
                slice.get_index_range(),
                log.get_index_range().intersect(&range(from, to)),
                "slice [{}, {})",
                from,
                to
            );
            for i in slice.get_index_range() {
                assert_eq!(slice.get_entry_by_index(i).unwrap().log_index(), i);
            }
        }
    }

    #[test]
    fn test_release() {
        let log = create_log_with_terms(1, &[(1, 14)]);
        let released = log.release(idx(5));
        assert_eq!(released.get_index_range(), range(5, 15));
        assert_eq!(released.get_first_entry().unwrap().log_index(), idx(5));
        assert!(released.get_entry_by_index(idx(4)).is_none());
        // the snapshot taken before compaction still has everything
        assert_eq!(log.get_index_range(), range(1, 15));
        assert!(log.get_entry_by_index(idx(4)).is_some());
    }

    #[test]
    fn test_release_bounds() {
        let log = create_log_with_terms(3, &[(1, 10)]);
        let last = log.get_last_index().value();
        for from in 0..=last + 1 {
            let released = log.release(idx(from));
            assert_eq!(
                released.get_index_range(),
                log.get_index_range()
                    .intersect(&LogRange::new(idx(from), LogIndex::new(u64::MAX)))
            );
        }
        assert_eq!(log.release(idx(1)).get_index_range(), log.get_index_range());
    }

    #[test]
    fn test_release_past_next_index_empties_log() {
        let log = create_log_with_terms(1, &[(1, 10)]);
        let released = log.release(idx(20));
        assert!(released.is_empty());
        assert_eq!(released.get_index_range(), range(20, 20));
        assert_eq!(released.get_next_index(), idx(20));
        let appended = released.append_entry(&LoggerContext::new(), create_test_entry(20, 2));
        assert_eq!(appended.get_index_range(), range(20, 21));
    }

    #[test]
    fn test_remove_back() {
        let log = create_log_with_terms(5, &[(1, 10)]);
        assert_eq!(log.remove_back(idx(10)).get_index_range(), range(5, 10));
        assert_eq!(log.remove_back(idx(20)).get_index_range(), range(5, 15));
        assert_eq!(log.remove_back(idx(2)).get_index_range(), range(5, 5));
        let truncated = log.remove_back(idx(8));
        let rewritten = truncated.append_entry(&LoggerContext::new(), create_test_entry(8, 3));
        assert_eq!(rewritten.get_term_of_index(idx(8)), Some(LogTerm::new(3)));
        assert_eq!(log.get_term_of_index(idx(8)), Some(LogTerm::new(1)));
    }

    #[test]
    fn test_term_search() {
        for first in [1, 7, 100] {
            let log = create_log_with_terms(first, &[(1, 5), (2, 18)]);
            assert_eq!(log.get_first_index_of_term(LogTerm::new(1)), Some(idx(first)));
            assert_eq!(log.get_last_index_of_term(LogTerm::new(1)), Some(idx(first + 4)));
            assert_eq!(log.get_first_index_of_term(LogTerm::new(2)), Some(idx(first + 5)));
            assert_eq!(log.get_last_index_of_term(LogTerm::new(2)), Some(idx(first + 22)));
            assert_eq!(log.get_first_index_of_term(LogTerm::new(3)), None);
            assert_eq!(log.get_last_index_of_term(LogTerm::new(3)), None);
            assert_eq!(log.get_first_index_of_term(LogTerm::new(0)), None);
            assert_eq!(log.get_last_index_of_term(LogTerm::new(0)), None);
        }
    }

    #[test]
    fn test_term_search_with_holes_in_terms() {
        let log = create_log_with_terms(1, &[(1, 3), (4, 50), (9, 1)]);
        assert_eq!(log.get_first_index_of_term(LogTerm::new(2)), None);
        assert_eq!(log.get_last_index_of_term(LogTerm::new(5)), None);
        assert_eq!(log.get_first_index_of_term(LogTerm::new(4)), Some(idx(4)));
        assert_eq!(log.get_last_index_of_term(LogTerm::new(4)), Some(idx(53)));
        assert_eq!(log.get_first_index_of_term(LogTerm::new(9)), Some(idx(54)));
        assert_eq!(log.get_last_index_of_term(LogTerm::new(9)), Some(idx(54)));
        assert_eq!(
            log.get_last_term_index_pair(),
            Some(TermIndexPair::new(LogTerm::new(9), idx(54)))
        );
    }

    #[test]
    fn test_term_search_on_empty_log() {
        let log = InMemoryLog::starting_at(idx(10));
        assert_eq!(log.get_first_index_of_term(LogTerm::new(1)), None);
        assert_eq!(log.get_last_index_of_term(LogTerm::new(1)), None);
    }

    #[test]
    fn test_iterator_range() {
        let log = create_log_with_terms(1, &[(1, 50)]);
        let iter = log.get_iterator_range(range(10, 20));
        assert_eq!(iter.range(), range(10, 20));
        assert_eq!(indexes(iter), (10..20).collect::<Vec<_>>());

        let iter = log.get_iterator_range(range(45, 60));
        assert_eq!(iter.range(), range(45, 51));
        assert_eq!(indexes(iter), (45..51).collect::<Vec<_>>());
    }

    #[test]
    fn test_iterator_from() {
        let log = create_log_with_terms(5, &[(1, 10), (2, 5)]);
        let iter = log.get_iterator_from(idx(12));
        assert_eq!(iter.range(), range(12, 20));
        assert_eq!(indexes(iter), (12..20).collect::<Vec<_>>());
        assert_eq!(indexes(log.get_iterator_from(idx(0))), (5..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_iterator_over_disjoint_range() {
        let log = create_log_with_terms(10, &[(1, 10)]);

        let mut iter = log.get_iterator_range(range(30, 40));
        assert_eq!(iter.range(), range(30, 30));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        let mut iter = log.get_iterator_range(range(1, 5));
        assert!(iter.range().is_empty());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_iterator_outlives_log() {
        let iter = {
            let log = create_log_with_terms(1, &[(1, 100)]);
            log.get_iterator_from(idx(90))
        };
        assert_eq!(indexes(iter), (90..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_in_memory_iterator() {
        let log = create_log_with_terms(1, &[(1, 5)]);
        let iter = log.get_in_memory_iterator_from(idx(3));
        assert_eq!(iter.range(), range(3, 6));
        let terms: Vec<_> = iter.map(|e| e.log_term()).collect();
        assert_eq!(terms, vec![LogTerm::new(1); 3]);
    }

    #[test]
    fn test_snapshots_are_independent() {
        let ctx = LoggerContext::new();
        let mut log = InMemoryLog::new();
        let mut snapshots = Vec::new();
        for i in 1..=200 {
            log = log.append_entry(&ctx, create_test_entry(i, 1 + i / 50));
            if i % 20 == 0 {
                snapshots.push(log.clone());
                log = log.release(idx(i - 10));
            }
        }
        for (n, snapshot) in snapshots.iter().enumerate() {
            let to = 20 * (n as u64 + 1);
            assert_eq!(snapshot.get_next_index(), idx(to + 1));
            let from = snapshot.get_first_index().value();
            assert_eq!(
                indexes(snapshot.get_iterator_from(idx(0))),
                (from..=to).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_from_entries() {
        let log = InMemoryLog::from_entries((4..9).map(|i| create_test_entry(i, 2)));
        assert_eq!(log.get_index_range(), range(4, 9));
        assert_eq!(InMemoryLog::from_entries(Vec::new()).get_index_range(), range(1, 1));
    }

    #[test]
    fn test_from_persisted_entries() {
        let persisted = (3..6).map(|i| {
            PersistingLogEntry::new(LogTerm::new(1), idx(i), LogPayload::from_bytes(vec![i as u8]))
        });
        let log = InMemoryLog::from_persisted_entries(idx(3), persisted, Instant::now());
        assert_eq!(log.get_index_range(), range(3, 6));
        assert!(!log.get_last_entry().unwrap().wait_for_sync());
    }

    #[test]
    fn test_dump() {
        let log = create_log_with_terms(1, &[(1, 2), (2, 1)]);
        assert_eq!(log.dump(), "InMemoryLog [1, 4) [(1:1) (1:2) (2:3)]");
        assert_eq!(InMemoryLog::new().dump(), "InMemoryLog [1, 1) []");
    }
}
