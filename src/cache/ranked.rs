//! Ranked Index Module
//!
//! Orders cached entries by usage score for eviction and refresh selection.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::entry::{RankKey, ScoredEntry};

// == Ranked Index ==
/// Entries ordered by their [`RankKey`].
///
/// - First = highest ranked (refresh candidates)
/// - Last = lowest ranked (eviction candidate)
#[derive(Debug)]
pub struct RankedIndex<K, V> {
    entries: BTreeMap<RankKey, Arc<ScoredEntry<K, V>>>,
}

impl<K: Clone, V> Default for RankedIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V> RankedIndex<K, V> {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Adds an entry. Returns false if an identical rank position was already taken.
    pub fn insert(&mut self, entry: Arc<ScoredEntry<K, V>>) -> bool {
        let rank = entry.rank_key();
        if self.entries.contains_key(&rank) {
            return false;
        }
        self.entries.insert(rank, entry);
        true
    }

    // == Remove ==
    /// Removes the given entry. Returns true if it was present.
    pub fn remove(&mut self, entry: &ScoredEntry<K, V>) -> bool {
        self.entries.remove(&entry.rank_key()).is_some()
    }

    // == Lowest Ranked ==
    /// Returns the current eviction candidate without removing it.
    pub fn lowest_ranked(&self) -> Option<&Arc<ScoredEntry<K, V>>> {
        self.entries.last_key_value().map(|(_, entry)| entry)
    }

    /// Removes and returns the current eviction candidate.
    pub fn pop_lowest(&mut self) -> Option<Arc<ScoredEntry<K, V>>> {
        self.entries.pop_last().map(|(_, entry)| entry)
    }

    // == Top K ==
    /// Returns up to `n` highest-ranked entries, best first.
    pub fn top_k(&self, n: usize) -> Vec<Arc<ScoredEntry<K, V>>> {
        self.entries.values().take(n).cloned().collect()
    }

    // == Rescore ==
    /// Applies `score_fn` to every entry and re-sorts the index.
    ///
    /// Returns the replacement entries for those whose score changed so the
    /// caller can mirror them into the keyed store.
    pub fn rescore<F>(&mut self, mut score_fn: F) -> Vec<Arc<ScoredEntry<K, V>>>
    where
        F: FnMut(&ScoredEntry<K, V>) -> u64,
    {
        let mut replaced = Vec::new();
        let previous = std::mem::take(&mut self.entries);

        for (rank, entry) in previous {
            let score = score_fn(&entry);
            if score == entry.score {
                self.entries.insert(rank, entry);
            } else {
                let updated = Arc::new(entry.rescored(score));
                self.entries.insert(updated.rank_key(), Arc::clone(&updated));
                replaced.push(updated);
            }
        }

        replaced
    }

    // == Iteration ==
    /// Keys from highest to lowest rank.
    pub fn keys_in_rank_order(&self) -> Vec<K> {
        self.entries.values().map(|entry| entry.key.clone()).collect()
    }

    // == Length ==
    /// Returns the number of ranked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, created_at: u64, seq: u64, score: u64) -> Arc<ScoredEntry<String, u32>> {
        Arc::new(ScoredEntry::with_state(
            key.to_string(),
            Arc::new(0),
            created_at,
            seq,
            score,
        ))
    }

    #[test]
    fn test_index_new() {
        let index: RankedIndex<String, u32> = RankedIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.lowest_ranked().is_none());
        assert!(index.top_k(3).is_empty());
    }

    #[test]
    fn test_lowest_ranked_is_smallest_score() {
        let mut index = RankedIndex::new();
        index.insert(entry("a", 100, 0, 5));
        index.insert(entry("b", 100, 1, 1));
        index.insert(entry("c", 100, 2, 3));

        let lowest = index.lowest_ranked().unwrap();
        assert_eq!(lowest.key, "b");
        assert_eq!(lowest.rank_key().score(), 1);
    }

    #[test]
    fn test_top_k_ordering() {
        let mut index = RankedIndex::new();
        index.insert(entry("a", 100, 0, 5));
        index.insert(entry("b", 100, 1, 1));
        index.insert(entry("c", 100, 2, 3));

        let top: Vec<String> = index.top_k(2).iter().map(|e| e.key.clone()).collect();
        assert_eq!(top, vec!["a".to_string(), "c".to_string()]);

        // Asking for more than stored returns everything without mutating.
        assert_eq!(index.top_k(10).len(), 3);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_equal_scores_evict_newest_first() {
        let mut index = RankedIndex::new();
        index.insert(entry("old", 100, 0, 2));
        index.insert(entry("new", 200, 1, 2));

        assert_eq!(index.pop_lowest().unwrap().key, "new");
        assert_eq!(index.pop_lowest().unwrap().key, "old");
        assert!(index.pop_lowest().is_none());
    }

    #[test]
    fn test_remove() {
        let mut index = RankedIndex::new();
        let a = entry("a", 100, 0, 1);
        let b = entry("b", 100, 1, 1);
        index.insert(Arc::clone(&a));
        index.insert(Arc::clone(&b));

        assert!(index.remove(&a));
        assert!(!index.remove(&a), "second remove is a no-op");
        assert_eq!(index.keys_in_rank_order(), vec!["b".to_string()]);
    }

    #[test]
    fn test_insert_duplicate_rank_rejected() {
        let mut index = RankedIndex::new();
        let a = entry("a", 100, 0, 1);

        assert!(index.insert(Arc::clone(&a)));
        assert!(!index.insert(a));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_rescore_reorders_and_reports_changes() {
        let mut index = RankedIndex::new();
        index.insert(entry("a", 100, 0, 5));
        index.insert(entry("b", 100, 1, 0));
        index.insert(entry("c", 100, 2, 2));

        // Decay everything by 3, floored at zero.
        let replaced = index.rescore(|e| e.score.saturating_sub(3));

        let mut changed: Vec<String> = replaced.iter().map(|e| e.key.clone()).collect();
        changed.sort();
        assert_eq!(changed, vec!["a".to_string(), "c".to_string()]);

        // a=2, c=0 (seq 2), b=0 (seq 1)
        assert_eq!(
            index.keys_in_rank_order(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_rescore_no_change_keeps_entries() {
        let mut index = RankedIndex::new();
        let a = entry("a", 100, 0, 0);
        index.insert(Arc::clone(&a));

        let replaced = index.rescore(|e| e.score);
        assert!(replaced.is_empty());
        assert!(Arc::ptr_eq(index.lowest_ranked().unwrap(), &a));
    }
}
