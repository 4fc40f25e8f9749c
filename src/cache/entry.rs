//! Scored Entry Module
//!
//! Defines individual cache entries carrying a decaying usage score and the
//! total order used to rank them.

use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use crate::cache::BASELINE_SCORE;

// == Rank Key ==
/// Position of an entry in the ranking.
///
/// Sorting ascending puts the most valuable entry first: highest score,
/// then oldest creation time, then lowest construction sequence. The
/// sequence is unique per cache, so two distinct entries never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RankKey {
    score: Reverse<u64>,
    created_at: u64,
    seq: u64,
}

impl RankKey {
    pub fn score(&self) -> u64 {
        self.score.0
    }
}

// == Scored Entry ==
/// A cached key/value pair with creation time and usage score.
///
/// Entries are never mutated once built. Score changes and refreshes build a
/// replacement that shares the key and value.
#[derive(Debug)]
pub struct ScoredEntry<K, V> {
    /// The cache key
    pub key: K,
    /// The cached value
    pub value: Arc<V>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Usage weight, never below the baseline
    pub score: u64,
    /// Construction sequence, unique within one cache
    pub seq: u64,
}

impl<K: Clone, V> ScoredEntry<K, V> {
    // == Constructor ==
    /// Creates an entry at the baseline score.
    pub fn new(key: K, value: Arc<V>, created_at: u64, seq: u64) -> Self {
        Self::with_state(key, value, created_at, seq, BASELINE_SCORE)
    }

    /// Creates an entry carrying an explicit score, as a refresh does.
    pub fn with_state(key: K, value: Arc<V>, created_at: u64, seq: u64, score: u64) -> Self {
        Self {
            key,
            value,
            created_at,
            score: score.max(BASELINE_SCORE),
            seq,
        }
    }

    /// Returns the ranking position of this entry.
    pub fn rank_key(&self) -> RankKey {
        RankKey {
            score: Reverse(self.score),
            created_at: self.created_at,
            seq: self.seq,
        }
    }

    /// True if `self` ranks strictly ahead of `other`.
    pub fn outranks(&self, other: &Self) -> bool {
        self.rank_key() < other.rank_key()
    }

    // == Rescoring ==
    /// Replacement entry with a new score; identity and creation time are kept.
    pub fn rescored(&self, score: u64) -> Self {
        Self::with_state(
            self.key.clone(),
            Arc::clone(&self.value),
            self.created_at,
            self.seq,
            score,
        )
    }

    /// Replacement entry with the score raised by `bonus`.
    pub fn accessed(&self, bonus: u64) -> Self {
        self.rescored(self.score.saturating_add(bonus))
    }

    /// Score after one decay step, floored at the baseline.
    pub fn decayed_score(&self, step: u64) -> u64 {
        self.score.saturating_sub(step).max(BASELINE_SCORE)
    }

    // == Staleness ==
    /// Age of the entry in milliseconds at `now_ms`.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at)
    }

    /// An entry is stale once its age strictly exceeds the threshold.
    pub fn is_stale(&self, now_ms: u64, stale_after_ms: u64) -> bool {
        self.age_ms(now_ms) > stale_after_ms
    }
}

impl<K: Clone, V> PartialEq for ScoredEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.rank_key() == other.rank_key()
    }
}

impl<K: Clone, V> Eq for ScoredEntry<K, V> {}

impl<K: Clone, V> PartialOrd for ScoredEntry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Clone, V> Ord for ScoredEntry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_key().cmp(&other.rank_key())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, created_at: u64, seq: u64, score: u64) -> ScoredEntry<String, u32> {
        ScoredEntry::with_state(key.to_string(), Arc::new(0), created_at, seq, score)
    }

    #[test]
    fn test_entry_starts_at_baseline() {
        let e = ScoredEntry::new("a".to_string(), Arc::new(1), 100, 0);
        assert_eq!(e.score, BASELINE_SCORE);
        assert_eq!(*e.value, 1);
        assert_eq!(e.created_at, 100);
    }

    #[test]
    fn test_higher_score_ranks_first() {
        let hot = entry("hot", 200, 1, 5);
        let cold = entry("cold", 100, 0, 1);

        assert!(hot.outranks(&cold));
        assert!(!cold.outranks(&hot));
        assert!(hot < cold);
    }

    #[test]
    fn test_tie_break_prefers_older_entry() {
        let older = entry("older", 100, 7, 3);
        let newer = entry("newer", 200, 1, 3);

        assert!(older.outranks(&newer));
    }

    #[test]
    fn test_tie_break_falls_back_to_sequence() {
        let first = entry("first", 100, 1, 3);
        let second = entry("second", 100, 2, 3);

        assert!(first.outranks(&second));
        assert_ne!(first, second);
    }

    #[test]
    fn test_entry_does_not_outrank_itself() {
        let e = entry("a", 100, 1, 3);
        assert!(!e.outranks(&e));
    }

    #[test]
    fn test_accessed_raises_score_and_keeps_identity() {
        let e = entry("a", 100, 9, 2);
        let bumped = e.accessed(4);

        assert_eq!(bumped.score, 6);
        assert_eq!(bumped.created_at, 100);
        assert_eq!(bumped.seq, 9);
        assert!(Arc::ptr_eq(&bumped.value, &e.value));
    }

    #[test]
    fn test_decay_floors_at_baseline() {
        let e = entry("a", 100, 1, 2);
        assert_eq!(e.decayed_score(1), 1);
        assert_eq!(e.decayed_score(5), BASELINE_SCORE);
        assert_eq!(entry("b", 100, 2, BASELINE_SCORE).decayed_score(1), BASELINE_SCORE);
    }

    #[test]
    fn test_staleness_boundary() {
        let e = entry("a", 1_000, 1, 0);

        assert!(!e.is_stale(1_000, 0), "same instant is not older than zero");
        assert!(e.is_stale(1_001, 0));
        assert!(!e.is_stale(1_500, 500), "age equal to threshold is still fresh");
        assert!(e.is_stale(1_501, 500));
    }

    #[test]
    fn test_age_saturates_for_clock_skew() {
        let e = entry("a", 1_000, 1, 0);
        assert_eq!(e.age_ms(900), 0);
    }
}
