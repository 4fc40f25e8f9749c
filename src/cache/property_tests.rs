//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's invariants over random operation sequences.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEngine, ManualClock, RankedIndex, ScoredEntry, BASELINE_SCORE};

// == Test Configuration ==
const TEST_CAPACITY: usize = 5;
const TEST_CANDIDATES: usize = 2;
const TEST_STALE_AFTER_MS: u64 = 10;

// == Strategies ==
/// Small key space so hits, rejections and removals all happen
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Get { key: String },
    Remove { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        2 => (0u64..25).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

/// Deterministic loader: the value is derived from the key alone.
fn derive_value(key: &String) -> anyhow::Result<usize> {
    Ok(key.len() * 100 + key.bytes().map(usize::from).sum::<usize>())
}

fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // For any sequence of reads, removals and clock movements, the cache never
    // holds more than its capacity and both indices agree on membership.
    #[test]
    fn prop_capacity_and_consistency(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let runtime = test_runtime();
        let clock = ManualClock::new(1_000);
        let cache: CacheEngine<String, usize, _> = CacheEngine::builder(derive_value)
            .max_cached_data(TEST_CAPACITY)
            .max_refresh_candidates(TEST_CANDIDATES)
            .stale_after(Duration::from_millis(TEST_STALE_AFTER_MS))
            .clock(clock.clone())
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();

        for op in ops {
            match op {
                CacheOp::Get { key } => {
                    let value = cache.get_value(&key).unwrap();
                    prop_assert_eq!(
                        *value,
                        derive_value(&key).unwrap(),
                        "Value served for wrong key"
                    );
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    prop_assert!(!cache.contains(&key));
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }

            prop_assert!(
                cache.len() <= TEST_CAPACITY,
                "Cache size {} exceeds max {}",
                cache.len(),
                TEST_CAPACITY
            );
            prop_assert!(cache.is_consistent(), "Store and ranked index disagree");
        }
    }

    // Repeated decay passes never push any score below the baseline, and the
    // ranking stays sorted by score.
    #[test]
    fn prop_decay_floor_and_order(
        scores in prop::collection::vec(0u64..20, 1..30),
        passes in 1usize..40,
        step in 1u64..5
    ) {
        let mut index = RankedIndex::new();
        for (seq, score) in scores.iter().enumerate() {
            let entry = ScoredEntry::with_state(seq, Arc::new(()), 0, seq as u64, *score);
            index.insert(Arc::new(entry));
        }

        for _ in 0..passes {
            index.rescore(|entry| entry.decayed_score(step));
            let ranked = index.top_k(index.len());
            prop_assert!(ranked.iter().all(|entry| entry.score >= BASELINE_SCORE));
            prop_assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
        }
        prop_assert_eq!(index.len(), scores.len());
    }

    // Whatever the entry set, the eviction candidate is the last of the
    // top-k ordering, so eviction and refresh selection agree.
    #[test]
    fn prop_lowest_ranked_is_last(
        entries in prop::collection::vec((0u64..5, 0u64..3), 1..25)
    ) {
        let mut index = RankedIndex::new();
        for (seq, (score, created_at)) in entries.iter().enumerate() {
            let entry = ScoredEntry::with_state(seq, Arc::new(()), *created_at, seq as u64, *score);
            index.insert(Arc::new(entry));
        }

        let ranked = index.top_k(entries.len());
        let lowest = index.lowest_ranked().unwrap();
        prop_assert_eq!(ranked.last().unwrap().key, lowest.key);
        prop_assert!(ranked
            .iter()
            .all(|entry| Arc::ptr_eq(entry, lowest) || entry.outranks(lowest)));
    }
}
