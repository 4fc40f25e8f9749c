//! Value Loader Module
//!
//! The extension point through which the cache owner computes values.

use std::fmt::Debug;
use std::hash::Hash;

/// Marker trait for cache keys.
///
/// Implemented for every type that can be hashed, cloned and shared across
/// threads. `Debug` is required so failed computations can name their key.
pub trait CacheKey: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

// == Value Loader ==
/// Computes the value for a key.
///
/// Called synchronously on a cache miss and from the refresh pool for stale
/// entries. It may run concurrently for different keys and repeatedly for the
/// same key, so it must not rely on being called once.
///
/// # Example
///
/// ```
/// use refresh_cache::ValueLoader;
///
/// struct Squares;
///
/// impl ValueLoader<u64, u64> for Squares {
///     fn load(&self, key: &u64) -> anyhow::Result<u64> {
///         Ok(key * key)
///     }
/// }
///
/// assert_eq!(Squares.load(&7).unwrap(), 49);
/// ```
pub trait ValueLoader<K, V>: Send + Sync + 'static {
    fn load(&self, key: &K) -> anyhow::Result<V>;
}

impl<K, V, F> ValueLoader<K, V> for F
where
    F: Fn(&K) -> anyhow::Result<V> + Send + Sync + 'static,
{
    fn load(&self, key: &K) -> anyhow::Result<V> {
        self(key)
    }
}
