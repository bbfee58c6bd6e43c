//! # memidx
//!
//! The indexing core for an in-memory keyed data server.
//!
//! ## Structures
//!
//! - **Hash index**: chained hashing over caller-owned records with
//!   progressive resizing — growth relocates one bucket per insert instead of
//!   rehashing in one pause, keeping worst-case added latency per operation
//!   bounded.
//! - **Order-statistics tree**: an AVL tree augmented with subtree sizes,
//!   giving O(log n) rebalance, deletion, and rank-offset queries.
//!
//! Both structures link records by 32-bit slab handles and leave hashing,
//! equality, and ordering to the caller; [`RankedSet`] is the bundled
//! consumer that wires a scored key set through both.
//!
//! ## Example
//!
//! ```rust
//! use memidx::RankedSet;
//!
//! let mut set = RankedSet::new();
//! set.insert(b"alice", 42.0);
//! set.insert(b"bob", 7.0);
//!
//! assert_eq!(set.score(b"alice"), Some(42.0));
//! // Lowest score ranks first.
//! assert_eq!(set.nth(0).unwrap().0, b"bob");
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hash;
pub mod ranked;
pub mod slab;
pub mod tree;

pub use hash::{HashIndex, HashLink, HashNodes};
pub use ranked::{key_hash, RankedSet, Record};
pub use slab::{NodeRef, Slab};
pub use tree::{TreeLink, TreeNodes};

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

/// Sizing for the hash index side of a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial slot count (rounded up to a power of two).
    pub initial_slots: usize,
    /// Mean chain length tolerated before the table doubles.
    pub max_load: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_slots: hash::DEFAULT_INITIAL_SLOTS,
            max_load: hash::DEFAULT_MAX_LOAD,
        }
    }
}

/// A shared, lock-guarded [`RankedSet`].
///
/// The core structures are single-threaded by design; this facade is the
/// external serialization they require, so multiple threads can share one
/// store. Composite read-modify-write sequences still need the caller to
/// hold their own span.
pub struct RankedKv {
    inner: RwLock<RankedSet>,
    len: AtomicUsize,
    #[allow(dead_code)]
    config: Config,
}

impl RankedKv {
    /// An empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// An empty store with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: RwLock::new(RankedSet::with_config(&config)),
            len: AtomicUsize::new(0),
            config,
        }
    }

    /// Insert a key with a score, or update an existing key's score.
    /// Returns `true` if the key is new.
    pub fn insert(&self, key: impl AsRef<[u8]>, score: f64) -> bool {
        let fresh = self.inner.write().insert(key.as_ref(), score);
        if fresh {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    /// The score stored for a key.
    pub fn score(&self, key: impl AsRef<[u8]>) -> Option<f64> {
        self.inner.read().score(key.as_ref())
    }

    /// Remove a key; `false` if it was absent.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> bool {
        let removed = self.inner.write().remove(key.as_ref());
        if removed {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Records at or above `(min_score, min_key)`, skipping `offset` ranks,
    /// at most `limit` of them.
    pub fn range(
        &self,
        min_score: f64,
        min_key: impl AsRef<[u8]>,
        offset: i64,
        limit: usize,
    ) -> Vec<(Vec<u8>, f64)> {
        self.inner
            .read()
            .range(min_score, min_key.as_ref(), offset, limit)
            .into_iter()
            .map(|(key, score)| (key.to_vec(), score))
            .collect()
    }

    /// The record at 0-based `rank` in `(score, key)` order.
    pub fn nth(&self, rank: usize) -> Option<(Vec<u8>, f64)> {
        self.inner
            .read()
            .nth(rank)
            .map(|(key, score)| (key.to_vec(), score))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RankedKv {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests;
