//! Ranked key/score store: the record type consuming both index cores.
//!
//! Each record embeds a [`HashLink`] and a [`TreeLink`]; the hash index
//! answers point lookups by key while the tree keeps records ordered by
//! `(score, key)` for rank and range queries. The store supplies everything
//! the cores leave to collaborators: the key digest, the equality predicate,
//! the ordering descent, and the handle-to-record mapping.

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::hash::{HashIndex, HashLink, HashNodes};
use crate::slab::{NodeRef, Slab};
use crate::tree::{self, TreeLink, TreeNodes};
use crate::Config;

/// Key bytes, stored inline up to 16 bytes.
type KeyBuf = SmallVec<[u8; 16]>;

/// FNV-1a 64-bit digest of raw key bytes.
///
/// Strong enough to avoid accidental clustering on legitimate keys; not a
/// defense against adversarially chosen ones.
pub fn key_hash(key: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in key {
        h ^= byte as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// A keyed, scored record carrying both embedded links.
pub struct Record {
    key: KeyBuf,
    score: f64,
    index: HashLink,
    order: TreeLink,
}

impl Record {
    /// The record's key bytes.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The record's score.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// `(score, key)` ordering; scores compare by `total_cmp`, ties break on
    /// key bytes.
    fn cmp_rank(&self, score: f64, key: &[u8]) -> Ordering {
        self.score
            .total_cmp(&score)
            .then_with(|| self.key.as_slice().cmp(key))
    }
}

impl HashNodes for Slab<Record> {
    fn hash_link(&self, node: NodeRef) -> &HashLink {
        &self[node].index
    }

    fn hash_link_mut(&mut self, node: NodeRef) -> &mut HashLink {
        &mut self[node].index
    }
}

impl TreeNodes for Slab<Record> {
    fn tree_link(&self, node: NodeRef) -> &TreeLink {
        &self[node].order
    }

    fn tree_link_mut(&mut self, node: NodeRef) -> &mut TreeLink {
        &mut self[node].order
    }
}

/// A set of scored keys with O(1) point access and O(log n) rank access.
///
/// Synchronous and single-threaded; wrap it (or see [`RankedKv`]) for shared
/// use.
///
/// [`RankedKv`]: crate::RankedKv
pub struct RankedSet {
    pub(crate) records: Slab<Record>,
    pub(crate) index: HashIndex,
    pub(crate) root: NodeRef,
}

impl RankedSet {
    /// An empty set with default index sizing.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// An empty set sized per `config`.
    pub fn with_config(config: &Config) -> Self {
        Self {
            records: Slab::new(),
            index: HashIndex::with_slots(config.initial_slots, config.max_load),
            root: NodeRef::NULL,
        }
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the set holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert a key with a score, or update an existing key's score.
    /// Returns `true` if the key is new.
    pub fn insert(&mut self, key: &[u8], score: f64) -> bool {
        if let Some(node) = self.find(key) {
            if self.records[node].score.total_cmp(&score) != Ordering::Equal {
                self.tree_detach(node);
                self.records[node].score = score;
                self.tree_attach(node);
            }
            return false;
        }
        let node = self.records.insert(Record {
            key: KeyBuf::from_slice(key),
            score,
            index: HashLink::new(key_hash(key)),
            order: TreeLink::new(),
        });
        self.index.insert(&mut self.records, node);
        self.tree_attach(node);
        true
    }

    /// The score stored for `key`, if present.
    pub fn score(&self, key: &[u8]) -> Option<f64> {
        self.find(key).map(|node| self.records[node].score)
    }

    /// Remove a key; `false` if it was absent.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let removed = self
            .index
            .remove(&mut self.records, key_hash(key), |recs, n| {
                recs[n].key.as_slice() == key
            });
        let Some(node) = removed else {
            return false;
        };
        self.root = tree::remove(&mut self.records, node);
        self.records.remove(node);
        true
    }

    /// Records at or above the `(min_score, min_key)` bound, skipping
    /// `offset` ranks, at most `limit` of them, in rank order.
    ///
    /// A negative `offset` reaches below the bound.
    pub fn range(
        &self,
        min_score: f64,
        min_key: &[u8],
        offset: i64,
        limit: usize,
    ) -> Vec<(&[u8], f64)> {
        let mut out = Vec::new();
        let Some(start) = self.seek_ge(min_score, min_key) else {
            return out;
        };
        let Some(mut node) = tree::offset(&self.records, start, offset) else {
            return out;
        };
        while out.len() < limit {
            let rec = &self.records[node];
            out.push((rec.key.as_slice(), rec.score));
            match tree::offset(&self.records, node, 1) {
                Some(next) => node = next,
                None => break,
            }
        }
        out
    }

    /// The record at 0-based `rank` in `(score, key)` order.
    pub fn nth(&self, rank: usize) -> Option<(&[u8], f64)> {
        if self.root.is_null() {
            return None;
        }
        let mut first = self.root;
        loop {
            let left = self.records[first].order.left;
            if left.is_null() {
                break;
            }
            first = left;
        }
        let node = tree::offset(&self.records, first, rank as i64)?;
        let rec = &self.records[node];
        Some((rec.key.as_slice(), rec.score))
    }

    /// Visit every record in hash-index order, stopping when `visit` returns
    /// `false`.
    pub fn for_each_key(&self, mut visit: impl FnMut(&[u8], f64) -> bool) {
        self.index.for_each(&self.records, |node| {
            let rec = &self.records[node];
            visit(rec.key.as_slice(), rec.score)
        });
    }

    fn find(&self, key: &[u8]) -> Option<NodeRef> {
        self.index
            .lookup(&self.records, key_hash(key), |recs, n| {
                recs[n].key.as_slice() == key
            })
    }

    /// Binary descent to the insertion point, then rebalance from the new
    /// node. The ordering lives here; the tree core never compares records.
    fn tree_attach(&mut self, node: NodeRef) {
        self.records[node].order = TreeLink::new();
        if self.root.is_null() {
            self.root = node;
            return;
        }
        let score = self.records[node].score;
        let mut cur = self.root;
        loop {
            let go_left = {
                let key = self.records[node].key.as_slice();
                self.records[cur].cmp_rank(score, key) == Ordering::Greater
            };
            let next = if go_left {
                self.records[cur].order.left
            } else {
                self.records[cur].order.right
            };
            if next.is_null() {
                if go_left {
                    self.records[cur].order.left = node;
                } else {
                    self.records[cur].order.right = node;
                }
                self.records[node].order.parent = cur;
                break;
            }
            cur = next;
        }
        self.root = tree::fix(&mut self.records, node);
    }

    fn tree_detach(&mut self, node: NodeRef) {
        self.root = tree::remove(&mut self.records, node);
    }

    /// Least record at or above the bound, by leftward-biased descent.
    fn seek_ge(&self, score: f64, key: &[u8]) -> Option<NodeRef> {
        let mut found = NodeRef::NULL;
        let mut cur = self.root;
        while !cur.is_null() {
            let rec = &self.records[cur];
            if rec.cmp_rank(score, key) == Ordering::Less {
                cur = rec.order.right;
            } else {
                found = cur;
                cur = rec.order.left;
            }
        }
        if found.is_null() {
            None
        } else {
            Some(found)
        }
    }
}

impl Default for RankedSet {
    fn default() -> Self {
        Self::new()
    }
}
