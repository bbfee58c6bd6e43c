//! Progressively resizing chained hash index.
//!
//! The index is a pair of fixed-capacity tables. Growth never rehashes in one
//! pause: the full table is demoted to a draining role and a cursor walks its
//! buckets, relocating one bucket per insert, so the added latency of a
//! resize is bounded per operation.
//!
//! The index stores no keys and allocates no records. Callers embed a
//! [`HashLink`] in their record, cache the key digest in it once, and expose
//! the link through the [`HashNodes`] seam; equality against a probe is a
//! per-call predicate. Handles, not the index, decide where records live.

use crate::slab::NodeRef;

/// Default number of slots in a fresh index.
pub const DEFAULT_INITIAL_SLOTS: usize = 4;

/// Default growth threshold: mean chain length before the table doubles.
pub const DEFAULT_MAX_LOAD: usize = 8;

/// Chain link embedded in an indexed record.
///
/// A link belongs to at most one chain at a time; the owning record must be
/// removed from the index before its slot is freed.
#[derive(Clone, Copy, Debug)]
pub struct HashLink {
    next: NodeRef,
    hash: u64,
}

impl HashLink {
    /// A detached link carrying the record's cached key digest.
    pub fn new(hash: u64) -> Self {
        Self {
            next: NodeRef::NULL,
            hash,
        }
    }

    /// The cached 64-bit key digest.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Caller-supplied mapping from a handle to its record's embedded link.
pub trait HashNodes {
    /// Borrow the link embedded in `node`'s record.
    fn hash_link(&self, node: NodeRef) -> &HashLink;

    /// Mutably borrow the link embedded in `node`'s record.
    fn hash_link_mut(&mut self, node: NodeRef) -> &mut HashLink;
}

/// One fixed-capacity table: chain heads plus a power-of-two mask.
struct Table {
    slots: Box<[NodeRef]>,
    mask: u64,
    len: usize,
}

impl Table {
    fn new(slot_count: usize) -> Self {
        debug_assert!(slot_count.is_power_of_two());
        Self {
            slots: vec![NodeRef::NULL; slot_count].into_boxed_slice(),
            mask: (slot_count - 1) as u64,
            len: 0,
        }
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        (hash & self.mask) as usize
    }

    /// Prepend `node` to the bucket selected by its cached digest.
    fn insert<S: HashNodes>(&mut self, nodes: &mut S, node: NodeRef) {
        let bucket = self.bucket(nodes.hash_link(node).hash);
        let head = self.slots[bucket];
        nodes.hash_link_mut(node).next = head;
        self.slots[bucket] = node;
        self.len += 1;
    }

    fn lookup<S, F>(&self, nodes: &S, hash: u64, eq: &mut F) -> Option<NodeRef>
    where
        S: HashNodes,
        F: FnMut(&S, NodeRef) -> bool,
    {
        if self.len == 0 {
            return None;
        }
        let mut cur = self.slots[self.bucket(hash)];
        while !cur.is_null() {
            let link = nodes.hash_link(cur);
            if link.hash == hash && eq(nodes, cur) {
                return Some(cur);
            }
            cur = link.next;
        }
        None
    }

    fn remove<S, F>(&mut self, nodes: &mut S, hash: u64, eq: &mut F) -> Option<NodeRef>
    where
        S: HashNodes,
        F: FnMut(&S, NodeRef) -> bool,
    {
        if self.len == 0 {
            return None;
        }
        let bucket = self.bucket(hash);
        let mut prev = NodeRef::NULL;
        let mut cur = self.slots[bucket];
        while !cur.is_null() {
            let link = *nodes.hash_link(cur);
            if link.hash == hash && eq(nodes, cur) {
                if prev.is_null() {
                    self.slots[bucket] = link.next;
                } else {
                    nodes.hash_link_mut(prev).next = link.next;
                }
                nodes.hash_link_mut(cur).next = NodeRef::NULL;
                self.len -= 1;
                return Some(cur);
            }
            prev = cur;
            cur = link.next;
        }
        None
    }

    /// Visit every node; returns `false` if the visitor stopped the walk.
    fn for_each<S, F>(&self, nodes: &S, visit: &mut F) -> bool
    where
        S: HashNodes,
        F: FnMut(NodeRef) -> bool,
    {
        if self.len == 0 {
            return true;
        }
        for &head in self.slots.iter() {
            let mut cur = head;
            while !cur.is_null() {
                if !visit(cur) {
                    return false;
                }
                cur = nodes.hash_link(cur).next;
            }
        }
        true
    }
}

/// Point-lookup index with incremental, bounded-latency growth.
///
/// All operations are synchronous and run to completion; callers needing
/// atomic composite actions must serialize externally.
pub struct HashIndex {
    active: Table,
    draining: Option<Table>,
    migrate_cursor: usize,
    max_load: usize,
}

impl HashIndex {
    /// An index with the default slot count and load threshold.
    pub fn new() -> Self {
        Self::with_slots(DEFAULT_INITIAL_SLOTS, DEFAULT_MAX_LOAD)
    }

    /// An index with an explicit initial slot count (rounded up to a power of
    /// two) and growth threshold.
    pub fn with_slots(initial_slots: usize, max_load: usize) -> Self {
        Self {
            active: Table::new(initial_slots.max(1).next_power_of_two()),
            draining: None,
            migrate_cursor: 0,
            max_load: max_load.max(1),
        }
    }

    /// Find the node whose cached digest is `hash` and whose record satisfies
    /// `eq`. Both tables are consulted while a migration is in flight.
    ///
    /// The scan pre-filters on the cached digest, so `eq` only ever sees
    /// digest-equal candidates and needn't recheck the hash.
    pub fn lookup<S, F>(&self, nodes: &S, hash: u64, mut eq: F) -> Option<NodeRef>
    where
        S: HashNodes,
        F: FnMut(&S, NodeRef) -> bool,
    {
        if let Some(found) = self.active.lookup(nodes, hash, &mut eq) {
            return Some(found);
        }
        self.draining
            .as_ref()
            .and_then(|draining| draining.lookup(nodes, hash, &mut eq))
    }

    /// Link `node` into the index. Always succeeds; screening out duplicate
    /// keys beforehand is the caller's job.
    ///
    /// Each insert also relocates one draining bucket and, once idle, checks
    /// the growth trigger.
    pub fn insert<S: HashNodes>(&mut self, nodes: &mut S, node: NodeRef) {
        self.active.insert(nodes, node);
        self.migrate_step(nodes);
        self.maybe_grow();
    }

    /// Unlink and return the matching node, `None` if absent. Absence is a
    /// normal outcome, not a fault.
    pub fn remove<S, F>(&mut self, nodes: &mut S, hash: u64, mut eq: F) -> Option<NodeRef>
    where
        S: HashNodes,
        F: FnMut(&S, NodeRef) -> bool,
    {
        if let Some(found) = self.active.remove(nodes, hash, &mut eq) {
            return Some(found);
        }
        if let Some(draining) = self.draining.as_mut() {
            if let Some(found) = draining.remove(nodes, hash, &mut eq) {
                if draining.len == 0 {
                    self.draining = None;
                    self.migrate_cursor = 0;
                }
                return Some(found);
            }
        }
        None
    }

    /// Visit every live node, active table first, stopping as soon as `visit`
    /// returns `false`.
    pub fn for_each<S, F>(&self, nodes: &S, mut visit: F)
    where
        S: HashNodes,
        F: FnMut(NodeRef) -> bool,
    {
        if !self.active.for_each(nodes, &mut visit) {
            return;
        }
        if let Some(draining) = self.draining.as_ref() {
            draining.for_each(nodes, &mut visit);
        }
    }

    /// Number of linked nodes across both tables.
    #[inline]
    pub fn len(&self) -> usize {
        self.active.len + self.draining.as_ref().map_or(0, |t| t.len)
    }

    /// Whether the index holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count of the active table.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.active.slots.len()
    }

    /// Nodes still awaiting relocation, 0 when migration is idle.
    #[inline]
    pub fn draining_len(&self) -> usize {
        self.draining.as_ref().map_or(0, |t| t.len)
    }

    /// Whether a resize migration is in flight.
    #[inline]
    pub fn is_migrating(&self) -> bool {
        self.draining.is_some()
    }

    /// Relocate one draining bucket into the active table. Exhausted buckets
    /// cost only a cursor advance, so the added work per insert stays O(1)
    /// amortized.
    fn migrate_step<S: HashNodes>(&mut self, nodes: &mut S) {
        let Some(draining) = self.draining.as_mut() else {
            return;
        };
        while self.migrate_cursor < draining.slots.len()
            && draining.slots[self.migrate_cursor].is_null()
        {
            self.migrate_cursor += 1;
        }
        if self.migrate_cursor < draining.slots.len() {
            let mut cur =
                std::mem::replace(&mut draining.slots[self.migrate_cursor], NodeRef::NULL);
            while !cur.is_null() {
                let next = nodes.hash_link(cur).next;
                draining.len -= 1;
                self.active.insert(nodes, cur);
                cur = next;
            }
            self.migrate_cursor += 1;
        }
        if draining.len == 0 {
            self.draining = None;
            self.migrate_cursor = 0;
        }
    }

    /// Start a resize once the active table exceeds its load threshold. Only
    /// one migration may be in flight; a trigger while draining is a no-op.
    fn maybe_grow(&mut self) {
        if self.draining.is_some() {
            return;
        }
        if self.active.len <= self.active.slots.len() * self.max_load {
            return;
        }
        let grown = Table::new(self.active.slots.len() * 2);
        self.draining = Some(std::mem::replace(&mut self.active, grown));
        self.migrate_cursor = 0;
    }
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::new()
    }
}
