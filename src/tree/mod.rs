//! Order-statistics AVL tree over handle-linked records.
//!
//! The tree core only rebalances, deletes, and answers rank-offset queries.
//! Finding an insertion point is the caller's job: descend with your own
//! ordering, attach the new node's links, then call [`fix`] from it. The
//! caller also holds the root handle — there is no container type, so any
//! number of records can carry an embedded [`TreeLink`] in any store shape.
//!
//! Every node is augmented with its subtree size, which is what lets
//! [`offset`] reach the element `k` sorted positions away in O(log n)
//! without enumerating the order.

use crate::slab::NodeRef;

/// Structural links embedded in a tree-resident record.
///
/// `parent` is a non-owning back-reference; `left`/`right` are the structural
/// children. `height` is 1 + the taller child's height (0 for an absent
/// child); `size` is 1 + both children's sizes. Fields are public because
/// insertion-point descent and attachment happen outside the core.
#[derive(Clone, Copy, Debug)]
pub struct TreeLink {
    /// Back-reference to the parent, NULL at the root.
    pub parent: NodeRef,
    /// Left structural child.
    pub left: NodeRef,
    /// Right structural child.
    pub right: NodeRef,
    /// 1 + max child height; a detached leaf has height 1.
    pub height: u32,
    /// 1 + left size + right size; a detached leaf has size 1.
    pub size: u32,
}

impl TreeLink {
    /// The detached single-node state: no links, height 1, size 1.
    pub fn new() -> Self {
        Self {
            parent: NodeRef::NULL,
            left: NodeRef::NULL,
            right: NodeRef::NULL,
            height: 1,
            size: 1,
        }
    }
}

impl Default for TreeLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-supplied mapping from a handle to its record's embedded link.
pub trait TreeNodes {
    /// Borrow the link embedded in `node`'s record.
    fn tree_link(&self, node: NodeRef) -> &TreeLink;

    /// Mutably borrow the link embedded in `node`'s record.
    fn tree_link_mut(&mut self, node: NodeRef) -> &mut TreeLink;
}

#[inline]
fn height<S: TreeNodes>(nodes: &S, node: NodeRef) -> u32 {
    if node.is_null() {
        0
    } else {
        nodes.tree_link(node).height
    }
}

#[inline]
fn size<S: TreeNodes>(nodes: &S, node: NodeRef) -> u32 {
    if node.is_null() {
        0
    } else {
        nodes.tree_link(node).size
    }
}

/// Recompute a node's height and size from its children.
fn update<S: TreeNodes>(nodes: &mut S, node: NodeRef) {
    let link = *nodes.tree_link(node);
    let h = 1 + height(nodes, link.left).max(height(nodes, link.right));
    let s = 1 + size(nodes, link.left) + size(nodes, link.right);
    let link = nodes.tree_link_mut(node);
    link.height = h;
    link.size = s;
}

/// Rotate `node` leftward; its right child becomes the local root, which is
/// returned. The parent's child slot is left for the caller to reattach.
fn rot_left<S: TreeNodes>(nodes: &mut S, node: NodeRef) -> NodeRef {
    let parent = nodes.tree_link(node).parent;
    let pivot = nodes.tree_link(node).right;
    let inner = nodes.tree_link(pivot).left;

    nodes.tree_link_mut(node).right = inner;
    if !inner.is_null() {
        nodes.tree_link_mut(inner).parent = node;
    }

    nodes.tree_link_mut(pivot).parent = parent;
    nodes.tree_link_mut(pivot).left = node;
    nodes.tree_link_mut(node).parent = pivot;

    update(nodes, node);
    update(nodes, pivot);
    pivot
}

/// Mirror of [`rot_left`].
fn rot_right<S: TreeNodes>(nodes: &mut S, node: NodeRef) -> NodeRef {
    let parent = nodes.tree_link(node).parent;
    let pivot = nodes.tree_link(node).left;
    let inner = nodes.tree_link(pivot).right;

    nodes.tree_link_mut(node).left = inner;
    if !inner.is_null() {
        nodes.tree_link_mut(inner).parent = node;
    }

    nodes.tree_link_mut(pivot).parent = parent;
    nodes.tree_link_mut(pivot).right = node;
    nodes.tree_link_mut(node).parent = pivot;

    update(nodes, node);
    update(nodes, pivot);
    pivot
}

/// Left subtree two levels taller: rotate the left child leftward first when
/// it leans right (zig-zag), then rotate `node` rightward.
fn fix_left<S: TreeNodes>(nodes: &mut S, node: NodeRef) -> NodeRef {
    let left = nodes.tree_link(node).left;
    let link = *nodes.tree_link(left);
    if height(nodes, link.left) < height(nodes, link.right) {
        let rotated = rot_left(nodes, left);
        nodes.tree_link_mut(node).left = rotated;
    }
    rot_right(nodes, node)
}

/// Mirror of [`fix_left`].
fn fix_right<S: TreeNodes>(nodes: &mut S, node: NodeRef) -> NodeRef {
    let right = nodes.tree_link(node).right;
    let link = *nodes.tree_link(right);
    if height(nodes, link.left) > height(nodes, link.right) {
        let rotated = rot_right(nodes, right);
        nodes.tree_link_mut(node).right = rotated;
    }
    rot_left(nodes, node)
}

/// Restore both invariants after a structural attach or detach at `node`,
/// walking every ancestor up to the root. Returns the final root.
pub fn fix<S: TreeNodes>(nodes: &mut S, start: NodeRef) -> NodeRef {
    let mut node = start;
    loop {
        update(nodes, node);
        let link = *nodes.tree_link(node);
        let parent = link.parent;
        let from_left = !parent.is_null() && nodes.tree_link(parent).left == node;

        let lh = height(nodes, link.left);
        let rh = height(nodes, link.right);
        let mut subtree = node;
        if lh > rh + 1 {
            subtree = fix_left(nodes, node);
        } else if rh > lh + 1 {
            subtree = fix_right(nodes, node);
        }

        if parent.is_null() {
            return subtree;
        }
        // Reattach the (possibly rotated) subtree to the parent's old slot.
        if from_left {
            nodes.tree_link_mut(parent).left = subtree;
        } else {
            nodes.tree_link_mut(parent).right = subtree;
        }
        node = parent;
    }
}

/// Detach a node with at most one child by splicing that child into the
/// parent's slot. Returns the tree's root after rebalancing.
fn detach_simple<S: TreeNodes>(nodes: &mut S, node: NodeRef) -> NodeRef {
    let link = *nodes.tree_link(node);
    debug_assert!(link.left.is_null() || link.right.is_null());
    let child = if link.left.is_null() {
        link.right
    } else {
        link.left
    };
    let parent = link.parent;

    if !child.is_null() {
        nodes.tree_link_mut(child).parent = parent;
    }
    if parent.is_null() {
        // The spliced child is the whole tree; nothing left to rebalance.
        return child;
    }
    let parent_link = nodes.tree_link_mut(parent);
    if parent_link.left == node {
        parent_link.left = child;
    } else {
        parent_link.right = child;
    }
    fix(nodes, parent)
}

/// Remove `node` from its tree, preserving balance and size invariants.
/// Returns the possibly-new root of the whole tree, NULL if it emptied.
///
/// The node's own link is left as-is; reinitialize it with
/// [`TreeLink::new`] before linking the record anywhere else.
pub fn remove<S: TreeNodes>(nodes: &mut S, node: NodeRef) -> NodeRef {
    let link = *nodes.tree_link(node);
    if link.left.is_null() || link.right.is_null() {
        return detach_simple(nodes, node);
    }

    // Two children: detach the in-order successor from its original spot
    // (which already restores balance there), then graft it into the
    // vacated position.
    let mut succ = link.right;
    loop {
        let left = nodes.tree_link(succ).left;
        if left.is_null() {
            break;
        }
        succ = left;
    }
    let mut root = detach_simple(nodes, succ);

    // The detach may have rotated ancestors, so re-read the node's links now.
    let vacated = *nodes.tree_link(node);
    *nodes.tree_link_mut(succ) = vacated;
    if !vacated.left.is_null() {
        nodes.tree_link_mut(vacated.left).parent = succ;
    }
    if !vacated.right.is_null() {
        nodes.tree_link_mut(vacated.right).parent = succ;
    }
    if vacated.parent.is_null() {
        root = succ;
    } else {
        let parent_link = nodes.tree_link_mut(vacated.parent);
        if parent_link.left == node {
            parent_link.left = succ;
        } else {
            parent_link.right = succ;
        }
    }
    root
}

/// The node `displacement` in-order positions away from `start`: +1 is the
/// successor, -1 the predecessor. `None` once the displacement leaves the
/// tree. O(log n) via the subtree-size augmentation.
pub fn offset<S: TreeNodes>(nodes: &S, start: NodeRef, displacement: i64) -> Option<NodeRef> {
    let mut node = start;
    // Rank of `node` relative to `start`.
    let mut pos: i64 = 0;
    while pos != displacement {
        let link = *nodes.tree_link(node);
        if pos < displacement && pos + size(nodes, link.right) as i64 >= displacement {
            // Target lies inside the right subtree.
            node = link.right;
            pos += size(nodes, nodes.tree_link(node).left) as i64 + 1;
        } else if pos > displacement && pos - (size(nodes, link.left) as i64) <= displacement {
            node = link.left;
            pos -= size(nodes, nodes.tree_link(node).right) as i64 + 1;
        } else {
            // Out of this subtree; step to the parent, discounting whichever
            // side we came from.
            let parent = link.parent;
            if parent.is_null() {
                return None;
            }
            if nodes.tree_link(parent).right == node {
                pos -= size(nodes, link.left) as i64 + 1;
            } else {
                pos += size(nodes, link.right) as i64 + 1;
            }
            node = parent;
        }
    }
    Some(node)
}
