//! Arena storage for instruction nodes.
//!
//! The arena owns every node of one instruction tree and hands out stable
//! [`NodeId`] handles. "Replace this node" is an O(1) handle rebind in the
//! parent's child list rather than a full-tree copy; a detached node simply
//! becomes unreachable and is dropped with the arena.
//!
//! # Ownership Invariant
//!
//! Every reachable node belongs to exactly one parent. Rewrites either
//! replace a node in place or detach and reinsert a *cloned* sub-tree - a
//! node handle is never aliased into two positions, because an edit through
//! one position would silently affect the other.
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

use crate::ast::node::{AstNode, AstOp};

/// Stable handle to a node in an [`AstArena`].
///
/// Handles are only minted by the arena that owns the node and are never
/// reused within one tree; cloning a sub-tree produces fresh handles for
/// every cloned node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Append-only node store with stable handles.
///
/// Nodes are never physically removed; detaching a sub-tree only unlinks it
/// from its parent. This keeps all outstanding handles valid for the lifetime
/// of the tree, which is what lets passes snapshot descendant lists and then
/// mutate without iterator invalidation.
#[derive(Debug, Clone, Default)]
pub struct AstArena {
    nodes: Vec<AstNode>,
}

impl AstArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new node with no children and no parent.
    pub fn alloc(&mut self, op: AstOp) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(AstNode::new(op));
        id
    }

    /// Allocates a new node carrying the bytecode offset it was lifted from.
    pub fn alloc_at(&mut self, op: AstOp, offset: u32) -> NodeId {
        let id = self.alloc(op);
        self.nodes[id.0].set_offset(Some(offset));
        id
    }

    /// Returns the node for `id`, or `None` if the handle was not minted by
    /// this arena.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id.0)
    }

    /// Returns a mutable reference to the node for `id`.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut AstNode> {
        self.nodes.get_mut(id.0)
    }

    /// Returns the number of allocated nodes, reachable or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no nodes are allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` was minted by this arena.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Deep-copies the sub-tree rooted at `root`.
    ///
    /// Every cloned node gets a fresh handle; variable references inside the
    /// ops are copied as-is, so the clone shares variable *identities* with
    /// the original but no node identities. The clone is detached - it has no
    /// parent until inserted somewhere.
    ///
    /// Returns `None` if `root` does not resolve in this arena.
    pub fn clone_subtree(&mut self, root: NodeId) -> Option<NodeId> {
        let node = self.get(root)?;
        let op = node.op().clone();
        let offset = node.offset();
        let children: Vec<NodeId> = node.children().to_vec();

        let clone = self.alloc(op);
        self.nodes[clone.0].set_offset(offset);

        for child in children {
            let child_clone = self.clone_subtree(child)?;
            self.nodes[child_clone.0].set_parent(Some(clone));
            self.nodes[clone.0].children_mut().push(child_clone);
        }

        Some(clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::ConstValue;

    #[test]
    fn test_alloc_returns_distinct_handles() {
        let mut arena = AstArena::new();
        let a = arena.alloc(AstOp::Nop);
        let b = arena.alloc(AstOp::Nop);
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_get_unknown_handle() {
        let arena = AstArena::new();
        assert!(arena.get(NodeId::from_index(3)).is_none());
    }

    #[test]
    fn test_alloc_at_records_offset() {
        let mut arena = AstArena::new();
        let id = arena.alloc_at(AstOp::Nop, 0x14);
        assert_eq!(arena.get(id).unwrap().offset(), Some(0x14));
    }

    #[test]
    fn test_clone_subtree_fresh_handles() {
        let mut arena = AstArena::new();
        let child = arena.alloc(AstOp::Const(ConstValue::I32(7)));
        let root = arena.alloc(AstOp::Return);
        arena.get_mut(root).unwrap().children_mut().push(child);
        arena.get_mut(child).unwrap().set_parent(Some(root));

        let clone = arena.clone_subtree(root).unwrap();
        assert_ne!(clone, root);

        let clone_child = arena.get(clone).unwrap().children()[0];
        assert_ne!(clone_child, child);
        assert_eq!(
            arena.get(clone_child).unwrap().op(),
            &AstOp::Const(ConstValue::I32(7))
        );
    }

    #[test]
    fn test_clone_is_detached() {
        let mut arena = AstArena::new();
        let root = arena.alloc(AstOp::Block);
        let clone = arena.clone_subtree(root).unwrap();
        assert!(arena.get(clone).unwrap().parent().is_none());
    }

    #[test]
    fn test_mutating_clone_leaves_original_untouched() {
        let mut arena = AstArena::new();
        let child = arena.alloc(AstOp::Const(ConstValue::I32(1)));
        let root = arena.alloc(AstOp::Return);
        arena.get_mut(root).unwrap().children_mut().push(child);
        arena.get_mut(child).unwrap().set_parent(Some(root));

        let clone = arena.clone_subtree(root).unwrap();
        let clone_child = arena.get(clone).unwrap().children()[0];
        arena
            .get_mut(clone_child)
            .unwrap()
            .set_op(AstOp::Const(ConstValue::I32(99)));

        assert_eq!(
            arena.get(child).unwrap().op(),
            &AstOp::Const(ConstValue::I32(1))
        );
    }
}
