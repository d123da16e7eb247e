//! The per-declaration instruction tree.
//!
//! An [`AstFunction`] bundles everything one decompiled declaration owns: the
//! node arena, the root block, the variable table and optional display
//! metadata (documentation comment, source-line hints). It is the working
//! document every transform pass reads and rewrites in place.
//!
//! # Mutation Contract
//!
//! All structural mutations go through this type so the single-parent
//! invariant holds at every step: a node is attached to at most one parent,
//! and rewrites either replace in place or detach and reinsert a *cloned*
//! sub-tree. Detached nodes stay allocated (handles remain valid) but become
//! unreachable from the root.
//!
//! # Snapshot Enumeration
//!
//! [`descendants`](AstFunction::descendants) returns an owned snapshot, not a
//! live view. Passes collect matching positions first and mutate afterwards;
//! the snapshot guarantees the collection is never invalidated by the
//! mutation that follows it.

use std::collections::{HashMap, HashSet};

use crate::{
    ast::{
        arena::{AstArena, NodeId},
        node::{AstNode, AstOp, AstOpKind},
        variable::{VarId, Variable, VariableTable},
    },
    Error, Result,
};

/// The mutable instruction tree of one declaration.
///
/// One `AstFunction` exists per decompiled declaration; it is never shared
/// across concurrent decompilations and never outlives its decompilation
/// request.
///
/// # Examples
///
/// ```rust
/// use cillift::ast::{AstFunction, AstOp, ConstValue, Variable, VariableKind};
///
/// let mut func = AstFunction::new("M");
/// let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
///
/// let value = func.add(AstOp::Const(ConstValue::I32(42)));
/// let store = func.add(AstOp::StoreLocal(v));
/// func.append_child(store, value).unwrap();
/// func.append_child(func.root(), store).unwrap();
///
/// assert_eq!(func.stores_of(v).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AstFunction {
    name: String,
    arena: AstArena,
    root: NodeId,
    variables: VariableTable,
    doc_comment: Option<String>,
    line_hints: HashMap<NodeId, u32>,
}

impl AstFunction {
    /// Creates a new function with an empty root block.
    ///
    /// # Arguments
    ///
    /// * `name` - The declaration name, for diagnostics only
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut arena = AstArena::new();
        let root = arena.alloc(AstOp::Block);
        Self {
            name: name.into(),
            arena,
            root,
            variables: VariableTable::new(),
            doc_comment: None,
            line_hints: HashMap::new(),
        }
    }

    /// Returns the declaration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root block handle.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the variable table.
    #[must_use]
    pub const fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Returns a mutable reference to the variable table.
    pub fn variables_mut(&mut self) -> &mut VariableTable {
        &mut self.variables
    }

    /// Registers a variable and returns its identity.
    pub fn declare_variable(&mut self, variable: Variable) -> VarId {
        self.variables.declare(variable)
    }

    /// Returns the documentation comment attached to this declaration.
    #[must_use]
    pub fn doc_comment(&self) -> Option<&str> {
        self.doc_comment.as_deref()
    }

    /// Attaches a documentation comment for the printer to emit.
    pub fn set_doc_comment(&mut self, comment: Option<String>) {
        self.doc_comment = comment;
    }

    /// Records a source-line hint for a node.
    pub fn add_line_hint(&mut self, node: NodeId, line: u32) {
        self.line_hints.insert(node, line);
    }

    /// Returns the source-line hint for a node, if one was recorded.
    #[must_use]
    pub fn line_hint(&self, node: NodeId) -> Option<u32> {
        self.line_hints.get(&node).copied()
    }

    // ------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------

    /// Returns the node for `id`, or `None` for a foreign handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&AstNode> {
        self.arena.get(id)
    }

    /// Returns a mutable reference to the node for `id`.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AstNode> {
        self.arena.get_mut(id)
    }

    /// Returns the operation of `id`, or `None` for a foreign handle.
    #[must_use]
    pub fn op(&self, id: NodeId) -> Option<&AstOp> {
        self.arena.get(id).map(AstNode::op)
    }

    /// Returns the ordered children of `id`, or an empty slice for a foreign
    /// handle.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena.get(id).map_or(&[], AstNode::children)
    }

    // ------------------------------------------------------------------
    // Construction and mutation
    // ------------------------------------------------------------------

    /// Allocates a detached node.
    pub fn add(&mut self, op: AstOp) -> NodeId {
        self.arena.alloc(op)
    }

    /// Allocates a detached node carrying a bytecode offset.
    pub fn add_at(&mut self, op: AstOp, offset: u32) -> NodeId {
        self.arena.alloc_at(op, offset)
    }

    /// Appends `child` to the end of `parent`'s child list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if either handle is foreign, and
    /// [`Error::Error`] if `child` is already attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Inserts `child` into `parent`'s child list at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if either handle is foreign or the
    /// index is out of range, and [`Error::Error`] if `child` is already
    /// attached elsewhere - a node is never aliased into two positions.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        if !self.arena.contains(parent) || !self.arena.contains(child) {
            return Err(Error::InvalidNode);
        }
        if self.arena.get(child).is_some_and(|n| n.parent().is_some()) {
            return Err(Error::Error(format!(
                "node {child} is already attached; clone it instead of aliasing"
            )));
        }
        let parent_node = self.arena.get_mut(parent).ok_or(Error::InvalidNode)?;
        if index > parent_node.children().len() {
            return Err(Error::InvalidNode);
        }
        parent_node.children_mut().insert(index, child);
        if let Some(child_node) = self.arena.get_mut(child) {
            child_node.set_parent(Some(parent));
        }
        Ok(())
    }

    /// Detaches and returns the child of `parent` at `index`.
    ///
    /// The detached node stays allocated; its handle remains valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if the handle is foreign or the index
    /// is out of range.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let parent_node = self.arena.get_mut(parent).ok_or(Error::InvalidNode)?;
        if index >= parent_node.children().len() {
            return Err(Error::InvalidNode);
        }
        let child = parent_node.children_mut().remove(index);
        if let Some(child_node) = self.arena.get_mut(child) {
            child_node.set_parent(None);
        }
        Ok(child)
    }

    /// Replaces the child of `parent` at `index` with `new`, returning the
    /// detached old child.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] on a foreign handle or out-of-range
    /// index, and [`Error::Error`] if `new` is already attached elsewhere.
    pub fn replace_child(&mut self, parent: NodeId, index: usize, new: NodeId) -> Result<NodeId> {
        let old = self.remove_child(parent, index)?;
        match self.insert_child(parent, index, new) {
            Ok(()) => Ok(old),
            Err(e) => {
                // Restore the old child so a failed replace is not observable.
                let _ = self.insert_child(parent, index, old);
                Err(e)
            }
        }
    }

    /// Replaces `target` with `new` at whatever position `target` occupies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if `target` is detached or is the root,
    /// or if either handle is foreign.
    pub fn replace(&mut self, target: NodeId, new: NodeId) -> Result<NodeId> {
        let parent = self
            .arena
            .get(target)
            .and_then(AstNode::parent)
            .ok_or(Error::InvalidNode)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == target)
            .ok_or(Error::InvalidNode)?;
        self.replace_child(parent, index, new)
    }

    /// Detaches `target` from its parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if `target` is detached, the root, or
    /// foreign.
    pub fn detach(&mut self, target: NodeId) -> Result<NodeId> {
        let parent = self
            .arena
            .get(target)
            .and_then(AstNode::parent)
            .ok_or(Error::InvalidNode)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == target)
            .ok_or(Error::InvalidNode)?;
        self.remove_child(parent, index)
    }

    /// Deep-copies the sub-tree rooted at `id`.
    ///
    /// Cloned nodes get fresh handles; variable references are copied by
    /// identity, so inlining an initializer into several use-sites does not
    /// fork the variable. The clone is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        self.arena.clone_subtree(id)
    }

    // ------------------------------------------------------------------
    // Structural queries
    // ------------------------------------------------------------------

    /// Returns a preorder snapshot of the sub-tree rooted at `id`, including
    /// `id` itself.
    ///
    /// The returned list is an owned snapshot: mutating the tree afterwards
    /// never invalidates it (handles of detached nodes stay resolvable).
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.arena.get(current).is_none() {
                continue;
            }
            out.push(current);
            // Reverse so children pop in source order.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Returns the chain of ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.arena.get(id).and_then(AstNode::parent);
        while let Some(p) = current {
            out.push(p);
            current = self.arena.get(p).and_then(AstNode::parent);
        }
        out
    }

    /// Returns every statement-list node (blocks and switch arms) reachable
    /// from the root, in preorder.
    #[must_use]
    pub fn statement_blocks(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.op(id).is_some_and(AstOp::is_statement_list))
            .collect()
    }

    /// Returns a snapshot of every load of `var` reachable from the root.
    #[must_use]
    pub fn loads_of(&self, var: VarId) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| matches!(self.op(id), Some(AstOp::LoadLocal(v)) if *v == var))
            .collect()
    }

    /// Returns a snapshot of every store to `var` reachable from the root.
    #[must_use]
    pub fn stores_of(&self, var: VarId) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| matches!(self.op(id), Some(AstOp::StoreLocal(v)) if *v == var))
            .collect()
    }

    /// Returns `true` if evaluating the sub-tree rooted at `id` may have an
    /// effect beyond producing a value.
    ///
    /// Calls, allocations, stores and throws count as effects; loads,
    /// constants and arithmetic do not.
    #[must_use]
    pub fn has_side_effects(&self, id: NodeId) -> bool {
        self.descendants(id).iter().any(|&n| {
            matches!(
                self.op(n).map(AstOp::kind),
                Some(
                    AstOpKind::Call
                        | AstOpKind::CallVirt
                        | AstOpKind::NewObj
                        | AstOpKind::StoreLocal
                        | AstOpKind::Throw
                        | AstOpKind::UsingBlock
                )
            )
        })
    }

    /// Returns `true` if the sub-trees at `a` and `b` are structurally equal:
    /// same operations (including payloads and variable identities) and same
    /// child shapes, regardless of node identities.
    #[must_use]
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        let (Some(na), Some(nb)) = (self.arena.get(a), self.arena.get(b)) else {
            return false;
        };
        if na.op() != nb.op() || na.child_count() != nb.child_count() {
            return false;
        }
        na.children()
            .iter()
            .zip(nb.children())
            .all(|(&ca, &cb)| self.structurally_equal(ca, cb))
    }

    /// Verifies the invariants the printer relies on: the reachable tree is
    /// acyclic with consistent parent links, and every referenced variable is
    /// registered in this function's table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Error`] describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                return Err(Error::Error(format!(
                    "node {current} is reachable through two paths"
                )));
            }
            let node = self.arena.get(current).ok_or(Error::InvalidNode)?;
            if let Some(var) = node.op().variable() {
                if !self.variables.contains(var) {
                    return Err(Error::Error(format!(
                        "node {current} references unregistered variable {var}"
                    )));
                }
            }
            for &child in node.children() {
                let child_node = self.arena.get(child).ok_or(Error::InvalidNode)?;
                if child_node.parent() != Some(current) {
                    return Err(Error::Error(format!(
                        "child {child} of {current} has an inconsistent parent link"
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::ConstValue;
    use crate::ast::variable::VariableKind;

    fn store_const(func: &mut AstFunction, var: VarId, value: i32) -> NodeId {
        let c = func.add(AstOp::Const(ConstValue::I32(value)));
        let store = func.add(AstOp::StoreLocal(var));
        func.append_child(store, c).unwrap();
        func.append_child(func.root(), store).unwrap();
        store
    }

    #[test]
    fn test_new_function_has_block_root() {
        let func = AstFunction::new("M");
        assert_eq!(func.op(func.root()), Some(&AstOp::Block));
        assert!(func.children(func.root()).is_empty());
    }

    #[test]
    fn test_append_and_remove_child() {
        let mut func = AstFunction::new("M");
        let nop = func.add(AstOp::Nop);
        func.append_child(func.root(), nop).unwrap();
        assert_eq!(func.node(nop).unwrap().parent(), Some(func.root()));

        let removed = func.remove_child(func.root(), 0).unwrap();
        assert_eq!(removed, nop);
        assert!(func.node(nop).unwrap().parent().is_none());
        assert!(func.children(func.root()).is_empty());
    }

    #[test]
    fn test_insert_rejects_attached_node() {
        let mut func = AstFunction::new("M");
        let nop = func.add(AstOp::Nop);
        func.append_child(func.root(), nop).unwrap();

        // Attaching the same node a second time would alias it.
        let result = func.append_child(func.root(), nop);
        assert!(result.is_err());
        assert_eq!(func.children(func.root()).len(), 1);
    }

    #[test]
    fn test_replace_swaps_in_place() {
        let mut func = AstFunction::new("M");
        let a = func.add(AstOp::Nop);
        let b = func.add(AstOp::Return);
        func.append_child(func.root(), a).unwrap();

        let old = func.replace(a, b).unwrap();
        assert_eq!(old, a);
        assert_eq!(func.children(func.root()), &[b]);
        assert!(func.node(a).unwrap().parent().is_none());
        assert_eq!(func.node(b).unwrap().parent(), Some(func.root()));
    }

    #[test]
    fn test_replace_detached_node_fails() {
        let mut func = AstFunction::new("M");
        let a = func.add(AstOp::Nop);
        let b = func.add(AstOp::Nop);
        assert!(func.replace(a, b).is_err());
    }

    #[test]
    fn test_descendants_is_preorder_snapshot() {
        let mut func = AstFunction::new("M");
        let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let store = store_const(&mut func, v, 1);
        let value = func.children(store)[0];

        let snapshot = func.descendants(func.root());
        assert_eq!(snapshot, vec![func.root(), store, value]);

        // Mutating after the snapshot leaves the snapshot resolvable.
        func.remove_child(func.root(), 0).unwrap();
        for id in snapshot {
            assert!(func.node(id).is_some());
        }
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut func = AstFunction::new("M");
        let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let store = store_const(&mut func, v, 1);
        let value = func.children(store)[0];

        assert_eq!(func.ancestors(value), vec![store, func.root()]);
    }

    #[test]
    fn test_loads_and_stores_of() {
        let mut func = AstFunction::new("M");
        let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let w = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        store_const(&mut func, v, 1);
        store_const(&mut func, w, 2);

        let load = func.add(AstOp::LoadLocal(v));
        let ret = func.add(AstOp::Return);
        func.append_child(ret, load).unwrap();
        func.append_child(func.root(), ret).unwrap();

        assert_eq!(func.stores_of(v).len(), 1);
        assert_eq!(func.stores_of(w).len(), 1);
        assert_eq!(func.loads_of(v).len(), 1);
        assert!(func.loads_of(w).is_empty());
    }

    #[test]
    fn test_side_effects() {
        let mut func = AstFunction::new("M");
        let pure = func.add(AstOp::Const(ConstValue::I32(1)));
        assert!(!func.has_side_effects(pure));

        let call = func.add(AstOp::Call(crate::ast::MemberRef::new(
            "System.Console",
            "WriteLine",
            1,
        )));
        assert!(func.has_side_effects(call));

        // Effect buried below arithmetic still counts.
        let add = func.add(AstOp::Binary(crate::ast::BinaryOp::Add));
        let inner = func.add(AstOp::Call(crate::ast::MemberRef::new("T", "M", 0)));
        let one = func.add(AstOp::Const(ConstValue::I32(1)));
        func.append_child(add, inner).unwrap();
        func.append_child(add, one).unwrap();
        assert!(func.has_side_effects(add));
    }

    #[test]
    fn test_structural_equality_ignores_node_identity() {
        let mut func = AstFunction::new("M");
        let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let a = func.add(AstOp::LoadLocal(v));
        let clone = func.clone_subtree(a).unwrap();

        assert_ne!(a, clone);
        assert!(func.structurally_equal(a, clone));
    }

    #[test]
    fn test_structural_equality_respects_variable_identity() {
        let mut func = AstFunction::new("M");
        let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let w = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let a = func.add(AstOp::LoadLocal(v));
        let b = func.add(AstOp::LoadLocal(w));
        assert!(!func.structurally_equal(a, b));
    }

    #[test]
    fn test_validate_accepts_wellformed_tree() {
        let mut func = AstFunction::new("M");
        let v = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        store_const(&mut func, v, 3);
        assert!(func.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unregistered_variable() {
        let mut func = AstFunction::new("M");
        let load = func.add(AstOp::LoadLocal(VarId::new(9)));
        func.append_child(func.root(), load).unwrap();
        assert!(func.validate().is_err());
    }

    #[test]
    fn test_line_hints_and_doc_comment() {
        let mut func = AstFunction::new("M");
        let nop = func.add(AstOp::Nop);
        func.add_line_hint(nop, 42);
        assert_eq!(func.line_hint(nop), Some(42));
        assert_eq!(func.line_hint(func.root()), None);

        func.set_doc_comment(Some("<summary>Does M.</summary>".into()));
        assert!(func.doc_comment().unwrap().contains("summary"));
    }
}
