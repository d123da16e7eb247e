//! Structural shape matchers over instruction nodes.
//!
//! Every transform pass recognizes its trigger shape through this module
//! instead of ad-hoc traversal code. A matcher is a pure function from a
//! node handle to `Option<bindings>`: `Some` carries the extracted
//! sub-components, `None` means the shape does not match.
//!
//! # Fail-Closed Rule
//!
//! Matchers never raise. Any unexpected shape - wrong operand count, wrong
//! operation code, a handle that does not resolve, an absent member
//! reference - returns `None`. Bytecode from adversarial or hand-written
//! binaries must only ever cause a pass to *skip*, never to crash.
//!
//! # Composition
//!
//! Matchers nest by chaining on extracted handles:
//!
//! ```rust
//! use cillift::ast::{AstFunction, AstOp, MemberRef};
//! use cillift::matchers;
//!
//! # let mut func = AstFunction::new("M");
//! # let handle = MemberRef::new("System.Type", "GetTypeFromHandle", 1);
//! # let tok = func.add(AstOp::LoadTypeToken("System.Int32".into()));
//! # let call = func.add(AstOp::Call(handle.clone()));
//! # func.append_child(call, tok).unwrap();
//! // call(GetTypeFromHandle, token(...))?
//! let matched = matchers::as_call_to(&func, call, &handle)
//!     .and_then(|args| matchers::as_type_token(&func, args[0]))
//!     .is_some();
//! assert!(matched);
//! ```

use crate::ast::{AstFunction, AstOp, BinaryOp, ConstValue, MemberRef, NodeId, VarId};

/// Bindings extracted from a store statement.
#[derive(Debug, Clone, Copy)]
pub struct StoreShape {
    /// The variable being stored to.
    pub var: VarId,
    /// The initializer expression.
    pub value: NodeId,
}

/// Bindings extracted from an if/then/else statement.
#[derive(Debug, Clone, Copy)]
pub struct IfShape {
    /// The condition expression.
    pub condition: NodeId,
    /// The then-block.
    pub then_block: NodeId,
    /// The else-block, if present.
    pub else_block: Option<NodeId>,
}

/// Matches a store to a local: `StoreLocal` with exactly one child.
#[must_use]
pub fn as_store(func: &AstFunction, id: NodeId) -> Option<StoreShape> {
    let node = func.node(id)?;
    match node.op() {
        AstOp::StoreLocal(var) if node.child_count() == 1 => Some(StoreShape {
            var: *var,
            value: node.child(0)?,
        }),
        _ => None,
    }
}

/// Matches a load of a local.
#[must_use]
pub fn as_load(func: &AstFunction, id: NodeId) -> Option<VarId> {
    match func.op(id)? {
        AstOp::LoadLocal(var) => Some(*var),
        _ => None,
    }
}

/// Matches any static call, returning its member and arguments.
#[must_use]
pub fn as_call(func: &AstFunction, id: NodeId) -> Option<(&MemberRef, &[NodeId])> {
    let node = func.node(id)?;
    match node.op() {
        AstOp::Call(member) => Some((member, node.children())),
        _ => None,
    }
}

/// Matches a static call to a specific resolved member.
///
/// The argument count must equal the member's declared arity; a call node
/// whose child list disagrees with its own reference is malformed input and
/// fails closed.
#[must_use]
pub fn as_call_to<'f>(func: &'f AstFunction, id: NodeId, member: &MemberRef) -> Option<&'f [NodeId]> {
    let (callee, args) = as_call(func, id)?;
    if callee == member && args.len() == member.arity() {
        Some(args)
    } else {
        None
    }
}

/// Matches a virtual call, returning its member, receiver and arguments.
#[must_use]
pub fn as_call_virt(func: &AstFunction, id: NodeId) -> Option<(&MemberRef, NodeId, &[NodeId])> {
    let node = func.node(id)?;
    match node.op() {
        AstOp::CallVirt(member) => {
            let (receiver, args) = node.children().split_first()?;
            Some((member, *receiver, args))
        }
        _ => None,
    }
}

/// Matches a virtual call to a specific resolved member, returning the
/// receiver and arguments.
#[must_use]
pub fn as_virt_call_to(
    func: &AstFunction,
    id: NodeId,
    member: &MemberRef,
) -> Option<(NodeId, Vec<NodeId>)> {
    let (callee, receiver, args) = as_call_virt(func, id)?;
    if callee == member && args.len() == member.arity() {
        Some((receiver, args.to_vec()))
    } else {
        None
    }
}

/// Matches a string literal load.
#[must_use]
pub fn as_string_literal<'f>(func: &'f AstFunction, id: NodeId) -> Option<&'f str> {
    match func.op(id)? {
        AstOp::Const(value) => value.as_str(),
        _ => None,
    }
}

/// Matches a metadata type-token load, returning the full type name.
#[must_use]
pub fn as_type_token<'f>(func: &'f AstFunction, id: NodeId) -> Option<&'f str> {
    match func.op(id)? {
        AstOp::LoadTypeToken(name) => Some(name.as_str()),
        _ => None,
    }
}

/// Matches a null-constant load.
#[must_use]
pub fn is_null_const(func: &AstFunction, id: NodeId) -> bool {
    matches!(func.op(id), Some(AstOp::Const(ConstValue::Null)))
}

/// Matches a binary operation of a specific operator, returning the operand
/// pair.
#[must_use]
pub fn as_binary(func: &AstFunction, id: NodeId, op: BinaryOp) -> Option<(NodeId, NodeId)> {
    let node = func.node(id)?;
    match node.op() {
        AstOp::Binary(actual) if *actual == op && node.child_count() == 2 => {
            Some((node.child(0)?, node.child(1)?))
        }
        _ => None,
    }
}

/// Matches an if/then/else statement.
///
/// Accepts both two-child (no else) and three-child forms; anything else
/// fails closed.
#[must_use]
pub fn as_if_then_else(func: &AstFunction, id: NodeId) -> Option<IfShape> {
    let node = func.node(id)?;
    if *node.op() != AstOp::IfThenElse {
        return None;
    }
    match node.children() {
        [condition, then_block] => Some(IfShape {
            condition: *condition,
            then_block: *then_block,
            else_block: None,
        }),
        [condition, then_block, else_block] => Some(IfShape {
            condition: *condition,
            then_block: *then_block,
            else_block: Some(*else_block),
        }),
        _ => None,
    }
}

/// Matches a try/finally region, returning `(try-block, finally-block)`.
#[must_use]
pub fn as_try_finally(func: &AstFunction, id: NodeId) -> Option<(NodeId, NodeId)> {
    let node = func.node(id)?;
    match node.op() {
        AstOp::TryFinally if node.child_count() == 2 => Some((node.child(0)?, node.child(1)?)),
        _ => None,
    }
}

/// Matches a block-like node containing exactly one statement, returning it.
#[must_use]
pub fn as_single_statement(func: &AstFunction, id: NodeId) -> Option<NodeId> {
    let node = func.node(id)?;
    if node.op().is_statement_list() && node.child_count() == 1 {
        node.child(0)
    } else {
        None
    }
}

/// Composes a call matcher with per-argument sub-matchers.
///
/// Returns `true` only if `id` is a static call to `member` and every
/// argument satisfies its positional predicate. The predicate slice length
/// must equal the member arity; any disagreement fails closed.
#[must_use]
pub fn call_with_args(
    func: &AstFunction,
    id: NodeId,
    member: &MemberRef,
    arg_matchers: &[&dyn Fn(&AstFunction, NodeId) -> bool],
) -> bool {
    let Some(args) = as_call_to(func, id, member) else {
        return false;
    };
    if args.len() != arg_matchers.len() {
        return false;
    }
    args.iter()
        .zip(arg_matchers)
        .all(|(&arg, matcher)| matcher(func, arg))
}
