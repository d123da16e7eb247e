//! The mutable instruction tree and its supporting types.
//!
//! This module is the IR of the lifting core. A method body arrives from the
//! loader as an [`AstFunction`] - an arena of typed [`AstNode`]s rooted at a
//! block, plus a table of [`Variable`] slots - and every transform pass
//! rewrites that tree in place until the pipeline converges.
//!
//! # Design
//!
//! - **Arena storage** ([`AstArena`]): nodes live in an append-only store and
//!   are addressed by stable [`NodeId`] handles, so replacing a node is an
//!   O(1) rebind instead of a tree copy.
//! - **Single-parent invariant**: no sub-tree is ever aliased into two
//!   positions; clones mint fresh node handles but share [`VarId`] identities.
//! - **Snapshot enumeration**: descendant queries return owned snapshots that
//!   survive subsequent mutation.
//!
//! # Thread Safety
//!
//! Trees are not shared across threads; each decompilation owns its function
//! exclusively. All types are `Send`, which is what the parallel batch
//! fan-out requires.

mod arena;
mod function;
mod member;
mod node;
mod variable;

pub use arena::{AstArena, NodeId};
pub use function::AstFunction;
pub use member::MemberRef;
pub use node::{AstNode, AstOp, AstOpKind, BinaryOp, ConstValue, UnaryOp};
pub use variable::{VarId, Variable, VariableFlags, VariableKind, VariableTable};
