//! Pass trait and infrastructure for the transform pipeline.
//!
//! This module defines the [`AstPass`] trait that every rewrite pass
//! implements. A pass is one focused *trigger shape → rewrite* rule: it
//! recognizes a low-level instruction idiom emitted by a known higher-level
//! source construct and rewrites it to the equivalent higher-level tree
//! shape.
//!
//! # Contract
//!
//! - **Safe to skip**: no pass is required for correctness of the overall
//!   tree, only for readability of the output.
//! - **Idempotent**: once a pass has rewritten its trigger shape, running it
//!   again is a no-op - the shape no longer matches.
//! - **Fail closed**: shape mismatches are skips, not errors. A pass only
//!   returns `Err` when one of its *internal* invariants is violated, which
//!   degrades the whole declaration to its fallback tree.
//!
//! # Granularity
//!
//! Most passes operate on one statement position within one block and are
//! driven forward position by position. Passes that need the whole function
//! at once (e.g. dead-store elimination, which counts loads globally)
//! override [`is_function_pass`](AstPass::is_function_pass) and run once per
//! pipeline cycle, after the per-position passes settle.

use crate::{
    ast::{AstFunction, NodeId},
    transform::context::TransformContext,
    Result,
};

/// A tree-rewrite pass.
///
/// All passes must be thread-safe (`Send + Sync`): one pipeline instance is
/// shared across the parallel batch fan-out, with each worker driving it
/// over its own tree.
pub trait AstPass: Send + Sync {
    /// Unique name, used by the stop-after marker and the event log.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Does this pass operate on the whole function at once?
    ///
    /// Function passes have [`run_function`](Self::run_function) called
    /// instead of being driven position by position.
    fn is_function_pass(&self) -> bool {
        false
    }

    /// Runs the pass at one statement position.
    ///
    /// `block` is a statement-list node and `position` an index into its
    /// children at the time of the call. The pass must re-read the child
    /// list itself - earlier rewrites in the same sweep may have shifted it.
    ///
    /// Returns `true` if the tree changed, `false` for a skip.
    ///
    /// # Errors
    ///
    /// Returns an error only on an internal invariant violation.
    fn run_at(
        &self,
        _function: &mut AstFunction,
        _block: NodeId,
        _position: usize,
        _ctx: &TransformContext,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Runs the pass over the whole function.
    ///
    /// Returns `true` if the tree changed, `false` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error only on an internal invariant violation.
    fn run_function(&self, _function: &mut AstFunction, _ctx: &TransformContext) -> Result<bool> {
        Ok(false)
    }
}
