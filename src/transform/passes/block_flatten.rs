//! Block normalization.
//!
//! Lifting and earlier rewrites leave behind structure with no source-level
//! meaning: bare blocks nested directly in another block (scope markers the
//! printer would render as stray braces) and no-op statements. This pass
//! splices nested bare blocks into their parents and drops no-ops.
//!
//! Runs at whole-function granularity once per cycle. Spliced-in statements
//! are re-examined in place, so a tower of nested blocks collapses in a
//! single sweep; only structure created by later passes waits for the next
//! cycle.

use crate::{
    ast::{AstFunction, AstOp},
    transform::{context::TransformContext, events::EventKind, pass::AstPass},
    Result,
};

/// Splices nested bare blocks into their parents and removes no-ops.
pub struct BlockFlatteningPass;

impl Default for BlockFlatteningPass {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockFlatteningPass {
    /// Creates a new block-flattening pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AstPass for BlockFlatteningPass {
    fn name(&self) -> &'static str {
        "block-flattening"
    }

    fn description(&self) -> &'static str {
        "Splice nested bare blocks into their parents and remove no-op statements"
    }

    fn is_function_pass(&self) -> bool {
        true
    }

    fn run_function(&self, function: &mut AstFunction, ctx: &TransformContext) -> Result<bool> {
        let mut changed = false;

        for block in function.statement_blocks() {
            let mut index = 0;
            while index < function.children(block).len() {
                let child = function.children(block)[index];
                match function.op(child) {
                    Some(AstOp::Nop) => {
                        function.remove_child(block, index)?;
                        changed = true;
                    }
                    Some(AstOp::Block) => {
                        // Splice the nested block's statements in place.
                        let inner = function.remove_child(block, index)?;
                        let mut insert_at = index;
                        while !function.children(inner).is_empty() {
                            let statement = function.remove_child(inner, 0)?;
                            function.insert_child(block, insert_at, statement)?;
                            insert_at += 1;
                        }
                        ctx.events.record(
                            EventKind::BlockFlattened,
                            self.name(),
                            format!("spliced {inner} into {block}"),
                        );
                        changed = true;
                        // Re-examine from the same index: the first spliced
                        // statement may itself be a bare block.
                    }
                    _ => index += 1,
                }
            }
        }

        Ok(changed)
    }
}
