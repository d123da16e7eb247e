//! Dead-store elimination.
//!
//! Removes store statements whose variable is never loaded anywhere in the
//! function, provided the initializer has no observable effects. Compilers
//! and obfuscators alike leave such stores behind - stack spills that became
//! redundant, debug scaffolding, decoy writes.
//!
//! Runs at whole-function granularity because "never loaded" is a global
//! property. Removing one store can strip loads of *other* variables out of
//! the tree (they lived inside the removed initializer), so the pipeline
//! re-runs this pass each cycle until nothing changes.

use crate::{
    ast::{AstFunction, AstOp},
    matchers,
    transform::{context::TransformContext, events::EventKind, pass::AstPass},
    Result,
};

/// Removes stores to variables with zero loads in the function.
pub struct DeadStoreEliminationPass;

impl Default for DeadStoreEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadStoreEliminationPass {
    /// Creates a new dead-store elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AstPass for DeadStoreEliminationPass {
    fn name(&self) -> &'static str {
        "dead-store-elimination"
    }

    fn description(&self) -> &'static str {
        "Remove stores to variables that are never loaded"
    }

    fn is_function_pass(&self) -> bool {
        true
    }

    fn run_function(&self, function: &mut AstFunction, ctx: &TransformContext) -> Result<bool> {
        let mut changed = false;

        // Snapshot first, mutate after: removals shift sibling positions.
        let candidates: Vec<_> = function
            .descendants(function.root())
            .into_iter()
            .filter_map(|id| matchers::as_store(function, id).map(|shape| (id, shape)))
            .collect();

        for (statement, shape) in candidates {
            // Only statement-position stores are eligible; a store nested in
            // an expression position is not ours to delete.
            let Some(parent) = function.node(statement).and_then(|n| n.parent()) else {
                continue;
            };
            if !function.op(parent).is_some_and(AstOp::is_statement_list) {
                continue;
            }
            if !function.loads_of(shape.var).is_empty() {
                continue;
            }
            // A pointer may still read an address-taken slot.
            if function
                .variables()
                .get(shape.var)
                .is_none_or(|v| v.is_address_taken())
            {
                continue;
            }
            if function.has_side_effects(shape.value) {
                continue;
            }

            let Some(index) = function
                .children(parent)
                .iter()
                .position(|&c| c == statement)
            else {
                continue;
            };
            function.remove_child(parent, index)?;
            ctx.events.record(
                EventKind::DeadStoreRemoved,
                self.name(),
                format!("removed dead store to {}", shape.var),
            );
            changed = true;
        }

        Ok(changed)
    }
}
