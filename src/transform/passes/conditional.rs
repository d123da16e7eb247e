//! Conditional-expression recovery.
//!
//! An `x = cond ? a : b` expression lowers to a branch whose arms both store
//! the same variable:
//!
//! ```text
//! if (cond) { store(x, a) } else { store(x, b) }
//! ```
//!
//! This pass collapses the statement back into a single store of a
//! conditional expression:
//!
//! ```text
//! store(x, conditional(cond, a, b))
//! ```
//!
//! Both arms must consist of exactly one store each, to the same variable;
//! anything else - extra statements, different variables, a missing else -
//! is left alone.

use crate::{
    ast::{AstFunction, AstOp, NodeId},
    matchers,
    transform::{context::TransformContext, events::EventKind, pass::AstPass},
    Error, Result,
};

/// Collapses if/else stores of one variable into a conditional expression.
pub struct ConditionalExpressionPass;

impl Default for ConditionalExpressionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionalExpressionPass {
    /// Creates a new conditional-expression pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AstPass for ConditionalExpressionPass {
    fn name(&self) -> &'static str {
        "conditional-expressions"
    }

    fn description(&self) -> &'static str {
        "Collapse if/else arms that store one variable into a conditional expression"
    }

    fn run_at(
        &self,
        function: &mut AstFunction,
        block: NodeId,
        position: usize,
        ctx: &TransformContext,
    ) -> Result<bool> {
        let Some(&statement) = function.children(block).get(position) else {
            return Ok(false);
        };
        let Some(shape) = matchers::as_if_then_else(function, statement) else {
            return Ok(false);
        };
        let Some(else_block) = shape.else_block else {
            return Ok(false);
        };
        let Some(then_stmt) = matchers::as_single_statement(function, shape.then_block) else {
            return Ok(false);
        };
        let Some(else_stmt) = matchers::as_single_statement(function, else_block) else {
            return Ok(false);
        };
        let (Some(then_store), Some(else_store)) = (
            matchers::as_store(function, then_stmt),
            matchers::as_store(function, else_stmt),
        ) else {
            return Ok(false);
        };
        if then_store.var != else_store.var {
            return Ok(false);
        }

        let fault = |e: Error| Error::PassFault {
            pass: "conditional-expressions",
            message: format!("rewrite failed: {e}"),
        };

        let condition = function.detach(shape.condition).map_err(fault)?;
        let then_value = function.detach(then_store.value).map_err(fault)?;
        let else_value = function.detach(else_store.value).map_err(fault)?;

        let conditional = function.add(AstOp::Conditional);
        function.append_child(conditional, condition).map_err(fault)?;
        function.append_child(conditional, then_value).map_err(fault)?;
        function.append_child(conditional, else_value).map_err(fault)?;

        let store = function.add(AstOp::StoreLocal(then_store.var));
        function.append_child(store, conditional).map_err(fault)?;
        function.replace(statement, store).map_err(fault)?;

        ctx.events.record(
            EventKind::PatternRecognized,
            self.name(),
            format!("conditional store of {}", then_store.var),
        );
        Ok(true)
    }
}
