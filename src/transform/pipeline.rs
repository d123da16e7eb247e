//! Pass sequencing and fixed-point iteration.
//!
//! The pipeline drives an ordered pass list over one function to a fixed
//! point:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ cycle:                                                       │
//! │   for each statement pass:                                   │
//! │     for each block, each position (forward):                 │
//! │       run pass; while "changed", re-run at the same          │
//! │       position (bounded retries)                             │
//! │   for each function pass: run once                           │
//! │ repeat cycle until nothing changed, up to max_cycles         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Re-running a pass at the position it just changed catches chained
//! simplifications at one spot (an inlined initializer may itself be the
//! trigger of the same pass). Both the per-position retry count and the
//! cycle count are bounded: a pass pair whose rewrites enable each other
//! forever is stopped and reported as a fault instead of hanging.
//!
//! Cancellation is polled at pass boundaries. An optional stop-after marker
//! halts the pipeline once a named pass has completed its sweep, which is
//! how progressive/diagnostic output is produced; already-applied passes are
//! not rolled back.

use crate::{
    ast::{AstFunction, NodeId},
    transform::{
        config::PipelineConfig,
        context::TransformContext,
        events::EventKind,
        pass::AstPass,
        passes::{
            BlockFlatteningPass, BuilderInliningPass, ConditionalExpressionPass,
            DeadStoreEliminationPass, StringSwitchPass, UsingRecognitionPass,
        },
    },
    Error, Result,
};

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// No enabled pass reported further change.
    Converged {
        /// Number of cycles that ran, including the final all-quiet one.
        cycles: usize,
    },
    /// The stop-after marker halted the pipeline.
    Stopped {
        /// The pass after which the pipeline halted.
        after: String,
    },
    /// Cancellation was requested; the tree must not be shown to the
    /// printer.
    Cancelled,
}

/// An ordered, iterated sequence of transform passes.
///
/// Construction fixes the pass order; [`run`](Self::run) may be called
/// concurrently from batch workers, each with its own tree and context.
pub struct PassPipeline {
    statement_passes: Vec<Box<dyn AstPass>>,
    function_passes: Vec<Box<dyn AstPass>>,
    max_cycles: usize,
    max_position_retries: usize,
    stop_after: Option<String>,
}

impl PassPipeline {
    /// Builds the standard pipeline from configuration toggles.
    ///
    /// Pass order is fixed: inlining runs before the shape passes that match
    /// on simplified call chains, and normalization (flattening, dead-store
    /// removal) runs at whole-function granularity after the per-position
    /// passes settle.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        let mut statement_passes: Vec<Box<dyn AstPass>> = Vec::new();
        if config.enable_builder_inlining {
            statement_passes.push(Box::new(BuilderInliningPass::new()));
        }
        if config.enable_using_recognition {
            statement_passes.push(Box::new(UsingRecognitionPass::new()));
        }
        if config.enable_string_switch {
            statement_passes.push(Box::new(StringSwitchPass::new()));
        }
        if config.enable_conditional_expressions {
            statement_passes.push(Box::new(ConditionalExpressionPass::new()));
        }

        let mut function_passes: Vec<Box<dyn AstPass>> = Vec::new();
        if config.enable_block_flattening {
            function_passes.push(Box::new(BlockFlatteningPass::new()));
        }
        if config.enable_dead_store_elimination {
            function_passes.push(Box::new(DeadStoreEliminationPass::new()));
        }

        Self::with_passes(statement_passes, function_passes, config)
    }

    /// Builds a pipeline from explicit pass lists.
    ///
    /// Used by tests and by hosts that register their own idiom passes.
    /// Passes flagged as function passes go in `function_passes`; the split
    /// is the caller's responsibility.
    #[must_use]
    pub fn with_passes(
        statement_passes: Vec<Box<dyn AstPass>>,
        function_passes: Vec<Box<dyn AstPass>>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            statement_passes,
            function_passes,
            max_cycles: config.max_cycles,
            max_position_retries: config.max_position_retries,
            stop_after: config.stop_after_pass.clone(),
        }
    }

    /// Returns the names of all registered passes, statement passes first.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.statement_passes
            .iter()
            .chain(&self.function_passes)
            .map(|p| p.name())
            .collect()
    }

    /// Drives the pass sequence over `function` to a fixed point.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownPass`] if the stop-after marker names no registered
    ///   pass (checked before the first cycle).
    /// - [`Error::RetryBudgetExhausted`] if a pass keeps reporting changes at
    ///   one position.
    /// - [`Error::FixedPointNotReached`] if the cycle budget runs out.
    /// - Any error a pass itself raises.
    pub fn run(
        &self,
        function: &mut AstFunction,
        ctx: &TransformContext,
    ) -> Result<PipelineOutcome> {
        if let Some(marker) = &self.stop_after {
            if !self.pass_names().iter().any(|n| n == marker) {
                return Err(Error::UnknownPass(marker.clone()));
            }
        }

        for cycle in 0..self.max_cycles {
            let mut changed = false;

            for pass in &self.statement_passes {
                if ctx.is_cancelled() {
                    ctx.events
                        .record(EventKind::Cancelled, pass.name(), "pipeline cancelled");
                    return Ok(PipelineOutcome::Cancelled);
                }
                changed |= self.run_statement_pass(pass.as_ref(), function, ctx)?;
                if self.is_stop_marker(pass.name()) {
                    return Ok(PipelineOutcome::Stopped {
                        after: pass.name().to_string(),
                    });
                }
            }

            for pass in &self.function_passes {
                if ctx.is_cancelled() {
                    ctx.events
                        .record(EventKind::Cancelled, pass.name(), "pipeline cancelled");
                    return Ok(PipelineOutcome::Cancelled);
                }
                changed |= pass.run_function(function, ctx)?;
                if self.is_stop_marker(pass.name()) {
                    return Ok(PipelineOutcome::Stopped {
                        after: pass.name().to_string(),
                    });
                }
            }

            if !changed {
                return Ok(PipelineOutcome::Converged { cycles: cycle + 1 });
            }
        }

        Err(Error::FixedPointNotReached {
            cycles: self.max_cycles,
        })
    }

    fn is_stop_marker(&self, name: &str) -> bool {
        self.stop_after.as_deref() == Some(name)
    }

    /// Drives one statement pass over every eligible position.
    ///
    /// Blocks are snapshotted up front; a block detached by an earlier
    /// rewrite in the same sweep is skipped. Within a block the position
    /// index advances forward, re-reading the child list after every change.
    fn run_statement_pass(
        &self,
        pass: &dyn AstPass,
        function: &mut AstFunction,
        ctx: &TransformContext,
    ) -> Result<bool> {
        let mut changed_any = false;

        for block in function.statement_blocks() {
            if !Self::is_reachable(function, block) {
                continue;
            }

            let mut position = 0;
            while position < function.children(block).len() {
                let mut retries = 0;
                while pass.run_at(function, block, position, ctx)? {
                    changed_any = true;
                    retries += 1;
                    if retries >= self.max_position_retries {
                        return Err(Error::RetryBudgetExhausted {
                            pass: pass.name(),
                            position,
                        });
                    }
                    // The rewrite may have removed the statement; the
                    // position now names the next one (or the end).
                    if position >= function.children(block).len() {
                        break;
                    }
                }
                position += 1;
            }
        }

        Ok(changed_any)
    }

    fn is_reachable(function: &AstFunction, id: NodeId) -> bool {
        if id == function.root() {
            return true;
        }
        function.ancestors(id).last() == Some(&function.root())
    }
}
