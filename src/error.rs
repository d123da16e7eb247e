use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the failure modes of the transform core: pass faults, pipeline budget
/// exhaustion, and orchestration failures. Match failures inside matchers are *not* errors -
/// matchers return `None` and passes skip the position silently.
///
/// # Error Categories
///
/// ## Pass Execution Errors
/// - [`Error::PassFault`] - A pass violated one of its internal invariants
/// - [`Error::RetryBudgetExhausted`] - A pass kept reporting changes at one position
/// - [`Error::FixedPointNotReached`] - The pipeline did not converge within its cycle budget
///
/// ## Orchestration Errors
/// - [`Error::UnknownPass`] - A stop-after marker named a pass not in the pipeline
/// - [`Error::MissingBody`] - The method source had no body for a declaration
/// - [`Error::InvalidNode`] - A node handle did not resolve inside its arena
#[derive(Error, Debug)]
pub enum Error {
    /// A transform pass violated one of its internal invariants.
    ///
    /// Pass faults are caught at the per-declaration granularity by the
    /// [`Decompiler`](crate::decompiler::Decompiler): the declaration's output
    /// degrades to its fallback tree and the fault is recorded in the event
    /// log. A fault never aborts a batch.
    #[error("Pass '{pass}' fault: {message}")]
    PassFault {
        /// The name of the pass that faulted
        pass: &'static str,
        /// Description of the violated invariant
        message: String,
    },

    /// The pipeline did not reach a fixed point within its cycle budget.
    ///
    /// This is the backstop against pass pairs whose rewrites enable each
    /// other forever. The tree at the point of exhaustion is still
    /// semantically valid, but the orchestrator treats the condition as a
    /// fault and falls back to the minimally transformed tree.
    #[error("Pipeline did not reach a fixed point within {cycles} cycles")]
    FixedPointNotReached {
        /// The cycle budget that was exhausted
        cycles: usize,
    },

    /// A pass kept reporting "changed" at a single statement position past the
    /// bounded retry count.
    ///
    /// A well-behaved pass becomes a no-op once its trigger shape is rewritten;
    /// exhausting the retry budget means the pass is not idempotent.
    #[error("Pass '{pass}' exhausted its retry budget at statement position {position}")]
    RetryBudgetExhausted {
        /// The name of the misbehaving pass
        pass: &'static str,
        /// The statement position that never settled
        position: usize,
    },

    /// A stop-after marker named a pass that is not part of the pipeline.
    ///
    /// The marker is validated before the first cycle runs so a typo surfaces
    /// immediately instead of silently running the full pipeline.
    #[error("Unknown pass name '{0}' in stop-after marker")]
    UnknownPass(String),

    /// The method source had no body for the requested declaration.
    #[error("Method body not provided for '{0}'")]
    MissingBody(String),

    /// A node handle did not resolve inside its arena.
    ///
    /// Handles are only minted by the arena itself, so this indicates a handle
    /// that crossed function boundaries or survived a tree rebuild.
    #[error("Node handle does not resolve in this tree")]
    InvalidNode,

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories.
    #[error("{0}")]
    Error(String),
}

/// Result type alias for operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
