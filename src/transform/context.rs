//! Shared context for one declaration's pipeline run.
//!
//! The context bundles what every pass needs besides the tree itself: the
//! external member resolver, the event log and the cancellation token. It is
//! scoped to a single declaration - nothing in it is shared across
//! concurrent decompilations except the resolver, which is read-only.

use crate::{
    cancellation::CancellationToken,
    resolver::MemberResolver,
    transform::events::EventLog,
};

/// Per-declaration pass execution context.
///
/// Passes receive the context by shared reference; the event log supports
/// recording through `&self`, and the resolver is queried read-only.
pub struct TransformContext<'a> {
    resolver: &'a dyn MemberResolver,
    /// Change log for this declaration's run.
    pub events: EventLog,
    cancellation: CancellationToken,
}

impl<'a> TransformContext<'a> {
    /// Creates a context for one declaration.
    ///
    /// # Arguments
    ///
    /// * `resolver` - The external member resolver
    /// * `cancellation` - Token polled at pass boundaries
    #[must_use]
    pub fn new(resolver: &'a dyn MemberResolver, cancellation: CancellationToken) -> Self {
        Self {
            resolver,
            events: EventLog::new(),
            cancellation,
        }
    }

    /// Returns the external member resolver.
    #[must_use]
    pub fn resolver(&self) -> &dyn MemberResolver {
        self.resolver
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
