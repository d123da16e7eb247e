//! Change tracking for transform passes.
//!
//! Every rewrite a pass performs is recorded as an [`Event`] so a
//! decompilation result can explain what was done to the tree - and so a
//! fault is never silently dropped. The log is append-only and usable
//! through a shared reference, which lets passes record events via the
//! [`TransformContext`](crate::transform::TransformContext) without any
//! locking.

use std::fmt;

/// The kind of change or incident an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A single-use local's initializer was inlined into a load site.
    StoreInlined,
    /// A store with no remaining loads was removed.
    DeadStoreRemoved,
    /// A low-level idiom was rewritten to its high-level shape.
    PatternRecognized,
    /// A nested block was spliced into its parent.
    BlockFlattened,
    /// A pass violated an internal invariant; the declaration degraded to
    /// its fallback tree.
    PassFault,
    /// The declaration's pipeline run was cancelled.
    Cancelled,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StoreInlined => "store-inlined",
            Self::DeadStoreRemoved => "dead-store-removed",
            Self::PatternRecognized => "pattern-recognized",
            Self::BlockFlattened => "block-flattened",
            Self::PassFault => "pass-fault",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// One recorded change or incident.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The pass that recorded the event.
    pub pass: &'static str,
    /// Human-readable detail.
    pub detail: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.pass, self.kind, self.detail)
    }
}

/// Append-only, lock-free event log.
///
/// Records happen through `&self`, so a log can be shared between the
/// pipeline and its passes without interior mutability boilerplate at every
/// call site.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    pub fn record(&self, kind: EventKind, pass: &'static str, detail: impl Into<String>) {
        self.events.push(Event {
            kind,
            pass,
            detail: detail.into(),
        });
    }

    /// Moves every event of `other` into this log.
    pub fn merge(&self, other: EventLog) {
        for (_, event) in other.events.iter() {
            self.events.push(event.clone());
        }
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the number of events of `kind`.
    #[must_use]
    pub fn count_of(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Returns an iterator over the recorded events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, event)| event)
    }
}
