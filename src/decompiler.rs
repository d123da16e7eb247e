//! Decompilation orchestration.
//!
//! The [`Decompiler`] selects nothing itself - it is handed declarations by
//! the host, builds each one's initial tree through the external
//! [`MethodSource`](crate::resolver::MethodSource), drives the pass pipeline
//! to completion or cancellation, and returns the finished tree for the
//! printer.
//!
//! # Failure Containment
//!
//! A fault in one pass never aborts a batch: the declaration's output
//! degrades to the minimally transformed fallback tree (a snapshot taken
//! before the pipeline ran), the fault is recorded in the event log, and the
//! batch continues. A declaration that cannot be fully simplified still
//! produces output - degraded but present - never an empty or crashed
//! result.
//!
//! # Concurrency
//!
//! Declarations share no mutable state, so
//! [`decompile_batch`](Decompiler::decompile_batch) fans out over the
//! available parallelism with no locking inside the core. The only shared component is the
//! resolver, which is queried read-only. Cancellation is checked before each
//! declaration and at pass boundaries within one declaration.

use std::fmt;

use rayon::prelude::*;

use crate::{
    ast::AstFunction,
    cancellation::CancellationToken,
    resolver::{DebugInfoProvider, MemberResolver, MethodSource},
    transform::{
        EventKind, EventLog, PassPipeline, PipelineConfig, PipelineOutcome, TransformContext,
    },
};

/// The kind of declaration being decompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// An ordinary method.
    Method,
    /// An instance or static constructor.
    Constructor,
    /// A property getter.
    PropertyGetter,
    /// A property setter.
    PropertySetter,
    /// An event add/remove accessor.
    EventAccessor,
}

/// Identity of one declaration to decompile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationRef {
    /// Full name of the declaring type.
    pub declaring_type: String,
    /// The declaration's name.
    pub name: String,
    /// What kind of declaration this is.
    pub kind: DeclarationKind,
}

impl DeclarationRef {
    /// Creates a method declaration reference.
    #[must_use]
    pub fn method(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            kind: DeclarationKind::Method,
        }
    }
}

impl fmt::Display for DeclarationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// How one declaration's decompilation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompileStatus {
    /// The pipeline ran to completion; the tree is fully settled.
    Completed,
    /// A pass faulted; the tree is the minimally transformed fallback.
    Degraded,
    /// The method source had no body for this declaration.
    Missing,
    /// Cancellation was requested; no tree is produced.
    Cancelled,
}

/// The result of decompiling one declaration.
#[derive(Debug)]
pub struct Decompilation {
    /// The declaration this result belongs to.
    pub declaration: DeclarationRef,
    /// How the decompilation ended.
    pub status: DecompileStatus,
    /// The finished tree, absent for [`DecompileStatus::Missing`] and
    /// [`DecompileStatus::Cancelled`].
    pub function: Option<AstFunction>,
    /// Everything the pipeline did or failed to do.
    pub events: EventLog,
}

/// Drives declarations through the transform pipeline.
///
/// One decompiler may serve many declarations, sequentially or in parallel;
/// it holds no per-declaration state.
///
/// # Examples
///
/// ```rust,ignore
/// use cillift::decompiler::{Decompiler, DeclarationRef};
/// use cillift::transform::PipelineConfig;
/// use cillift::cancellation::CancellationToken;
///
/// let decompiler = Decompiler::new(PipelineConfig::default());
/// let result = decompiler.decompile(
///     DeclarationRef::method("Lib.Widget", "Render"),
///     &loader,
///     &resolver,
///     None,
///     &CancellationToken::new(),
/// );
/// assert!(result.function.is_some());
/// ```
pub struct Decompiler {
    config: PipelineConfig,
    pipeline: PassPipeline,
}

impl Default for Decompiler {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Decompiler {
    /// Creates a decompiler with the standard pipeline built from `config`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let pipeline = PassPipeline::new(&config);
        Self { config, pipeline }
    }

    /// Creates a decompiler around a custom pipeline.
    ///
    /// Hosts use this to add their own idiom passes; tests use it to inject
    /// misbehaving passes.
    #[must_use]
    pub fn with_pipeline(config: PipelineConfig, pipeline: PassPipeline) -> Self {
        Self { config, pipeline }
    }

    /// Decompiles one declaration.
    ///
    /// Builds the initial tree from `source`, snapshots it as the fallback,
    /// drives the pipeline, and returns the finished tree - or the fallback
    /// on a pass fault, or no tree at all on cancellation.
    pub fn decompile(
        &self,
        declaration: DeclarationRef,
        source: &dyn MethodSource,
        resolver: &dyn MemberResolver,
        debug_info: Option<&dyn DebugInfoProvider>,
        cancellation: &CancellationToken,
    ) -> Decompilation {
        if cancellation.is_cancelled() {
            let events = EventLog::new();
            events.record(EventKind::Cancelled, "decompiler", "cancelled before start");
            return Decompilation {
                declaration,
                status: DecompileStatus::Cancelled,
                function: None,
                events,
            };
        }

        let Some(mut function) = source.method_body(&declaration) else {
            return Decompilation {
                declaration,
                status: DecompileStatus::Missing,
                function: None,
                events: EventLog::new(),
            };
        };
        let fallback = function.clone();

        let ctx = TransformContext::new(resolver, cancellation.clone());
        let (status, mut function) = match self.pipeline.run(&mut function, &ctx) {
            Ok(PipelineOutcome::Cancelled) => {
                // Discard the partially-mutated tree; a cancelled declaration
                // must not reach the printer.
                return Decompilation {
                    declaration,
                    status: DecompileStatus::Cancelled,
                    function: None,
                    events: ctx.events,
                };
            }
            Ok(_) => match function.validate() {
                Ok(()) => (DecompileStatus::Completed, function),
                Err(e) => {
                    ctx.events.record(
                        EventKind::PassFault,
                        "decompiler",
                        format!("output tree failed validation: {e}"),
                    );
                    (DecompileStatus::Degraded, fallback)
                }
            },
            Err(e) => {
                ctx.events
                    .record(EventKind::PassFault, "decompiler", e.to_string());
                (DecompileStatus::Degraded, fallback)
            }
        };

        self.annotate(&mut function, &declaration, source, debug_info);

        Decompilation {
            declaration,
            status,
            function: Some(function),
            events: ctx.events,
        }
    }

    /// Decompiles a batch of declarations in parallel.
    ///
    /// Each declaration is independent; the fan-out is bounded by the
    /// available parallelism. Cancellation mid-batch yields `Cancelled`
    /// entries for the declarations not yet started or not yet settled -
    /// every entry reported `Completed` carries a fully pipeline-settled
    /// tree.
    pub fn decompile_batch(
        &self,
        declarations: Vec<DeclarationRef>,
        source: &dyn MethodSource,
        resolver: &dyn MemberResolver,
        debug_info: Option<&dyn DebugInfoProvider>,
        cancellation: &CancellationToken,
    ) -> Vec<Decompilation> {
        declarations
            .into_par_iter()
            .map(|declaration| {
                self.decompile(declaration, source, resolver, debug_info, cancellation)
            })
            .collect()
    }

    /// Attaches display metadata: the documentation comment (when enabled)
    /// and best-effort source-line hints from debug symbols.
    fn annotate(
        &self,
        function: &mut AstFunction,
        declaration: &DeclarationRef,
        source: &dyn MethodSource,
        debug_info: Option<&dyn DebugInfoProvider>,
    ) {
        if self.config.emit_doc_comments {
            function.set_doc_comment(source.doc_comment(declaration));
        }
        if let Some(provider) = debug_info {
            for node in function.descendants(function.root()) {
                let hint = function
                    .node(node)
                    .and_then(|n| n.offset())
                    .and_then(|offset| provider.line_hint(offset));
                if let Some(line) = hint {
                    function.add_line_hint(node, line);
                }
            }
        }
    }
}
