//! The transform engine: passes, pipeline, configuration and change
//! tracking.
//!
//! This module turns the loader's low-level instruction tree into the
//! high-level tree the printer renders. The design is a registered list of
//! independent pass objects driven uniformly by a fixed-point pipeline - one
//! shape-to-rewrite contract per pass - rather than one monolithic method
//! testing many unrelated shapes. That keeps every idiom independently unit
//! tested and independently togglable.
//!
//! # Key Components
//!
//! - [`AstPass`] - the pass contract (per-statement or whole-function)
//! - [`PassPipeline`] - ordered, iterated sequencing with bounded retries
//! - [`PipelineConfig`] - pass toggles, budgets, stop-after marker
//! - [`TransformContext`] - resolver handle, event log, cancellation
//! - [`EventLog`] - append-only record of every change a pass makes
//! - [`passes`] - the built-in idiom-recognition pass library

mod config;
mod context;
mod events;
mod pass;
mod pipeline;

pub mod passes;

pub use config::PipelineConfig;
pub use context::TransformContext;
pub use events::{Event, EventKind, EventLog};
pub use pass::AstPass;
pub use pipeline::{PassPipeline, PipelineOutcome};
