//! Built-in transform passes.
//!
//! Each pass is one *trigger shape → rewrite* rule, independently testable
//! and independently togglable through
//! [`PipelineConfig`](crate::transform::PipelineConfig). Passes compose: any
//! pass must be safe to skip and safe to run in any order relative to
//! unrelated idioms, while the pipeline fixes the order for passes with a
//! known dependency (inlining before the shape passes that match on
//! simplified call chains).
//!
//! | Pass | Idiom |
//! |------|-------|
//! | [`BuilderInliningPass`] | Single-use locals holding expression-builder factory calls |
//! | [`UsingRecognitionPass`] | Store + try/finally-dispose → using-block |
//! | [`StringSwitchPass`] | String-equality chains → string-switch dispatch |
//! | [`ConditionalExpressionPass`] | If/else store pairs → conditional expressions |
//! | [`BlockFlatteningPass`] | Nested bare blocks and no-ops |
//! | [`DeadStoreEliminationPass`] | Stores to never-loaded variables |

mod block_flatten;
mod builder_inlining;
mod conditional;
mod dead_store;
mod string_switch;
mod using_blocks;

pub use block_flatten::BlockFlatteningPass;
pub use builder_inlining::BuilderInliningPass;
pub use conditional::ConditionalExpressionPass;
pub use dead_store::DeadStoreEliminationPass;
pub use string_switch::StringSwitchPass;
pub use using_blocks::UsingRecognitionPass;
