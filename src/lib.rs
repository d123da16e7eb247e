// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # cillift
//!
//! A framework for reconstructing source-level syntax trees from compiled
//! .NET method bodies. Where a compiler front end lowers source to stack
//! bytecode, `cillift` raises bytecode back up: it takes the typed
//! instruction tree a loader lifts from a method body and rewrites it, idiom
//! by idiom, into the shape a pretty-printer can render as source text.
//!
//! ## Features
//!
//! - **🌳 Arena-backed mutable IR** - stable node handles, O(1) in-place
//!   rewrites, strict single-parent ownership
//! - **🔍 Fail-closed structural matching** - adversarial and hand-written
//!   bytecode makes passes skip, never crash
//! - **🧩 Composable pass library** - one shape-to-rewrite contract per
//!   idiom, each independently togglable and testable
//! - **🔁 Fixed-point pipeline** - bounded retries and cycle budgets turn
//!   would-be infinite loops into reported faults
//! - **⚡ Embarrassingly parallel batches** - declarations share nothing;
//!   fan-out is bounded only by available parallelism
//! - **🛡️ Degraded, never absent, output** - a faulting pass costs one
//!   declaration its polish, not the batch its result
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cillift::prelude::*;
//!
//! let decompiler = Decompiler::new(PipelineConfig::default());
//! let result = decompiler.decompile(
//!     DeclarationRef::method("Lib.Widget", "Render"),
//!     &loader,          // your MethodSource
//!     &resolver,        // your MemberResolver
//!     None,             // optional DebugInfoProvider
//!     &CancellationToken::new(),
//! );
//!
//! match result.status {
//!     DecompileStatus::Completed => println!("settled: {:?}", result.function),
//!     DecompileStatus::Degraded => println!("fallback tree, see events"),
//!     _ => {}
//! }
//! ```
//!
//! ## Architecture
//!
//! `cillift` is organized into several key modules:
//!
//! - [`ast`] - the mutable instruction tree: arena, nodes, variables,
//!   member references
//! - [`matchers`] - declarative, fail-closed shape predicates over nodes
//! - [`transform`] - the pass trait, the built-in pass library and the
//!   fixed-point pipeline
//! - [`decompiler`] - per-declaration orchestration and parallel batching
//! - [`resolver`] - the loader-facing traits this core consumes
//! - [`Error`] and [`Result`] - comprehensive error handling
//!
//! The flow is loader → initial tree → pipeline → printer. Everything on
//! either side of the pipeline (binary parsing, metadata resolution, text
//! emission) lives behind the traits in [`resolver`]; the core performs no
//! I/O at all.
//!
//! ## Error Handling
//!
//! Match failures are not errors - matchers return `None` and passes skip.
//! Pass faults are contained per declaration: the output degrades to the
//! minimally transformed tree and the fault is recorded in the result's
//! event log. Cancellation is cooperative, polled at pass boundaries, and
//! surfaces as a distinct outcome that never exposes a half-rewritten tree.

pub mod ast;
pub mod cancellation;
pub mod decompiler;
pub mod matchers;
pub mod resolver;
pub mod transform;

mod error;

pub use error::{Error, Result};

/// Convenient re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::ast::{
        AstFunction, AstNode, AstOp, AstOpKind, BinaryOp, ConstValue, MemberRef, NodeId, UnaryOp,
        VarId, Variable, VariableFlags, VariableKind,
    };
    pub use crate::cancellation::CancellationToken;
    pub use crate::decompiler::{
        DeclarationKind, DeclarationRef, Decompilation, DecompileStatus, Decompiler,
    };
    pub use crate::resolver::{
        DebugInfoProvider, EmptyResolver, MemberResolver, MethodSource, ResolverCache,
    };
    pub use crate::transform::{
        AstPass, EventKind, EventLog, PassPipeline, PipelineConfig, PipelineOutcome,
        TransformContext,
    };
    pub use crate::{Error, Result};
}
