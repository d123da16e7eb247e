//! Single-use builder-local inlining.
//!
//! Compilers that lower expression-tree literals emit a store of each
//! builder object into a compiler-generated local, then load that local at
//! every point the object is referenced:
//!
//! ```text
//! store(v, call(Expression::Parameter, call(Type::GetTypeFromHandle, token(System.Int32)), "x"))
//! ...
//! load(v) ... load(v) ... load(v)
//! ```
//!
//! Source code never names these locals. This pass inlines the initializer
//! into every load site and deletes the store:
//!
//! ```text
//! ... call(Expression::Parameter, call(Type::GetTypeFromHandle, token(System.Int32)), "x") ...
//! ```
//!
//! # Eligibility
//!
//! Only variables with *no other defining write* in the function are
//! eligible; the pass counts stores itself rather than assuming. The rewrite
//! is function-local. If zero loads exist the store is still removed -
//! dead-store elimination for this idiom is a side effect of this pass.
//!
//! The builder factory is a pure allocation, so duplicating the initializer
//! across N load sites preserves semantics.

use crate::{
    ast::{AstFunction, NodeId},
    matchers,
    transform::{context::TransformContext, events::EventKind, pass::AstPass},
    Error, Result,
};

const BUILDER_TYPE: &str = "System.Linq.Expressions.Expression";
const BUILDER_METHOD: &str = "Parameter";
const HANDLE_TYPE: &str = "System.Type";
const HANDLE_METHOD: &str = "GetTypeFromHandle";

/// Inlines single-use locals holding recognized builder-call idioms.
pub struct BuilderInliningPass;

impl Default for BuilderInliningPass {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderInliningPass {
    /// Creates a new builder-inlining pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Matches the builder-call idiom: a two-argument call to the parameter
    /// factory whose first argument is a type-handle call wrapping a type
    /// token and whose second argument is a literal string.
    fn is_builder_call(function: &AstFunction, value: NodeId, ctx: &TransformContext) -> bool {
        // Resolver absence is "no match", never a positive.
        let Some(builder) = ctx.resolver().resolve(BUILDER_TYPE, BUILDER_METHOD, 2) else {
            return false;
        };
        let Some(handle) = ctx.resolver().resolve(HANDLE_TYPE, HANDLE_METHOD, 1) else {
            return false;
        };

        let Some(args) = matchers::as_call_to(function, value, &builder) else {
            return false;
        };
        let token_producing = matchers::as_call_to(function, args[0], &handle)
            .and_then(|inner| matchers::as_type_token(function, inner[0]))
            .is_some();
        token_producing && matchers::as_string_literal(function, args[1]).is_some()
    }
}

impl AstPass for BuilderInliningPass {
    fn name(&self) -> &'static str {
        "builder-inlining"
    }

    fn description(&self) -> &'static str {
        "Inline single-use locals holding expression-builder factory calls into their load sites"
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
        let Some(store) = matchers::as_store(function, statement) else {
            return Ok(false);
        };
        if !Self::is_builder_call(function, store.value, ctx) {
            return Ok(false);
        }

        // Eligibility: this store must be the variable's only defining write.
        let stores = function.stores_of(store.var);
        if stores.len() != 1 || stores[0] != statement {
            return Ok(false);
        }

        let loads = function.loads_of(store.var);
        for &load in &loads {
            let copy = function
                .clone_subtree(store.value)
                .ok_or(Error::InvalidNode)?;
            function.replace(load, copy).map_err(|e| Error::PassFault {
                pass: self.name(),
                message: format!("load site rewrite failed: {e}"),
            })?;
            ctx.events.record(
                EventKind::StoreInlined,
                self.name(),
                format!("inlined initializer of {} at {load}", store.var),
            );
        }

        function
            .remove_child(block, position)
            .map_err(|e| Error::PassFault {
                pass: self.name(),
                message: format!("store removal failed: {e}"),
            })?;

        if loads.is_empty() {
            ctx.events.record(
                EventKind::DeadStoreRemoved,
                self.name(),
                format!("removed unused builder store to {}", store.var),
            );
        }

        Ok(true)
    }
}
