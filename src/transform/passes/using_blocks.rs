//! Using-statement recovery.
//!
//! A `using (var r = ...) { ... }` statement lowers to a store followed by a
//! try/finally whose finally part disposes the stored resource:
//!
//! ```text
//! store(r, init)
//! try { body } finally { if (load(r) != null) { callvirt(Dispose, load(r)) } }
//! ```
//!
//! Value-typed resources are disposed without the null guard. Either form is
//! rewritten to a single resource-acquisition node:
//!
//! ```text
//! using(r) { init; body }
//! ```
//!
//! # Eligibility
//!
//! The store must be the resource's only defining write, and every load of
//! the resource must sit inside the protected region - a resource that
//! escapes its try block was not a using-statement in source.

use std::collections::HashSet;

use crate::{
    ast::{AstFunction, AstOp, BinaryOp, NodeId, VarId},
    matchers,
    transform::{context::TransformContext, events::EventKind, pass::AstPass},
    Error, Result,
};

const DISPOSABLE_TYPE: &str = "System.IDisposable";
const DISPOSE_METHOD: &str = "Dispose";

/// Rewrites store + try/finally-dispose sequences into using-blocks.
pub struct UsingRecognitionPass;

impl Default for UsingRecognitionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl UsingRecognitionPass {
    /// Creates a new using-recognition pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Matches `callvirt(Dispose, load(var))`.
    fn is_dispose_of(
        function: &AstFunction,
        id: NodeId,
        var: VarId,
        ctx: &TransformContext,
    ) -> bool {
        let Some(dispose) = ctx.resolver().resolve(DISPOSABLE_TYPE, DISPOSE_METHOD, 0) else {
            return false;
        };
        matchers::as_virt_call_to(function, id, &dispose)
            .and_then(|(receiver, _)| matchers::as_load(function, receiver))
            .is_some_and(|loaded| loaded == var)
    }

    /// Matches the finally body: a lone dispose call, optionally wrapped in
    /// a `load(var) != null` guard.
    fn finally_disposes(
        function: &AstFunction,
        finally_block: NodeId,
        var: VarId,
        ctx: &TransformContext,
    ) -> bool {
        let Some(statement) = matchers::as_single_statement(function, finally_block) else {
            return false;
        };
        if Self::is_dispose_of(function, statement, var, ctx) {
            return true;
        }

        // Null-guarded form.
        let Some(guard) = matchers::as_if_then_else(function, statement) else {
            return false;
        };
        if guard.else_block.is_some() {
            return false;
        }
        let guarded = matchers::as_binary(function, guard.condition, BinaryOp::Ne)
            .is_some_and(|(left, right)| {
                matchers::as_load(function, left) == Some(var)
                    && matchers::is_null_const(function, right)
            });
        if !guarded {
            return false;
        }
        matchers::as_single_statement(function, guard.then_block)
            .is_some_and(|inner| Self::is_dispose_of(function, inner, var, ctx))
    }
}

impl AstPass for UsingRecognitionPass {
    fn name(&self) -> &'static str {
        "using-recognition"
    }

    fn description(&self) -> &'static str {
        "Rewrite store + try/finally-dispose sequences into using-blocks"
    }

    fn run_at(
        &self,
        function: &mut AstFunction,
        block: NodeId,
        position: usize,
        ctx: &TransformContext,
    ) -> Result<bool> {
        let children = function.children(block);
        let (Some(&statement), Some(&next)) = (children.get(position), children.get(position + 1))
        else {
            return Ok(false);
        };
        let Some(store) = matchers::as_store(function, statement) else {
            return Ok(false);
        };
        let Some((try_block, finally_block)) = matchers::as_try_finally(function, next) else {
            return Ok(false);
        };
        if !Self::finally_disposes(function, finally_block, store.var, ctx) {
            return Ok(false);
        }

        // Eligibility: single defining write, and the resource stays inside
        // the protected region.
        let stores = function.stores_of(store.var);
        if stores.len() != 1 || stores[0] != statement {
            return Ok(false);
        }
        let inside: HashSet<NodeId> = function
            .descendants(try_block)
            .into_iter()
            .chain(function.descendants(finally_block))
            .collect();
        if !function
            .loads_of(store.var)
            .iter()
            .all(|load| inside.contains(load))
        {
            return Ok(false);
        }

        let fault = |e: Error| Error::PassFault {
            pass: "using-recognition",
            message: format!("rewrite failed: {e}"),
        };

        let init = function.detach(store.value).map_err(fault)?;
        function.detach(try_block).map_err(fault)?;

        let using = function.add(AstOp::UsingBlock(store.var));
        function.append_child(using, init).map_err(fault)?;
        function.append_child(using, try_block).map_err(fault)?;

        // Drop the gutted try/finally first, then swap the store for the
        // using-block at the original position.
        function.remove_child(block, position + 1).map_err(fault)?;
        function.replace(statement, using).map_err(fault)?;

        ctx.events.record(
            EventKind::PatternRecognized,
            self.name(),
            format!("using-block over {}", store.var),
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{ConstValue, MemberRef, Variable, VariableKind},
        cancellation::CancellationToken,
        resolver::MemberResolver,
    };

    struct DisposeResolver;

    impl MemberResolver for DisposeResolver {
        fn resolve(&self, declaring_type: &str, name: &str, arity: usize) -> Option<MemberRef> {
            (declaring_type == DISPOSABLE_TYPE && name == DISPOSE_METHOD && arity == 0)
                .then(|| MemberRef::new(declaring_type, name, arity))
        }
    }

    fn dispose_call(func: &mut AstFunction, var: VarId) -> NodeId {
        let receiver = func.add(AstOp::LoadLocal(var));
        let call = func.add(AstOp::CallVirt(MemberRef::new(
            DISPOSABLE_TYPE,
            DISPOSE_METHOD,
            0,
        )));
        func.append_child(call, receiver).unwrap();
        call
    }

    /// `store(r, newobj); try { load(r) used } finally { if (r != null) dispose }`
    fn using_lowering(func: &mut AstFunction, guarded: bool) -> VarId {
        let r = func.declare_variable(Variable::new(VariableKind::Local, "System.IO.MemoryStream"));

        let init = func.add(AstOp::NewObj(MemberRef::new(
            "System.IO.MemoryStream",
            ".ctor",
            0,
        )));
        let store = func.add(AstOp::StoreLocal(r));
        func.append_child(store, init).unwrap();
        func.append_child(func.root(), store).unwrap();

        let try_block = func.add(AstOp::Block);
        let use_site = func.add(AstOp::LoadLocal(r));
        let use_call = func.add(AstOp::CallVirt(MemberRef::new(
            "System.IO.Stream",
            "Flush",
            0,
        )));
        func.append_child(use_call, use_site).unwrap();
        func.append_child(try_block, use_call).unwrap();

        let finally_block = func.add(AstOp::Block);
        let dispose = dispose_call(func, r);
        if guarded {
            let load = func.add(AstOp::LoadLocal(r));
            let null = func.add(AstOp::Const(ConstValue::Null));
            let cond = func.add(AstOp::Binary(BinaryOp::Ne));
            func.append_child(cond, load).unwrap();
            func.append_child(cond, null).unwrap();
            let then_block = func.add(AstOp::Block);
            func.append_child(then_block, dispose).unwrap();
            let guard = func.add(AstOp::IfThenElse);
            func.append_child(guard, cond).unwrap();
            func.append_child(guard, then_block).unwrap();
            func.append_child(finally_block, guard).unwrap();
        } else {
            func.append_child(finally_block, dispose).unwrap();
        }

        let try_finally = func.add(AstOp::TryFinally);
        func.append_child(try_finally, try_block).unwrap();
        func.append_child(try_finally, finally_block).unwrap();
        func.append_child(func.root(), try_finally).unwrap();

        r
    }

    fn run(func: &mut AstFunction) -> bool {
        let ctx = TransformContext::new(&DisposeResolver, CancellationToken::new());
        let root = func.root();
        UsingRecognitionPass::new()
            .run_at(func, root, 0, &ctx)
            .unwrap()
    }

    #[test]
    fn test_recognizes_guarded_dispose() {
        let mut func = AstFunction::new("M");
        let r = using_lowering(&mut func, true);

        assert!(run(&mut func));

        let statements = func.children(func.root());
        assert_eq!(statements.len(), 1);
        assert_eq!(func.op(statements[0]), Some(&AstOp::UsingBlock(r)));
        assert_eq!(func.children(statements[0]).len(), 2);
        assert!(func.validate().is_ok());
    }

    #[test]
    fn test_recognizes_unguarded_dispose() {
        let mut func = AstFunction::new("M");
        let r = using_lowering(&mut func, false);

        assert!(run(&mut func));
        let statements = func.children(func.root());
        assert_eq!(func.op(statements[0]), Some(&AstOp::UsingBlock(r)));
    }

    #[test]
    fn test_skips_when_resource_escapes() {
        let mut func = AstFunction::new("M");
        let r = using_lowering(&mut func, true);

        // A load after the try/finally means the resource escapes.
        let load = func.add(AstOp::LoadLocal(r));
        let ret = func.add(AstOp::Return);
        func.append_child(ret, load).unwrap();
        func.append_child(func.root(), ret).unwrap();

        assert!(!run(&mut func));
    }

    #[test]
    fn test_skips_without_resolver() {
        let mut func = AstFunction::new("M");
        using_lowering(&mut func, true);

        let ctx = TransformContext::new(&crate::resolver::EmptyResolver, CancellationToken::new());
        let root = func.root();
        let changed = UsingRecognitionPass::new()
            .run_at(&mut func, root, 0, &ctx)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_skips_finally_with_extra_work() {
        let mut func = AstFunction::new("M");
        using_lowering(&mut func, false);

        // Find the finally block and add a second statement.
        let try_finally = func.children(func.root())[1];
        let finally_block = func.children(try_finally)[1];
        let extra = func.add(AstOp::Nop);
        func.append_child(finally_block, extra).unwrap();

        assert!(!run(&mut func));
    }

    #[test]
    fn test_idempotent_after_rewrite() {
        let mut func = AstFunction::new("M");
        using_lowering(&mut func, true);

        assert!(run(&mut func));
        assert!(!run(&mut func));
    }
}
