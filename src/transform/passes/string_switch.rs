//! Switch-on-string recovery.
//!
//! A `switch` over a string lowers to a chain of equality comparisons
//! against the same subject:
//!
//! ```text
//! if (s == "a") { A } else if (s == "b") { B } else if (s == "c") { C } else { D }
//! ```
//!
//! This pass collapses chains of at least [`MIN_CASES`] comparisons back
//! into a dispatch node with one arm per literal plus an optional default
//! arm. The comparison must be the string equality operator resolved from
//! metadata; an overloaded `==` on some unrelated type never matches.

use crate::{
    ast::{AstFunction, AstOp, NodeId, VarId},
    matchers,
    transform::{context::TransformContext, events::EventKind, pass::AstPass},
    Error, Result,
};

const STRING_TYPE: &str = "System.String";
const EQUALITY_METHOD: &str = "op_Equality";

/// Minimum chain length worth collapsing. Shorter chains read fine as
/// if/else, and compilers emit them directly without a dispatch table.
const MIN_CASES: usize = 3;

/// One recognized arm of the comparison chain.
struct CaseArm {
    literal: String,
    body: NodeId,
}

/// Collapses string-equality chains into string-switch nodes.
pub struct StringSwitchPass;

impl Default for StringSwitchPass {
    fn default() -> Self {
        Self::new()
    }
}

impl StringSwitchPass {
    /// Creates a new string-switch pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Matches `call(String::op_Equality, load(subject), "literal")` and
    /// returns the subject variable and literal.
    fn as_subject_comparison(
        function: &AstFunction,
        id: NodeId,
        ctx: &TransformContext,
    ) -> Option<(VarId, String)> {
        let equality = ctx.resolver().resolve(STRING_TYPE, EQUALITY_METHOD, 2)?;
        let args = matchers::as_call_to(function, id, &equality)?;
        let subject = matchers::as_load(function, args[0])?;
        let literal = matchers::as_string_literal(function, args[1])?;
        Some((subject, literal.to_string()))
    }

    /// Walks the if/else-if chain starting at `statement`.
    ///
    /// Returns the subject, the collected arms and the default block (the
    /// final unconditional else, if any). Returns `None` when the head
    /// statement is not a subject comparison at all.
    fn collect_chain(
        function: &AstFunction,
        statement: NodeId,
        ctx: &TransformContext,
    ) -> Option<(VarId, Vec<CaseArm>, Option<NodeId>)> {
        let mut subject = None;
        let mut arms = Vec::new();
        let mut default_block = None;
        let mut current = statement;

        loop {
            let Some(shape) = matchers::as_if_then_else(function, current) else {
                break;
            };
            let Some((var, literal)) = Self::as_subject_comparison(function, shape.condition, ctx)
            else {
                break;
            };
            match subject {
                None => subject = Some(var),
                Some(expected) if expected == var => {}
                Some(_) => break,
            }
            arms.push(CaseArm {
                literal,
                body: shape.then_block,
            });

            let Some(else_block) = shape.else_block else {
                break;
            };
            // An else holding exactly one further comparison continues the
            // chain; anything else is the default arm.
            if let Some(next) = matchers::as_single_statement(function, else_block) {
                if matchers::as_if_then_else(function, next).is_some() {
                    current = next;
                    continue;
                }
            }
            default_block = Some(else_block);
            break;
        }

        subject.map(|var| (var, arms, default_block))
    }

    /// Moves every statement of `from` into `to`.
    fn move_statements(function: &mut AstFunction, from: NodeId, to: NodeId) -> Result<()> {
        while !function.children(from).is_empty() {
            let statement = function.remove_child(from, 0)?;
            function.append_child(to, statement)?;
        }
        Ok(())
    }
}

impl AstPass for StringSwitchPass {
    fn name(&self) -> &'static str {
        "string-switch"
    }

    fn description(&self) -> &'static str {
        "Collapse chains of string-equality comparisons into string-switch dispatch"
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
        let Some((subject, arms, default_block)) = Self::collect_chain(function, statement, ctx)
        else {
            return Ok(false);
        };
        if arms.len() < MIN_CASES {
            return Ok(false);
        }

        let fault = |e: Error| Error::PassFault {
            pass: "string-switch",
            message: format!("rewrite failed: {e}"),
        };

        let case_count = arms.len();
        let switch = function.add(AstOp::StringSwitch);
        let load = function.add(AstOp::LoadLocal(subject));
        function.append_child(switch, load).map_err(fault)?;

        for arm in arms {
            function.detach(arm.body).map_err(fault)?;
            let case = function.add(AstOp::StringCase(Some(arm.literal)));
            Self::move_statements(function, arm.body, case).map_err(fault)?;
            function.append_child(switch, case).map_err(fault)?;
        }
        if let Some(default_body) = default_block {
            function.detach(default_body).map_err(fault)?;
            let case = function.add(AstOp::StringCase(None));
            Self::move_statements(function, default_body, case).map_err(fault)?;
            function.append_child(switch, case).map_err(fault)?;
        }

        function.replace(statement, switch).map_err(fault)?;

        ctx.events.record(
            EventKind::PatternRecognized,
            self.name(),
            format!("string switch over {subject} with {case_count} cases"),
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

    struct StringResolver;

    impl MemberResolver for StringResolver {
        fn resolve(&self, declaring_type: &str, name: &str, arity: usize) -> Option<MemberRef> {
            (declaring_type == STRING_TYPE && name == EQUALITY_METHOD && arity == 2)
                .then(|| MemberRef::new(declaring_type, name, arity))
        }
    }

    fn comparison(func: &mut AstFunction, subject: VarId, literal: &str) -> NodeId {
        let load = func.add(AstOp::LoadLocal(subject));
        let lit = func.add(AstOp::Const(ConstValue::Str(literal.into())));
        let call = func.add(AstOp::Call(MemberRef::new(STRING_TYPE, EQUALITY_METHOD, 2)));
        func.append_child(call, load).unwrap();
        func.append_child(call, lit).unwrap();
        call
    }

    fn arm_body(func: &mut AstFunction, marker: i64) -> NodeId {
        let block = func.add(AstOp::Block);
        let c = func.add(AstOp::Const(ConstValue::I64(marker)));
        let ret = func.add(AstOp::Return);
        func.append_child(ret, c).unwrap();
        func.append_child(block, ret).unwrap();
        block
    }

    /// Builds `if (s=="a") .. else if (s=="b") .. else if (s=="c") .. [else default]`
    /// and appends it to the root. Returns the subject variable.
    fn equality_chain(func: &mut AstFunction, literals: &[&str], with_default: bool) -> VarId {
        let s = func.declare_variable(Variable::new(VariableKind::Parameter, "System.String"));

        let mut statement: Option<NodeId> = None;
        for (i, literal) in literals.iter().enumerate().rev() {
            let cond = comparison(func, s, literal);
            let body = arm_body(func, i as i64);
            let stmt = func.add(AstOp::IfThenElse);
            func.append_child(stmt, cond).unwrap();
            func.append_child(stmt, body).unwrap();
            match statement.take() {
                Some(inner) => {
                    let else_block = func.add(AstOp::Block);
                    func.append_child(else_block, inner).unwrap();
                    func.append_child(stmt, else_block).unwrap();
                }
                None if with_default => {
                    let default = arm_body(func, -1);
                    func.append_child(stmt, default).unwrap();
                }
                None => {}
            }
            statement = Some(stmt);
        }
        func.append_child(func.root(), statement.unwrap()).unwrap();
        s
    }

    fn run(func: &mut AstFunction) -> bool {
        let ctx = TransformContext::new(&StringResolver, CancellationToken::new());
        let root = func.root();
        StringSwitchPass::new()
            .run_at(func, root, 0, &ctx)
            .unwrap()
    }

    #[test]
    fn test_collapses_chain_with_default() {
        let mut func = AstFunction::new("M");
        let s = equality_chain(&mut func, &["a", "b", "c"], true);

        assert!(run(&mut func));

        let switch = func.children(func.root())[0];
        assert_eq!(func.op(switch), Some(&AstOp::StringSwitch));

        let children = func.children(switch).to_vec();
        // subject + 3 cases + default
        assert_eq!(children.len(), 5);
        assert_eq!(func.op(children[0]), Some(&AstOp::LoadLocal(s)));
        assert_eq!(
            func.op(children[1]),
            Some(&AstOp::StringCase(Some("a".into())))
        );
        assert_eq!(
            func.op(children[3]),
            Some(&AstOp::StringCase(Some("c".into())))
        );
        assert_eq!(func.op(children[4]), Some(&AstOp::StringCase(None)));
        assert!(func.validate().is_ok());
    }

    #[test]
    fn test_collapses_chain_without_default() {
        let mut func = AstFunction::new("M");
        equality_chain(&mut func, &["a", "b", "c"], false);

        assert!(run(&mut func));
        let switch = func.children(func.root())[0];
        assert_eq!(func.children(switch).len(), 4);
    }

    #[test]
    fn test_skips_short_chain() {
        let mut func = AstFunction::new("M");
        equality_chain(&mut func, &["a", "b"], true);

        assert!(!run(&mut func));
    }

    #[test]
    fn test_skips_mixed_subjects() {
        let mut func = AstFunction::new("M");
        let s = func.declare_variable(Variable::new(VariableKind::Parameter, "System.String"));
        let t = func.declare_variable(Variable::new(VariableKind::Parameter, "System.String"));

        // if (s=="a") .. else { if (t=="b") .. else { if (s=="c") .. } }
        let mut inner = {
            let cond = comparison(&mut func, s, "c");
            let body = arm_body(&mut func, 2);
            let stmt = func.add(AstOp::IfThenElse);
            func.append_child(stmt, cond).unwrap();
            func.append_child(stmt, body).unwrap();
            stmt
        };
        for (var, lit, marker) in [(t, "b", 1), (s, "a", 0)] {
            let cond = comparison(&mut func, var, lit);
            let body = arm_body(&mut func, marker);
            let stmt = func.add(AstOp::IfThenElse);
            func.append_child(stmt, cond).unwrap();
            func.append_child(stmt, body).unwrap();
            let else_block = func.add(AstOp::Block);
            func.append_child(else_block, inner).unwrap();
            func.append_child(stmt, else_block).unwrap();
            inner = stmt;
        }
        func.append_child(func.root(), inner).unwrap();

        // The chain breaks at the subject change: only "a" matches, which is
        // below the minimum.
        assert!(!run(&mut func));
    }

    #[test]
    fn test_skips_without_resolver() {
        let mut func = AstFunction::new("M");
        equality_chain(&mut func, &["a", "b", "c"], true);

        let ctx = TransformContext::new(&crate::resolver::EmptyResolver, CancellationToken::new());
        let root = func.root();
        let changed = StringSwitchPass::new()
            .run_at(&mut func, root, 0, &ctx)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_idempotent_after_rewrite() {
        let mut func = AstFunction::new("M");
        equality_chain(&mut func, &["a", "b", "c", "d"], true);

        assert!(run(&mut func));
        assert!(!run(&mut func));
    }
}
