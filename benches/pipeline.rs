//! Benchmarks for the transform pipeline.
//!
//! Measures fixed-point convergence over synthetic method bodies of
//! increasing size: each body carries N builder stores with three loads
//! apiece plus N dead stores, so every standard pass has work to do.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use cillift::{
    ast::{AstFunction, AstOp, ConstValue, MemberRef, Variable, VariableKind},
    cancellation::CancellationToken,
    resolver::MemberResolver,
    transform::{PassPipeline, PipelineConfig, TransformContext},
};

struct WellKnownResolver;

impl MemberResolver for WellKnownResolver {
    fn resolve(&self, declaring_type: &str, name: &str, arity: usize) -> Option<MemberRef> {
        match (declaring_type, name, arity) {
            ("System.Linq.Expressions.Expression", "Parameter", 2)
            | ("System.Type", "GetTypeFromHandle", 1)
            | ("System.String", "op_Equality", 2)
            | ("System.IDisposable", "Dispose", 0) => {
                Some(MemberRef::new(declaring_type, name, arity))
            }
            _ => None,
        }
    }
}

/// Builds a body with `n` inlinable builder stores (three loads each) and
/// `n` dead stores.
fn synthetic_body(n: usize) -> AstFunction {
    let mut func = AstFunction::new("Bench");

    for i in 0..n {
        let v = func.declare_variable(Variable::new(VariableKind::Temporary, "System.Object"));

        let token = func.add(AstOp::LoadTypeToken("System.Int32".into()));
        let handle = func.add(AstOp::Call(MemberRef::new(
            "System.Type",
            "GetTypeFromHandle",
            1,
        )));
        func.append_child(handle, token).unwrap();
        let literal = func.add(AstOp::Const(ConstValue::Str(format!("p{i}"))));
        let builder = func.add(AstOp::Call(MemberRef::new(
            "System.Linq.Expressions.Expression",
            "Parameter",
            2,
        )));
        func.append_child(builder, handle).unwrap();
        func.append_child(builder, literal).unwrap();
        let store = func.add(AstOp::StoreLocal(v));
        func.append_child(store, builder).unwrap();
        func.append_child(func.root(), store).unwrap();

        for _ in 0..3 {
            let load = func.add(AstOp::LoadLocal(v));
            let sink = func.add(AstOp::Call(MemberRef::new("Lib.Sinks", "Consume", 1)));
            func.append_child(sink, load).unwrap();
            func.append_child(func.root(), sink).unwrap();
        }

        let dead = func.declare_variable(Variable::new(VariableKind::Local, "System.Int32"));
        let c = func.add(AstOp::Const(ConstValue::I32(i as i32)));
        let dead_store = func.add(AstOp::StoreLocal(dead));
        func.append_child(dead_store, c).unwrap();
        func.append_child(func.root(), dead_store).unwrap();
    }

    func
}

fn bench_pipeline_convergence(c: &mut Criterion) {
    let pipeline = PassPipeline::new(&PipelineConfig::default());
    let resolver = WellKnownResolver;

    let mut group = c.benchmark_group("pipeline_convergence");
    for size in [4usize, 16, 64] {
        let template = synthetic_body(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || template.clone(),
                |mut func| {
                    let ctx = TransformContext::new(&resolver, CancellationToken::new());
                    let outcome = pipeline.run(&mut func, &ctx).unwrap();
                    black_box((func, outcome))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_clone_subtree(c: &mut Criterion) {
    let func = synthetic_body(16);

    c.bench_function("descendants_snapshot", |b| {
        b.iter(|| black_box(func.descendants(func.root())));
    });
}

criterion_group!(benches, bench_pipeline_convergence, bench_clone_subtree);
criterion_main!(benches);
