//! Benchmarks for the schedule search.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polyguide::analysis::score_loop_orders;
use polyguide::prelude::*;

fn gemm_patterns() -> Vec<AccessPattern> {
    vec![
        AccessPattern::read_only("A", &["i", "k"]),
        AccessPattern::read_only("B", &["k", "j"]),
        AccessPattern::read_write("C", &["i", "j"]),
    ]
}

/// Benchmark scoring every loop order of a 4-deep nest.
fn bench_order_scoring(c: &mut Criterion) {
    let names = ["i", "j", "k", "l"];
    let patterns = vec![
        AccessPattern::read_only("A", &["i", "k", "l"]),
        AccessPattern::read_only("B", &["k", "j"]),
        AccessPattern::read_write("C", &["i", "j", "l"]),
    ];

    c.bench_function("score_loop_orders_4d", |b| {
        b.iter(|| score_loop_orders(black_box(&names), black_box(&patterns)))
    });
}

/// Benchmark full enumeration for GEMM.
fn bench_enumeration(c: &mut Criterion) {
    let mut solver = ConstraintSolver::default();
    solver.set_access_patterns(gemm_patterns());

    c.bench_function("generate_all_legal_gemm", |b| {
        b.iter(|| solver.generate_all_legal_configs(3, black_box(&["i", "j", "k"]), true))
    });
}

/// Benchmark evaluation of the enumerated GEMM space.
fn bench_evaluation(c: &mut Criterion) {
    let mut solver = ConstraintSolver::default();
    solver.set_access_patterns(gemm_patterns());
    let candidates = solver.generate_all_legal_configs(3, &["i", "j", "k"], true);

    let sequential = CostEvaluator::new(EvaluatorConfig::default().parallel(false));
    c.bench_function("search_best_config_sequential", |b| {
        b.iter(|| {
            let mut batch = candidates.clone();
            sequential.search_best_config(black_box(&mut batch))
        })
    });

    let parallel = CostEvaluator::new(EvaluatorConfig::default().parallel(true));
    c.bench_function("search_best_config_parallel", |b| {
        b.iter(|| {
            let mut batch = candidates.clone();
            parallel.search_best_config(black_box(&mut batch))
        })
    });
}

/// Benchmark the whole pipeline.
fn bench_optimize(c: &mut Criterion) {
    let mut optimizer = HybridOptimizer::new(TuningConfig::default());
    optimizer.set_access_patterns(gemm_patterns());
    let baseline = BaselineSchedule::single(&["i", "j", "k"]);

    c.bench_function("optimize_gemm_neighbors", |b| {
        b.iter(|| optimizer.run(Some(black_box(&baseline)), Strategy::OptimalNeighbors))
    });
    c.bench_function("optimize_gemm_all_legal", |b| {
        b.iter(|| optimizer.run(Some(black_box(&baseline)), Strategy::AllLegal))
    });
}

criterion_group!(
    benches,
    bench_order_scoring,
    bench_enumeration,
    bench_evaluation,
    bench_optimize
);
criterion_main!(benches);
