//! Local materialization benchmarks.
//!
//! Compares serial and rayon-backed evaluation of the same graphs: a
//! well-conditioned regression dataset and a low-rank matrix whose cost is
//! dominated by the block QR.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
#![expect(
    clippy::shadow_reuse,
    reason = "Criterion bench_with_input closures rebind parameter names"
)]
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use blockreg_benches::{
    error::BenchSetupError,
    params::{LowRankBenchParams, RegressionBenchParams},
};
use blockreg_core::{
    ExecutionMode, Executor, LocalExecutor, RandomState, make_low_rank_matrix, make_regression,
};

const SEED: u64 = 7;
const MODES: &[(&str, ExecutionMode)] = &[
    ("serial", ExecutionMode::Serial),
    ("parallel", ExecutionMode::Parallel),
];

fn regression_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("materialize_regression");
    group.sample_size(20);

    for &n_parts in &[1, 8] {
        let params = RegressionBenchParams {
            n_samples: 20_000,
            n_features: 50,
            n_parts,
            effective_rank: None,
        };
        let dataset = make_regression(&params.config()?, RandomState::Seed(SEED))?;

        for &(label, mode) in MODES {
            let executor = LocalExecutor::new().with_mode(mode);
            dataset.materialize(&executor)?;
            group.bench_with_input(
                BenchmarkId::new(label, &params),
                &executor,
                |b, executor| {
                    b.iter(|| black_box(dataset.materialize(executor)));
                },
            );
        }
    }

    group.finish();
    Ok(())
}

fn low_rank_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("materialize_low_rank");
    group.sample_size(10);

    for &n_parts in &[1, 8] {
        let params = LowRankBenchParams {
            n_samples: 8_000,
            n_features: 64,
            n_parts,
        };
        let matrix = make_low_rank_matrix(&params.config()?, RandomState::Seed(SEED))?;

        for &(label, mode) in MODES {
            let executor = LocalExecutor::new().with_mode(mode);
            executor.compute(&matrix)?;
            group.bench_with_input(
                BenchmarkId::new(label, &params),
                &executor,
                |b, executor| {
                    b.iter(|| black_box(executor.compute(&matrix)));
                },
            );
        }
    }

    group.finish();
    Ok(())
}

fn materialize_regression(c: &mut Criterion) {
    if let Err(err) = regression_impl(c) {
        panic!("materialize_regression benchmark setup failed: {err}");
    }
}

fn materialize_low_rank(c: &mut Criterion) {
    if let Err(err) = low_rank_impl(c) {
        panic!("materialize_low_rank benchmark setup failed: {err}");
    }
}

criterion_group!(benches, materialize_regression, materialize_low_rank);
criterion_main!(benches);
