//! Unit tests for regression dataset assembly.

use ndarray::{Array1, Array2, Ix1, Ix2};
use rstest::{fixture, rstest};

use super::{RegressionConfig, ShufflePlan, assemble, make_regression};
use crate::{
    DenseArray, Dtype, ExecutionMode, LocalExecutor, MemoryOrder, RandomSource, RandomState,
    error::BlockregErrorCode,
};

#[fixture]
fn executor() -> LocalExecutor {
    LocalExecutor::new().with_mode(ExecutionMode::Serial)
}

fn matrix(dense: &DenseArray) -> Array2<f64> {
    dense
        .to_f64()
        .into_dimensionality::<Ix2>()
        .expect("two-dimensional")
}

fn vector(dense: &DenseArray) -> Array1<f64> {
    dense
        .to_f64()
        .into_dimensionality::<Ix1>()
        .expect("one-dimensional")
}

#[test]
fn defaults_follow_the_documented_values() {
    let config = RegressionConfig::default();
    assert_eq!(config.n_samples(), 100);
    assert_eq!(config.n_features(), 100);
    assert_eq!(config.n_informative(), 10);
    assert_eq!(config.n_targets(), 1);
    assert_eq!(config.bias(), 0.0);
    assert_eq!(config.effective_rank(), None);
    assert_eq!(config.tail_strength(), 0.5);
    assert_eq!(config.noise(), 0.0);
    assert!(!config.shuffle());
    assert!(!config.emit_coefficients());
    assert_eq!(config.n_parts(), 1);
    assert_eq!(config.order(), MemoryOrder::ColumnMajor);
    assert_eq!(config.dtype(), Dtype::F32);
    assert_eq!(config.row_chunk(), 100);
}

#[rstest]
#[case(RegressionConfig::new().with_shape(0, 3), BlockregErrorCode::ZeroSize)]
#[case(RegressionConfig::new().with_shape(3, 0), BlockregErrorCode::ZeroSize)]
#[case(RegressionConfig::new().with_n_targets(0), BlockregErrorCode::ZeroSize)]
#[case(RegressionConfig::new().with_n_parts(0), BlockregErrorCode::ZeroSize)]
#[case(RegressionConfig::new().with_n_samples_per_part(Some(0)), BlockregErrorCode::ZeroSize)]
#[case(RegressionConfig::new().with_effective_rank(Some(0)), BlockregErrorCode::ZeroSize)]
#[case(RegressionConfig::new().with_tail_strength(-0.1), BlockregErrorCode::InvalidFloatParameter)]
#[case(RegressionConfig::new().with_noise(-1.0), BlockregErrorCode::InvalidFloatParameter)]
#[case(RegressionConfig::new().with_noise(f64::INFINITY), BlockregErrorCode::InvalidFloatParameter)]
#[case(RegressionConfig::new().with_bias(f64::NAN), BlockregErrorCode::InvalidFloatParameter)]
fn rejects_invalid_configurations(
    #[case] config: RegressionConfig,
    #[case] expected: BlockregErrorCode,
) {
    let err = make_regression(&config, RandomState::Seed(0)).expect_err("invalid config");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[case(None)]
#[case(Some(4))]
fn layouts_keep_row_chunks_and_collapse_columns(#[case] effective_rank: Option<usize>) {
    let config = RegressionConfig::new()
        .with_shape(30, 6)
        .with_n_informative(2)
        .with_n_parts(3)
        .with_effective_rank(effective_rank)
        .with_coefficients(true);
    let dataset = make_regression(&config, RandomState::Seed(1)).expect("valid config");

    assert_eq!(dataset.x().row_chunks().blocks(), &[10, 10, 10]);
    assert_eq!(dataset.x().col_chunks().blocks(), &[6]);
    assert_eq!(dataset.y().row_chunks().blocks(), &[10, 10, 10]);
    assert_eq!(dataset.y().shape(), vec![30]);
    let coefficients = dataset.coefficients().expect("requested");
    assert_eq!(coefficients.shape(), vec![6]);
    assert!(coefficients.row_chunks().is_single());
}

#[rstest]
fn multi_target_outputs_keep_two_dimensions(executor: LocalExecutor) {
    let config = RegressionConfig::new()
        .with_shape(12, 4)
        .with_n_informative(3)
        .with_n_targets(2)
        .with_coefficients(true)
        .with_dtype(Dtype::F64);
    let dataset = make_regression(&config, RandomState::Seed(4)).expect("valid config");
    assert_eq!(dataset.y().shape(), vec![12, 2]);

    let dense = dataset.materialize(&executor).expect("materializes");
    let coefficients = matrix(dense.coefficients.as_ref().expect("requested"));
    assert_eq!(coefficients.dim(), (4, 2));
    assert!(coefficients.row(3).iter().all(|&value| value == 0.0));

    let recomputed = matrix(&dense.x).dot(&coefficients);
    for (got, want) in matrix(&dense.y).iter().zip(recomputed.iter()) {
        assert!((got - want).abs() < 1e-9);
    }
}

#[rstest]
fn informative_count_is_clamped(executor: LocalExecutor) {
    let config = RegressionConfig::new()
        .with_shape(8, 3)
        .with_n_informative(10)
        .with_coefficients(true);
    let dataset = make_regression(&config, RandomState::Seed(2)).expect("valid config");
    assert_eq!(dataset.n_informative(), 3);

    let dense = dataset.materialize(&executor).expect("materializes");
    let coefficients = vector(dense.coefficients.as_ref().expect("requested"));
    assert!(coefficients.iter().all(|&value| value != 0.0));
}

#[rstest]
fn no_informative_features_yield_constant_targets(executor: LocalExecutor) {
    let config = RegressionConfig::new()
        .with_shape(5, 4)
        .with_n_informative(0)
        .with_bias(2.5)
        .with_coefficients(true);
    let dataset = make_regression(&config, RandomState::Seed(3)).expect("valid config");
    let dense = dataset.materialize(&executor).expect("materializes");

    assert!(vector(&dense.y).iter().all(|&value| value == 2.5));
    let coefficients = vector(dense.coefficients.as_ref().expect("requested"));
    assert_eq!(coefficients.len(), 4);
    assert!(coefficients.iter().all(|&value| value == 0.0));
}

#[rstest]
fn bias_shifts_every_target(executor: LocalExecutor) {
    let base = RegressionConfig::new()
        .with_shape(10, 4)
        .with_n_informative(2)
        .with_dtype(Dtype::F64);
    let plain = make_regression(&base, RandomState::Seed(6))
        .expect("valid config")
        .materialize(&executor)
        .expect("materializes");
    let shifted = make_regression(&base.clone().with_bias(3.0), RandomState::Seed(6))
        .expect("valid config")
        .materialize(&executor)
        .expect("materializes");

    assert_eq!(plain.x, shifted.x);
    for (lhs, rhs) in vector(&plain.y).iter().zip(vector(&shifted.y).iter()) {
        assert!((rhs - lhs - 3.0).abs() < 1e-9);
    }
}

#[rstest]
fn noise_perturbs_targets_only(executor: LocalExecutor) {
    let base = RegressionConfig::new()
        .with_shape(16, 5)
        .with_n_informative(5)
        .with_dtype(Dtype::F64);
    let quiet = make_regression(&base, RandomState::Seed(10))
        .expect("valid config")
        .materialize(&executor)
        .expect("materializes");
    let noisy = make_regression(&base.clone().with_noise(1.0), RandomState::Seed(10))
        .expect("valid config")
        .materialize(&executor)
        .expect("materializes");

    assert_eq!(quiet.x, noisy.x);
    assert_ne!(quiet.y, noisy.y);
}

#[test]
fn coefficients_are_omitted_unless_requested() {
    let dataset =
        make_regression(&RegressionConfig::new().with_shape(4, 2), RandomState::Seed(0))
            .expect("valid config");
    assert!(dataset.coefficients().is_none());
    assert!(dataset.shuffle().is_none());
}

#[rstest]
#[case(7, 3)]
#[case(1, 1)]
fn shuffle_plans_are_permutations(#[case] n_samples: usize, #[case] n_features: usize) {
    let plan = ShufflePlan::draw(n_samples, n_features, Some(42));
    let mut samples = plan.samples().to_vec();
    samples.sort_unstable();
    assert_eq!(samples, (0..n_samples).collect::<Vec<_>>());
    let mut features = plan.features().to_vec();
    features.sort_unstable();
    assert_eq!(features, (0..n_features).collect::<Vec<_>>());
    assert_eq!(plan, ShufflePlan::draw(n_samples, n_features, Some(42)));
}

#[test]
fn shared_sources_continue_their_stream() {
    let config = RegressionConfig::new().with_shape(6, 3).with_n_informative(3);
    let source = RandomSource::from_seed(5);
    let first = assemble(&config, &source).expect("valid config");
    let second = assemble(&config, &source).expect("valid config");
    let executor = LocalExecutor::new().with_mode(ExecutionMode::Serial);
    assert_ne!(
        first.materialize(&executor).expect("materializes").x,
        second.materialize(&executor).expect("materializes").x,
    );
}

#[rstest]
#[case(MemoryOrder::RowMajor)]
#[case(MemoryOrder::ColumnMajor)]
fn local_executor_uses_the_requested_order(#[case] order: MemoryOrder) {
    let dataset = make_regression(
        &RegressionConfig::new().with_shape(5, 3).with_order(order),
        RandomState::Seed(0),
    )
    .expect("valid config");
    let dense = dataset
        .materialize(&dataset.local_executor())
        .expect("materializes");
    assert_eq!(
        dense.x.is_column_major(),
        order == MemoryOrder::ColumnMajor
    );
}
