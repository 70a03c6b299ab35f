//! Unit tests for the local executor.

use ndarray::{Array2, ArrayD, Ix2, array};
use rstest::{fixture, rstest};

use super::{DenseArray, ExecutionMode, Executor, LocalExecutor, MemoryOrder};
use crate::{
    ArrayAxis, Dtype, LazyArray, PartitionScheme, RandomSource,
    error::{BlockregError, ExecutionError, ParseError},
};

fn scheme(blocks: &[usize]) -> PartitionScheme {
    PartitionScheme::from_blocks(blocks.to_vec()).expect("blocks are positive")
}

fn dense_f64(dense: &DenseArray) -> Array2<f64> {
    dense
        .to_f64()
        .into_dimensionality::<Ix2>()
        .expect("array is two-dimensional")
}

#[fixture]
fn executor() -> LocalExecutor {
    LocalExecutor::new().with_mode(ExecutionMode::Serial)
}

#[rstest]
#[case(&[10], &[70])]
#[case(&[3, 3, 4], &[64, 6])]
#[case(&[1, 9], &[5, 60, 5])]
fn draws_do_not_depend_on_chunking(
    executor: LocalExecutor,
    #[case] rows: &[usize],
    #[case] cols: &[usize],
) {
    let reference = RandomSource::from_seed(11)
        .standard_normal(scheme(&[10]), scheme(&[70]), Dtype::F64)
        .expect("draw");
    let rechunked = RandomSource::from_seed(11)
        .standard_normal(scheme(rows), scheme(cols), Dtype::F64)
        .expect("draw");
    assert_eq!(
        executor.compute(&reference).expect("materializes"),
        executor.compute(&rechunked).expect("materializes"),
    );
}

#[rstest]
fn successive_draws_differ(executor: LocalExecutor) {
    let source = RandomSource::from_seed(5);
    let first = source
        .standard_normal(scheme(&[4]), scheme(&[3]), Dtype::F32)
        .expect("draw");
    let second = source
        .standard_normal(scheme(&[4]), scheme(&[3]), Dtype::F32)
        .expect("draw");
    assert_ne!(
        executor.compute(&first).expect("materializes"),
        executor.compute(&second).expect("materializes"),
    );
}

#[rstest]
fn matmul_matches_dense_product(executor: LocalExecutor) {
    let source = RandomSource::from_seed(2);
    let lhs = source
        .standard_normal(scheme(&[2, 3]), scheme(&[1, 3]), Dtype::F64)
        .expect("draw");
    let rhs = source
        .standard_normal(scheme(&[4]), scheme(&[2, 1]), Dtype::F64)
        .expect("draw");
    let product = lhs.matmul(&rhs).expect("inner dimensions agree");
    assert_eq!(product.row_chunks().blocks(), &[2, 3]);
    assert_eq!(product.col_chunks().blocks(), &[2, 1]);

    let values = executor
        .compute_many(&[&lhs, &rhs, &product])
        .expect("materializes");
    let expected = dense_f64(&values[0]).dot(&dense_f64(&values[1]));
    for (got, want) in dense_f64(&values[2]).iter().zip(expected.iter()) {
        assert!((got - want).abs() < 1e-12);
    }
}

#[rstest]
fn transpose_swaps_axes(executor: LocalExecutor) {
    let draw = RandomSource::from_seed(8)
        .standard_normal(scheme(&[2, 2]), scheme(&[3]), Dtype::F64)
        .expect("draw");
    let transposed = draw.transpose();
    assert_eq!(transposed.shape(), vec![3, 4]);
    let values = executor
        .compute_many(&[&draw, &transposed])
        .expect("materializes");
    assert_eq!(dense_f64(&values[0]).t(), dense_f64(&values[1]));
}

#[rstest]
fn qr_produces_orthonormal_columns(executor: LocalExecutor) {
    let draw = RandomSource::from_seed(13)
        .standard_normal(scheme(&[6, 6, 8]), scheme(&[5]), Dtype::F64)
        .expect("draw");
    let q = draw.qr().expect("blocks are tall enough");
    let q = dense_f64(&executor.compute(&q).expect("materializes"));
    let gram = q.t().dot(&q);
    for ((i, j), value) in gram.indexed_iter() {
        let expected = if i == j { 1.0 } else { 0.0 };
        assert!((value - expected).abs() < 1e-10, "gram[{i},{j}] = {value}");
    }
}

#[test]
fn qr_rejects_short_blocks_at_construction() {
    let draw = RandomSource::from_seed(1)
        .standard_normal(scheme(&[2, 8]), scheme(&[4]), Dtype::F32)
        .expect("draw");
    let err = draw.qr().expect_err("first block is too short");
    assert_eq!(
        err,
        BlockregError::Execution(ExecutionError::QrBlockTooShort { rows: 2, cols: 4 })
    );
}

#[rstest]
fn elementwise_ops_follow_their_formulas(executor: LocalExecutor) {
    let zeros = LazyArray::zeros(scheme(&[2, 1]), scheme(&[2]), Dtype::F64);
    let factors =
        LazyArray::from_row_vector(&[2.0, -1.0], scheme(&[2]), Dtype::F64).expect("length matches");
    let shifted = zeros.add_scalar(1.5).expect("finite");
    let scaled = shifted
        .mul_columns(&factors)
        .expect("one factor per column")
        .scale(2.0)
        .expect("finite");
    let summed = scaled.add(&shifted).expect("same shape");
    let dense = dense_f64(&executor.compute(&summed).expect("materializes"));
    assert_eq!(dense, array![[7.5, -1.5], [7.5, -1.5], [7.5, -1.5]]);
}

#[rstest]
fn concat_slice_and_take_rearrange_values(executor: LocalExecutor) {
    let left = LazyArray::from_row_vector(&[1.0, 2.0], scheme(&[2]), Dtype::F64).expect("row");
    let right =
        LazyArray::from_row_vector(&[3.0, 4.0, 5.0], scheme(&[1, 2]), Dtype::F64).expect("row");
    let joined = LazyArray::concat(&[left, right], ArrayAxis::Columns).expect("same height");
    assert_eq!(joined.col_chunks().blocks(), &[2, 1, 2]);

    let sliced = joined.slice_columns(1..4).expect("inside the row");
    assert_eq!(sliced.col_chunks().blocks(), &[1, 1, 1]);
    let taken = joined
        .take(ArrayAxis::Columns, &[4, 0, 2, 1, 3])
        .expect("permutation");
    let stacked = LazyArray::concat(&[joined.clone(), taken.clone()], ArrayAxis::Rows)
        .expect("same width");

    let values = executor
        .compute_many(&[&sliced, &taken, &stacked])
        .expect("materializes");
    assert_eq!(dense_f64(&values[0]), array![[2.0, 3.0, 4.0]]);
    assert_eq!(dense_f64(&values[1]), array![[5.0, 1.0, 3.0, 2.0, 4.0]]);
    assert_eq!(
        dense_f64(&values[2]),
        array![[1.0, 2.0, 3.0, 4.0, 5.0], [5.0, 1.0, 3.0, 2.0, 4.0]]
    );
}

#[rstest]
fn squeezed_arrays_materialize_as_vectors(executor: LocalExecutor) {
    let column = LazyArray::zeros(scheme(&[2, 2]), scheme(&[1]), Dtype::F32)
        .add_scalar(3.0)
        .expect("finite")
        .squeeze();
    let dense = executor.compute(&column).expect("materializes");
    assert_eq!(dense.shape(), &[4]);
    assert_eq!(
        dense.as_f32().cloned(),
        Some(ArrayD::from_elem(vec![4], 3.0_f32))
    );
}

#[rstest]
fn operations_on_squeezed_arrays_materialize_as_vectors(executor: LocalExecutor) {
    let vector = LazyArray::zeros(scheme(&[2, 2]), scheme(&[1]), Dtype::F64)
        .squeeze()
        .add_scalar(1.0)
        .and_then(|shifted| shifted.rechunk_rows(scheme(&[3, 1])))
        .expect("finite offset and matching rows");
    let dense = executor.compute(&vector).expect("materializes");
    assert_eq!(dense.shape(), &[4]);
    assert_eq!(dense.as_f64().cloned(), Some(ArrayD::from_elem(vec![4], 1.0_f64)));
}

#[rstest]
#[case(MemoryOrder::ColumnMajor, true, false)]
#[case(MemoryOrder::RowMajor, false, true)]
fn honours_memory_order(
    #[case] order: MemoryOrder,
    #[case] column_major: bool,
    #[case] row_major: bool,
) {
    let draw = RandomSource::from_seed(4)
        .standard_normal(scheme(&[3]), scheme(&[2]), Dtype::F64)
        .expect("draw");
    let dense = LocalExecutor::new()
        .with_mode(ExecutionMode::Serial)
        .with_order(order)
        .compute(&draw)
        .expect("materializes");
    assert_eq!(dense.is_column_major(), column_major);
    assert_eq!(dense.is_standard_layout(), row_major);
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_and_serial_results_match() {
    let source = RandomSource::from_seed(21);
    let draw = source
        .standard_normal(scheme(&[8, 8, 8]), scheme(&[4, 4]), Dtype::F32)
        .expect("draw");
    let q = draw.qr().expect("tall blocks");
    let serial = LocalExecutor::new()
        .with_mode(ExecutionMode::Serial)
        .compute(&q)
        .expect("materializes");
    let parallel = LocalExecutor::new()
        .with_mode(ExecutionMode::Parallel)
        .compute(&q)
        .expect("materializes");
    assert_eq!(serial, parallel);
}

#[cfg(not(feature = "parallel"))]
#[test]
fn parallel_mode_requires_feature() {
    let zeros = LazyArray::zeros(scheme(&[1]), scheme(&[1]), Dtype::F32);
    let err = LocalExecutor::new()
        .with_mode(ExecutionMode::Parallel)
        .compute(&zeros)
        .expect_err("parallel backend is compiled out");
    assert_eq!(
        err,
        BlockregError::BackendUnavailable {
            requested: ExecutionMode::Parallel
        }
    );
}

#[test]
fn frobenius_norm_accumulates_in_double_precision() {
    let dense = DenseArray::F32(ArrayD::from_elem(vec![2, 2], 0.5_f32));
    assert!((dense.frobenius_norm() - 1.0).abs() < 1e-12);
    assert_eq!(dense.dtype(), Dtype::F32);
}

#[rstest]
#[case("C", Ok(MemoryOrder::RowMajor))]
#[case("F", Ok(MemoryOrder::ColumnMajor))]
#[case(" A ", Err(ParseError::UnknownMemoryOrder { provided: "A".to_owned() }))]
fn parses_memory_order(#[case] raw: &str, #[case] expected: Result<MemoryOrder, ParseError>) {
    assert_eq!(raw.parse::<MemoryOrder>(), expected);
}
