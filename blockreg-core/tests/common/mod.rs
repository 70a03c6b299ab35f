use blockreg_core::{DenseArray, ExecutionMode, LocalExecutor};
use ndarray::{Array1, Array2, Ix1, Ix2};

#[must_use]
pub fn serial() -> LocalExecutor {
    LocalExecutor::new().with_mode(ExecutionMode::Serial)
}

#[must_use]
pub fn matrix(dense: &DenseArray) -> Array2<f64> {
    dense
        .to_f64()
        .into_dimensionality::<Ix2>()
        .expect("array must be two-dimensional")
}

#[must_use]
pub fn vector(dense: &DenseArray) -> Array1<f64> {
    dense
        .to_f64()
        .into_dimensionality::<Ix1>()
        .expect("array must be one-dimensional")
}
