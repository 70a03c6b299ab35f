//! Materialization of lazy graphs.
//!
//! The core only describes computations; an [`Executor`] turns a
//! [`LazyArray`] into data. [`LocalExecutor`] is the in-process reference
//! implementation: it evaluates nodes block by block with `ndarray`, factors
//! blocks with `nalgebra`, and optionally spreads per-block work over `rayon`.

mod blocks;
mod evaluate;
mod qr;

use ndarray::{Array2, ArrayD, ShapeBuilder};
use tracing::{debug, instrument};

use crate::{
    Result,
    element::{Dtype, Element},
    error::ParseError,
    graph::LazyArray,
};

use self::evaluate::Evaluator;

/// Submits lazy graphs and returns their materialized values.
pub trait Executor {
    /// Materializes a single array.
    ///
    /// # Errors
    /// Returns an error when the graph cannot be evaluated, for example
    /// because a QR block is shorter than it is wide.
    fn compute(&self, array: &LazyArray) -> Result<DenseArray>;

    /// Materializes several arrays, in order.
    ///
    /// Implementations may share work between arrays whose graphs overlap.
    ///
    /// # Errors
    /// Returns the first evaluation error encountered.
    fn compute_many(&self, arrays: &[&LazyArray]) -> Result<Vec<DenseArray>> {
        arrays.iter().map(|array| self.compute(array)).collect()
    }
}

/// How [`LocalExecutor`] schedules per-block work.
///
/// `Auto` selects `Parallel` when the crate is built with the `parallel`
/// feature and `Serial` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Pick the best mode available in this build.
    #[default]
    Auto,
    /// Evaluate blocks one after another on the calling thread.
    Serial,
    /// Evaluate independent blocks on the `rayon` thread pool.
    Parallel,
}

impl ExecutionMode {
    fn resolve(self) -> Result<bool> {
        match self {
            Self::Serial => Ok(false),
            Self::Auto => Ok(cfg!(feature = "parallel")),
            #[cfg(feature = "parallel")]
            Self::Parallel => Ok(true),
            #[cfg(not(feature = "parallel"))]
            Self::Parallel => Err(crate::error::BlockregError::BackendUnavailable {
                requested: Self::Parallel,
            }),
        }
    }
}

/// Memory layout of materialized two-dimensional arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MemoryOrder {
    /// C order: rows are contiguous.
    RowMajor,
    /// Fortran order: columns are contiguous.
    #[default]
    ColumnMajor,
}

impl std::str::FromStr for MemoryOrder {
    type Err = ParseError;

    fn from_str(raw: &str) -> core::result::Result<Self, Self::Err> {
        match raw.trim() {
            "C" | "c" | "row-major" => Ok(Self::RowMajor),
            "F" | "f" | "column-major" => Ok(Self::ColumnMajor),
            other => Err(ParseError::UnknownMemoryOrder {
                provided: other.to_owned(),
            }),
        }
    }
}

/// A fully materialized array.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseArray {
    /// Single-precision values.
    F32(ArrayD<f32>),
    /// Double-precision values.
    F64(ArrayD<f64>),
}

impl DenseArray {
    /// Precision of the stored values.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        match self {
            Self::F32(_) => Dtype::F32,
            Self::F64(_) => Dtype::F64,
        }
    }

    /// Shape of the stored array.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::F32(array) => array.shape(),
            Self::F64(array) => array.shape(),
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Returns `true` when the data is laid out in row-major order.
    #[must_use]
    pub fn is_standard_layout(&self) -> bool {
        match self {
            Self::F32(array) => array.is_standard_layout(),
            Self::F64(array) => array.is_standard_layout(),
        }
    }

    /// Returns `true` when the data is laid out in column-major order.
    #[must_use]
    pub fn is_column_major(&self) -> bool {
        match self {
            Self::F32(array) => array.t().is_standard_layout(),
            Self::F64(array) => array.t().is_standard_layout(),
        }
    }

    /// Borrows single-precision data.
    #[must_use]
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Self::F32(array) => Some(array),
            Self::F64(_) => None,
        }
    }

    /// Borrows double-precision data.
    #[must_use]
    pub fn as_f64(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::F64(array) => Some(array),
            Self::F32(_) => None,
        }
    }

    /// Copies the values into a double-precision array.
    #[must_use]
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Self::F32(array) => array.mapv(f64::from),
            Self::F64(array) => array.clone(),
        }
    }

    /// Frobenius norm, accumulated in double precision.
    #[must_use]
    pub fn frobenius_norm(&self) -> f64 {
        match self {
            Self::F32(array) => array.iter().map(|&v| f64::from(v).powi(2)).sum::<f64>().sqrt(),
            Self::F64(array) => array.iter().map(|v| v.powi(2)).sum::<f64>().sqrt(),
        }
    }
}

/// In-process reference executor.
///
/// # Examples
/// ```
/// use blockreg_core::{Dtype, Executor, LocalExecutor, PartitionScheme, RandomSource};
///
/// let source = RandomSource::from_seed(3);
/// let rows = PartitionScheme::regular(8, 3).expect("valid layout");
/// let cols = PartitionScheme::single(2).expect("valid layout");
/// let draw = source.standard_normal(rows, cols, Dtype::F64).expect("draw");
/// let dense = LocalExecutor::new().compute(&draw).expect("materializes");
/// assert_eq!(dense.shape(), &[8, 2]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalExecutor {
    mode: ExecutionMode,
    order: MemoryOrder,
}

impl LocalExecutor {
    /// Creates an executor with [`ExecutionMode::Auto`] and column-major
    /// output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the scheduling mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the memory layout of materialized arrays.
    #[must_use]
    pub fn with_order(mut self, order: MemoryOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns the configured scheduling mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns the configured memory layout.
    #[must_use]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    fn finish<T: Element>(&self, evaluator: &mut Evaluator<T>, array: &LazyArray) -> Result<DenseArray> {
        let blocks = evaluator.evaluate(array.node())?;
        let full = blocks.assemble()?;
        debug!(
            operation = array.operation(),
            blocks = blocks.len(),
            rows = %array.row_chunks(),
            cols = %array.col_chunks(),
            "materialized array"
        );
        Ok(T::into_dense(self.shape_output(full, array.is_squeezed())))
    }

    fn shape_output<T: Element>(&self, full: Array2<T>, squeezed: bool) -> ArrayD<T> {
        if squeezed {
            return full.column(0).to_owned().into_dyn();
        }
        match self.order {
            MemoryOrder::RowMajor => full.as_standard_layout().into_owned().into_dyn(),
            MemoryOrder::ColumnMajor => {
                let mut out = Array2::zeros(full.dim().f());
                out.assign(&full);
                out.into_dyn()
            }
        }
    }
}

impl Executor for LocalExecutor {
    #[instrument(
        name = "core.compute",
        err,
        skip(self, array),
        fields(
            operation = array.operation(),
            shape = ?array.shape(),
            dtype = %array.dtype(),
            mode = ?self.mode,
        ),
    )]
    fn compute(&self, array: &LazyArray) -> Result<DenseArray> {
        let parallel = self.mode.resolve()?;
        match array.dtype() {
            Dtype::F32 => self.finish(&mut Evaluator::<f32>::new(parallel), array),
            Dtype::F64 => self.finish(&mut Evaluator::<f64>::new(parallel), array),
        }
    }

    #[instrument(
        name = "core.compute_many",
        err,
        skip(self, arrays),
        fields(arrays = arrays.len(), mode = ?self.mode),
    )]
    fn compute_many(&self, arrays: &[&LazyArray]) -> Result<Vec<DenseArray>> {
        let parallel = self.mode.resolve()?;
        let mut single = Evaluator::<f32>::new(parallel);
        let mut double = Evaluator::<f64>::new(parallel);
        arrays
            .iter()
            .map(|array| match array.dtype() {
                Dtype::F32 => self.finish(&mut single, array),
                Dtype::F64 => self.finish(&mut double, array),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
