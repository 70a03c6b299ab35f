//! Lazy, immutable task graph for chunked matrices.
//!
//! A [`LazyArray`] is a handle to a node in a directed acyclic graph. Every
//! operation allocates a new node whose chunk layout is computed eagerly, so
//! shapes and block boundaries are known (and validated) long before any
//! executor materializes data. Nodes are shared through `Arc`, never mutated.

use std::{collections::HashSet, fmt, ops::Range, sync::Arc};

use crate::{
    Result,
    element::Dtype,
    error::{BlockregError, ExecutionError},
    partition::PartitionScheme,
    random::DrawKey,
};

/// Axis of a two-dimensional array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayAxis {
    /// The first axis (samples).
    Rows,
    /// The second axis (features or targets).
    Columns,
}

/// Chunk layout of a two-dimensional array.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    rows: PartitionScheme,
    cols: PartitionScheme,
}

impl Layout {
    /// Pairs a row and a column partition.
    #[must_use]
    pub fn new(rows: PartitionScheme, cols: PartitionScheme) -> Self {
        Self { rows, cols }
    }

    /// Row partition.
    #[must_use]
    pub fn rows(&self) -> &PartitionScheme {
        &self.rows
    }

    /// Column partition.
    #[must_use]
    pub fn cols(&self) -> &PartitionScheme {
        &self.cols
    }

    /// Logical `(rows, cols)` shape.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.total(), self.cols.total())
    }

    fn transposed(&self) -> Self {
        Self::new(self.cols.clone(), self.rows.clone())
    }
}

pub(crate) enum Op {
    StandardNormal { key: DrawKey },
    Zeros,
    Constant { values: Arc<[f64]> },
    Qr { input: Arc<Node> },
    Transpose { input: Arc<Node> },
    MatMul { lhs: Arc<Node>, rhs: Arc<Node> },
    Rechunk { input: Arc<Node> },
    Concat { axis: ArrayAxis, parts: Vec<Arc<Node>> },
    SliceColumns { input: Arc<Node>, range: Range<usize> },
    Take { input: Arc<Node>, axis: ArrayAxis, indices: Arc<[usize]> },
    Scale { input: Arc<Node>, factor: f64 },
    AddScalar { input: Arc<Node>, value: f64 },
    Add { lhs: Arc<Node>, rhs: Arc<Node> },
    MulColumns { input: Arc<Node>, factors: Arc<Node> },
}

impl Op {
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::StandardNormal { .. } => "standard_normal",
            Self::Zeros => "zeros",
            Self::Constant { .. } => "constant",
            Self::Qr { .. } => "qr",
            Self::Transpose { .. } => "transpose",
            Self::MatMul { .. } => "matmul",
            Self::Rechunk { .. } => "rechunk",
            Self::Concat { .. } => "concat",
            Self::SliceColumns { .. } => "slice_columns",
            Self::Take { .. } => "take",
            Self::Scale { .. } => "scale",
            Self::AddScalar { .. } => "add_scalar",
            Self::Add { .. } => "add",
            Self::MulColumns { .. } => "mul_columns",
        }
    }

    pub(crate) fn inputs(&self) -> Vec<&Arc<Node>> {
        match self {
            Self::StandardNormal { .. } | Self::Zeros | Self::Constant { .. } => Vec::new(),
            Self::Qr { input }
            | Self::Transpose { input }
            | Self::Rechunk { input }
            | Self::SliceColumns { input, .. }
            | Self::Take { input, .. }
            | Self::Scale { input, .. }
            | Self::AddScalar { input, .. } => vec![input],
            Self::MatMul { lhs, rhs } | Self::Add { lhs, rhs } => vec![lhs, rhs],
            Self::MulColumns { input, factors } => vec![input, factors],
            Self::Concat { parts, .. } => parts.iter().collect(),
        }
    }
}

pub(crate) struct Node {
    pub(crate) op: Op,
    pub(crate) layout: Layout,
    pub(crate) dtype: Dtype,
}

impl Node {
    /// Identity of the node for memoization while its graph is alive.
    pub(crate) fn id(node: &Arc<Self>) -> usize {
        Arc::as_ptr(node) as usize
    }
}

/// Handle to a lazily described, chunked matrix.
///
/// Arrays are two-dimensional; [`LazyArray::squeeze`] marks a single-column
/// array as a vector so it reports (and materializes with) a one-dimensional
/// shape. Derived arrays stay squeezed while they keep a single column.
///
/// # Examples
/// ```
/// use blockreg_core::{Dtype, LazyArray, PartitionScheme};
///
/// let rows = PartitionScheme::regular(6, 4).expect("valid layout");
/// let cols = PartitionScheme::single(2).expect("valid layout");
/// let zeros = LazyArray::zeros(rows, cols, Dtype::F32);
/// let shifted = zeros.add_scalar(1.5).expect("finite offset");
/// assert_eq!(shifted.shape(), vec![6, 2]);
/// assert_eq!(shifted.row_chunks().blocks(), &[4, 2]);
/// ```
#[derive(Clone)]
pub struct LazyArray {
    node: Arc<Node>,
    squeezed: bool,
}

impl LazyArray {
    fn from_op(op: Op, layout: Layout, dtype: Dtype) -> Self {
        Self {
            node: Arc::new(Node { op, layout, dtype }),
            squeezed: false,
        }
    }

    fn derive(&self, op: Op, layout: Layout) -> Self {
        let squeezed = self.squeezed && layout.cols.total() == 1;
        Self {
            squeezed,
            ..Self::from_op(op, layout, self.dtype())
        }
    }

    pub(crate) fn standard_normal(
        key: DrawKey,
        rows: PartitionScheme,
        cols: PartitionScheme,
        dtype: Dtype,
    ) -> Self {
        Self::from_op(Op::StandardNormal { key }, Layout::new(rows, cols), dtype)
    }

    /// Describes an array of exact zeros.
    #[must_use]
    pub fn zeros(rows: PartitionScheme, cols: PartitionScheme, dtype: Dtype) -> Self {
        Self::from_op(Op::Zeros, Layout::new(rows, cols), dtype)
    }

    /// Describes a `1 × n` array holding `values`, chunked along its columns
    /// by `cols`.
    ///
    /// Values are stored in double precision and cast to `dtype` when
    /// materialized.
    ///
    /// # Errors
    /// Returns [`BlockregError::ShapeMismatch`] when `values` does not match
    /// the length of `cols`.
    pub fn from_row_vector(values: &[f64], cols: PartitionScheme, dtype: Dtype) -> Result<Self> {
        if values.len() != cols.total() {
            return Err(BlockregError::ShapeMismatch {
                operation: "from_row_vector",
                left: (1, values.len()),
                right: (1, cols.total()),
            });
        }
        let rows = PartitionScheme::single(1)?;
        Ok(Self::from_op(
            Op::Constant {
                values: values.into(),
            },
            Layout::new(rows, cols),
            dtype,
        ))
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Logical shape: `[rows, cols]`, or `[rows]` once squeezed.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        let (rows, cols) = self.layout().shape();
        if self.squeezed {
            vec![rows]
        } else {
            vec![rows, cols]
        }
    }

    /// Number of logical dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        if self.squeezed { 1 } else { 2 }
    }

    /// Number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.layout().rows().total()
    }

    /// Number of columns of the underlying matrix.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.layout().cols().total()
    }

    /// Chunk layout of the underlying matrix.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.node.layout
    }

    /// Row partition.
    #[must_use]
    pub fn row_chunks(&self) -> &PartitionScheme {
        self.layout().rows()
    }

    /// Column partition.
    #[must_use]
    pub fn col_chunks(&self) -> &PartitionScheme {
        self.layout().cols()
    }

    /// Element precision.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        self.node.dtype
    }

    /// Returns `true` when the array reports a one-dimensional shape.
    #[must_use]
    pub fn is_squeezed(&self) -> bool {
        self.squeezed
    }

    /// Name of the operation that produces this array.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.node.op.name()
    }

    /// Counts the distinct nodes reachable from this array, itself included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut seen = HashSet::new();
        let mut pending = vec![&self.node];
        while let Some(node) = pending.pop() {
            if seen.insert(Node::id(node)) {
                pending.extend(node.op.inputs());
            }
        }
        seen.len()
    }

    fn ensure_same_dtype(&self, other: &Self, operation: &'static str) -> Result<()> {
        if self.dtype() == other.dtype() {
            Ok(())
        } else {
            Err(BlockregError::DtypeMismatch {
                operation,
                left: self.dtype(),
                right: other.dtype(),
            })
        }
    }

    /// Orthonormalizes the columns with a block (tall-skinny) QR.
    ///
    /// The columns are first gathered into one block. Every row block must be
    /// at least as tall as the matrix is wide, which is what
    /// [`PartitionScheme::sizes`] guarantees.
    ///
    /// # Errors
    /// Returns [`ExecutionError::QrBlockTooShort`] (wrapped in
    /// [`BlockregError::Execution`]) when a row block is shorter than the
    /// column count.
    pub fn qr(&self) -> Result<Self> {
        let cols = self.ncols();
        let input = self.rechunk_cols(PartitionScheme::single(cols)?)?;
        if let Some(&rows) = input.row_chunks().blocks().iter().find(|&&rows| rows < cols) {
            return Err(ExecutionError::QrBlockTooShort { rows, cols }.into());
        }
        let layout = input.layout().clone();
        Ok(input.derive(Op::Qr { input: input.node.clone() }, layout))
    }

    /// Swaps rows and columns, carrying the chunk layout along.
    #[must_use]
    pub fn transpose(&self) -> Self {
        self.derive(
            Op::Transpose {
                input: self.node.clone(),
            },
            self.layout().transposed(),
        )
    }

    /// Describes the matrix product `self × rhs`.
    ///
    /// The row chunks of `rhs` are aligned with the column chunks of `self`
    /// when they differ.
    ///
    /// # Errors
    /// Returns [`BlockregError::ShapeMismatch`] when the inner dimensions
    /// differ and [`BlockregError::DtypeMismatch`] for mixed precisions.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        self.ensure_same_dtype(rhs, "matmul")?;
        if self.ncols() != rhs.nrows() {
            return Err(BlockregError::ShapeMismatch {
                operation: "matmul",
                left: self.layout().shape(),
                right: rhs.layout().shape(),
            });
        }
        let aligned = rhs.rechunk_rows(self.col_chunks().clone())?;
        let layout = Layout::new(self.row_chunks().clone(), aligned.col_chunks().clone());
        Ok(self.derive(
            Op::MatMul {
                lhs: self.node.clone(),
                rhs: aligned.node,
            },
            layout,
        ))
    }

    /// Changes the chunk layout without changing values. Returns a cheap
    /// clone when the layout is unchanged.
    ///
    /// # Errors
    /// Returns [`BlockregError::ShapeMismatch`] when the new layout covers a
    /// different shape.
    pub fn rechunk(&self, rows: PartitionScheme, cols: PartitionScheme) -> Result<Self> {
        let layout = Layout::new(rows, cols);
        if layout.shape() != self.layout().shape() {
            return Err(BlockregError::ShapeMismatch {
                operation: "rechunk",
                left: self.layout().shape(),
                right: layout.shape(),
            });
        }
        if &layout == self.layout() {
            return Ok(self.clone());
        }
        Ok(self.derive(
            Op::Rechunk {
                input: self.node.clone(),
            },
            layout,
        ))
    }

    /// Rechunks the rows, keeping the column layout.
    ///
    /// # Errors
    /// See [`LazyArray::rechunk`].
    pub fn rechunk_rows(&self, rows: PartitionScheme) -> Result<Self> {
        self.rechunk(rows, self.col_chunks().clone())
    }

    /// Rechunks the columns, keeping the row layout.
    ///
    /// # Errors
    /// See [`LazyArray::rechunk`].
    pub fn rechunk_cols(&self, cols: PartitionScheme) -> Result<Self> {
        self.rechunk(self.row_chunks().clone(), cols)
    }

    /// Concatenates arrays along `axis`.
    ///
    /// Later parts are rechunked along the other axis to match the first.
    ///
    /// # Errors
    /// Returns [`BlockregError::ZeroSize`] for an empty slice,
    /// [`BlockregError::ShapeMismatch`] when the other axis differs, and
    /// [`BlockregError::DtypeMismatch`] for mixed precisions.
    pub fn concat(parts: &[Self], axis: ArrayAxis) -> Result<Self> {
        let Some((first, rest)) = parts.split_first() else {
            return Err(BlockregError::ZeroSize {
                parameter: "concatenated parts",
            });
        };
        let mut nodes = vec![first.node.clone()];
        let mut layout = first.layout().clone();
        for part in rest {
            first.ensure_same_dtype(part, "concat")?;
            let (aligned, extended) = match axis {
                ArrayAxis::Rows => {
                    let aligned = part.rechunk_cols(layout.cols.clone()).map_err(|_| {
                        BlockregError::ShapeMismatch {
                            operation: "concat",
                            left: first.layout().shape(),
                            right: part.layout().shape(),
                        }
                    })?;
                    let rows = layout.rows.concat(aligned.row_chunks());
                    (aligned, Layout::new(rows, layout.cols.clone()))
                }
                ArrayAxis::Columns => {
                    let aligned = part.rechunk_rows(layout.rows.clone()).map_err(|_| {
                        BlockregError::ShapeMismatch {
                            operation: "concat",
                            left: first.layout().shape(),
                            right: part.layout().shape(),
                        }
                    })?;
                    let cols = layout.cols.concat(aligned.col_chunks());
                    (aligned, Layout::new(layout.rows.clone(), cols))
                }
            };
            nodes.push(aligned.node);
            layout = extended;
        }
        Ok(first.derive(Op::Concat { axis, parts: nodes }, layout))
    }

    /// Selects the columns in `range`, keeping the block boundaries inside it.
    ///
    /// # Errors
    /// Returns [`BlockregError::Partition`] when the range is empty or out of
    /// bounds.
    pub fn slice_columns(&self, range: Range<usize>) -> Result<Self> {
        let cols = self.col_chunks().slice(range.clone())?;
        let layout = Layout::new(self.row_chunks().clone(), cols);
        Ok(self.derive(
            Op::SliceColumns {
                input: self.node.clone(),
                range,
            },
            layout,
        ))
    }

    /// Gathers rows or columns by position, in the order given.
    ///
    /// A full-length index list (a permutation) keeps the chunk layout;
    /// otherwise the gathered axis becomes a single block.
    ///
    /// # Errors
    /// Returns [`BlockregError::IndexOutOfBounds`] for an index past the axis
    /// and [`BlockregError::ZeroSize`] for an empty index list.
    pub fn take(&self, axis: ArrayAxis, indices: &[usize]) -> Result<Self> {
        let scheme = match axis {
            ArrayAxis::Rows => self.row_chunks(),
            ArrayAxis::Columns => self.col_chunks(),
        };
        let len = scheme.total();
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(BlockregError::IndexOutOfBounds { index, len });
        }
        if indices.is_empty() {
            return Err(BlockregError::ZeroSize {
                parameter: "take indices",
            });
        }
        let gathered = if indices.len() == len {
            scheme.clone()
        } else {
            PartitionScheme::single(indices.len())?
        };
        let layout = match axis {
            ArrayAxis::Rows => Layout::new(gathered, self.col_chunks().clone()),
            ArrayAxis::Columns => Layout::new(self.row_chunks().clone(), gathered),
        };
        Ok(self.derive(
            Op::Take {
                input: self.node.clone(),
                axis,
                indices: indices.into(),
            },
            layout,
        ))
    }

    /// Multiplies every element by `factor`.
    ///
    /// # Errors
    /// Returns [`BlockregError::InvalidFloatParameter`] for a non-finite
    /// factor.
    pub fn scale(&self, factor: f64) -> Result<Self> {
        ensure_finite(factor, "factor")?;
        Ok(self.derive(
            Op::Scale {
                input: self.node.clone(),
                factor,
            },
            self.layout().clone(),
        ))
    }

    /// Adds `value` to every element.
    ///
    /// # Errors
    /// Returns [`BlockregError::InvalidFloatParameter`] for a non-finite
    /// value.
    pub fn add_scalar(&self, value: f64) -> Result<Self> {
        ensure_finite(value, "value")?;
        Ok(self.derive(
            Op::AddScalar {
                input: self.node.clone(),
                value,
            },
            self.layout().clone(),
        ))
    }

    /// Adds two arrays elementwise, aligning `other` to this layout.
    ///
    /// # Errors
    /// Returns [`BlockregError::ShapeMismatch`] when the shapes differ and
    /// [`BlockregError::DtypeMismatch`] for mixed precisions.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.ensure_same_dtype(other, "add")?;
        let aligned = other
            .rechunk(self.row_chunks().clone(), self.col_chunks().clone())
            .map_err(|_| BlockregError::ShapeMismatch {
                operation: "add",
                left: self.layout().shape(),
                right: other.layout().shape(),
            })?;
        Ok(self.derive(
            Op::Add {
                lhs: self.node.clone(),
                rhs: aligned.node,
            },
            self.layout().clone(),
        ))
    }

    /// Multiplies column `j` by `factors[0, j]`, broadcasting a `1 × n` array
    /// over every row.
    ///
    /// # Errors
    /// Returns [`BlockregError::ShapeMismatch`] unless `factors` is `1 × n`
    /// for an `m × n` array, and [`BlockregError::DtypeMismatch`] for mixed
    /// precisions.
    pub fn mul_columns(&self, factors: &Self) -> Result<Self> {
        self.ensure_same_dtype(factors, "mul_columns")?;
        if factors.nrows() != 1 || factors.ncols() != self.ncols() {
            return Err(BlockregError::ShapeMismatch {
                operation: "mul_columns",
                left: self.layout().shape(),
                right: factors.layout().shape(),
            });
        }
        let aligned = factors.rechunk_cols(self.col_chunks().clone())?;
        Ok(self.derive(
            Op::MulColumns {
                input: self.node.clone(),
                factors: aligned.node,
            },
            self.layout().clone(),
        ))
    }

    /// Drops a trailing singleton dimension. Arrays with more than one column
    /// are returned unchanged.
    #[must_use]
    pub fn squeeze(&self) -> Self {
        Self {
            node: self.node.clone(),
            squeezed: self.squeezed || self.ncols() == 1,
        }
    }
}

fn ensure_finite(value: f64, parameter: &'static str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BlockregError::InvalidFloatParameter {
            parameter,
            expected: "a finite value",
        })
    }
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("operation", &self.operation())
            .field("shape", &self.shape())
            .field("rows", self.row_chunks())
            .field("cols", self.col_chunks())
            .field("dtype", &self.dtype())
            .finish()
    }
}
