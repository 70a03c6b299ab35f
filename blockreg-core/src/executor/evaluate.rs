//! Node-by-node evaluation of a lazy graph.

use std::{collections::HashMap, sync::Arc};

use ndarray::{Array2, Axis};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::trace;

use crate::{
    Result,
    element::Element,
    error::ExecutionError,
    graph::{ArrayAxis, Node, Op},
    random::standard_normal_block,
};

use super::{blocks::Blocks, qr::tsqr};

/// Runs `task` for every index in `0..count`, on the `rayon` pool when
/// `parallel` is set. Output order always follows the indices.
pub(super) fn map_indices<R, F>(parallel: bool, count: usize, task: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(usize) -> Result<R> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    if parallel {
        return (0..count).into_par_iter().map(task).collect();
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    (0..count).map(task).collect()
}

/// Evaluates nodes of one precision, memoizing shared subgraphs.
pub(super) struct Evaluator<T> {
    parallel: bool,
    cache: HashMap<usize, Arc<Blocks<T>>>,
}

impl<T: Element> Evaluator<T> {
    pub(super) fn new(parallel: bool) -> Self {
        Self {
            parallel,
            cache: HashMap::new(),
        }
    }

    pub(super) fn evaluate(&mut self, node: &Arc<Node>) -> Result<Arc<Blocks<T>>> {
        let id = Node::id(node);
        if let Some(done) = self.cache.get(&id) {
            return Ok(Arc::clone(done));
        }
        trace!(operation = node.op.name(), "evaluating node");
        let blocks = Arc::new(self.evaluate_op(node)?);
        self.cache.insert(id, Arc::clone(&blocks));
        Ok(blocks)
    }

    fn per_block<F>(&self, node: &Node, task: F) -> Result<Blocks<T>>
    where
        F: Fn(usize, usize) -> Result<Array2<T>> + Sync + Send,
    {
        let col_blocks = node.layout.cols().len();
        let count = node.layout.rows().len() * col_blocks;
        let data = map_indices(self.parallel, count, |index| {
            task(index / col_blocks, index % col_blocks)
        })?;
        Blocks::new(&node.layout, data)
    }

    fn evaluate_op(&mut self, node: &Node) -> Result<Blocks<T>> {
        let layout = &node.layout;
        match &node.op {
            Op::StandardNormal { key } => {
                let rows: Vec<_> = layout.rows().ranges().collect();
                let cols: Vec<_> = layout.cols().ranges().collect();
                self.per_block(node, |i, j| {
                    Ok(standard_normal_block(key, rows[i].clone(), cols[j].clone()))
                })
            }
            Op::Zeros => self.per_block(node, |i, j| {
                Ok(Array2::zeros((layout.rows().blocks()[i], layout.cols().blocks()[j])))
            }),
            Op::Constant { values } => {
                let cols: Vec<_> = layout.cols().ranges().collect();
                self.per_block(node, |_, j| {
                    let start = cols[j].start;
                    Ok(Array2::from_shape_fn((1, cols[j].len()), |(_, k)| {
                        T::cast_from_f64(values[start + k])
                    }))
                })
            }
            Op::Qr { input } => {
                let input = self.evaluate(input)?;
                let column: Vec<_> = input.iter().collect();
                Blocks::new(layout, tsqr(&column, self.parallel)?)
            }
            Op::Transpose { input } => {
                let input = self.evaluate(input)?;
                self.per_block(node, |i, j| Ok(input.get(j, i).t().to_owned()))
            }
            Op::MatMul { lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                if lhs.col_blocks() != rhs.row_blocks() {
                    return Err(ExecutionError::BlockMismatch {
                        operation: "matmul",
                        left: (lhs.row_blocks(), lhs.col_blocks()),
                        right: (rhs.row_blocks(), rhs.col_blocks()),
                    }
                    .into());
                }
                self.per_block(node, |i, j| {
                    let mut out = Array2::zeros((layout.rows().blocks()[i], layout.cols().blocks()[j]));
                    for k in 0..lhs.col_blocks() {
                        let (a, b) = (lhs.get(i, k), rhs.get(k, j));
                        if a.ncols() != b.nrows() {
                            return Err(ExecutionError::BlockMismatch {
                                operation: "matmul",
                                left: a.dim(),
                                right: b.dim(),
                            }
                            .into());
                        }
                        out = out + a.dot(b);
                    }
                    Ok(out)
                })
            }
            Op::Rechunk { input } => {
                let full = self.evaluate(input)?.assemble()?;
                Blocks::split(layout, &full)
            }
            Op::Concat { axis, parts } => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    views.push(self.evaluate(part)?.assemble()?);
                }
                let borrowed: Vec<_> = views.iter().map(Array2::view).collect();
                let full = ndarray::concatenate(ndarray_axis(*axis), &borrowed).map_err(|_| {
                    ExecutionError::BlockMismatch {
                        operation: "concat",
                        left: views.first().map_or((0, 0), Array2::dim),
                        right: views.last().map_or((0, 0), Array2::dim),
                    }
                })?;
                Blocks::split(layout, &full)
            }
            Op::SliceColumns { input, range } => {
                let full = self.evaluate(input)?.assemble()?;
                let sliced = full.slice(ndarray::s![.., range.clone()]).to_owned();
                Blocks::split(layout, &sliced)
            }
            Op::Take {
                input,
                axis,
                indices,
            } => {
                let full = self.evaluate(input)?.assemble()?;
                Blocks::split(layout, &full.select(ndarray_axis(*axis), indices))
            }
            Op::Scale { input, factor } => {
                let input = self.evaluate(input)?;
                let factor = T::cast_from_f64(*factor);
                self.per_block(node, |i, j| Ok(input.get(i, j).mapv(|v| v * factor)))
            }
            Op::AddScalar { input, value } => {
                let input = self.evaluate(input)?;
                let value = T::cast_from_f64(*value);
                self.per_block(node, |i, j| Ok(input.get(i, j).mapv(|v| v + value)))
            }
            Op::Add { lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                self.per_block(node, |i, j| {
                    let (a, b) = (lhs.get(i, j), rhs.get(i, j));
                    if a.dim() != b.dim() {
                        return Err(ExecutionError::BlockMismatch {
                            operation: "add",
                            left: a.dim(),
                            right: b.dim(),
                        }
                        .into());
                    }
                    Ok(a + b)
                })
            }
            Op::MulColumns { input, factors } => {
                let input = self.evaluate(input)?;
                let factors = self.evaluate(factors)?;
                self.per_block(node, |i, j| {
                    let (block, scale) = (input.get(i, j), factors.get(0, j));
                    if block.ncols() != scale.ncols() {
                        return Err(ExecutionError::BlockMismatch {
                            operation: "mul_columns",
                            left: block.dim(),
                            right: scale.dim(),
                        }
                        .into());
                    }
                    Ok(block * &scale.row(0))
                })
            }
        }
    }
}

fn ndarray_axis(axis: ArrayAxis) -> Axis {
    match axis {
        ArrayAxis::Rows => Axis(0),
        ArrayAxis::Columns => Axis(1),
    }
}
