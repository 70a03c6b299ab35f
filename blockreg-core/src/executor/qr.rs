//! Tall-skinny QR over a column of row blocks.
//!
//! Each block is factored independently; the stacked `R` factors are then
//! factored once more and the second-level `Q` is folded back into every
//! block. The result has orthonormal columns and keeps the input row layout.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Axis, concatenate, s};

use crate::{Result, element::Element, error::ExecutionError};

use super::evaluate::map_indices;

fn to_nalgebra<T: Element>(block: ArrayView2<'_, T>) -> DMatrix<T> {
    let (rows, cols) = block.dim();
    DMatrix::from_fn(rows, cols, |i, j| block[[i, j]])
}

fn to_ndarray<T: Element>(matrix: &DMatrix<T>) -> Array2<T> {
    Array2::from_shape_fn(matrix.shape(), |(i, j)| matrix[(i, j)])
}

/// Thin QR of one block: `Q` is `rows × cols`, `R` is `cols × cols`.
fn thin_qr<T: Element>(block: ArrayView2<'_, T>) -> Result<(Array2<T>, Array2<T>)> {
    let (rows, cols) = block.dim();
    if rows < cols {
        return Err(ExecutionError::QrBlockTooShort { rows, cols }.into());
    }
    let qr = to_nalgebra(block).qr();
    Ok((to_ndarray(&qr.q()), to_ndarray(&qr.r())))
}

/// Returns the orthonormal factor of the matrix formed by stacking `blocks`.
pub(super) fn tsqr<T: Element>(blocks: &[&Array2<T>], parallel: bool) -> Result<Vec<Array2<T>>> {
    let factors = map_indices(parallel, blocks.len(), |index| thin_qr(blocks[index].view()))?;
    if factors.len() == 1 {
        return Ok(factors.into_iter().map(|(q, _)| q).collect());
    }

    let cols = blocks.first().map_or(0, |block| block.ncols());
    let stacked_r: Vec<ArrayView2<'_, T>> = factors.iter().map(|(_, r)| r.view()).collect();
    let stacked = concatenate(Axis(0), &stacked_r).map_err(|_| ExecutionError::BlockMismatch {
        operation: "qr",
        left: (cols, cols),
        right: factors.first().map_or((0, 0), |(_, r)| r.dim()),
    })?;
    let (second_q, _) = thin_qr(stacked.view())?;

    map_indices(parallel, factors.len(), |index| {
        let (q, _) = &factors[index];
        let rotation = second_q.slice(s![index * cols..(index + 1) * cols, ..]);
        Ok(q.dot(&rotation))
    })
}
