//! Grid of materialized blocks matching a node's chunk layout.

use std::ops::Range;

use ndarray::{Array2, s};

use crate::{Result, element::Element, error::ExecutionError, graph::Layout};

/// Materialized blocks stored in row-major grid order.
#[derive(Debug, Clone)]
pub(super) struct Blocks<T> {
    rows: Vec<Range<usize>>,
    cols: Vec<Range<usize>>,
    data: Vec<Array2<T>>,
}

impl<T: Element> Blocks<T> {
    /// Wraps blocks produced for `layout`, checking every block's shape.
    pub(super) fn new(layout: &Layout, data: Vec<Array2<T>>) -> Result<Self> {
        let rows: Vec<_> = layout.rows().ranges().collect();
        let cols: Vec<_> = layout.cols().ranges().collect();
        let expected = rows.len() * cols.len();
        if data.len() != expected {
            return Err(ExecutionError::LayoutViolation {
                expected,
                actual: data.len(),
            }
            .into());
        }
        let blocks = Self { rows, cols, data };
        for (index, block) in blocks.data.iter().enumerate() {
            let (row, col) = blocks.position(index);
            let wanted = (blocks.rows[row].len(), blocks.cols[col].len());
            if block.dim() != wanted {
                return Err(ExecutionError::LayoutViolation {
                    expected: wanted.0 * wanted.1,
                    actual: block.len(),
                }
                .into());
            }
        }
        Ok(blocks)
    }

    /// Splits a whole matrix along the boundaries of `layout`.
    pub(super) fn split(layout: &Layout, full: &Array2<T>) -> Result<Self> {
        let (rows, cols) = layout.shape();
        if full.dim() != (rows, cols) {
            return Err(ExecutionError::LayoutViolation {
                expected: rows * cols,
                actual: full.len(),
            }
            .into());
        }
        let col_ranges: Vec<_> = layout.cols().ranges().collect();
        let data = layout
            .rows()
            .ranges()
            .flat_map(|r| {
                col_ranges
                    .iter()
                    .map(move |c| full.slice(s![r.clone(), c.clone()]).to_owned())
            })
            .collect();
        Self::new(layout, data)
    }

    /// Number of blocks.
    pub(super) fn len(&self) -> usize {
        self.data.len()
    }

    pub(super) fn row_blocks(&self) -> usize {
        self.rows.len()
    }

    pub(super) fn col_blocks(&self) -> usize {
        self.cols.len()
    }

    /// Grid coordinates of the block stored at `index`.
    pub(super) fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols.len(), index % self.cols.len())
    }

    pub(super) fn get(&self, row: usize, col: usize) -> &Array2<T> {
        &self.data[row * self.cols.len() + col]
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = &Array2<T>> {
        self.data.iter()
    }

    /// Copies every block into one contiguous matrix.
    pub(super) fn assemble(&self) -> Result<Array2<T>> {
        let total_rows = self.rows.last().map_or(0, |r| r.end);
        let total_cols = self.cols.last().map_or(0, |c| c.end);
        let mut full = Array2::zeros((total_rows, total_cols));
        for (index, block) in self.data.iter().enumerate() {
            let (row, col) = self.position(index);
            let mut target = full.slice_mut(s![self.rows[row].clone(), self.cols[col].clone()]);
            if target.dim() != block.dim() {
                return Err(ExecutionError::BlockMismatch {
                    operation: "assemble",
                    left: target.dim(),
                    right: block.dim(),
                }
                .into());
            }
            target.assign(block);
        }
        Ok(full)
    }
}
