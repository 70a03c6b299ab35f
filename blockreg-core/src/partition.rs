//! Block layouts for one axis of a chunked array.
//!
//! A [`PartitionScheme`] lists the lengths of consecutive blocks along an
//! axis. [`PartitionScheme::sizes`] derives the layout used ahead of a block
//! QR factorization, where every block must be at least as tall as the number
//! of columns being orthogonalized.

use std::{fmt, ops::Range, sync::Arc};

use crate::error::PartitionError;

/// Ordered, non-empty list of positive block lengths along one axis.
///
/// # Examples
/// ```
/// use blockreg_core::PartitionScheme;
///
/// let scheme = PartitionScheme::sizes(100, 30, 3).expect("axis is long enough");
/// assert_eq!(scheme.blocks(), &[33, 33, 34]);
/// assert_eq!(scheme.total(), 100);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PartitionScheme {
    blocks: Arc<[usize]>,
    total: usize,
}

impl PartitionScheme {
    /// Derives the block layout for an axis of `total_size` items that must be
    /// split into blocks of at least `min_block_size`, aiming for `n_parts`
    /// blocks.
    ///
    /// The per-part size `max(1, total_size / n_parts)` replaces the minimum
    /// when it is larger, so a small part count relaxes parallelism rather
    /// than shrinking blocks. The final block absorbs the remainder.
    ///
    /// # Errors
    /// Returns [`PartitionError::ZeroParts`] when `n_parts` is zero and
    /// [`PartitionError::DegeneratePartition`] when `total_size` is smaller
    /// than the effective minimum block size.
    ///
    /// # Examples
    /// ```
    /// use blockreg_core::{PartitionError, PartitionScheme};
    ///
    /// let scheme = PartitionScheme::sizes(10, 4, 8).expect("valid layout");
    /// assert_eq!(scheme.blocks(), &[4, 6]);
    ///
    /// let err = PartitionScheme::sizes(3, 5, 1).expect_err("axis too short");
    /// assert!(matches!(err, PartitionError::DegeneratePartition { .. }));
    /// ```
    pub fn sizes(
        total_size: usize,
        min_block_size: usize,
        n_parts: usize,
    ) -> Result<Self, PartitionError> {
        if n_parts == 0 {
            return Err(PartitionError::ZeroParts);
        }

        let per_part = (total_size / n_parts).max(1);
        let effective_min = per_part.max(min_block_size);
        if total_size < effective_min {
            return Err(PartitionError::DegeneratePartition {
                total_size,
                min_block_size: effective_min,
            });
        }

        let part_count = (total_size / effective_min).max(1);
        let remainder = total_size % (part_count * effective_min);
        let mut blocks = vec![effective_min; part_count];
        if let Some(last) = blocks.last_mut() {
            *last += remainder;
        }
        Self::from_blocks(blocks)
    }

    /// Splits `total_size` into blocks of `block_size`, leaving a shorter
    /// trailing block when the axis does not divide evenly.
    ///
    /// A `block_size` at least as large as the axis yields a single block.
    ///
    /// # Errors
    /// Returns [`PartitionError::Empty`] for an empty axis and
    /// [`PartitionError::ZeroBlock`] when `block_size` is zero.
    ///
    /// # Examples
    /// ```
    /// use blockreg_core::PartitionScheme;
    ///
    /// let scheme = PartitionScheme::regular(10, 4).expect("valid layout");
    /// assert_eq!(scheme.blocks(), &[4, 4, 2]);
    /// ```
    pub fn regular(total_size: usize, block_size: usize) -> Result<Self, PartitionError> {
        if block_size == 0 {
            return Err(PartitionError::ZeroBlock { index: 0 });
        }
        if total_size == 0 {
            return Err(PartitionError::Empty);
        }
        let full = total_size / block_size;
        let tail = total_size % block_size;
        let mut blocks = vec![block_size; full];
        if tail > 0 {
            blocks.push(tail);
        }
        Self::from_blocks(blocks)
    }

    /// Returns a layout holding the whole axis in one block.
    ///
    /// # Errors
    /// Returns [`PartitionError::Empty`] when `total_size` is zero.
    pub fn single(total_size: usize) -> Result<Self, PartitionError> {
        Self::from_blocks(vec![total_size])
    }

    /// Builds a scheme from explicit block lengths.
    ///
    /// # Errors
    /// Returns [`PartitionError::Empty`] when `blocks` is empty and
    /// [`PartitionError::ZeroBlock`] when any block is zero.
    ///
    /// # Examples
    /// ```
    /// use blockreg_core::PartitionScheme;
    ///
    /// let scheme = PartitionScheme::from_blocks(vec![2, 3]).expect("positive blocks");
    /// assert_eq!(scheme.total(), 5);
    /// assert!(PartitionScheme::from_blocks(vec![2, 0]).is_err());
    /// ```
    pub fn from_blocks(blocks: Vec<usize>) -> Result<Self, PartitionError> {
        if blocks.is_empty() {
            return Err(PartitionError::Empty);
        }
        if let Some(index) = blocks.iter().position(|&block| block == 0) {
            return Err(PartitionError::ZeroBlock { index });
        }
        let total = blocks.iter().sum();
        Ok(Self {
            blocks: blocks.into(),
            total,
        })
    }

    /// Builds a scheme from group lengths, dropping empty groups.
    ///
    /// Used for column groups such as informative and non-informative
    /// features, where either group may legitimately be empty.
    ///
    /// # Errors
    /// Returns [`PartitionError::Empty`] when every group is empty.
    ///
    /// # Examples
    /// ```
    /// use blockreg_core::PartitionScheme;
    ///
    /// let scheme = PartitionScheme::from_groups(&[0, 8]).expect("one non-empty group");
    /// assert_eq!(scheme.blocks(), &[8]);
    /// ```
    pub fn from_groups(groups: &[usize]) -> Result<Self, PartitionError> {
        Self::from_blocks(groups.iter().copied().filter(|&len| len > 0).collect())
    }

    /// Returns the block lengths in axis order.
    #[must_use]
    pub fn blocks(&self) -> &[usize] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`; schemes hold at least one block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the axis length covered by the scheme.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns `true` when the axis is held in one block.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.blocks.len() == 1
    }

    /// Returns the smallest block length.
    #[must_use]
    pub fn min_block(&self) -> usize {
        self.blocks.iter().copied().min().unwrap_or(0)
    }

    /// Iterates over the index range covered by each block.
    ///
    /// # Examples
    /// ```
    /// use blockreg_core::PartitionScheme;
    ///
    /// let scheme = PartitionScheme::from_blocks(vec![2, 3]).expect("positive blocks");
    /// let ranges: Vec<_> = scheme.ranges().collect();
    /// assert_eq!(ranges, vec![0..2, 2..5]);
    /// ```
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.blocks.iter().scan(0_usize, |start, &len| {
            let range = *start..*start + len;
            *start += len;
            Some(range)
        })
    }

    /// Appends the blocks of `other` after the blocks of `self`.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let blocks: Vec<usize> = self.blocks.iter().chain(other.blocks.iter()).copied().collect();
        Self {
            blocks: blocks.into(),
            total: self.total + other.total,
        }
    }

    /// Returns the layout of `range` when the axis is sliced, keeping the
    /// original block boundaries that fall inside it.
    ///
    /// # Errors
    /// Returns [`PartitionError::OutOfRange`] when the range is empty or
    /// extends past the axis.
    ///
    /// # Examples
    /// ```
    /// use blockreg_core::PartitionScheme;
    ///
    /// let scheme = PartitionScheme::from_blocks(vec![3, 5]).expect("positive blocks");
    /// let sliced = scheme.slice(1..6).expect("range inside axis");
    /// assert_eq!(sliced.blocks(), &[2, 3]);
    /// ```
    pub fn slice(&self, range: Range<usize>) -> Result<Self, PartitionError> {
        if range.start >= range.end || range.end > self.total {
            return Err(PartitionError::OutOfRange {
                start: range.start,
                end: range.end,
                total_size: self.total,
            });
        }
        let blocks = self
            .ranges()
            .filter_map(|block| {
                let start = block.start.max(range.start);
                let end = block.end.min(range.end);
                (start < end).then_some(end - start)
            })
            .collect();
        Self::from_blocks(blocks)
    }
}

impl fmt::Debug for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PartitionScheme").field(&self.blocks).finish()
    }
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{block}")?;
        }
        f.write_str(")")
    }
}
