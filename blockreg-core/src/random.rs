//! Random state resolution and chunk-independent normal sampling.
//!
//! Callers describe where randomness comes from with a [`RandomState`]; the
//! resolver turns it into a [`RandomSource`], which hands every lazy draw a
//! 256-bit key at graph-construction time. Values are later generated from a
//! ChaCha stream addressed by `(key, row, column tile)`, so a seed yields the
//! same numbers regardless of how the array is chunked.

use std::{
    fmt,
    ops::Range,
    str::FromStr,
    sync::{Arc, Mutex},
};

use ndarray::{Array2, ArrayView1, s};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{
    Result,
    element::{Dtype, Element},
    error::BlockregError,
    graph::LazyArray,
    partition::PartitionScheme,
};

/// Columns generated from one ChaCha stream; fixed so values never depend on
/// the chunk layout.
pub(crate) const COLUMN_TILE: usize = 64;

/// Where a dataset's randomness comes from.
///
/// # Examples
/// ```
/// use blockreg_core::RandomState;
///
/// let state: RandomState = "42".parse().expect("integers are seeds");
/// assert!(matches!(state, RandomState::Seed(42)));
///
/// let err = "mersenne".parse::<RandomState>().expect_err("unknown kind");
/// assert_eq!(err.code().as_str(), "BLOCKREG_UNSUPPORTED_RANDOM_STATE_KIND");
/// ```
#[derive(Default)]
pub enum RandomState {
    /// Seed a fresh source from operating-system entropy.
    #[default]
    Unset,
    /// Seed a fresh source deterministically.
    Seed(u64),
    /// Drive a source from an existing single-stream generator.
    Local(Box<dyn RngCore + Send>),
    /// Reuse an existing source, sharing its stream.
    Distributed(RandomSource),
}

impl RandomState {
    fn kind(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Seed(_) => "seed",
            Self::Local(_) => "local",
            Self::Distributed(_) => "distributed",
        }
    }
}

impl fmt::Debug for RandomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed(seed) => f.debug_tuple("Seed").field(seed).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

impl From<u64> for RandomState {
    fn from(seed: u64) -> Self {
        Self::Seed(seed)
    }
}

impl From<Option<u64>> for RandomState {
    fn from(seed: Option<u64>) -> Self {
        seed.map_or(Self::Unset, Self::Seed)
    }
}

impl From<RandomSource> for RandomState {
    fn from(source: RandomSource) -> Self {
        Self::Distributed(source)
    }
}

impl FromStr for RandomState {
    type Err = BlockregError;

    /// Parses `none`/`entropy` (or an empty string) as [`RandomState::Unset`]
    /// and an unsigned integer as [`RandomState::Seed`].
    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "none" | "entropy" => Ok(Self::Unset),
            _ => trimmed.parse::<u64>().map(Self::Seed).map_err(|_| {
                BlockregError::UnsupportedRandomStateKind {
                    provided: trimmed.to_owned(),
                }
            }),
        }
    }
}

/// Key identifying the random stream of one lazy draw.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DrawKey([u8; 32]);

impl fmt::Debug for DrawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DrawKey(")?;
        for byte in self.0.iter().take(4) {
            write!(f, "{byte:02x}")?;
        }
        f.write_str("..)")
    }
}

/// Generator that hands out draw keys.
type KeyStream = Box<dyn RngCore + Send>;

/// Source of lazily drawn normal arrays.
///
/// Cloning a source shares its stream: draws taken through either handle
/// advance the same key sequence.
///
/// # Examples
/// ```
/// use blockreg_core::{Dtype, PartitionScheme, RandomSource};
///
/// let source = RandomSource::from_seed(7);
/// let rows = PartitionScheme::regular(10, 4).expect("valid layout");
/// let cols = PartitionScheme::single(3).expect("valid layout");
/// let draw = source
///     .standard_normal(rows, cols, Dtype::F64)
///     .expect("draw is described");
/// assert_eq!(draw.shape(), vec![10, 3]);
/// ```
#[derive(Clone)]
pub struct RandomSource {
    keys: Arc<Mutex<KeyStream>>,
}

impl RandomSource {
    /// Normalizes a [`RandomState`] into a source.
    ///
    /// Integers and [`RandomState::Unset`] create a fresh source, a local
    /// generator is wrapped so its stream seeds every draw, and an existing
    /// source is returned unchanged. No randomness is consumed here.
    #[must_use]
    pub fn resolve(state: RandomState) -> Self {
        debug!(kind = state.kind(), "resolving random state");
        match state {
            RandomState::Unset => Self::from_entropy(),
            RandomState::Seed(seed) => Self::from_seed(seed),
            RandomState::Local(rng) => Self::wrap(rng),
            RandomState::Distributed(source) => source,
        }
    }

    /// Creates a deterministic source from `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::wrap(Box::new(ChaCha8Rng::seed_from_u64(seed)))
    }

    /// Creates a source seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::wrap(Box::new(ChaCha8Rng::from_entropy()))
    }

    /// Creates a source driven by an existing generator.
    #[must_use]
    pub fn from_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self::wrap(Box::new(rng))
    }

    fn wrap(stream: KeyStream) -> Self {
        Self {
            keys: Arc::new(Mutex::new(stream)),
        }
    }

    /// Returns `true` when both handles advance the same stream.
    #[must_use]
    pub fn shares_stream_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.keys, &other.keys)
    }

    pub(crate) fn next_key(&self) -> Result<DrawKey> {
        let mut keys = self.keys.lock().map_err(|_| BlockregError::LockPoisoned {
            resource: "random source",
        })?;
        let mut key = [0_u8; 32];
        keys.fill_bytes(&mut key);
        Ok(DrawKey(key))
    }

    /// Describes an array of i.i.d. standard-normal values with the given
    /// chunk layout.
    ///
    /// # Errors
    /// Returns [`BlockregError::LockPoisoned`] if the source's stream lock
    /// was poisoned.
    pub fn standard_normal(
        &self,
        rows: PartitionScheme,
        cols: PartitionScheme,
        dtype: Dtype,
    ) -> Result<LazyArray> {
        let key = self.next_key()?;
        Ok(LazyArray::standard_normal(key, rows, cols, dtype))
    }

    /// Describes an array of i.i.d. normal values with standard deviation
    /// `scale`.
    ///
    /// # Errors
    /// Returns [`BlockregError::InvalidFloatParameter`] when `scale` is
    /// negative or non-finite, and [`BlockregError::LockPoisoned`] if the
    /// stream lock was poisoned.
    pub fn normal(
        &self,
        scale: f64,
        rows: PartitionScheme,
        cols: PartitionScheme,
        dtype: Dtype,
    ) -> Result<LazyArray> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(BlockregError::InvalidFloatParameter {
                parameter: "scale",
                expected: "a finite, non-negative standard deviation",
            });
        }
        self.standard_normal(rows, cols, dtype)?.scale(scale)
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSource").finish_non_exhaustive()
    }
}

#[inline]
fn stream_id(row: usize, tile: usize) -> u64 {
    ((row as u64) << 32) | (tile as u64 & 0xFFFF_FFFF)
}

/// Generates the standard-normal block covering `rows` × `cols` of the draw
/// identified by `key`.
pub(crate) fn standard_normal_block<T: Element>(
    key: &DrawKey,
    rows: Range<usize>,
    cols: Range<usize>,
) -> Array2<T> {
    let mut block = Array2::zeros((rows.len(), cols.len()));
    if cols.is_empty() {
        return block;
    }
    let first_tile = cols.start / COLUMN_TILE;
    let last_tile = (cols.end - 1) / COLUMN_TILE;
    let mut tile_values = Vec::with_capacity(COLUMN_TILE);

    for (local_row, row) in rows.enumerate() {
        for tile in first_tile..=last_tile {
            let tile_start = tile * COLUMN_TILE;
            let tile_end = cols.end.min(tile_start + COLUMN_TILE);
            let mut rng = ChaCha8Rng::from_seed(key.0);
            rng.set_stream(stream_id(row, tile));
            tile_values.clear();
            tile_values.extend((tile_start..tile_end).map(|_| T::sample_standard_normal(&mut rng)));

            let lo = cols.start.max(tile_start);
            let wanted = &tile_values[lo - tile_start..];
            block
                .slice_mut(s![local_row, lo - cols.start..tile_end - cols.start])
                .assign(&ArrayView1::from(wanted));
        }
    }
    block
}

#[cfg(test)]
mod tests;
