//! Synthesis of matrices with a prescribed singular-value profile.
//!
//! Two random Gaussian matrices are orthonormalized with a block QR, the
//! left factor's columns are rescaled by a bell-shaped profile, and the
//! product of the factors is returned. The result is lazy: only the graph is
//! built here.

use tracing::{debug, instrument};

use crate::{
    Result,
    element::Dtype,
    error::BlockregError,
    graph::LazyArray,
    partition::PartitionScheme,
    random::{RandomSource, RandomState},
};

/// Parameters of a low-rank matrix.
///
/// # Examples
/// ```
/// use blockreg_core::{Dtype, LowRankConfig};
///
/// let config = LowRankConfig::new()
///     .with_shape(40, 12)
///     .with_effective_rank(3)
///     .with_dtype(Dtype::F64);
/// assert_eq!(config.n_samples(), 40);
/// assert_eq!(config.tail_strength(), 0.5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LowRankConfig {
    n_samples: usize,
    n_features: usize,
    effective_rank: usize,
    tail_strength: f64,
    n_parts: usize,
    n_samples_per_part: Option<usize>,
    dtype: Dtype,
}

impl Default for LowRankConfig {
    fn default() -> Self {
        Self {
            n_samples: 100,
            n_features: 100,
            effective_rank: 10,
            tail_strength: 0.5,
            n_parts: 1,
            n_samples_per_part: None,
            dtype: Dtype::F32,
        }
    }
}

impl LowRankConfig {
    /// Creates a configuration populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the matrix shape.
    #[must_use]
    pub fn with_shape(mut self, n_samples: usize, n_features: usize) -> Self {
        self.n_samples = n_samples;
        self.n_features = n_features;
        self
    }

    /// Sets the approximate number of dominant singular values.
    #[must_use]
    pub fn with_effective_rank(mut self, effective_rank: usize) -> Self {
        self.effective_rank = effective_rank;
        self
    }

    /// Sets the weight of the slowly decaying tail, in `[0, 1]`.
    #[must_use]
    pub fn with_tail_strength(mut self, tail_strength: f64) -> Self {
        self.tail_strength = tail_strength;
        self
    }

    /// Sets the desired number of row partitions.
    #[must_use]
    pub fn with_n_parts(mut self, n_parts: usize) -> Self {
        self.n_parts = n_parts;
        self
    }

    /// Overrides the row chunk of the result. Defaults to
    /// `max(1, n_samples / n_parts)`.
    #[must_use]
    pub fn with_n_samples_per_part(mut self, rows: Option<usize>) -> Self {
        self.n_samples_per_part = rows;
        self
    }

    /// Sets the element precision.
    #[must_use]
    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = dtype;
        self
    }

    /// Number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Approximate number of dominant singular values.
    #[must_use]
    pub fn effective_rank(&self) -> usize {
        self.effective_rank
    }

    /// Weight of the tail of the profile.
    #[must_use]
    pub fn tail_strength(&self) -> f64 {
        self.tail_strength
    }

    /// Desired number of row partitions.
    #[must_use]
    pub fn n_parts(&self) -> usize {
        self.n_parts
    }

    /// Element precision.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Row chunk of the result.
    #[must_use]
    pub fn row_chunk(&self) -> usize {
        row_chunk(self.n_samples, self.n_parts, self.n_samples_per_part)
    }

    /// Checks every parameter.
    ///
    /// # Errors
    /// Returns [`BlockregError::ZeroSize`] for a zero dimension, rank, part
    /// count or row chunk and [`BlockregError::InvalidFloatParameter`] when
    /// the tail strength is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        ensure_positive(self.n_samples, "n_samples")?;
        ensure_positive(self.n_features, "n_features")?;
        ensure_positive(self.effective_rank, "effective_rank")?;
        ensure_positive(self.n_parts, "n_parts")?;
        if let Some(rows) = self.n_samples_per_part {
            ensure_positive(rows, "n_samples_per_part")?;
        }
        ensure_unit_interval(self.tail_strength, "tail_strength")
    }
}

pub(crate) fn ensure_positive(value: usize, parameter: &'static str) -> Result<()> {
    if value == 0 {
        Err(BlockregError::ZeroSize { parameter })
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_unit_interval(value: f64, parameter: &'static str) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(BlockregError::InvalidFloatParameter {
            parameter,
            expected: "a value in [0, 1]",
        })
    }
}

pub(crate) fn row_chunk(n_samples: usize, n_parts: usize, requested: Option<usize>) -> usize {
    requested.unwrap_or_else(|| (n_samples / n_parts.max(1)).max(1))
}

/// Computes the singular-value profile of length `n`.
///
/// With `t = i / effective_rank`, entry `i` is
/// `(1 - tail_strength) * exp(-t²) + tail_strength * exp(-0.1 t)`.
///
/// # Examples
/// ```
/// use blockreg_core::singular_profile;
///
/// let profile = singular_profile(3, 10, 0.5);
/// assert_eq!(profile[0], 1.0);
/// assert!(profile[1] < profile[0]);
/// ```
#[must_use]
pub fn singular_profile(n: usize, effective_rank: usize, tail_strength: f64) -> Vec<f64> {
    let rank = effective_rank as f64;
    (0..n)
        .map(|index| {
            let t = index as f64 / rank;
            let low_rank = (1.0 - tail_strength) * (-(t * t)).exp();
            let tail = tail_strength * (-0.1 * t).exp();
            low_rank + tail
        })
        .collect()
}

/// Orthonormal factors and profile making up a low-rank matrix.
#[derive(Debug, Clone)]
pub struct LowRankFactors {
    u: LazyArray,
    v: LazyArray,
    profile: Vec<f64>,
}

impl LowRankFactors {
    /// Left factor with orthonormal columns, `n_samples × n`.
    #[must_use]
    pub fn u(&self) -> &LazyArray {
        &self.u
    }

    /// Right factor with orthonormal rows, `n × n_features`.
    #[must_use]
    pub fn v(&self) -> &LazyArray {
        &self.v
    }

    /// Singular-value profile applied to the columns of `u`.
    #[must_use]
    pub fn profile(&self) -> &[f64] {
        &self.profile
    }

    /// Describes `(u · diag(profile)) × v`.
    ///
    /// # Errors
    /// Propagates shape errors from graph construction.
    pub fn assemble(&self) -> Result<LazyArray> {
        let scale =
            LazyArray::from_row_vector(&self.profile, self.u.col_chunks().clone(), self.u.dtype())?;
        self.u.mul_columns(&scale)?.matmul(&self.v)
    }
}

/// Builds the factors of a low-rank matrix, drawing from `source`.
///
/// `u` is drawn first, then `v`.
///
/// # Errors
/// Returns configuration errors from [`LowRankConfig::validate`] and
/// partition errors when an axis cannot hold a QR block.
#[instrument(
    name = "core.low_rank_factors",
    err,
    skip(config, source),
    fields(
        n_samples = config.n_samples,
        n_features = config.n_features,
        effective_rank = config.effective_rank,
        n_parts = config.n_parts,
    ),
)]
pub fn low_rank_factors(config: &LowRankConfig, source: &RandomSource) -> Result<LowRankFactors> {
    config.validate()?;
    let (n_samples, n_features, dtype) = (config.n_samples, config.n_features, config.dtype);
    let n = n_samples.min(n_features);
    let inner = PartitionScheme::single(n)?;

    let u_rows = PartitionScheme::sizes(n_samples, n, config.n_parts)?;
    let v_cols = PartitionScheme::sizes(n_features, n, config.n_parts)?;
    debug!(u_rows = %u_rows, v_cols = %v_cols, "qr partitions");

    let u = source
        .standard_normal(u_rows, inner.clone(), dtype)?
        .qr()?;
    let v = source
        .standard_normal(inner, v_cols, dtype)?
        .transpose()
        .qr()?
        .transpose();

    let rows = config.row_chunk();
    let u = u.rechunk_rows(PartitionScheme::regular(n_samples, rows)?)?;
    let v = v.rechunk_rows(PartitionScheme::regular(n, rows)?)?;

    Ok(LowRankFactors {
        u,
        v,
        profile: singular_profile(n, config.effective_rank, config.tail_strength),
    })
}

/// Describes a low-rank matrix, drawing from an existing source.
///
/// # Errors
/// See [`low_rank_factors`].
pub fn synthesize(config: &LowRankConfig, source: &RandomSource) -> Result<LazyArray> {
    low_rank_factors(config, source)?.assemble()
}

/// Describes an `n_samples × n_features` matrix whose singular values follow
/// [`singular_profile`].
///
/// # Errors
/// See [`low_rank_factors`].
///
/// # Examples
/// ```
/// use blockreg_core::{Executor, LocalExecutor, LowRankConfig, RandomState, make_low_rank_matrix};
///
/// let config = LowRankConfig::new().with_shape(30, 8).with_effective_rank(2);
/// let matrix = make_low_rank_matrix(&config, RandomState::Seed(0)).expect("valid config");
/// assert_eq!(matrix.shape(), vec![30, 8]);
/// let dense = LocalExecutor::new().compute(&matrix).expect("materializes");
/// assert_eq!(dense.shape(), &[30, 8]);
/// ```
#[instrument(name = "core.make_low_rank_matrix", err, skip(config, random_state))]
pub fn make_low_rank_matrix(config: &LowRankConfig, random_state: RandomState) -> Result<LazyArray> {
    let source = RandomSource::resolve(random_state);
    synthesize(config, &source)
}
