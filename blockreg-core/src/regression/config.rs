//! Parameters of a synthetic regression dataset.

use crate::{
    Result,
    element::Dtype,
    error::BlockregError,
    executor::MemoryOrder,
    lowrank::{LowRankConfig, ensure_positive, ensure_unit_interval, row_chunk},
};

/// Parameters accepted by [`crate::make_regression`].
///
/// Defaults: 100 samples, 100 features, 10 informative features, one target,
/// no bias, a well-conditioned design, tail strength 0.5, no noise, no
/// shuffling, no coefficients, one part, single precision and column-major
/// output.
///
/// # Examples
/// ```
/// use blockreg_core::{Dtype, RegressionConfig};
///
/// let config = RegressionConfig::new()
///     .with_shape(200, 8)
///     .with_n_informative(3)
///     .with_noise(0.5)
///     .with_dtype(Dtype::F64);
/// assert_eq!(config.n_informative(), 3);
/// assert_eq!(config.n_targets(), 1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionConfig {
    n_samples: usize,
    n_features: usize,
    n_informative: usize,
    n_targets: usize,
    bias: f64,
    effective_rank: Option<usize>,
    tail_strength: f64,
    noise: f64,
    shuffle: bool,
    shuffle_seed: Option<u64>,
    emit_coefficients: bool,
    n_parts: usize,
    n_samples_per_part: Option<usize>,
    order: MemoryOrder,
    dtype: Dtype,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            n_samples: 100,
            n_features: 100,
            n_informative: 10,
            n_targets: 1,
            bias: 0.0,
            effective_rank: None,
            tail_strength: 0.5,
            noise: 0.0,
            shuffle: false,
            shuffle_seed: None,
            emit_coefficients: false,
            n_parts: 1,
            n_samples_per_part: None,
            order: MemoryOrder::ColumnMajor,
            dtype: Dtype::F32,
        }
    }
}

impl RegressionConfig {
    /// Creates a configuration populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of samples and features.
    #[must_use]
    pub fn with_shape(mut self, n_samples: usize, n_features: usize) -> Self {
        self.n_samples = n_samples;
        self.n_features = n_features;
        self
    }

    /// Sets how many leading features drive the target. Values above the
    /// feature count are clamped when the dataset is built.
    #[must_use]
    pub fn with_n_informative(mut self, n_informative: usize) -> Self {
        self.n_informative = n_informative;
        self
    }

    /// Sets the number of target columns.
    #[must_use]
    pub fn with_n_targets(mut self, n_targets: usize) -> Self {
        self.n_targets = n_targets;
        self
    }

    /// Sets the constant added to every target.
    #[must_use]
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Requests an ill-conditioned design with roughly `rank` dominant
    /// singular values. `None` draws a well-conditioned design.
    #[must_use]
    pub fn with_effective_rank(mut self, rank: Option<usize>) -> Self {
        self.effective_rank = rank;
        self
    }

    /// Sets the tail weight of the singular profile.
    #[must_use]
    pub fn with_tail_strength(mut self, tail_strength: f64) -> Self {
        self.tail_strength = tail_strength;
        self
    }

    /// Sets the standard deviation of the Gaussian noise added to targets.
    #[must_use]
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Enables sample and feature shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Seeds the shuffle stream. Without a seed, permutations come from
    /// operating-system entropy and are not reproducible.
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }

    /// Requests the ground-truth coefficients alongside the data.
    #[must_use]
    pub fn with_coefficients(mut self, emit: bool) -> Self {
        self.emit_coefficients = emit;
        self
    }

    /// Sets the desired number of row partitions.
    #[must_use]
    pub fn with_n_parts(mut self, n_parts: usize) -> Self {
        self.n_parts = n_parts;
        self
    }

    /// Overrides the row chunk. Defaults to `max(1, n_samples / n_parts)`.
    #[must_use]
    pub fn with_n_samples_per_part(mut self, rows: Option<usize>) -> Self {
        self.n_samples_per_part = rows;
        self
    }

    /// Sets the memory layout materialized arrays should use.
    #[must_use]
    pub fn with_order(mut self, order: MemoryOrder) -> Self {
        self.order = order;
        self
    }

    /// Sets the element precision.
    #[must_use]
    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = dtype;
        self
    }

    /// Number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Requested informative feature count, before clamping.
    #[must_use]
    pub fn n_informative(&self) -> usize {
        self.n_informative
    }

    /// Number of target columns.
    #[must_use]
    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    /// Constant added to every target.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Requested effective rank of the design.
    #[must_use]
    pub fn effective_rank(&self) -> Option<usize> {
        self.effective_rank
    }

    /// Tail weight of the singular profile.
    #[must_use]
    pub fn tail_strength(&self) -> f64 {
        self.tail_strength
    }

    /// Standard deviation of the target noise.
    #[must_use]
    pub fn noise(&self) -> f64 {
        self.noise
    }

    /// Whether samples and features are shuffled.
    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Seed of the shuffle stream.
    #[must_use]
    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    /// Whether coefficients are returned.
    #[must_use]
    pub fn emit_coefficients(&self) -> bool {
        self.emit_coefficients
    }

    /// Desired number of row partitions.
    #[must_use]
    pub fn n_parts(&self) -> usize {
        self.n_parts
    }

    /// Memory layout of materialized arrays.
    #[must_use]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    /// Element precision.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Row chunk of every sample-indexed array.
    #[must_use]
    pub fn row_chunk(&self) -> usize {
        row_chunk(self.n_samples, self.n_parts, self.n_samples_per_part)
    }

    pub(crate) fn clamped_informative(&self) -> usize {
        self.n_informative.min(self.n_features)
    }

    pub(crate) fn low_rank(&self, effective_rank: usize) -> LowRankConfig {
        LowRankConfig::new()
            .with_shape(self.n_samples, self.n_features)
            .with_effective_rank(effective_rank)
            .with_tail_strength(self.tail_strength)
            .with_n_parts(self.n_parts)
            .with_n_samples_per_part(Some(self.row_chunk()))
            .with_dtype(self.dtype)
    }

    /// Checks every parameter.
    ///
    /// # Errors
    /// Returns [`BlockregError::ZeroSize`] for a zero sample, feature, target
    /// or part count, a zero row chunk or a zero effective rank, and
    /// [`BlockregError::InvalidFloatParameter`] for a non-finite bias, a
    /// negative or non-finite noise level, or a tail strength outside
    /// `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        ensure_positive(self.n_samples, "n_samples")?;
        ensure_positive(self.n_features, "n_features")?;
        ensure_positive(self.n_targets, "n_targets")?;
        ensure_positive(self.n_parts, "n_parts")?;
        if let Some(rows) = self.n_samples_per_part {
            ensure_positive(rows, "n_samples_per_part")?;
        }
        if let Some(rank) = self.effective_rank {
            ensure_positive(rank, "effective_rank")?;
        }
        ensure_unit_interval(self.tail_strength, "tail_strength")?;
        if !self.bias.is_finite() {
            return Err(BlockregError::InvalidFloatParameter {
                parameter: "bias",
                expected: "a finite value",
            });
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(BlockregError::InvalidFloatParameter {
                parameter: "noise",
                expected: "a finite, non-negative standard deviation",
            });
        }
        Ok(())
    }
}
