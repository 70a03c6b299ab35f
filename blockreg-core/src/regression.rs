//! Assembly of synthetic linear-regression datasets.
//!
//! The design matrix is either drawn directly or synthesized with a
//! prescribed singular spectrum. Targets are a linear function of the
//! informative features plus an optional bias and Gaussian noise.

mod config;

use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use tracing::{debug, instrument, warn};

pub use self::config::RegressionConfig;

use crate::{
    Result,
    executor::{DenseArray, Executor, LocalExecutor, MemoryOrder},
    graph::{ArrayAxis, LazyArray},
    lowrank::synthesize,
    partition::PartitionScheme,
    random::{RandomSource, RandomState},
};

/// Scale of the informative ground-truth coefficients.
const COEFFICIENT_SCALE: f64 = 100.0;

/// Permutations applied when shuffling was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShufflePlan {
    samples: Vec<usize>,
    features: Vec<usize>,
}

impl ShufflePlan {
    fn draw(n_samples: usize, n_features: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                warn!("shuffling without a shuffle seed; the dataset is not reproducible");
                SmallRng::from_entropy()
            }
        };
        let mut samples: Vec<usize> = (0..n_samples).collect();
        samples.shuffle(&mut rng);
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut rng);
        Self { samples, features }
    }

    /// Original sample index at each output row.
    #[must_use]
    pub fn samples(&self) -> &[usize] {
        &self.samples
    }

    /// Original feature index at each output column of `x`.
    #[must_use]
    pub fn features(&self) -> &[usize] {
        &self.features
    }
}

/// Lazily described regression dataset.
#[derive(Debug, Clone)]
pub struct RegressionDataset {
    x: LazyArray,
    y: LazyArray,
    coefficients: Option<LazyArray>,
    shuffle: Option<ShufflePlan>,
    n_informative: usize,
    order: MemoryOrder,
}

impl RegressionDataset {
    /// Design matrix, `n_samples × n_features`, one column block.
    #[must_use]
    pub fn x(&self) -> &LazyArray {
        &self.x
    }

    /// Targets: a vector when there is one target, otherwise a matrix.
    #[must_use]
    pub fn y(&self) -> &LazyArray {
        &self.y
    }

    /// Ground-truth coefficients, when requested.
    #[must_use]
    pub fn coefficients(&self) -> Option<&LazyArray> {
        self.coefficients.as_ref()
    }

    /// Permutations applied to samples and features, when shuffled.
    #[must_use]
    pub fn shuffle(&self) -> Option<&ShufflePlan> {
        self.shuffle.as_ref()
    }

    /// Informative feature count after clamping to the feature count.
    #[must_use]
    pub fn n_informative(&self) -> usize {
        self.n_informative
    }

    /// Memory layout requested for materialized arrays.
    #[must_use]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    /// Returns a local executor producing the requested memory layout.
    #[must_use]
    pub fn local_executor(&self) -> LocalExecutor {
        LocalExecutor::new().with_order(self.order)
    }

    /// Splits the dataset into `(x, y, coefficients)`.
    #[must_use]
    pub fn into_parts(self) -> (LazyArray, LazyArray, Option<LazyArray>) {
        (self.x, self.y, self.coefficients)
    }

    /// Materializes every array with one call so shared subgraphs are
    /// evaluated once.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub fn materialize<E: Executor + ?Sized>(&self, executor: &E) -> Result<DenseDataset> {
        let mut arrays = vec![&self.x, &self.y];
        arrays.extend(self.coefficients.as_ref());
        let mut values = executor.compute_many(&arrays)?.into_iter();
        match (values.next(), values.next()) {
            (Some(x), Some(y)) => Ok(DenseDataset {
                x,
                y,
                coefficients: values.next(),
            }),
            _ => Err(crate::error::ExecutionError::LayoutViolation {
                expected: arrays.len(),
                actual: 0,
            }
            .into()),
        }
    }
}

/// Materialized regression dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseDataset {
    /// Design matrix.
    pub x: DenseArray,
    /// Targets.
    pub y: DenseArray,
    /// Ground-truth coefficients, when requested.
    pub coefficients: Option<DenseArray>,
}

/// Describes a random linear-regression problem.
///
/// Draws happen in a fixed order: the design (or its low-rank factors), the
/// informative coefficients, then the noise. Shuffling uses a separate stream
/// seeded by [`RegressionConfig::with_shuffle_seed`].
///
/// # Errors
/// Returns configuration errors from [`RegressionConfig::validate`] and
/// graph construction errors from the low-rank synthesizer.
///
/// # Examples
/// ```
/// use blockreg_core::{RandomState, RegressionConfig, make_regression};
///
/// let config = RegressionConfig::new()
///     .with_shape(20, 5)
///     .with_n_informative(2)
///     .with_coefficients(true);
/// let dataset = make_regression(&config, RandomState::Seed(0)).expect("valid config");
/// assert_eq!(dataset.x().shape(), vec![20, 5]);
/// assert_eq!(dataset.y().shape(), vec![20]);
/// assert_eq!(dataset.coefficients().map(|c| c.shape()), Some(vec![5]));
/// ```
#[instrument(
    name = "core.make_regression",
    err,
    skip(config, random_state),
    fields(
        n_samples = config.n_samples(),
        n_features = config.n_features(),
        n_informative = config.n_informative(),
        n_targets = config.n_targets(),
        effective_rank = ?config.effective_rank(),
        n_parts = config.n_parts(),
        dtype = %config.dtype(),
    ),
)]
pub fn make_regression(config: &RegressionConfig, random_state: RandomState) -> Result<RegressionDataset> {
    let source = RandomSource::resolve(random_state);
    assemble(config, &source)
}

/// Describes a regression dataset, drawing from an existing source.
///
/// # Errors
/// See [`make_regression`].
pub fn assemble(config: &RegressionConfig, source: &RandomSource) -> Result<RegressionDataset> {
    config.validate()?;
    let (n_samples, n_features, dtype) = (config.n_samples(), config.n_features(), config.dtype());
    let n_informative = config.clamped_informative();
    let rows = PartitionScheme::regular(n_samples, config.row_chunk())?;
    let groups = PartitionScheme::from_groups(&[n_informative, n_features - n_informative])?;
    let targets = PartitionScheme::single(config.n_targets())?;
    debug!(rows = %rows, columns = %groups, "design layout");

    let x = match config.effective_rank() {
        None => source.standard_normal(rows.clone(), groups, dtype)?,
        Some(rank) => synthesize(&config.low_rank(rank), source)?.rechunk(rows.clone(), groups)?,
    };

    let (mut y, mut coefficients) = if n_informative == 0 {
        let y = LazyArray::zeros(rows.clone(), targets.clone(), dtype).add_scalar(config.bias())?;
        let zeros = LazyArray::zeros(PartitionScheme::single(n_features)?, targets.clone(), dtype);
        (y, zeros)
    } else {
        let informative = source.normal(
            COEFFICIENT_SCALE,
            PartitionScheme::single(n_informative)?,
            targets.clone(),
            dtype,
        )?;
        let y = x
            .slice_columns(0..n_informative)?
            .matmul(&informative)?
            .add_scalar(config.bias())?;
        let coefficients = if n_informative < n_features {
            let zeros = LazyArray::zeros(
                PartitionScheme::single(n_features - n_informative)?,
                targets.clone(),
                dtype,
            );
            LazyArray::concat(&[informative, zeros], ArrayAxis::Rows)?
                .rechunk_rows(PartitionScheme::single(n_features)?)?
        } else {
            informative
        };
        (y, coefficients)
    };

    let mut x = x.rechunk_cols(PartitionScheme::single(n_features)?)?;

    if config.noise() > 0.0 {
        let noise = source.normal(config.noise(), rows, targets, dtype)?;
        y = y.add(&noise)?;
    }

    let shuffle = if config.shuffle() {
        let plan = ShufflePlan::draw(n_samples, n_features, config.shuffle_seed());
        x = x
            .take(ArrayAxis::Rows, plan.samples())?
            .take(ArrayAxis::Columns, plan.features())?;
        y = y.take(ArrayAxis::Rows, plan.samples())?;
        coefficients = coefficients.take(ArrayAxis::Rows, plan.features())?;
        Some(plan)
    } else {
        None
    };

    if config.n_targets() == 1 {
        y = y.squeeze();
        coefficients = coefficients.squeeze();
    }

    debug!(nodes = y.node_count(), "regression graph built");
    Ok(RegressionDataset {
        x,
        y,
        coefficients: config.emit_coefficients().then_some(coefficients),
        shuffle,
        n_informative,
        order: config.order(),
    })
}

#[cfg(test)]
mod tests;
