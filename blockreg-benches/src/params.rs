//! Benchmark parameter types.
//!
//! Each struct names one point of a sweep and builds the matching library
//! configuration, so bench files only loop over constants.

use std::fmt;

use blockreg_core::{Dtype, LowRankConfig, RegressionConfig};

use crate::error::BenchSetupError;

/// One point of a regression sweep.
#[derive(Clone, Debug)]
pub struct RegressionBenchParams {
    /// Number of samples.
    pub n_samples: usize,
    /// Number of features.
    pub n_features: usize,
    /// Number of row blocks.
    pub n_parts: usize,
    /// Approximate design rank; `None` for a well-conditioned design.
    pub effective_rank: Option<usize>,
}

impl RegressionBenchParams {
    /// Builds the configuration for this point, emitting coefficients so the
    /// whole graph is exercised.
    ///
    /// # Errors
    /// Returns [`BenchSetupError::ZeroValue`] when `n_parts` is zero.
    pub fn config(&self) -> Result<RegressionConfig, BenchSetupError> {
        if self.n_parts == 0 {
            return Err(BenchSetupError::ZeroValue { context: "n_parts" });
        }
        Ok(RegressionConfig::new()
            .with_shape(self.n_samples, self.n_features)
            .with_n_informative(self.n_features.div_ceil(10))
            .with_effective_rank(self.effective_rank)
            .with_n_parts(self.n_parts)
            .with_coefficients(true)
            .with_dtype(Dtype::F64))
    }
}

impl fmt::Display for RegressionBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={},p={},parts={}",
            self.n_samples, self.n_features, self.n_parts
        )?;
        if let Some(rank) = self.effective_rank {
            write!(f, ",rank={rank}")?;
        }
        Ok(())
    }
}

/// One point of a low-rank sweep.
#[derive(Clone, Debug)]
pub struct LowRankBenchParams {
    /// Number of rows.
    pub n_samples: usize,
    /// Number of columns.
    pub n_features: usize,
    /// Number of row blocks.
    pub n_parts: usize,
}

impl LowRankBenchParams {
    /// Builds the configuration for this point.
    ///
    /// # Errors
    /// Returns [`BenchSetupError::ZeroValue`] when `n_parts` is zero.
    pub fn config(&self) -> Result<LowRankConfig, BenchSetupError> {
        if self.n_parts == 0 {
            return Err(BenchSetupError::ZeroValue { context: "n_parts" });
        }
        Ok(LowRankConfig::new()
            .with_shape(self.n_samples, self.n_features)
            .with_effective_rank(self.n_features.div_ceil(4))
            .with_n_parts(self.n_parts)
            .with_dtype(Dtype::F64))
    }
}

impl fmt::Display for LowRankBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={},p={},parts={}",
            self.n_samples, self.n_features, self.n_parts
        )
    }
}
