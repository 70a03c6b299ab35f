//! Benchmark setup error type.

use blockreg_core::BlockregError;

/// Errors that may occur while preparing a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Building or materializing a graph failed.
    #[error("blockreg operation failed: {0}")]
    Core(#[from] BlockregError),
    /// A parameter that must be positive was zero.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// The parameter that was zero.
        context: &'static str,
    },
}
