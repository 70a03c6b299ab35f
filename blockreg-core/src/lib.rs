//! Blockreg core library.
//!
//! Builds lazy, block-partitioned descriptions of synthetic regression
//! datasets and low-rank matrices. Nothing is computed until an
//! [`Executor`] materializes a [`LazyArray`].
#![cfg_attr(docsrs, feature(doc_cfg))]

mod element;
mod error;
mod executor;
mod graph;
mod lowrank;
mod partition;
mod random;
mod regression;
#[cfg(test)]
mod test_utils;

pub use crate::{
    element::{Dtype, Element},
    error::{
        BlockregError, BlockregErrorCode, ExecutionError, ExecutionErrorCode, ParseError,
        ParseErrorCode, PartitionError, PartitionErrorCode, Result,
    },
    executor::{DenseArray, ExecutionMode, Executor, LocalExecutor, MemoryOrder},
    graph::{ArrayAxis, LazyArray, Layout},
    lowrank::{
        LowRankConfig, LowRankFactors, low_rank_factors, make_low_rank_matrix, singular_profile,
        synthesize,
    },
    partition::PartitionScheme,
    random::{RandomSource, RandomState},
    regression::{
        DenseDataset, RegressionConfig, RegressionDataset, ShufflePlan, assemble, make_regression,
    },
};
