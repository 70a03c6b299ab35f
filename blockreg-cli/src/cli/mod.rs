//! Command-line interface for synthesizing block-partitioned datasets.
//!
//! `regression` builds a regression problem and `low-rank` builds a matrix
//! with a prescribed singular-value profile. Both materialize the result with
//! the local executor and report shapes, chunk layouts and norms.

mod commands;

pub use commands::{
    ArraySummary, Cli, CliError, Command, ExecutionArgs, ExecutionSummary, LowRankCommand,
    ModeArg, RegressionCommand, render_summary, run_cli,
};
