//! Benchmark support for blockreg.
//!
//! Parameter types and setup helpers shared by the Criterion benchmarks for
//! graph construction and local materialization.

pub mod error;
pub mod params;
