//! Floating-point element types supported by the executor.

use std::fmt;

use ndarray::{ArrayD, LinalgScalar};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::{error::ParseError, executor::DenseArray};

/// Floating precision of a lazily described array.
///
/// # Examples
/// ```
/// use blockreg_core::Dtype;
///
/// assert_eq!(Dtype::default(), Dtype::F32);
/// assert_eq!("float64".parse::<Dtype>(), Ok(Dtype::F64));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// Single precision.
    #[default]
    F32,
    /// Double precision.
    F64,
}

impl Dtype {
    /// Returns the conventional name of the precision.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dtype {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "f32" | "float32" => Ok(Self::F32),
            "f64" | "float64" => Ok(Self::F64),
            other => Err(ParseError::UnknownDtype {
                provided: other.to_owned(),
            }),
        }
    }
}

/// Scalar types the local executor can materialize.
///
/// Combines the `ndarray` arithmetic bound used for block products with the
/// `nalgebra` field bound used for block QR.
pub trait Element:
    nalgebra::RealField + LinalgScalar + Copy + Send + Sync + fmt::Debug
{
    /// Precision tag matching this type.
    const DTYPE: Dtype;

    /// Converts a double-precision value, rounding when narrowing.
    fn cast_from_f64(value: f64) -> Self;

    /// Widens the value to double precision.
    fn as_f64(self) -> f64;

    /// Draws one standard-normal value.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Wraps a materialized array in the matching [`DenseArray`] variant.
    fn into_dense(array: ArrayD<Self>) -> DenseArray;
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;

    fn cast_from_f64(value: f64) -> Self {
        value as Self
    }

    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StandardNormal.sample(rng)
    }

    fn into_dense(array: ArrayD<Self>) -> DenseArray {
        DenseArray::F32(array)
    }
}

impl Element for f64 {
    const DTYPE: Dtype = Dtype::F64;

    fn cast_from_f64(value: f64) -> Self {
        value
    }

    fn as_f64(self) -> f64 {
        self
    }

    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StandardNormal.sample(rng)
    }

    fn into_dense(array: ArrayD<Self>) -> DenseArray {
        DenseArray::F64(array)
    }
}
