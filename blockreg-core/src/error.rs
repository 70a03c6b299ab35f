//! Error types for the blockreg core library.
//!
//! Every failure is a configuration or layout error detected synchronously,
//! either while a lazy graph is being described or while an executor
//! materializes it. Each enum exposes a stable machine-readable code.

use std::fmt;

use thiserror::Error;

use crate::{element::Dtype, executor::ExecutionMode};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced while deriving a [`crate::PartitionScheme`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PartitionError {
    /// The requested part count was zero.
    #[error("n_parts must be at least 1")]
    ZeroParts,
    /// The axis is shorter than the smallest block the caller requires, so the
    /// sizing formula would emit a block larger than the axis itself.
    #[error(
        "cannot partition an axis of length {total_size} into blocks of at least {min_block_size}"
    )]
    DegeneratePartition {
        /// Length of the axis being partitioned.
        total_size: usize,
        /// Effective minimum block size after applying the part count.
        min_block_size: usize,
    },
    /// A scheme was built from an empty list of blocks.
    #[error("a partition scheme must contain at least one block")]
    Empty,
    /// A scheme contained a zero-length block.
    #[error("block {index} of the partition scheme is empty")]
    ZeroBlock {
        /// Position of the offending block.
        index: usize,
    },
    /// A requested slice fell outside the partitioned axis.
    #[error("range {start}..{end} is outside an axis of length {total_size}")]
    OutOfRange {
        /// First index of the requested range.
        start: usize,
        /// One past the last index of the requested range.
        end: usize,
        /// Length of the partitioned axis.
        total_size: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`PartitionError`] variants.
    enum PartitionErrorCode for PartitionError {
        /// The requested part count was zero.
        ZeroParts => ZeroParts => "PARTITION_ZERO_PARTS",
        /// The axis is shorter than the required minimum block.
        DegeneratePartition => DegeneratePartition { .. } => "PARTITION_DEGENERATE",
        /// A scheme was built from an empty list of blocks.
        Empty => Empty => "PARTITION_EMPTY",
        /// A scheme contained a zero-length block.
        ZeroBlock => ZeroBlock { .. } => "PARTITION_ZERO_BLOCK",
        /// A requested slice fell outside the partitioned axis.
        OutOfRange => OutOfRange { .. } => "PARTITION_OUT_OF_RANGE",
    }
}

/// An error produced while parsing a textual setting.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    /// The precision name is not recognised.
    #[error("unsupported dtype `{provided}`; expected float32 or float64")]
    UnknownDtype {
        /// Value supplied by the caller, normalised to lower case.
        provided: String,
    },
    /// The memory order is not recognised.
    #[error("unsupported memory order `{provided}`; expected C or F")]
    UnknownMemoryOrder {
        /// Value supplied by the caller, trimmed.
        provided: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`ParseError`] variants.
    enum ParseErrorCode for ParseError {
        /// The precision name is not recognised.
        UnknownDtype => UnknownDtype { .. } => "PARSE_UNKNOWN_DTYPE",
        /// The memory order is not recognised.
        UnknownMemoryOrder => UnknownMemoryOrder { .. } => "PARSE_UNKNOWN_MEMORY_ORDER",
    }
}

/// An error produced while an [`crate::Executor`] materializes a graph.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ExecutionError {
    /// A block handed to the orthogonalization had fewer rows than columns.
    #[error("QR block has {rows} rows but {cols} columns; blocks must be at least as tall as wide")]
    QrBlockTooShort {
        /// Rows in the offending block.
        rows: usize,
        /// Columns being orthogonalized.
        cols: usize,
    },
    /// Blocks of two operands did not line up.
    #[error("`{operation}` received blocks of shape {left:?} and {right:?}")]
    BlockMismatch {
        /// Operation being evaluated.
        operation: &'static str,
        /// Shape of the left-hand block.
        left: (usize, usize),
        /// Shape of the right-hand block.
        right: (usize, usize),
    },
    /// Assembled data did not match the layout recorded in the graph.
    #[error("materialized data has {actual} elements but the layout requires {expected}")]
    LayoutViolation {
        /// Element count implied by the layout.
        expected: usize,
        /// Element count actually produced.
        actual: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`ExecutionError`] variants.
    enum ExecutionErrorCode for ExecutionError {
        /// A block handed to the orthogonalization had fewer rows than columns.
        QrBlockTooShort => QrBlockTooShort { .. } => "EXECUTION_QR_BLOCK_TOO_SHORT",
        /// Blocks of two operands did not line up.
        BlockMismatch => BlockMismatch { .. } => "EXECUTION_BLOCK_MISMATCH",
        /// Assembled data did not match the layout recorded in the graph.
        LayoutViolation => LayoutViolation { .. } => "EXECUTION_LAYOUT_VIOLATION",
    }
}

/// Error type produced by the public blockreg API.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BlockregError {
    /// A random state was supplied in a form the resolver does not understand.
    #[error(
        "unsupported random state `{provided}`; expected an unsigned integer seed, `none`, or `entropy`"
    )]
    UnsupportedRandomStateKind {
        /// Raw value supplied by the caller.
        provided: String,
    },
    /// A size parameter that must be positive was zero.
    #[error("{parameter} must be at least 1")]
    ZeroSize {
        /// Name of the offending parameter.
        parameter: &'static str,
    },
    /// A floating-point parameter was non-finite or outside its domain.
    #[error("invalid floating-point parameter `{parameter}`: {expected}")]
    InvalidFloatParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Human-readable description of the accepted domain.
        expected: &'static str,
    },
    /// Two arrays combined by an operation had incompatible shapes.
    #[error("`{operation}` cannot combine shapes {left:?} and {right:?}")]
    ShapeMismatch {
        /// Operation being described.
        operation: &'static str,
        /// Shape of the left-hand operand.
        left: (usize, usize),
        /// Shape of the right-hand operand.
        right: (usize, usize),
    },
    /// Two arrays combined by an operation had different precisions.
    #[error("`{operation}` cannot combine {left} and {right} arrays")]
    DtypeMismatch {
        /// Operation being described.
        operation: &'static str,
        /// Precision of the left-hand operand.
        left: Dtype,
        /// Precision of the right-hand operand.
        right: Dtype,
    },
    /// An index list referenced positions outside the indexed axis.
    #[error("index {index} is out of bounds for an axis of length {len}")]
    IndexOutOfBounds {
        /// The first offending index.
        index: usize,
        /// Length of the indexed axis.
        len: usize,
    },
    /// A shared resource guarded by a mutex was poisoned.
    #[error("{resource} lock was poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
    /// The requested execution mode is unavailable in the current build.
    #[error("the requested execution mode {requested:?} is not available in this build")]
    BackendUnavailable {
        /// Mode that could not be satisfied by the current build.
        requested: ExecutionMode,
    },
    /// A partition scheme could not be derived.
    #[error(transparent)]
    Partition(#[from] PartitionError),
    /// Materializing a graph failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

define_error_codes! {
    /// Stable codes describing [`BlockregError`] variants.
    enum BlockregErrorCode for BlockregError {
        /// A random state was supplied in an unrecognized form.
        UnsupportedRandomStateKind => UnsupportedRandomStateKind { .. } => "BLOCKREG_UNSUPPORTED_RANDOM_STATE_KIND",
        /// A size parameter that must be positive was zero.
        ZeroSize => ZeroSize { .. } => "BLOCKREG_ZERO_SIZE",
        /// A floating-point parameter was non-finite or outside its domain.
        InvalidFloatParameter => InvalidFloatParameter { .. } => "BLOCKREG_INVALID_FLOAT_PARAMETER",
        /// Two arrays combined by an operation had incompatible shapes.
        ShapeMismatch => ShapeMismatch { .. } => "BLOCKREG_SHAPE_MISMATCH",
        /// Two arrays combined by an operation had different precisions.
        DtypeMismatch => DtypeMismatch { .. } => "BLOCKREG_DTYPE_MISMATCH",
        /// An index list referenced positions outside the indexed axis.
        IndexOutOfBounds => IndexOutOfBounds { .. } => "BLOCKREG_INDEX_OUT_OF_BOUNDS",
        /// A shared resource guarded by a mutex was poisoned.
        LockPoisoned => LockPoisoned { .. } => "BLOCKREG_LOCK_POISONED",
        /// The requested execution mode is unavailable in the current build.
        BackendUnavailable => BackendUnavailable { .. } => "BLOCKREG_BACKEND_UNAVAILABLE",
        /// A partition scheme could not be derived.
        PartitionFailure => Partition { .. } => "BLOCKREG_PARTITION_FAILURE",
        /// Materializing a graph failed.
        ExecutionFailure => Execution { .. } => "BLOCKREG_EXECUTION_FAILURE",
    }
}

impl BlockregError {
    /// Retrieve the inner [`PartitionErrorCode`] when partition sizing failed.
    pub const fn partition_code(&self) -> Option<PartitionErrorCode> {
        match self {
            Self::Partition(error) => Some(error.code()),
            _ => None,
        }
    }

    /// Retrieve the inner [`ExecutionErrorCode`] when materialization failed.
    pub const fn execution_code(&self) -> Option<ExecutionErrorCode> {
        match self {
            Self::Execution(error) => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, BlockregError>;
