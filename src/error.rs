//! Error types for embedding operations.

use std::fmt;

use thiserror::Error;

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating an embedding request.
///
/// All but [`Error::Overflow`] are detected before any numerical work
/// starts. No variant comes with partial output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// No dissimilarity argument was supplied.
    #[error("missing argument: a dissimilarity matrix is required")]
    MissingArgument,

    /// More arguments than the `(D, p)` contract allows.
    #[error("too many arguments: expected at most 2, got {count}")]
    ExtraArgument {
        /// Number of arguments received.
        count: usize,
    },

    /// The dissimilarity input is neither condensed nor square.
    #[error("invalid shape {rows}x{cols}: {violation}")]
    InvalidShape {
        /// Rows of the offending input.
        rows: usize,
        /// Columns of the offending input.
        cols: usize,
        /// Which constraint was violated.
        violation: ShapeViolation,
    },

    /// NaN or infinite dissimilarity.
    #[error("non-finite dissimilarity at ({row}, {col})")]
    NonFinite {
        /// Row of the entry in the resolved square matrix.
        row: usize,
        /// Column of the entry in the resolved square matrix.
        col: usize,
    },

    /// Finite dissimilarities too large to square: the centered matrix holds
    /// an infinite or NaN entry.
    #[error("centered matrix overflows at ({row}, {col}): dissimilarities too large to square")]
    Overflow {
        /// Row of the first non-finite centered entry.
        row: usize,
        /// Column of the first non-finite centered entry.
        col: usize,
    },

    /// The target dimension argument is not a usable integer.
    #[error("invalid target dimension: {0}")]
    InvalidDimension(String),
}

/// Constraint broken by an [`Error::InvalidShape`] input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeViolation {
    /// The input holds no entries.
    Empty,
    /// A two-dimensional input that is not square.
    NotSquare,
    /// A vector whose length is not n(n-1)/2 for any integer n.
    CondensedLength {
        /// Length of the vector.
        len: usize,
    },
    /// A condensed vector with a negative entry.
    NegativeEntry {
        /// Position in the vector.
        index: usize,
        /// The negative value.
        value: f64,
    },
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeViolation::Empty => write!(f, "input is empty"),
            ShapeViolation::NotSquare => {
                write!(f, "expected a square matrix or a condensed distance vector")
            }
            ShapeViolation::CondensedLength { len } => {
                write!(f, "condensed length {len} is not n(n-1)/2 for any integer n")
            }
            ShapeViolation::NegativeEntry { index, value } => {
                write!(f, "condensed entry {index} is negative ({value})")
            }
        }
    }
}
