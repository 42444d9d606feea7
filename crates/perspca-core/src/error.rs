//! Error types for subspace and federated optimization operations.

use thiserror::Error;

/// Errors that can occur during subspace estimation.
#[derive(Debug, Clone, Error)]
pub enum PcaError {
    /// A retraction was requested with an unrecognized method name.
    ///
    /// This is a programmer/configuration error, surfaced immediately and
    /// never retried.
    #[error("Unsupported retraction method: {method}")]
    UnsupportedRetraction {
        /// Name of the requested method
        method: String,
    },

    /// Gram-Schmidt encountered a numerically rank-deficient input.
    ///
    /// Raised instead of silently dividing by a near-zero residual norm
    /// and propagating NaN/Inf.
    #[error("Degenerate basis: column {column} is numerically dependent on its predecessors")]
    DegenerateBasis {
        /// Index of the offending column
        column: usize,
    },

    /// Dimension mismatch between matrices or across clients.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// The adapted step size underflowed to zero.
    ///
    /// Repeated loss increases shrink the step size geometrically; once it
    /// reaches zero the round loop would stall silently, so the driver
    /// aborts instead.
    #[error("Step size collapsed to zero at round {round}")]
    StepSizeCollapse {
        /// Round index at which the collapse was detected
        round: usize,
    },

    /// A dense linear-algebra routine failed to converge.
    ///
    /// Carries the operation name and input shape; never caught and
    /// retried automatically.
    #[error("Numerical failure in {operation} on a {rows}x{cols} matrix")]
    NumericalFailure {
        /// Name of the failing operation (e.g. "svd", "qr")
        operation: String,
        /// Number of rows of the input
        rows: usize,
        /// Number of columns of the input
        cols: usize,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration for {parameter}: {reason}")]
    InvalidConfiguration {
        /// Name of the invalid parameter
        parameter: String,
        /// Description of the problem
        reason: String,
    },
}

impl PcaError {
    /// Create an UnsupportedRetraction error.
    pub fn unsupported_retraction<S: Into<String>>(method: S) -> Self {
        Self::UnsupportedRetraction {
            method: method.into(),
        }
    }

    /// Create a DegenerateBasis error for the given column.
    pub fn degenerate_basis(column: usize) -> Self {
        Self::DegenerateBasis { column }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a StepSizeCollapse error at the given round.
    pub fn step_size_collapse(round: usize) -> Self {
        Self::StepSizeCollapse { round }
    }

    /// Create a NumericalFailure error carrying the operation name and
    /// input shape.
    pub fn numerical_failure<S: Into<String>>(operation: S, rows: usize, cols: usize) -> Self {
        Self::NumericalFailure {
            operation: operation.into(),
            rows,
            cols,
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2>(parameter: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::InvalidConfiguration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for operations that can produce `PcaError`.
pub type Result<T> = std::result::Result<T, PcaError>;
