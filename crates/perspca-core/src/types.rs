//! Type definitions and aliases shared across the workspace.
//!
//! This module provides the scalar abstraction over `f32`/`f64` and the
//! dense matrix aliases used by every subspace operation.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in subspace estimation (f32 or f64).
///
/// Combines the numeric traits required by dense linear algebra and the
/// gradient updates, plus the per-precision tolerance constants used for
/// orthogonality and degeneracy checks.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for numerical comparisons.
    const DEFAULT_TOLERANCE: Self;

    /// Tolerance for checking orthonormality of a basis.
    const ORTHOGONALITY_TOLERANCE: Self;

    /// Norm threshold below which a Gram-Schmidt residual column is
    /// considered numerically dependent on its predecessors.
    const DEGENERACY_TOLERANCE: Self;

    /// Smallest step size the driver will accept before reporting a
    /// step-size collapse.
    const MIN_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Convert from usize (for counts and averages).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-4;
    const ORTHOGONALITY_TOLERANCE: Self = 1e-4;
    const DEGENERACY_TOLERANCE: Self = 1e-5;
    const MIN_STEP_SIZE: Self = 1e-30;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-8;
    const ORTHOGONALITY_TOLERANCE: Self = 1e-8;
    const DEGENERACY_TOLERANCE: Self = 1e-10;
    const MIN_STEP_SIZE: Self = 1e-300;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;
