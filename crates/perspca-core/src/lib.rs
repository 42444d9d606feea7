//! perspca-core - Manifold operators and subspace metrics.
//!
//! This crate provides the numerical primitives behind personalized
//! federated PCA: retractions onto the Stiefel manifold of orthonormal
//! bases, the pair correction that keeps a local subspace orthogonal to
//! the global one, classical Gram-Schmidt, and principal-angle based
//! subspace distances together with the client affinity matrix.
//!
//! The federated optimization itself lives in the companion crate
//! `perspca-fed`.

pub mod error;
pub mod metric;
pub mod retraction;
pub mod types;

pub use error::{PcaError, Result};
pub use metric::{affinity, laplacian_adjust, subspace_error, subspace_error_avg, BasisRef};
pub use retraction::{gram_schmidt, is_orthonormal, orthonormalize_pair, retract, RetractionMethod};
pub use types::{DMatrix, DVector, Scalar};

/// Commonly used types and functions.
pub mod prelude {
    pub use crate::error::{PcaError, Result};
    pub use crate::metric::{
        affinity, laplacian_adjust, subspace_error, subspace_error_avg, BasisRef,
    };
    pub use crate::retraction::{
        gram_schmidt, is_orthonormal, orthonormalize_pair, retract, RetractionMethod,
    };
    pub use crate::types::{DMatrix, DVector, Scalar};
}
