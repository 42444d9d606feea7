//! Orthogonal retraction onto the Stiefel manifold St(d,r).
//!
//! The Stiefel manifold is the set of d x r real matrices with orthonormal
//! columns. Every update in the federated optimization leaves the manifold
//! by a small amount (a gradient step, or the server-side average of
//! per-client bases), and is pulled back with one of the retractions
//! implemented here:
//!
//! - **Polar**: replace the singular values of the input with 1. This is
//!   the orthogonal Procrustes solution, i.e. the orthonormal matrix
//!   closest to the input in Frobenius norm.
//! - **QR**: take the thin Q factor of a QR factorization. Cheaper, and
//!   numerically stable for averaging nearly-identical bases.
//!
//! The module also provides the pair correction used before every local
//! gradient step (forcing the local basis into the orthogonal complement
//! of the global basis) and classical Gram-Schmidt orthonormalization.

use crate::error::{PcaError, Result};
use crate::types::{DMatrix, Scalar};
use num_traits::Float;
use std::str::FromStr;

/// Retraction method selecting how a matrix is mapped back onto the
/// Stiefel manifold.
///
/// Unknown method names are rejected at the configuration boundary by the
/// `FromStr` implementation; the inner loops only ever see this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetractionMethod {
    /// Polar decomposition via SVD (nearest orthonormal matrix).
    Polar,
    /// Thin Q factor of a QR factorization.
    Qr,
}

impl FromStr for RetractionMethod {
    type Err = PcaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "polar" => Ok(Self::Polar),
            "qr" => Ok(Self::Qr),
            other => Err(PcaError::unsupported_retraction(other)),
        }
    }
}

/// Maximum SVD iterations before reporting a numerical failure.
const SVD_MAX_ITER: usize = 1000;

/// Retracts an arbitrary d x r matrix onto the Stiefel manifold.
///
/// Returns the d x r matrix with orthonormal columns closest to `m`
/// (exactly closest for `Polar`, approximately for `Qr`). Requires
/// `m` to have full column rank; rank-deficient input surfaces as a
/// `NumericalFailure` or produces a basis of the column space.
pub fn retract<T: Scalar>(m: &DMatrix<T>, method: RetractionMethod) -> Result<DMatrix<T>> {
    let (rows, cols) = m.shape();
    match method {
        RetractionMethod::Polar => {
            let svd = m
                .clone()
                .try_svd(true, true, T::EPSILON, SVD_MAX_ITER)
                .ok_or_else(|| PcaError::numerical_failure("svd", rows, cols))?;
            let u = svd
                .u
                .ok_or_else(|| PcaError::numerical_failure("svd", rows, cols))?;
            let v_t = svd
                .v_t
                .ok_or_else(|| PcaError::numerical_failure("svd", rows, cols))?;
            // Dropping the singular values is the same as replacing them
            // with 1: the polar factor U V^T.
            Ok(u * v_t)
        }
        RetractionMethod::Qr => {
            let qr = m.clone().qr();
            Ok(qr.q())
        }
    }
}

/// Forces `v` into the orthogonal complement of the orthonormal basis `u`.
///
/// Projects out the components of `v` lying in span(`u`)
/// (`v - u u^T v`) and polar-retracts the remainder, so that the returned
/// pair satisfies `u^T v = 0` and `v^T v = I`. `u` is passed through
/// unchanged. This is the correction step applied before every local
/// gradient update.
pub fn orthonormalize_pair<T: Scalar>(
    u: &DMatrix<T>,
    v: &DMatrix<T>,
) -> Result<(DMatrix<T>, DMatrix<T>)> {
    if u.nrows() != v.nrows() {
        return Err(PcaError::dimension_mismatch(
            format!("{} rows", u.nrows()),
            format!("{} rows", v.nrows()),
        ));
    }
    let complement = v - u * (u.transpose() * v);
    let v_orth = retract(&complement, RetractionMethod::Polar)?;
    Ok((u.clone(), v_orth))
}

/// Classical (not modified) Gram-Schmidt orthonormalization, in place.
///
/// If a residual column norm falls below `Scalar::DEGENERACY_TOLERANCE`
/// the input is numerically rank-deficient and a `DegenerateBasis` error
/// is returned; the matrix contents are unspecified in that case. Classical
/// Gram-Schmidt loses orthogonality faster than the modified variant on
/// ill-conditioned input; callers needing the exact minimizer should use
/// the polar retraction instead.
pub fn gram_schmidt<T: Scalar>(q: &mut DMatrix<T>) -> Result<()> {
    for i in 0..q.ncols() {
        for j in 0..i {
            let proj = q.column(i).dot(&q.column(j));
            let prev = q.column(j).into_owned();
            q.column_mut(i).axpy(-proj, &prev, T::one());
        }
        let norm = q.column(i).norm();
        if norm <= T::DEGENERACY_TOLERANCE {
            return Err(PcaError::degenerate_basis(i));
        }
        q.column_mut(i).unscale_mut(norm);
    }
    Ok(())
}

/// Checks whether a matrix has orthonormal columns within `tolerance`.
pub fn is_orthonormal<T: Scalar>(m: &DMatrix<T>, tolerance: T) -> bool {
    let gram = m.transpose() * m;
    for i in 0..gram.nrows() {
        for j in 0..gram.ncols() {
            let expected = if i == j { T::one() } else { T::zero() };
            if <T as Float>::abs(gram[(i, j)] - expected) > tolerance {
                return false;
            }
        }
    }
    true
}
