//! Reconstruction-error loss of the joint bases against client data.
//!
//! The pooled loss is the single scalar the driver monitors and adapts
//! its step size on. It is fully deterministic: the same data and bases
//! reproduce the same value bit for bit.

use crate::local::joint_basis;
use perspca_core::{gram_schmidt, BasisRef, DMatrix, PcaError, Result, Scalar};

/// Mean squared Frobenius reconstruction residual of one client's data
/// against a single basis: `||y^T - b b^T y^T||_F^2 / n`.
pub fn single_loss<T: Scalar>(y: &DMatrix<T>, basis: &DMatrix<T>) -> T {
    let yt = y.transpose();
    let residual = &yt - basis * (basis.transpose() * &yt);
    residual.norm_squared() / <T as Scalar>::from_usize(y.nrows())
}

/// Pooled mean squared reconstruction error across all clients.
///
/// For each client the joint basis `[u_k | v_k]` is formed; when both the
/// global and local bases are per-client sequences the pair is
/// re-orthonormalized first, since per-client drift between aggregations
/// would otherwise leak into the monitored quantity. Residuals are summed
/// over clients and divided by the total datapoint count (a pooled mean,
/// not a per-client average).
pub fn pooled_loss<T: Scalar>(
    data: &[DMatrix<T>],
    global: BasisRef<'_, T>,
    local: Option<BasisRef<'_, T>>,
) -> Result<T> {
    for count in [global.count(), local.and_then(|l| l.count())]
        .into_iter()
        .flatten()
    {
        if count != data.len() {
            return Err(PcaError::dimension_mismatch(
                format!("{} bases", data.len()),
                format!("{count}"),
            ));
        }
    }
    if data.is_empty() {
        return Err(PcaError::dimension_mismatch("at least 1 client", "0"));
    }

    let mut residual = T::zero();
    let mut total = 0usize;
    for (k, y) in data.iter().enumerate() {
        let joint = match (global, local) {
            (g, None) => g.get(k).clone(),
            (BasisRef::PerClient(_), Some(l)) => {
                let mut w = joint_basis(global.get(k), l.get(k));
                gram_schmidt(&mut w)?;
                w
            }
            (BasisRef::Shared(u), Some(l)) => joint_basis(u, l.get(k)),
        };

        let yt = y.transpose();
        residual += (&yt - &joint * (joint.transpose() * &yt)).norm_squared();
        total += y.nrows();
    }
    Ok(residual / <T as Scalar>::from_usize(total))
}
