//! Per-client local optimizer.
//!
//! One invocation performs the client's share of a federated round: the
//! orthogonality correction, then `local_steps` gradient steps on the
//! client's empirical second moment, jointly updating the client's global
//! and local subspace estimates. Pure function of its inputs; no internal
//! randomness.

use crate::config::UpdateRule;
use perspca_core::{orthonormalize_pair, retract, DMatrix, Result, RetractionMethod, Scalar};

/// Concatenates two bases column-wise into the joint basis `[u | v]`.
pub(crate) fn joint_basis<T: Scalar>(u: &DMatrix<T>, v: &DMatrix<T>) -> DMatrix<T> {
    let d = u.nrows();
    let mut w = DMatrix::zeros(d, u.ncols() + v.ncols());
    w.columns_mut(0, u.ncols()).copy_from(u);
    w.columns_mut(u.ncols(), v.ncols()).copy_from(v);
    w
}

/// One client-side update of `(u, v)` on data `y` (rows are samples).
///
/// The trace-maximization objective is `trace(w^T s w)` for the joint
/// basis `w = [u | v]` and second moment `s = y^T y / n`; the Euclidean
/// gradient of its negation is `-2 s w`, and the step is taken either on
/// the Stiefel tangent space or in the ambient space depending on `rule`.
/// Returns the updated pair; the caller owns the broadcast and averaging.
pub fn local_update<T: Scalar>(
    y: &DMatrix<T>,
    u: &DMatrix<T>,
    v: &DMatrix<T>,
    eta: T,
    rule: UpdateRule,
    local_steps: usize,
) -> Result<(DMatrix<T>, DMatrix<T>)> {
    // Correction: force v into the orthogonal complement of u.
    let (mut u, mut v) = orthonormalize_pair(u, v)?;

    let du = u.ncols();
    let dv = v.ncols();
    let n = <T as Scalar>::from_usize(y.nrows());
    let s = (y.transpose() * y).unscale(n);
    let two = <T as Scalar>::from_f64(2.0);

    for _ in 0..local_steps {
        let mut w = joint_basis(&u, &v);
        let grad = -(&s * &w) * two;

        match rule {
            UpdateRule::Riemannian => {
                // Tangent-space projection at w, then retract only the
                // local block; the aggregator re-orthonormalizes the
                // global block after averaging.
                let sym = (grad.transpose() * &w + w.transpose() * &grad).unscale(two);
                let rgrad = &grad - &w * sym;
                w -= rgrad * eta;
                u = w.columns(0, du).into_owned();
                let local_block = w.columns(du, dv).into_owned();
                v = retract(&local_block, RetractionMethod::Polar)?;
            }
            UpdateRule::Projected => {
                w -= grad * eta;
                let retracted = retract(&w, RetractionMethod::Polar)?;
                u = retracted.columns(0, du).into_owned();
                v = retracted.columns(du, dv).into_owned();
            }
        }
    }

    Ok((u, v))
}
