//! Principal-angle based subspace distances and the client affinity matrix.

use crate::error::{PcaError, Result};
use crate::types::{DMatrix, Scalar};

/// Reference to either a single shared basis or a per-client sequence.
///
/// The loss and metric routines accept bases in both forms (a single
/// global estimate broadcast to all clients, or one estimate per client).
/// This tagged variant is resolved once at the call boundary instead of
/// being re-examined inside the per-client loops.
#[derive(Debug, Clone, Copy)]
pub enum BasisRef<'a, T: Scalar> {
    /// One basis shared by every client.
    Shared(&'a DMatrix<T>),
    /// One basis per client, in client order.
    PerClient(&'a [DMatrix<T>]),
}

impl<'a, T: Scalar> BasisRef<'a, T> {
    /// Number of per-client bases, or `None` for a shared basis.
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::Shared(_) => None,
            Self::PerClient(list) => Some(list.len()),
        }
    }

    /// The basis seen by client `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds for a per-client sequence; callers
    /// validate sequence lengths up front.
    pub fn get(&self, i: usize) -> &'a DMatrix<T> {
        match self {
            Self::Shared(m) => m,
            Self::PerClient(list) => &list[i],
        }
    }
}

/// Subspace error between two orthonormal d x r bases.
///
/// Returns `r - trace(P_U P_V)` where `P_U = U U^T`, computed as
/// `r - ||U^T V||_F^2`. The value lies in `[0, r]`: 0 when the bases span
/// the same subspace, `r` when the subspaces are mutually orthogonal.
/// Equals the sum of squared sines of the principal angles.
pub fn subspace_error<T: Scalar>(u: &DMatrix<T>, v: &DMatrix<T>) -> T {
    let r = <T as Scalar>::from_usize(u.ncols());
    r - (u.transpose() * v).norm_squared()
}

/// Average subspace error over two basis sequences.
///
/// A `Shared` basis is broadcast against a `PerClient` sequence on the
/// other side. Two `PerClient` sequences must have equal length. Two
/// `Shared` bases reduce to a single `subspace_error`.
pub fn subspace_error_avg<T: Scalar>(u: BasisRef<'_, T>, v: BasisRef<'_, T>) -> Result<T> {
    let n = match (u.count(), v.count()) {
        (Some(a), Some(b)) if a != b => {
            return Err(PcaError::dimension_mismatch(
                format!("{a} bases"),
                format!("{b} bases"),
            ));
        }
        (Some(a), _) => a,
        (_, Some(b)) => b,
        (None, None) => 1,
    };
    if n == 0 {
        return Err(PcaError::dimension_mismatch("at least 1 basis", "0 bases"));
    }

    let mut total = T::zero();
    for i in 0..n {
        total += subspace_error(u.get(i), v.get(i));
    }
    Ok(total / <T as Scalar>::from_usize(n))
}

/// Pairwise affinity matrix between client local subspaces.
///
/// Entry `(i, j)` is `trace(V_i V_i^T V_j V_j^T) = ||V_i^T V_j||_F^2`, a
/// similarity in `[0, min(r_i, r_j)]`; the diagonal is left at zero. The
/// matrix is the input to an external spectral-clustering collaborator,
/// usually after [`laplacian_adjust`].
pub fn affinity<T: Scalar>(locals: &[DMatrix<T>]) -> DMatrix<T> {
    let n = locals.len();
    let mut afm = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..i {
            let a = (locals[i].transpose() * &locals[j]).norm_squared();
            afm[(i, j)] = a;
            afm[(j, i)] = a;
        }
    }
    afm
}

/// Rescales an affinity matrix into its graph-Laplacian-like form.
///
/// Normalizes by the largest entry, squares elementwise to sharpen the
/// contrast, then subtracts each row sum from the diagonal. Clustering
/// itself is out of scope; this is the last step the core performs.
pub fn laplacian_adjust<T: Scalar>(afm: &mut DMatrix<T>) {
    let max = afm.max();
    if max > T::zero() {
        afm.unscale_mut(max);
    }
    afm.apply(|x| *x = *x * *x);

    let n = afm.nrows();
    for i in 0..n {
        let row_sum = afm.row(i).sum();
        afm[(i, i)] -= row_sum;
    }
}
