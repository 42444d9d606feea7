//! Initialization strategies for the global and local subspaces.

use crate::config::{FedPcaConfig, InitStrategy};
use perspca_core::{gram_schmidt, DMatrix, PcaError, Result, Scalar};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Maximum eigensolver iterations before reporting a numerical failure.
const EIGEN_MAX_ITER: usize = 1000;

/// Samples a matrix with i.i.d. standard normal entries.
pub(crate) fn random_gaussian<T, R>(rows: usize, cols: usize, rng: &mut R) -> DMatrix<T>
where
    T: Scalar,
    R: Rng + ?Sized,
{
    DMatrix::from_fn(rows, cols, |_, _| {
        let val: f64 = StandardNormal.sample(rng);
        <T as Scalar>::from_f64(val)
    })
}

/// Symmetric eigendecomposition with eigenpairs sorted by decreasing
/// eigenvalue.
fn sorted_symmetric_eigen<T: Scalar>(s: DMatrix<T>) -> Result<(Vec<T>, DMatrix<T>)> {
    let n = s.nrows();
    let eigen = s
        .try_symmetric_eigen(T::EPSILON, EIGEN_MAX_ITER)
        .ok_or_else(|| PcaError::numerical_failure("symmetric_eigen", n, n))?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let mut vectors = DMatrix::zeros(n, n);
    for (j, &i) in order.iter().enumerate() {
        vectors.set_column(j, &eigen.eigenvectors.column(i));
    }
    Ok((values, vectors))
}

/// Leading `k` eigenvectors of a symmetric matrix, as a `n x k` basis.
pub fn leading_eigenvectors<T: Scalar>(s: &DMatrix<T>, k: usize) -> Result<DMatrix<T>> {
    let n = s.nrows();
    if k > n {
        return Err(PcaError::dimension_mismatch(
            format!("rank <= {n}"),
            format!("{k}"),
        ));
    }
    let (_, vectors) = sorted_symmetric_eigen(s.clone())?;
    Ok(vectors.columns(0, k).into_owned())
}

/// Top-`rank` principal directions of a single client's data.
pub(crate) fn single_pca<T: Scalar>(y: &DMatrix<T>, rank: usize) -> Result<DMatrix<T>> {
    leading_eigenvectors(&(y.transpose() * y), rank)
}

/// Top-`rank` principal directions scaled by the square root of their
/// eigenvalues, so that the server-side aggregation weighs clients by
/// explained variance.
pub(crate) fn single_pca_scaled<T: Scalar>(y: &DMatrix<T>, rank: usize) -> Result<DMatrix<T>> {
    let s = y.transpose() * y;
    let n = s.nrows();
    if rank > n {
        return Err(PcaError::dimension_mismatch(
            format!("rank <= {n}"),
            format!("{rank}"),
        ));
    }
    let (values, vectors) = sorted_symmetric_eigen(s)?;

    let mut out = vectors.columns(0, rank).into_owned();
    for (j, &value) in values.iter().take(rank).enumerate() {
        let scale = <T as num_traits::Float>::sqrt(<T as num_traits::Float>::max(value, T::zero()));
        out.column_mut(j).scale_mut(scale);
    }
    Ok(out)
}

/// Seeds the initial global subspace according to the configured strategy.
pub fn initial_global<T, R>(
    data: &[DMatrix<T>],
    config: &FedPcaConfig<T>,
    d: usize,
    rng: &mut R,
) -> Result<DMatrix<T>>
where
    T: Scalar,
    R: Rng + ?Sized,
{
    match config.init {
        InitStrategy::Random => {
            let mut u = random_gaussian(d, config.ngc, rng);
            gram_schmidt(&mut u)?;
            Ok(u)
        }
        InitStrategy::Centralized => {
            let mut s = DMatrix::zeros(d, d);
            for y in data {
                s += y.transpose() * y;
            }
            leading_eigenvectors(&s, config.ngc)
        }
        InitStrategy::Aggregation => {
            // Each client reports a scaled PCA of joint rank; the server
            // aggregates the implied covariances and extracts the shared
            // directions.
            let mut s = DMatrix::zeros(d, d);
            for y in data {
                let p = single_pca_scaled(y, config.ngc + config.nlc)?;
                s += &p * p.transpose();
            }
            leading_eigenvectors(&s, config.ngc)
        }
    }
}

/// Seeds every client's local subspace: a random Gaussian basis projected
/// onto the orthogonal complement of the global subspace and
/// orthonormalized.
pub fn initial_locals<T, R>(
    u: &DMatrix<T>,
    nlc: usize,
    num_client: usize,
    rng: &mut R,
) -> Result<Vec<DMatrix<T>>>
where
    T: Scalar,
    R: Rng + ?Sized,
{
    let d = u.nrows();
    let mut locals = Vec::with_capacity(num_client);
    for _ in 0..num_client {
        let g = random_gaussian::<T, R>(d, nlc, rng);
        let mut v = &g - u * (u.transpose() * &g);
        gram_schmidt(&mut v)?;
        locals.push(v);
    }
    Ok(locals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use perspca_core::{is_orthonormal, subspace_error};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn low_rank_data(d: usize, directions: &[usize], n: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mixing = random_gaussian::<f64, _>(n, directions.len(), &mut rng);
        let mut y = DMatrix::zeros(n, d);
        for (j, &dir) in directions.iter().enumerate() {
            y.column_mut(dir).copy_from(&mixing.column(j));
        }
        y
    }

    #[test]
    fn test_leading_eigenvectors_diagonal_matrix() {
        let s: DMatrix<f64> =
            DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1.0, 5.0, 3.0, 0.5]));
        let top = leading_eigenvectors(&s, 2).unwrap();

        // Largest eigenvalues sit at indices 1 and 2.
        assert_relative_eq!(top.column(0).abs().max(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(top[(1, 0)].abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(top[(2, 1)].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_pca_recovers_support() {
        let y = low_rank_data(10, &[2, 5], 200, 1);
        let basis = single_pca(&y, 2).unwrap();

        let mut truth = DMatrix::zeros(10, 2);
        truth[(2, 0)] = 1.0;
        truth[(5, 1)] = 1.0;
        assert!(subspace_error(&truth, &basis) < 1e-8);
    }

    #[test]
    fn test_single_pca_scaled_recovers_magnitude() {
        let y = low_rank_data(8, &[1, 4], 500, 2);
        let scaled = single_pca_scaled(&y, 2).unwrap();
        let s = y.transpose() * &y;

        // Reconstructed rank-2 covariance matches the data's second moment.
        let approx_s = &scaled * scaled.transpose();
        assert_relative_eq!(approx_s, s, epsilon = 1e-6);
    }

    #[test]
    fn test_initial_global_strategies_are_orthonormal() {
        let mut rng = StdRng::seed_from_u64(3);
        let data: Vec<_> = (0..4)
            .map(|k| low_rank_data(12, &[0, 1, 2 + k], 50, 10 + k as u64))
            .collect();

        for init in [
            InitStrategy::Random,
            InitStrategy::Centralized,
            InitStrategy::Aggregation,
        ] {
            let cfg = FedPcaConfig::<f64>::new(2, 1, 4).with_init(init);
            let u = initial_global(&data, &cfg, 12, &mut rng).unwrap();
            assert_eq!(u.shape(), (12, 2));
            assert!(is_orthonormal(&u, 1e-8), "{init:?} basis not orthonormal");
        }
    }

    #[test]
    fn test_initial_locals_live_in_complement() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut u = random_gaussian::<f64, _>(10, 2, &mut rng);
        gram_schmidt(&mut u).unwrap();

        let locals = initial_locals(&u, 3, 5, &mut rng).unwrap();
        assert_eq!(locals.len(), 5);
        for v in &locals {
            assert!(is_orthonormal(v, 1e-8));
            assert!((u.transpose() * v).norm() < 1e-8);
        }
    }
}
