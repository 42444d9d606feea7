//! Two-shot PCA baseline.
//!
//! A non-iterative alternative to the federated driver: one round of
//! client-local PCA, one server aggregation, and a per-client deflation.
//! It consumes the same data model and configuration surface but never
//! touches the round loop or the step-size policy.

use crate::config::FedPcaConfig;
use crate::driver::FedPcaResult;
use crate::init::{leading_eigenvectors, single_pca};
use perspca_core::{DMatrix, Result, Scalar};

/// Estimates global and local subspaces in two communication shots.
///
/// Each client reports the top `ngc + nlc` principal directions of its
/// data; the server aggregates the reported directions and extracts the
/// `ngc` shared ones. Local subspaces are then recovered client-side by
/// deflating the global reconstruction out of the data and taking the top
/// `nlc` directions of the remainder. The returned loss trajectory is
/// empty (nothing is iterated).
pub fn two_shot_pca<T: Scalar>(
    data: &[DMatrix<T>],
    config: &FedPcaConfig<T>,
) -> Result<FedPcaResult<T>> {
    let d = config.validate(data)?;
    let rank = config.ngc + config.nlc;

    // Shot one: client-local principal directions.
    let reported = data
        .iter()
        .map(|y| single_pca(y, rank))
        .collect::<Result<Vec<_>>>()?;

    // Shot two: the server aggregates the reported directions and keeps
    // the dominant shared ones.
    let mut s: DMatrix<T> = DMatrix::zeros(d, d);
    for p in &reported {
        s += p * p.transpose();
    }
    let u = leading_eigenvectors(&s, config.ngc)?;

    // Deflation: remove the global reconstruction and extract the local
    // directions from the residual.
    let projector = &u * u.transpose();
    let locals = data
        .iter()
        .map(|y| single_pca(&(y - y * &projector), config.nlc))
        .collect::<Result<Vec<_>>>()?;

    let globals = vec![u; config.num_client];
    Ok(FedPcaResult {
        globals,
        locals,
        loss_trajectory: Vec::new(),
    })
}
