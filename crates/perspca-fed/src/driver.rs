//! Federated driver: the round loop, server-side aggregation, and
//! step-size adaptation.
//!
//! One run proceeds through a fixed number of rounds. In every round the
//! clients take their local gradient steps independently (fanned out with
//! rayon; the aggregation below is the join point), the server averages
//! the per-client global estimates, QR-retracts the average back onto the
//! Stiefel manifold, and broadcasts a fresh copy to every client. The
//! pooled loss after the round feeds a non-monotone step-size heuristic:
//! shrink on an increase, optionally grow every 5th round. The heuristic
//! is empirically tuned policy, not convergent by construction.

use crate::config::{FedPcaConfig, UpdateRule};
use crate::init;
use crate::local::local_update;
use crate::loss::pooled_loss;
use perspca_core::{
    orthonormalize_pair, retract, BasisRef, DMatrix, PcaError, Result, RetractionMethod, Scalar,
};
use rand::Rng;
use rayon::prelude::*;

/// Output of one federated run.
///
/// Immediately after a run, all entries of `globals` are equal copies of
/// the final aggregated global basis; `locals[k]` is client `k`'s private
/// basis, orthogonal to it. The trajectory holds one pooled loss value
/// per completed round, in order.
#[derive(Debug, Clone)]
pub struct FedPcaResult<T: Scalar> {
    /// Per-client global-subspace estimates (identical after aggregation).
    pub globals: Vec<DMatrix<T>>,
    /// Per-client local-subspace estimates.
    pub locals: Vec<DMatrix<T>>,
    /// Pooled loss after each round, in round order.
    pub loss_trajectory: Vec<T>,
}

/// Federated personalized PCA driver.
#[derive(Debug, Clone)]
pub struct FedPca<T: Scalar> {
    config: FedPcaConfig<T>,
}

impl<T: Scalar> FedPca<T> {
    /// Creates a driver with the given configuration.
    pub fn new(config: FedPcaConfig<T>) -> Self {
        Self { config }
    }

    /// Returns the driver's configuration.
    pub fn config(&self) -> &FedPcaConfig<T> {
        &self.config
    }

    /// Runs the federated optimization with a thread-local RNG for the
    /// initialization step.
    pub fn run(&self, data: &[DMatrix<T>]) -> Result<FedPcaResult<T>> {
        self.run_with_rng(data, &mut rand::thread_rng())
    }

    /// Runs the federated optimization, drawing the initial bases from
    /// the supplied RNG (reproducible given a seeded generator).
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        data: &[DMatrix<T>],
        rng: &mut R,
    ) -> Result<FedPcaResult<T>> {
        let d = self.config.validate(data)?;
        let u = init::initial_global(data, &self.config, d, rng)?;
        let locals = init::initial_locals(&u, self.config.nlc, self.config.num_client, rng)?;
        self.run_from(data, &u, locals)
    }

    /// Runs the federated optimization from explicit initial bases.
    ///
    /// `u_init` is broadcast (copied) to every client; `v_init` supplies
    /// one local basis per client. Useful for warm starts and for
    /// fixed-point checks against known generating subspaces.
    pub fn run_from(
        &self,
        data: &[DMatrix<T>],
        u_init: &DMatrix<T>,
        v_init: Vec<DMatrix<T>>,
    ) -> Result<FedPcaResult<T>> {
        let cfg = &self.config;
        let d = cfg.validate(data)?;
        if u_init.shape() != (d, cfg.ngc) {
            return Err(PcaError::dimension_mismatch(
                format!("({d}, {})", cfg.ngc),
                format!("{:?}", u_init.shape()),
            ));
        }
        if v_init.len() != cfg.num_client {
            return Err(PcaError::dimension_mismatch(
                format!("{} local bases", cfg.num_client),
                format!("{}", v_init.len()),
            ));
        }
        for v in &v_init {
            if v.shape() != (d, cfg.nlc) {
                return Err(PcaError::dimension_mismatch(
                    format!("({d}, {})", cfg.nlc),
                    format!("{:?}", v.shape()),
                ));
            }
        }

        // Broadcast is always a copy; clients never alias each other's
        // state.
        let mut globals: Vec<DMatrix<T>> = (0..cfg.num_client).map(|_| u_init.clone()).collect();
        let mut locals = v_init;

        let mut eta = cfg.eta;
        let mut trajectory: Vec<T> = Vec::with_capacity(cfg.global_epochs);

        for round in 0..cfg.global_epochs {
            // Fan-out: one independent pure update per client; the
            // collect below is the fan-in barrier.
            let updated = data
                .par_iter()
                .zip(globals.par_iter().zip(locals.par_iter()))
                .map(|(y, (u, v))| local_update(y, u, v, eta, cfg.update_rule, cfg.local_steps))
                .collect::<Result<Vec<_>>>()?;
            for (k, (u, v)) in updated.into_iter().enumerate() {
                globals[k] = u;
                locals[k] = v;
            }

            // Aggregate: the mean of orthonormal matrices is generally
            // not orthonormal; QR restores the constraint.
            let mut u_avg: DMatrix<T> = DMatrix::zeros(d, cfg.ngc);
            for u in &globals {
                u_avg += u;
            }
            u_avg.unscale_mut(<T as Scalar>::from_usize(cfg.num_client));
            let u_avg = retract(&u_avg, RetractionMethod::Qr)?;
            for u in globals.iter_mut() {
                *u = u_avg.clone();
            }

            let ls = pooled_loss(
                data,
                BasisRef::PerClient(&globals),
                Some(BasisRef::PerClient(&locals)),
            )?;
            if cfg.log_progress {
                println!(
                    "[{}/{}] loss {:.6e} (eta {:.3e})",
                    round + 1,
                    cfg.global_epochs,
                    ls.to_f64(),
                    eta.to_f64()
                );
            }

            eta = adapted_step(eta, trajectory.last().copied(), ls, round, cfg)?;
            trajectory.push(ls);
        }

        // Numerical drift during training can leave the pair slightly
        // non-orthogonal; re-establish the invariant on output.
        for k in 0..cfg.num_client {
            let (u, v) = orthonormalize_pair(&globals[k], &locals[k])?;
            globals[k] = u;
            locals[k] = v;
        }

        Ok(FedPcaResult {
            globals,
            locals,
            loss_trajectory: trajectory,
        })
    }
}

/// Step-size adaptation policy.
///
/// Shrinks by `e^-1` when the loss increased versus the previous round;
/// otherwise, in Riemannian mode with the adaptive flag set, grows by 1.5
/// on every 5th round. A step size that shrinks below the representable
/// minimum is a `StepSizeCollapse`.
fn adapted_step<T: Scalar>(
    eta: T,
    previous_loss: Option<T>,
    loss: T,
    round: usize,
    config: &FedPcaConfig<T>,
) -> Result<T> {
    let increased = previous_loss.is_some_and(|prev| loss > prev);
    if increased {
        let shrunk = eta * <T as Scalar>::from_f64(std::f64::consts::E.recip());
        if !(shrunk >= T::MIN_STEP_SIZE) {
            return Err(PcaError::step_size_collapse(round));
        }
        if config.log_progress {
            println!("decreasing step size to {:.10e}", shrunk.to_f64());
        }
        return Ok(shrunk);
    }
    if config.update_rule == UpdateRule::Riemannian
        && config.adaptive_step_size
        && round % 5 == 4
    {
        return Ok(eta * <T as Scalar>::from_f64(1.5));
    }
    Ok(eta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitStrategy;
    use approx::assert_relative_eq;

    fn config(rule: UpdateRule, adaptive: bool) -> FedPcaConfig<f64> {
        FedPcaConfig::new(2, 3, 10)
            .with_update_rule(rule)
            .with_adaptive_step_size(adaptive)
            .with_init(InitStrategy::Random)
    }

    #[test]
    fn test_step_shrinks_on_loss_increase() {
        let cfg = config(UpdateRule::Projected, false);
        let eta = adapted_step(0.1, Some(1.0), 2.0, 3, &cfg).unwrap();
        assert_relative_eq!(eta, 0.1 * (-1.0f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_step_grows_every_fifth_round_in_adaptive_riemannian() {
        let cfg = config(UpdateRule::Riemannian, true);
        assert_relative_eq!(
            adapted_step(0.1, Some(2.0), 1.0, 4, &cfg).unwrap(),
            0.15,
            epsilon = 1e-15
        );
        // Not on the 5th round boundary.
        assert_relative_eq!(
            adapted_step(0.1, Some(2.0), 1.0, 3, &cfg).unwrap(),
            0.1,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_step_never_grows_in_projected_mode() {
        let cfg = config(UpdateRule::Projected, true);
        assert_relative_eq!(
            adapted_step(0.1, Some(2.0), 1.0, 4, &cfg).unwrap(),
            0.1,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_step_unchanged_on_first_round() {
        let cfg = config(UpdateRule::Projected, false);
        assert_relative_eq!(adapted_step(0.1, None, 5.0, 0, &cfg).unwrap(), 0.1);
    }

    #[test]
    fn test_step_collapse_is_an_error() {
        let cfg = config(UpdateRule::Projected, false);
        let err = adapted_step(f64::MIN_STEP_SIZE, Some(1.0), 2.0, 7, &cfg).unwrap_err();
        assert!(matches!(err, PcaError::StepSizeCollapse { round: 7 }));
    }
}
