//! Configuration for the federated personalized PCA driver.
//!
//! The configuration is immutable for the lifetime of a run; the only
//! quantity the driver adapts over rounds (the step size) is explicit
//! optimizer state, not configuration.

use perspca_core::{DMatrix, PcaError, Result, Scalar};

/// How a client applies its gradient step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateRule {
    /// Project the gradient onto the tangent space of the Stiefel
    /// manifold, step, then polar-retract only the local block (the
    /// global block is re-orthonormalized by the aggregator).
    Riemannian,
    /// Step in the ambient space and polar-retract the whole joint basis.
    /// Tolerates larger step sizes, since the retraction absorbs the full
    /// correction.
    Projected,
}

/// How the initial global subspace is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitStrategy {
    /// Random Gaussian basis, Gram-Schmidt orthonormalized.
    Random,
    /// Leading eigenvectors of the pooled second-moment matrix.
    Centralized,
    /// Client-local scaled PCA of rank `ngc + nlc`, aggregated on the
    /// server, followed by a second rank-`ngc` eigendecomposition.
    Aggregation,
}

/// Configuration for a federated personalized PCA run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FedPcaConfig<T: Scalar> {
    /// Dimension of the shared global subspace.
    pub ngc: usize,

    /// Dimension of each client's local subspace.
    pub nlc: usize,

    /// Number of participating clients.
    pub num_client: usize,

    /// Initial step size (adapted over rounds by the driver).
    pub eta: T,

    /// Number of federated rounds. The driver always runs exactly this
    /// many rounds; there is no early-stopping criterion.
    pub global_epochs: usize,

    /// Gradient steps each client takes per round.
    pub local_steps: usize,

    /// Gradient update rule.
    pub update_rule: UpdateRule,

    /// Initialization strategy for the global subspace.
    pub init: InitStrategy,

    /// Grow the step size every 5th round when the loss is not
    /// increasing. Only meaningful with `UpdateRule::Riemannian`.
    pub adaptive_step_size: bool,

    /// Print the loss after every round. Pure observability hook; has no
    /// effect on results.
    pub log_progress: bool,
}

impl<T: Scalar> FedPcaConfig<T> {
    /// Creates a configuration with the given subspace dimensions and
    /// client count, and default optimization settings.
    pub fn new(ngc: usize, nlc: usize, num_client: usize) -> Self {
        Self {
            ngc,
            nlc,
            num_client,
            eta: <T as Scalar>::from_f64(0.1),
            global_epochs: 100,
            local_steps: 1,
            update_rule: UpdateRule::Projected,
            init: InitStrategy::Centralized,
            adaptive_step_size: false,
            log_progress: false,
        }
    }

    /// Sets the initial step size.
    pub fn with_eta(mut self, eta: T) -> Self {
        self.eta = eta;
        self
    }

    /// Sets the number of federated rounds.
    pub fn with_global_epochs(mut self, epochs: usize) -> Self {
        self.global_epochs = epochs;
        self
    }

    /// Sets the number of gradient steps per client per round.
    pub fn with_local_steps(mut self, steps: usize) -> Self {
        self.local_steps = steps;
        self
    }

    /// Sets the gradient update rule.
    pub fn with_update_rule(mut self, rule: UpdateRule) -> Self {
        self.update_rule = rule;
        self
    }

    /// Sets the global-subspace initialization strategy.
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Enables the every-5th-round step-size growth heuristic.
    pub fn with_adaptive_step_size(mut self, enabled: bool) -> Self {
        self.adaptive_step_size = enabled;
        self
    }

    /// Enables round-by-round loss reporting.
    pub fn with_log_progress(mut self, enabled: bool) -> Self {
        self.log_progress = enabled;
        self
    }

    /// Validates the configuration against the client data sets.
    ///
    /// Checked once before the round loop begins. Returns the common
    /// ambient dimension `d`.
    pub fn validate(&self, data: &[DMatrix<T>]) -> Result<usize> {
        if self.num_client == 0 {
            return Err(PcaError::invalid_configuration(
                "num_client",
                "at least one client is required",
            ));
        }
        if data.len() != self.num_client {
            return Err(PcaError::dimension_mismatch(
                format!("{} client data sets", self.num_client),
                format!("{}", data.len()),
            ));
        }
        if !(self.eta > T::zero()) {
            return Err(PcaError::invalid_configuration(
                "eta",
                "step size must be positive",
            ));
        }
        if self.local_steps == 0 {
            return Err(PcaError::invalid_configuration(
                "local_steps",
                "at least one local step per round is required",
            ));
        }

        let d = data[0].ncols();
        for (k, y) in data.iter().enumerate() {
            if y.ncols() != d {
                return Err(PcaError::dimension_mismatch(
                    format!("ambient dimension {d}"),
                    format!("{} for client {k}", y.ncols()),
                ));
            }
        }
        if self.ngc + self.nlc > d {
            return Err(PcaError::dimension_mismatch(
                format!("ngc + nlc <= {d}"),
                format!("{} + {}", self.ngc, self.nlc),
            ));
        }
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perspca_core::DMatrix;

    fn data(num_client: usize, n: usize, d: usize) -> Vec<DMatrix<f64>> {
        (0..num_client)
            .map(|k| DMatrix::from_fn(n, d, |i, j| (i + j + k) as f64))
            .collect()
    }

    #[test]
    fn test_builder_defaults() {
        let cfg = FedPcaConfig::<f64>::new(2, 3, 10);
        assert_eq!(cfg.update_rule, UpdateRule::Projected);
        assert_eq!(cfg.init, InitStrategy::Centralized);
        assert_eq!(cfg.local_steps, 1);
        assert!(!cfg.adaptive_step_size);
    }

    #[test]
    fn test_validate_accepts_consistent_data() {
        let cfg = FedPcaConfig::<f64>::new(2, 3, 4);
        assert_eq!(cfg.validate(&data(4, 20, 15)).unwrap(), 15);
    }

    #[test]
    fn test_validate_rejects_rank_overflow() {
        let cfg = FedPcaConfig::<f64>::new(8, 8, 4);
        let err = cfg.validate(&data(4, 20, 15)).unwrap_err();
        assert!(matches!(err, PcaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_inconsistent_ambient_dimension() {
        let cfg = FedPcaConfig::<f64>::new(2, 3, 2);
        let mut sets = data(2, 20, 15);
        sets[1] = DMatrix::zeros(20, 12);
        let err = cfg.validate(&sets).unwrap_err();
        assert!(matches!(err, PcaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_eta_and_counts() {
        let cfg = FedPcaConfig::<f64>::new(2, 3, 4).with_eta(0.0);
        assert!(matches!(
            cfg.validate(&data(4, 20, 15)).unwrap_err(),
            PcaError::InvalidConfiguration { .. }
        ));

        let cfg = FedPcaConfig::<f64>::new(2, 3, 4);
        assert!(matches!(
            cfg.validate(&data(3, 20, 15)).unwrap_err(),
            PcaError::DimensionMismatch { .. }
        ));

        let cfg = FedPcaConfig::<f64>::new(2, 3, 4).with_local_steps(0);
        assert!(matches!(
            cfg.validate(&data(4, 20, 15)).unwrap_err(),
            PcaError::InvalidConfiguration { .. }
        ));
    }
}
