//! perspca-fed - Federated estimation of personalized PCA models.
//!
//! Jointly estimates a shared global subspace and per-client local
//! subspaces from distributed data sets without moving raw data between
//! clients: each round, every client takes a manifold-constrained
//! gradient step on its own empirical covariance, and the server averages
//! and re-orthonormalizes the global estimates before broadcasting them
//! back. The numerical primitives (retractions, subspace metrics) live in
//! `perspca-core`.
//!
//! # Example
//!
//! ```rust,no_run
//! use perspca_fed::{FedPca, FedPcaConfig};
//! use perspca_core::DMatrix;
//!
//! # fn load_client_data() -> Vec<DMatrix<f64>> { Vec::new() }
//! let data: Vec<DMatrix<f64>> = load_client_data();
//! let config = FedPcaConfig::new(2, 3, data.len())
//!     .with_eta(0.1)
//!     .with_global_epochs(50);
//! let result = FedPca::new(config).run(&data).unwrap();
//! println!("final loss: {}", result.loss_trajectory.last().unwrap());
//! ```

pub mod baseline;
pub mod config;
pub mod driver;
pub mod init;
pub mod local;
pub mod loss;

pub use baseline::two_shot_pca;
pub use config::{FedPcaConfig, InitStrategy, UpdateRule};
pub use driver::{FedPca, FedPcaResult};
pub use init::{initial_global, initial_locals, leading_eigenvectors};
pub use local::local_update;
pub use loss::{pooled_loss, single_loss};
