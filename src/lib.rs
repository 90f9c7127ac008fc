//! seqevo: transition probabilities for time-reversible substitution models
//!
//! Builds the normalised rate generator Q from exchangeabilities R and
//! stationary frequencies pi, decomposes it once, and evaluates
//! P(w) = exp(Qw) = V diag(exp(E w)) V^{-1} for any number of branch lengths
//! through a bounded LRU cache. Meant for the inner loop of MCMC samplers,
//! where the same branch lengths come back iteration after iteration.
//!
//! ```
//! use seqevo::{SequenceType, TransitionConfig, TransitionModel};
//!
//! let mut model = TransitionModel::new(
//!     "two-state",
//!     SequenceType::Binary,
//!     vec![1.0],
//!     vec![0.5, 0.5],
//!     TransitionConfig::default(),
//! )?;
//! let p = model.compute_p(0.1)?;
//! let expected = 0.5 + 0.5 * (-0.2_f64).exp();
//! assert!((p.matrix()[[0, 0]] - expected).abs() < 1e-12);
//! # Ok::<(), seqevo::SeqEvoError>(())
//! ```

pub mod alphabet;
pub mod cache;
pub mod config;
pub mod eigen;
pub mod error;
pub mod exchangeability;
pub mod linalg;
pub mod model;
pub mod qmatrix;
pub mod transition;

#[cfg(feature = "python")]
mod python;

pub use alphabet::SequenceType;
pub use cache::{BoundedTransitionCache, CacheStats};
pub use config::{TransitionConfig, DEFAULT_CACHE_CAPACITY, MAX_MARKOV_TIME};
pub use eigen::{EigenSolver, EigenSystem, RawEigen, SymmetricEigenSolver};
#[cfg(feature = "lapack")]
pub use eigen::LapackEigenSolver;
pub use error::{Result, SeqEvoError};
pub use exchangeability::Exchangeabilities;
pub use model::TransitionModel;
pub use qmatrix::{build_rate_matrix, RateMatrix};
pub use transition::TransitionMatrix;
