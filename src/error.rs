//! Error type shared by every component of the evaluator.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SeqEvoError>;

/// Failures raised while building or evaluating a substitution model.
///
/// None of these are transient: the computation is deterministic, so a
/// failed call fails the same way every time it is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeqEvoError {
    /// Malformed exchangeabilities, frequencies, configuration or operands.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The eigensolver produced complex eigenvalues; only reversible
    /// generators (real spectrum) are supported.
    #[error("Reversibility assumption violated: {0}")]
    AssumptionViolated(String),

    /// The eigenvector matrix could not be inverted.
    #[error("Eigendecomposition failed: {0}")]
    Decomposition(String),
}

impl SeqEvoError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SeqEvoError::InvalidParameter(msg.into())
    }
}

#[cfg(feature = "python")]
impl From<SeqEvoError> for pyo3::PyErr {
    fn from(err: SeqEvoError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
