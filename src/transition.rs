//! Transition probability matrices P(w) = exp(Qw) and the operations
//! likelihood code runs against them.

use std::fmt;

use log::trace;
use ndarray::prelude::*;

use crate::eigen::EigenSystem;
use crate::error::{Result, SeqEvoError};
use crate::linalg;

/// Validate an elapsed time and clamp it to `max_time`.
///
/// Times above the bound are evaluated at the bound (very long branches are
/// indistinguishable from stationarity anyway); this is not an error.
pub fn effective_time(w: f64, max_time: f64) -> Result<f64> {
    if w.is_nan() || w < 0.0 || w == f64::INFINITY {
        return Err(SeqEvoError::invalid(format!(
            "time must be finite and >= 0, got {}",
            w
        )));
    }
    if w > max_time {
        trace!("clamping time {} to {}", w, max_time);
        return Ok(max_time);
    }
    // Fold -0.0 into 0.0
    Ok(w + 0.0)
}

/// Row-stochastic matrix of state-to-state probabilities over one time span.
///
/// Rows index the start state, columns the end state.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrix {
    time: f64,
    p: Array2<f64>,
}

impl TransitionMatrix {
    /// Evaluate exp(Q * time) from a decomposed generator. `time` is used
    /// as given; see [`effective_time`] for validation and clamping.
    pub fn from_eigensystem(eigen: &EigenSystem, time: f64) -> Self {
        Self {
            time,
            p: eigen.expm(time),
        }
    }

    /// P(0).
    pub fn identity(dim: usize) -> Self {
        Self {
            time: 0.0,
            p: Array2::eye(dim),
        }
    }

    /// Effective (possibly clamped) time this matrix was evaluated at.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.p.nrows()
    }

    #[inline]
    pub fn matrix(&self) -> &Array2<f64> {
        &self.p
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.p
    }

    /// Probability of moving from state `from` to state `to`.
    #[inline]
    pub fn probability(&self, from: usize, to: usize) -> Option<f64> {
        self.p.get((from, to)).copied()
    }

    /// Y = P X for a dim x k operand (k conditional-likelihood columns).
    pub fn apply_to(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        linalg::check_rows(self.dim(), x.nrows(), "operand")?;
        Ok(self.p.dot(&x))
    }

    /// y = P x for a single vector.
    pub fn apply_to_vector(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        linalg::check_rows(self.dim(), x.len(), "operand")?;
        Ok(self.p.dot(&x))
    }

    /// Owned copy of column `j`: the probabilities of ending in state `j`
    /// from every start state.
    pub fn column(&self, j: usize) -> Result<Array1<f64>> {
        if j >= self.dim() {
            return Err(SeqEvoError::invalid(format!(
                "column {} out of range for {} states",
                j,
                self.dim()
            )));
        }
        Ok(self.p.column(j).to_owned())
    }

    /// P(s) P(t), which equals P(s + t) for matrices of the same model.
    pub fn compose(&self, other: &TransitionMatrix) -> Result<TransitionMatrix> {
        linalg::check_rows(self.dim(), other.dim(), "composed matrix")?;
        Ok(TransitionMatrix {
            time: self.time + other.time,
            p: self.p.dot(&other.p),
        })
    }

    /// Largest |row sum - 1|; stays near zero for a sound decomposition.
    pub fn max_row_sum_error(&self) -> f64 {
        self.p
            .rows()
            .into_iter()
            .map(|row| (row.sum() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for TransitionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "P({}):", self.time)?;
        write!(f, "{:.6}", self.p)
    }
}
