//! Eigendecomposition of the rate matrix for fast matrix exponentials
//!
//! The numerical solve is delegated to an [`EigenSolver`]. This module
//! checks what comes back (real spectrum, invertible eigenvectors) and
//! keeps V, E and V^{-1} so that each exp(Qt) costs only two O(n^2) passes
//! and one matrix product instead of a fresh decomposition.

use log::debug;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::prelude::*;
use num_complex::Complex64;

use crate::error::{Result, SeqEvoError};
use crate::linalg;

/// Unchecked output of an eigensolver.
#[derive(Clone, Debug)]
pub struct RawEigen {
    /// Eigenvalues; may carry imaginary parts for non-reversible input.
    pub values: Array1<Complex64>,
    /// Right eigenvectors, one per column, in the same order as `values`.
    pub vectors: Array2<f64>,
}

/// External eigendecomposition primitive.
///
/// `pi` is passed along so solvers may exploit reversibility; general
/// solvers are free to ignore it.
pub trait EigenSolver: Send + Sync {
    fn decompose(&self, q: ArrayView2<f64>, pi: ArrayView1<f64>) -> Result<RawEigen>;

    fn name(&self) -> &'static str;
}

/// Pure-Rust solver for reversible generators.
///
/// For reversible Q with stationary frequencies pi:
/// 1. Symmetrize: S = Pi^{1/2} Q Pi^{-1/2}
/// 2. Eigendecompose the symmetric S = U D U^T
/// 3. Transform back: V = Pi^{-1/2} U, so Q = V D V^{-1}
#[derive(Clone, Copy, Debug, Default)]
pub struct SymmetricEigenSolver;

impl EigenSolver for SymmetricEigenSolver {
    fn decompose(&self, q: ArrayView2<f64>, pi: ArrayView1<f64>) -> Result<RawEigen> {
        let n = q.nrows();
        if pi.len() != n {
            return Err(SeqEvoError::invalid(format!(
                "pi must have length {}, got {}",
                n,
                pi.len()
            )));
        }

        let sqrt_pi = pi.mapv(f64::sqrt);
        let inv_sqrt_pi = pi.mapv(|x| 1.0 / x.sqrt());

        let s = DMatrix::from_fn(n, n, |i, j| sqrt_pi[i] * q[[i, j]] * inv_sqrt_pi[j]);
        // Remove rounding asymmetry before the symmetric solve
        let s = (&s + s.transpose()) * 0.5;

        let eig = SymmetricEigen::try_new(s, f64::EPSILON, 0).ok_or_else(|| {
            SeqEvoError::Decomposition("symmetric eigensolver did not converge".into())
        })?;

        let values = eig
            .eigenvalues
            .iter()
            .map(|&lambda| Complex64::new(lambda, 0.0))
            .collect();
        let vectors = Array2::from_shape_fn((n, n), |(i, j)| inv_sqrt_pi[i] * eig.eigenvectors[(i, j)]);

        Ok(RawEigen { values, vectors })
    }

    fn name(&self) -> &'static str {
        "symmetric"
    }
}

/// General (non-symmetric) solver backed by LAPACK `dgeev`.
#[cfg(feature = "lapack")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LapackEigenSolver;

#[cfg(feature = "lapack")]
impl EigenSolver for LapackEigenSolver {
    fn decompose(&self, q: ArrayView2<f64>, _pi: ArrayView1<f64>) -> Result<RawEigen> {
        use ndarray_linalg::Eig;

        let (values, vectors) = q
            .to_owned()
            .eig()
            .map_err(|e| SeqEvoError::Decomposition(format!("LAPACK eig failed: {:?}", e)))?;

        // Real eigenvalues come with real eigenvectors; complex ones are
        // rejected by EigenSystem before the vectors are used.
        Ok(RawEigen {
            values,
            vectors: vectors.mapv(|z| z.re),
        })
    }

    fn name(&self) -> &'static str {
        "lapack"
    }
}

/// Checked eigensystem Q = V diag(E) V^{-1}.
#[derive(Clone, Debug)]
pub struct EigenSystem {
    /// Eigenvalues (E)
    eigenvalues: Array1<f64>,
    /// Eigenvectors (V): columns are eigenvectors
    eigenvectors: Array2<f64>,
    /// Precomputed V^{-1}
    eigenvectors_inv: Array2<f64>,
}

impl EigenSystem {
    /// Decompose `q` with `solver` and validate the result.
    ///
    /// Fails with `AssumptionViolated` if any eigenvalue has an imaginary
    /// part above `imaginary_tolerance` (relative to max(1, |lambda|)), and
    /// with `Decomposition` if V cannot be inverted.
    pub fn new(
        q: ArrayView2<f64>,
        pi: ArrayView1<f64>,
        solver: &dyn EigenSolver,
        imaginary_tolerance: f64,
        singularity_tolerance: f64,
    ) -> Result<Self> {
        let n = q.nrows();
        if q.ncols() != n {
            return Err(SeqEvoError::invalid(format!(
                "Q matrix must be square, got {}x{}",
                n,
                q.ncols()
            )));
        }

        let raw = solver.decompose(q, pi)?;
        if raw.values.len() != n || raw.vectors.dim() != (n, n) {
            return Err(SeqEvoError::Decomposition(format!(
                "{} solver returned {} eigenvalues and a {:?} eigenvector matrix for n = {}",
                solver.name(),
                raw.values.len(),
                raw.vectors.dim(),
                n
            )));
        }

        if let Some((k, lambda)) = raw
            .values
            .iter()
            .enumerate()
            .find(|(_, z)| z.im.abs() > imaginary_tolerance * z.re.abs().max(1.0))
        {
            return Err(SeqEvoError::AssumptionViolated(format!(
                "eigenvalue {} is complex ({} {:+}i); only reversible generators are supported",
                k, lambda.re, lambda.im
            )));
        }
        if raw.vectors.iter().any(|x| !x.is_finite()) {
            return Err(SeqEvoError::Decomposition("eigenvectors contain non-finite values".into()));
        }

        let eigenvalues = raw.values.mapv(|z| z.re);
        let eigenvectors_inv = linalg::invert(raw.vectors.view(), singularity_tolerance)?;

        debug!(
            "eigensystem ({} solver, n = {}): eigenvalues in [{:.6}, {:.6}]",
            solver.name(),
            n,
            eigenvalues.iter().copied().fold(f64::INFINITY, f64::min),
            eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        );

        Ok(Self {
            eigenvalues,
            eigenvectors: raw.vectors,
            eigenvectors_inv,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.eigenvalues.len()
    }

    #[inline]
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    #[inline]
    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.eigenvectors
    }

    #[inline]
    pub fn eigenvectors_inv(&self) -> &Array2<f64> {
        &self.eigenvectors_inv
    }

    /// Compute exp(Q * t) = V diag(exp(E t)) V^{-1}.
    ///
    /// Each row of V^{-1} is scaled by its exponentiated eigenvalue and the
    /// result multiplied by V; the diagonal matrix is never built. No
    /// clamping or validation happens here.
    #[inline]
    pub fn expm(&self, t: f64) -> Array2<f64> {
        let exp_lambda_t = self.eigenvalues.mapv(|lambda| (lambda * t).exp());
        let scaled = linalg::scale_rows(exp_lambda_t.view(), self.eigenvectors_inv.view());
        self.eigenvectors.dot(&scaled)
    }

    /// V diag(E) V^{-1}; equals Q up to rounding.
    pub fn reconstruct(&self) -> Array2<f64> {
        let scaled = linalg::scale_rows(self.eigenvalues.view(), self.eigenvectors_inv.view());
        self.eigenvectors.dot(&scaled)
    }
}
