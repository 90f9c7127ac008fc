//! Rate generator construction from exchangeabilities and frequencies
//!
//! Q_ij = pi_j * R_ij for i != j, Q_ii = -sum_{j != i} Q_ij, then the whole
//! matrix is scaled so that one unit of branch length carries one expected
//! substitution: -sum_i pi_i * Q_ii = 1.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{Result, SeqEvoError};
use crate::exchangeability::Exchangeabilities;

/// Check stationary frequencies: right length, strictly positive and
/// summing to one within `tolerance`. Never renormalises.
pub fn validate_frequencies(pi: &[f64], dim: usize, tolerance: f64) -> Result<Array1<f64>> {
    if pi.len() != dim {
        return Err(SeqEvoError::invalid(format!(
            "pi must have length {}, got {}",
            dim,
            pi.len()
        )));
    }
    if let Some((i, &p)) = pi.iter().enumerate().find(|(_, p)| !p.is_finite() || **p <= 0.0) {
        return Err(SeqEvoError::invalid(format!(
            "pi[{}] must be finite and > 0, got {}",
            i, p
        )));
    }
    let total: f64 = pi.iter().sum();
    if (total - 1.0).abs() > tolerance {
        return Err(SeqEvoError::invalid(format!(
            "pi must sum to 1 (tolerance {:e}), got {}",
            tolerance, total
        )));
    }
    Ok(Array1::from_vec(pi.to_vec()))
}

/// Expected number of events per unit time: -sum_i pi_i * Q_ii
#[inline]
pub fn expected_rate(q: ArrayView2<f64>, pi: ArrayView1<f64>) -> f64 {
    -pi.iter()
        .enumerate()
        .map(|(i, &p)| p * q[[i, i]])
        .sum::<f64>()
}

/// A normalised generator together with the factor used to normalise it.
#[derive(Clone, Debug, PartialEq)]
pub struct RateMatrix {
    q: Array2<f64>,
    beta: f64,
}

impl RateMatrix {
    /// Scaled generator.
    #[inline]
    pub fn q(&self) -> &Array2<f64> {
        &self.q
    }

    /// Scale factor beta applied to the raw generator.
    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Generator before scaling (Q / beta).
    pub fn unscaled(&self) -> Array2<f64> {
        &self.q / self.beta
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.q.nrows()
    }
}

/// Build the scaled rate matrix for a reversible model.
///
/// `pi` is expected to have passed [`validate_frequencies`]; only its length
/// is re-checked here.
pub fn build_rate_matrix(r: &Exchangeabilities, pi: ArrayView1<f64>) -> Result<RateMatrix> {
    let n = r.dim();
    if pi.len() != n {
        return Err(SeqEvoError::invalid(format!(
            "pi must have length {}, got {}",
            n,
            pi.len()
        )));
    }

    let mut q = Array2::zeros((n, n));

    // Off-diagonals; the symmetric R entry feeds both halves
    for (i, j, rate) in r.pairs() {
        q[[i, j]] = pi[j] * rate;
        q[[j, i]] = pi[i] * rate;
    }

    // Q[i,i] = -sum(Q[i,j] for j != i)
    for i in 0..n {
        let row_sum: f64 = q.row(i).sum();
        q[[i, i]] = -row_sum;
    }

    let rate = expected_rate(q.view(), pi);
    if !(rate > 0.0) || !rate.is_finite() {
        return Err(SeqEvoError::invalid(format!(
            "expected substitution rate must be positive, got {} (all exchangeabilities zero?)",
            rate
        )));
    }
    let beta = 1.0 / rate;
    q.mapv_inplace(|x| x * beta);

    Ok(RateMatrix { q, beta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn gtr_example() -> (Exchangeabilities, Array1<f64>) {
        let r = Exchangeabilities::new(4, vec![1.2, 3.5, 0.8, 1.1, 4.2, 0.6]).unwrap();
        let pi = validate_frequencies(&[0.1, 0.2, 0.3, 0.4], 4, 1e-6).unwrap();
        (r, pi)
    }

    #[test]
    fn test_two_state_example() {
        let r = Exchangeabilities::new(2, vec![1.0]).unwrap();
        let pi = validate_frequencies(&[0.5, 0.5], 2, 1e-6).unwrap();
        let rate = build_rate_matrix(&r, pi.view()).unwrap();

        assert_abs_diff_eq!(rate.beta(), 2.0, epsilon = 1e-12);
        let unscaled = rate.unscaled();
        let expected_unscaled = arr2(&[[-0.5, 0.5], [0.5, -0.5]]);
        let expected_q = arr2(&[[-1.0, 1.0], [1.0, -1.0]]);
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(unscaled[[i, j]], expected_unscaled[[i, j]], epsilon = 1e-12);
                assert_abs_diff_eq!(rate.q()[[i, j]], expected_q[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_q_matrix_row_sums_zero() {
        let (r, pi) = gtr_example();
        let rate = build_rate_matrix(&r, pi.view()).unwrap();

        for i in 0..4 {
            let row_sum: f64 = rate.q().row(i).sum();
            assert_abs_diff_eq!(row_sum, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_q_matrix_normalization() {
        let (r, pi) = gtr_example();
        let rate = build_rate_matrix(&r, pi.view()).unwrap();

        assert_abs_diff_eq!(expected_rate(rate.q().view(), pi.view()), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_q_matrix_detailed_balance() {
        // pi[i] * Q[i,j] = pi[j] * Q[j,i]
        let (r, pi) = gtr_example();
        let q = build_rate_matrix(&r, pi.view()).unwrap().q().clone();

        for i in 0..4 {
            for j in 0..4 {
                if i != j {
                    assert_abs_diff_eq!(pi[i] * q[[i, j]], pi[j] * q[[j, i]], epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_frequency_validation() {
        // Sums to 0.8; must not be renormalised
        let err = validate_frequencies(&[0.4, 0.4], 2, 1e-6).unwrap_err();
        assert!(matches!(err, SeqEvoError::InvalidParameter(_)));

        assert!(validate_frequencies(&[0.5, 0.5, 0.0], 3, 1e-6).is_err());
        assert!(validate_frequencies(&[1.2, -0.2], 2, 1e-6).is_err());
        assert!(validate_frequencies(&[0.5, 0.5], 3, 1e-6).is_err());
        // Inside the tolerance
        assert!(validate_frequencies(&[0.5, 0.5 + 1e-8], 2, 1e-6).is_ok());
    }

    #[test]
    fn test_zero_rates_rejected() {
        let r = Exchangeabilities::new(3, vec![0.0; 3]).unwrap();
        let pi = Array1::from_elem(3, 1.0 / 3.0);
        assert!(build_rate_matrix(&r, pi.view()).is_err());
    }
}
