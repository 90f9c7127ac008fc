//! Small dense-matrix helpers used around the eigensystem
//!
//! Matrices here are at most a few dozen rows, so plain O(n^3) loops are fine.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Result, SeqEvoError};

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// A pivot smaller than `tolerance` times the largest absolute entry of `a`
/// is treated as singular.
pub fn invert(a: ArrayView2<f64>, tolerance: f64) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(SeqEvoError::invalid(format!(
            "cannot invert non-square {}x{} matrix",
            n,
            a.ncols()
        )));
    }

    let scale = a.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(SeqEvoError::Decomposition(format!(
            "matrix is singular (max |entry| = {})",
            scale
        )));
    }

    let mut work = a.to_owned();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        // Largest remaining entry in this column
        let pivot_row = (col..n)
            .max_by(|&x, &y| work[[x, col]].abs().total_cmp(&work[[y, col]].abs()))
            .unwrap_or(col);
        let pivot = work[[pivot_row, col]];
        if pivot.abs() <= tolerance * scale {
            return Err(SeqEvoError::Decomposition(format!(
                "eigenvector matrix is singular: pivot {:e} in column {}",
                pivot, col
            )));
        }

        if pivot_row != col {
            swap_rows(&mut work, pivot_row, col);
            swap_rows(&mut inv, pivot_row, col);
        }

        let inv_pivot = 1.0 / pivot;
        work.row_mut(col).mapv_inplace(|x| x * inv_pivot);
        inv.row_mut(col).mapv_inplace(|x| x * inv_pivot);

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                let (w, v) = (work[[col, k]], inv[[col, k]]);
                work[[row, k]] -= factor * w;
                inv[[row, k]] -= factor * v;
            }
        }
    }

    Ok(inv)
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    for k in 0..m.ncols() {
        m.swap([a, k], [b, k]);
    }
}

/// diag(d) * m, i.e. row i of `m` multiplied by d[i], without building
/// the diagonal matrix.
pub fn scale_rows(d: ArrayView1<f64>, m: ArrayView2<f64>) -> Array2<f64> {
    let mut out = m.to_owned();
    for (mut row, &s) in out.axis_iter_mut(Axis(0)).zip(d.iter()) {
        row.mapv_inplace(|x| x * s);
    }
    out
}

/// Largest absolute elementwise difference.
pub fn max_abs_diff(a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0_f64, |m, (&x, &y)| m.max((x - y).abs()))
}

/// Check an operand has `dim` rows before multiplying from the left.
pub(crate) fn check_rows(dim: usize, rows: usize, what: &str) -> Result<()> {
    if rows != dim {
        return Err(SeqEvoError::invalid(format!(
            "{} must have {} rows, got {}",
            what, dim, rows
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_invert_round_trip() {
        let a = arr2(&[[4.0, 7.0, 2.0], [3.0, 6.0, 1.0], [2.0, 5.0, 3.0]]);
        let inv = invert(a.view(), 1e-12).unwrap();
        let product = a.dot(&inv);

        assert!(max_abs_diff(product.view(), Array2::eye(3).view()) < 1e-12);
    }

    #[test]
    fn test_invert_needs_pivoting() {
        // Zero in the leading position
        let a = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
        let inv = invert(a.view(), 1e-12).unwrap();

        assert_abs_diff_eq!(inv[[0, 1]], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(inv[[1, 0]], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_invert_singular() {
        let a = arr2(&[[1.0, 2.0], [2.0, 4.0]]);
        let err = invert(a.view(), 1e-12).unwrap_err();
        assert!(matches!(err, SeqEvoError::Decomposition(_)));

        let zeros = Array2::<f64>::zeros((3, 3));
        assert!(invert(zeros.view(), 1e-12).is_err());
    }

    #[test]
    fn test_scale_rows() {
        let m = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let scaled = scale_rows(arr1(&[2.0, -1.0]).view(), m.view());
        assert_eq!(scaled, arr2(&[[2.0, 4.0], [-3.0, -4.0]]));
    }
}
