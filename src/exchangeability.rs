//! Compact storage of the symmetric exchangeability matrix R
//!
//! Only the strict upper triangle is stored, row-major:
//! (0,1), (0,2), ..., (0,n-1), (1,2), ..., (n-2,n-1).

use std::fmt;

use ndarray::{Array1, ArrayView1};

use crate::error::{Result, SeqEvoError};

/// Number of free exchangeabilities for `dim` states.
#[inline]
pub fn triangle_len(dim: usize) -> usize {
    dim * dim.saturating_sub(1) / 2
}

/// Symmetric exchangeability parameters for a reversible model.
#[derive(Clone, Debug, PartialEq)]
pub struct Exchangeabilities {
    dim: usize,
    values: Array1<f64>,
}

impl Exchangeabilities {
    /// Wrap an upper-triangle vector, checking its length and signs.
    pub fn new(dim: usize, values: Vec<f64>) -> Result<Self> {
        if dim < 2 {
            return Err(SeqEvoError::invalid(format!(
                "alphabet size must be at least 2, got {}",
                dim
            )));
        }
        let expected = triangle_len(dim);
        if values.len() != expected {
            return Err(SeqEvoError::invalid(format!(
                "R must have length {} for {} states, got {}",
                expected,
                dim,
                values.len()
            )));
        }
        if let Some((k, &r)) = values
            .iter()
            .enumerate()
            .find(|(_, r)| !r.is_finite() || **r < 0.0)
        {
            return Err(SeqEvoError::invalid(format!(
                "R[{}] must be finite and >= 0, got {}",
                k, r
            )));
        }

        Ok(Self {
            dim,
            values: Array1::from_vec(values),
        })
    }

    /// All exchangeabilities equal to one (JC69-style).
    pub fn uniform(dim: usize) -> Result<Self> {
        Self::new(dim, vec![1.0; triangle_len(dim)])
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat position of the pair {i, j}. Order of i and j does not matter;
    /// diagonal or out-of-range pairs have no slot.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> Option<usize> {
        if i == j || i >= self.dim || j >= self.dim {
            return None;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        // Rows before `lo` hold (dim-1) + (dim-2) + ... + (dim-lo) entries
        Some(lo * self.dim - lo * (lo + 1) / 2 + (hi - lo - 1))
    }

    /// R_ij (== R_ji).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.index(i, j).map(|k| self.values[k])
    }

    /// Iterate over (i, j, R_ij) with i < j in storage order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let dim = self.dim;
        (0..dim)
            .flat_map(move |i| (i + 1..dim).map(move |j| (i, j)))
            .zip(self.values.iter())
            .map(|((i, j), &r)| (i, j, r))
    }

    pub fn as_array(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }
}

/// Upper-triangle table, one row per state, tab separated.
impl fmt::Display for Exchangeabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Alphabet size: {}", self.dim)?;
        for i in 0..self.dim - 1 {
            for j in 0..self.dim {
                f.write_str("\t")?;
                match self.get(i, j) {
                    Some(r) if j > i => write!(f, "{}", r)?,
                    _ => {}
                }
            }
            if i + 2 < self.dim {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_row_major_order() {
        let r = Exchangeabilities::new(4, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        let order: Vec<(usize, usize)> = r.pairs().map(|(i, j, _)| (i, j)).collect();
        assert_eq!(order, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);

        for (k, (i, j, value)) in r.pairs().enumerate() {
            assert_eq!(r.index(i, j), Some(k));
            assert_eq!(r.get(i, j), Some(value));
        }
    }

    #[test]
    fn test_index_is_symmetric() {
        let r = Exchangeabilities::uniform(20).unwrap();
        assert_eq!(r.len(), 190);

        for i in 0..20 {
            assert_eq!(r.index(i, i), None);
            for j in 0..20 {
                assert_eq!(r.index(i, j), r.index(j, i));
            }
        }
        assert_eq!(r.index(18, 19), Some(189));
        assert_eq!(r.index(0, 20), None);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Exchangeabilities::new(4, vec![1.0; 5]).is_err());
        assert!(Exchangeabilities::new(1, vec![]).is_err());
        assert!(Exchangeabilities::new(3, vec![1.0, -0.5, 1.0]).is_err());
        assert!(Exchangeabilities::new(3, vec![1.0, f64::NAN, 1.0]).is_err());
        // Zero rates are allowed
        assert!(Exchangeabilities::new(3, vec![1.0, 0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_display_table() {
        let r = Exchangeabilities::new(3, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(r.to_string(), "Alphabet size: 3\n\t\t1\t2\n\t\t\t3");
    }
}
