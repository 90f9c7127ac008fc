//! Python bindings
//!
//! Exposes `TransitionModel` to Python with NumPy arrays in and out. Errors
//! surface as `ValueError`.

use numpy::{PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::alphabet::SequenceType;
use crate::config::TransitionConfig;
use crate::model::TransitionModel;

fn parse_sequence_type(name: &str, dim: Option<usize>) -> PyResult<SequenceType> {
    match name.to_ascii_lowercase().as_str() {
        "binary" => Ok(SequenceType::Binary),
        "dna" | "nucleotide" => Ok(SequenceType::Dna),
        "aa" | "protein" | "aminoacid" => Ok(SequenceType::AminoAcid),
        "codon" => Ok(SequenceType::Codon),
        "custom" => dim
            .map(SequenceType::Custom)
            .ok_or_else(|| PyValueError::new_err("custom alphabets need dim")),
        other => Err(PyValueError::new_err(format!("unknown sequence type '{}'", other))),
    }
}

/// Cached transition-probability evaluator for a reversible model
///
/// Args:
///     name: Model name (diagnostics only)
///     sequence_type: "binary", "dna", "aa", "codon" or "custom"
///     r: Upper-triangle exchangeabilities, row-major, length dim*(dim-1)/2
///     pi: Stationary frequencies (length dim, summing to 1)
///     cache_size: Number of P(t) matrices to keep
///     dim: Alphabet size, only for sequence_type="custom"
#[pyclass(name = "TransitionModel")]
pub struct PyTransitionModel {
    inner: TransitionModel,
}

#[pymethods]
impl PyTransitionModel {
    #[new]
    #[pyo3(signature = (name, sequence_type, r, pi, cache_size=1000, dim=None))]
    fn new(
        name: String,
        sequence_type: &str,
        r: PyReadonlyArray1<f64>,
        pi: PyReadonlyArray1<f64>,
        cache_size: usize,
        dim: Option<usize>,
    ) -> PyResult<Self> {
        let seq_type = parse_sequence_type(sequence_type, dim)?;
        let config = TransitionConfig::default().with_cache_capacity(cache_size);
        let inner = TransitionModel::new(
            name,
            seq_type,
            r.as_array().to_vec(),
            pi.as_array().to_vec(),
            config,
        )?;
        Ok(Self { inner })
    }

    /// Transition probability matrix P(t) = exp(Qt)
    fn compute_p<'py>(&mut self, py: Python<'py>, t: f64) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let p = self.inner.compute_p(t)?;
        Ok(PyArray2::from_array_bound(py, p.matrix()))
    }

    /// P(t) @ x for x of shape (dim, k)
    fn apply_to<'py>(
        &mut self,
        py: Python<'py>,
        t: f64,
        x: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let p = self.inner.compute_p(t)?;
        let y = p.apply_to(x.as_array())?;
        Ok(PyArray2::from_owned_array_bound(py, y))
    }

    /// Column j of P(t)
    fn column<'py>(&mut self, py: Python<'py>, t: f64, j: usize) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let p = self.inner.compute_p(t)?;
        Ok(PyArray1::from_owned_array_bound(py, p.column(j)?))
    }

    /// diag(pi) @ x
    fn weight_by_stationary<'py>(
        &self,
        py: Python<'py>,
        x: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let y = self.inner.weight_by_stationary(x.as_array())?;
        Ok(PyArray2::from_owned_array_bound(py, y))
    }

    /// Replace R and pi and rebuild the eigensystem
    fn update(&mut self, r: PyReadonlyArray1<f64>, pi: PyReadonlyArray1<f64>) -> PyResult<()> {
        self.inner
            .set_parameters(r.as_array().to_vec(), pi.as_array().to_vec())?;
        Ok(())
    }

    fn is_compatible(&self, sequence_type: &str) -> PyResult<bool> {
        let seq_type = parse_sequence_type(sequence_type, Some(self.inner.alphabet_size()))?;
        Ok(self.inner.is_compatible(seq_type))
    }

    /// Scaled rate matrix Q
    fn rate_matrix<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        PyArray2::from_array_bound(py, self.inner.rate_matrix())
    }

    #[getter]
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[getter]
    fn alphabet_size(&self) -> usize {
        self.inner.alphabet_size()
    }

    fn __repr__(&self) -> String {
        self.inner.to_string()
    }
}

/// seqevo Python module
#[pymodule]
fn seqevo(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTransitionModel>()?;
    Ok(())
}
