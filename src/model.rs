//! Substitution model handle: parameters, generator, eigensystem and the
//! transition-matrix cache, kept consistent with each other.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use ndarray::prelude::*;
use rayon::prelude::*;

use crate::alphabet::SequenceType;
use crate::cache::{BoundedTransitionCache, CacheStats};
use crate::config::TransitionConfig;
use crate::eigen::{EigenSolver, EigenSystem, SymmetricEigenSolver};
use crate::error::{Result, SeqEvoError};
use crate::exchangeability::Exchangeabilities;
use crate::linalg;
use crate::qmatrix::{build_rate_matrix, validate_frequencies, RateMatrix};
use crate::transition::{effective_time, TransitionMatrix};

/// A time-reversible substitution model with cached P(w) evaluation.
///
/// Single-owner: methods that may touch the cache take `&mut self`. To
/// evaluate from several threads, either wrap the model in a lock or clone
/// [`eigensystem`](Self::eigensystem) and call
/// [`TransitionMatrix::from_eigensystem`] directly.
pub struct TransitionModel {
    name: String,
    sequence_type: SequenceType,
    config: TransitionConfig,
    exchangeabilities: Exchangeabilities,
    stationary: Array1<f64>,
    rate: RateMatrix,
    eigen: Arc<EigenSystem>,
    solver: Box<dyn EigenSolver>,
    cache: BoundedTransitionCache<TransitionMatrix>,
}

impl TransitionModel {
    /// Build a model from the upper-triangle exchangeabilities `r` and the
    /// stationary frequencies `pi`, using the default reversible solver.
    pub fn new(
        name: impl Into<String>,
        sequence_type: SequenceType,
        r: Vec<f64>,
        pi: Vec<f64>,
        config: TransitionConfig,
    ) -> Result<Self> {
        Self::with_solver(name, sequence_type, r, pi, config, Box::new(SymmetricEigenSolver))
    }

    /// Like [`new`](Self::new) with an explicit eigensolver.
    pub fn with_solver(
        name: impl Into<String>,
        sequence_type: SequenceType,
        r: Vec<f64>,
        pi: Vec<f64>,
        config: TransitionConfig,
        solver: Box<dyn EigenSolver>,
    ) -> Result<Self> {
        config.validate()?;
        let name = name.into();
        let dim = sequence_type.alphabet_size();

        let exchangeabilities = Exchangeabilities::new(dim, r)?;
        let stationary = validate_frequencies(&pi, dim, config.frequency_tolerance)?;
        let (rate, eigen) = decompose(&exchangeabilities, &stationary, solver.as_ref(), &config)?;

        info!(
            "created substitution model {} ({}, {} states, cache capacity {})",
            name, sequence_type, dim, config.cache_capacity
        );

        Ok(Self {
            name,
            sequence_type,
            cache: BoundedTransitionCache::new(config.cache_capacity),
            config,
            exchangeabilities,
            stationary,
            rate,
            eigen: Arc::new(eigen),
            solver,
        })
    }

    /// Jukes-Cantor: DNA, equal exchangeabilities and frequencies.
    pub fn jc69(config: TransitionConfig) -> Result<Self> {
        let dim = SequenceType::Dna.alphabet_size();
        let r = Exchangeabilities::uniform(dim)?.to_vec();
        Self::new("JC69", SequenceType::Dna, r, vec![1.0 / dim as f64; dim], config)
    }

    /// Poisson-like amino-acid model: equal exchangeabilities and frequencies.
    pub fn uniform_aa(config: TransitionConfig) -> Result<Self> {
        let dim = SequenceType::AminoAcid.alphabet_size();
        let r = Exchangeabilities::uniform(dim)?.to_vec();
        Self::new("UniformAA", SequenceType::AminoAcid, r, vec![1.0 / dim as f64; dim], config)
    }

    /// Recompute Q and the eigensystem from the current parameters and
    /// clear the cache. On failure the model is left unchanged.
    pub fn update(&mut self) -> Result<()> {
        let (rate, eigen) = decompose(
            &self.exchangeabilities,
            &self.stationary,
            self.solver.as_ref(),
            &self.config,
        )?;
        self.rate = rate;
        self.eigen = Arc::new(eigen);
        self.cache.invalidate_all();
        Ok(())
    }

    /// Replace R and pi, then [`update`](Self::update). Invalid input leaves
    /// the previous parameters, eigensystem and cache in place.
    pub fn set_parameters(&mut self, r: Vec<f64>, pi: Vec<f64>) -> Result<()> {
        let dim = self.alphabet_size();
        let exchangeabilities = Exchangeabilities::new(dim, r)?;
        let stationary = validate_frequencies(&pi, dim, self.config.frequency_tolerance)?;
        self.replace_parameters(exchangeabilities, stationary)
    }

    /// Replace only the exchangeabilities.
    pub fn set_exchangeabilities(&mut self, r: Vec<f64>) -> Result<()> {
        let exchangeabilities = Exchangeabilities::new(self.alphabet_size(), r)?;
        let stationary = self.stationary.clone();
        self.replace_parameters(exchangeabilities, stationary)
    }

    /// Replace only the stationary frequencies.
    pub fn set_stationary(&mut self, pi: Vec<f64>) -> Result<()> {
        let stationary =
            validate_frequencies(&pi, self.alphabet_size(), self.config.frequency_tolerance)?;
        let exchangeabilities = self.exchangeabilities.clone();
        self.replace_parameters(exchangeabilities, stationary)
    }

    /// Swap the eigensolver and rebuild.
    pub fn set_solver(&mut self, solver: Box<dyn EigenSolver>) -> Result<()> {
        let (rate, eigen) = decompose(
            &self.exchangeabilities,
            &self.stationary,
            solver.as_ref(),
            &self.config,
        )?;
        self.solver = solver;
        self.rate = rate;
        self.eigen = Arc::new(eigen);
        self.cache.invalidate_all();
        Ok(())
    }

    fn replace_parameters(
        &mut self,
        exchangeabilities: Exchangeabilities,
        stationary: Array1<f64>,
    ) -> Result<()> {
        let (rate, eigen) =
            decompose(&exchangeabilities, &stationary, self.solver.as_ref(), &self.config)?;
        self.exchangeabilities = exchangeabilities;
        self.stationary = stationary;
        self.rate = rate;
        self.eigen = Arc::new(eigen);
        self.cache.invalidate_all();
        Ok(())
    }

    /// P(w) = exp(Qw), served from the cache when `w` was seen before.
    ///
    /// `w` above `config.max_time` is evaluated at `max_time`; negative,
    /// NaN or infinite `w` is rejected.
    pub fn compute_p(&mut self, w: f64) -> Result<Arc<TransitionMatrix>> {
        let t = effective_time(w, self.config.max_time)?;
        if let Some(p) = self.cache.get(t) {
            return Ok(p);
        }
        let p = TransitionMatrix::from_eigensystem(&self.eigen, t);
        Ok(self.cache.put(t, p))
    }

    /// P(w) for a batch of times, e.g. every branch of a tree.
    ///
    /// Cache misses are evaluated in parallel; repeated times in the batch
    /// are computed once. The result is in input order.
    pub fn compute_many(&mut self, ws: &[f64]) -> Result<Vec<Arc<TransitionMatrix>>> {
        let max_time = self.config.max_time;
        let times = ws
            .iter()
            .map(|&w| effective_time(w, max_time))
            .collect::<Result<Vec<f64>>>()?;

        // Look up hits first so fresh insertions cannot evict them
        let hits: Vec<Option<Arc<TransitionMatrix>>> = times.iter().map(|&t| self.cache.get(t)).collect();

        let mut missing: Vec<f64> = times
            .iter()
            .zip(&hits)
            .filter(|(_, hit)| hit.is_none())
            .map(|(&t, _)| t)
            .collect();
        missing.sort_by(f64::total_cmp);
        missing.dedup();

        let eigen = &*self.eigen;
        let computed: Vec<(f64, Arc<TransitionMatrix>)> = missing
            .par_iter()
            .map(|&t| (t, Arc::new(TransitionMatrix::from_eigensystem(eigen, t))))
            .collect();

        let fresh: HashMap<u64, Arc<TransitionMatrix>> = computed
            .iter()
            .map(|(t, p)| (t.to_bits(), Arc::clone(p)))
            .collect();
        for (t, p) in computed {
            self.cache.put_shared(t, p);
        }

        hits.into_iter()
            .zip(&times)
            .map(|(hit, t)| match hit {
                Some(p) => Ok(p),
                None => fresh.get(&t.to_bits()).cloned().ok_or_else(|| {
                    SeqEvoError::Decomposition(format!("no transition matrix evaluated for t = {}", t))
                }),
            })
            .collect()
    }

    /// Y = diag(pi) X: row i of `x` weighted by pi_i. Independent of P.
    pub fn weight_by_stationary(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        linalg::check_rows(self.alphabet_size(), x.nrows(), "operand")?;
        Ok(linalg::scale_rows(self.stationary.view(), x))
    }

    /// y_i = pi_i x_i.
    pub fn weight_vector_by_stationary(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        linalg::check_rows(self.alphabet_size(), x.len(), "operand")?;
        Ok(&self.stationary * &x)
    }

    /// Whether data of `sequence_type` can be evaluated under this model.
    #[inline]
    pub fn is_compatible(&self, sequence_type: SequenceType) -> bool {
        self.sequence_type == sequence_type
    }

    /// Whether an alphabet of `n` states matches this model's state space.
    #[inline]
    pub fn is_compatible_size(&self, n: usize) -> bool {
        self.alphabet_size() == n
    }

    /// Drop all cached matrices without touching the model.
    pub fn clear_cache(&mut self) {
        self.cache.invalidate_all();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.exchangeabilities.dim()
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn exchangeabilities(&self) -> &Exchangeabilities {
        &self.exchangeabilities
    }

    pub fn stationary(&self) -> &Array1<f64> {
        &self.stationary
    }

    /// Scaled generator Q.
    pub fn rate_matrix(&self) -> &Array2<f64> {
        self.rate.q()
    }

    /// Normalisation factor beta applied to the raw generator.
    pub fn scale_factor(&self) -> f64 {
        self.rate.beta()
    }

    /// Shared handle to the current eigensystem.
    pub fn eigensystem(&self) -> &Arc<EigenSystem> {
        &self.eigen
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_times(&self) -> Vec<f64> {
        self.cache.times_by_recency()
    }
}

fn decompose(
    r: &Exchangeabilities,
    pi: &Array1<f64>,
    solver: &dyn EigenSolver,
    config: &TransitionConfig,
) -> Result<(RateMatrix, EigenSystem)> {
    let rate = build_rate_matrix(r, pi.view())?;
    let eigen = EigenSystem::new(
        rate.q().view(),
        pi.view(),
        solver,
        config.imaginary_tolerance,
        config.singularity_tolerance,
    )?;
    debug!("rebuilt rate matrix: {} states, beta = {:.6}", rate.dim(), rate.beta());
    Ok((rate, eigen))
}

/// Diagnostic dump of R, pi, E, V and V^{-1}. Not meant to be parsed.
impl fmt::Display for TransitionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Markov transition rate matrix of model {} ({}, {} states)",
            self.name,
            self.sequence_type,
            self.alphabet_size()
        )?;
        writeln!(f, "Symmetric exchangeability matrix R (upper triangle):")?;
        writeln!(f, "{}", self.exchangeabilities)?;
        writeln!(f, "Stationary frequencies Pi:")?;
        writeln!(f, "{:.6}", self.stationary)?;
        writeln!(f, "Eigenvalues of Q, E:")?;
        writeln!(f, "{:.6}", self.eigen.eigenvalues())?;
        writeln!(f, "Right eigenvectors of Q, V:")?;
        writeln!(f, "{:.6}", self.eigen.eigenvectors())?;
        writeln!(f, "Inverse of V:")?;
        writeln!(f, "{:.6}", self.eigen.eigenvectors_inv())
    }
}

impl fmt::Debug for TransitionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionModel")
            .field("name", &self.name)
            .field("sequence_type", &self.sequence_type)
            .field("solver", &self.solver.name())
            .field("cache", &self.cache)
            .finish()
    }
}
