//! Tunables for model construction and transition-matrix evaluation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqEvoError};

/// Largest elapsed time handed to the exponential. Longer branches are
/// evaluated at this bound instead.
pub const MAX_MARKOV_TIME: f64 = 1000.0;

/// Default number of transition matrices kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Configuration for a [`TransitionModel`](crate::TransitionModel).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Clamp bound for `compute_p`. Default: 1000.0
    pub max_time: f64,
    /// Allowed deviation of sum(pi) from 1. Default: 1e-6
    pub frequency_tolerance: f64,
    /// Largest imaginary part accepted as a real eigenvalue. Default: 1e-9
    pub imaginary_tolerance: f64,
    /// Pivot magnitude below which V counts as singular. Default: 1e-12
    pub singularity_tolerance: f64,
    /// Number of cached P(w) matrices. Default: 1000
    pub cache_capacity: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            max_time: MAX_MARKOV_TIME,
            frequency_tolerance: 1e-6,
            imaginary_tolerance: 1e-9,
            singularity_tolerance: 1e-12,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl TransitionConfig {
    pub fn with_max_time(mut self, max_time: f64) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_frequency_tolerance(mut self, tolerance: f64) -> Self {
        self.frequency_tolerance = tolerance;
        self
    }

    pub fn with_imaginary_tolerance(mut self, tolerance: f64) -> Self {
        self.imaginary_tolerance = tolerance;
        self
    }

    pub fn with_singularity_tolerance(mut self, tolerance: f64) -> Self {
        self.singularity_tolerance = tolerance;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_time", self.max_time),
            ("frequency_tolerance", self.frequency_tolerance),
            ("imaginary_tolerance", self.imaginary_tolerance),
            ("singularity_tolerance", self.singularity_tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SeqEvoError::invalid(format!(
                    "{} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        if self.cache_capacity == 0 {
            return Err(SeqEvoError::invalid("cache_capacity must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TransitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_time, MAX_MARKOV_TIME);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_cache = TransitionConfig::default().with_cache_capacity(0);
        assert!(matches!(zero_cache.validate(), Err(SeqEvoError::InvalidParameter(_))));

        let negative_tol = TransitionConfig::default().with_frequency_tolerance(-1.0);
        assert!(negative_tol.validate().is_err());

        let nan_time = TransitionConfig::default().with_max_time(f64::NAN);
        assert!(nan_time.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        // Missing fields fall back to their defaults
        let config: TransitionConfig =
            serde_json::from_str(r#"{"cache_capacity": 64, "max_time": 50.0}"#).unwrap();

        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.max_time, 50.0);
        assert_eq!(config.frequency_tolerance, 1e-6);
    }
}
