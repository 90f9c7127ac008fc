//! Cache behaviour observed through the model API.

use std::sync::Arc;

use seqevo::{SequenceType, TransitionConfig, TransitionModel};

fn small_cache_model(capacity: usize) -> TransitionModel {
    TransitionModel::new(
        "GTR",
        SequenceType::Dna,
        vec![0.9, 2.7, 0.4, 1.3, 3.1, 1.0],
        vec![0.3, 0.2, 0.2, 0.3],
        TransitionConfig::default().with_cache_capacity(capacity),
    )
    .unwrap()
}

#[test]
fn test_repeated_time_is_bit_identical() {
    let mut model = small_cache_model(16);
    let first = model.compute_p(0.137).unwrap();
    let eigen_before = Arc::clone(model.eigensystem());
    let second = model.compute_p(0.137).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.matrix(), second.matrix());
    // No eigen recomputation happened in between
    assert!(Arc::ptr_eq(&eigen_before, model.eigensystem()));
    assert_eq!(model.cache_stats().hits, 1);
}

#[test]
fn test_cache_stays_bounded() {
    let mut model = small_cache_model(5);
    for i in 0..100 {
        model.compute_p(0.01 * i as f64).unwrap();
        assert!(model.cache_len() <= 5);
    }
    assert_eq!(model.cache_len(), 5);
    assert_eq!(model.cache_stats().evictions, 95);
}

#[test]
fn test_least_recently_used_is_evicted() {
    let mut model = small_cache_model(3);
    let a = model.compute_p(0.1).unwrap();
    model.compute_p(0.2).unwrap();
    model.compute_p(0.3).unwrap();

    // Re-use 0.1 so that 0.2 becomes the oldest entry
    let a_again = model.compute_p(0.1).unwrap();
    assert!(Arc::ptr_eq(&a, &a_again));
    model.compute_p(0.4).unwrap();

    assert_eq!(model.cached_times(), vec![0.3, 0.1, 0.4]);

    // 0.2 is recomputed (miss), 0.1 is still served from the cache
    let misses_before = model.cache_stats().misses;
    model.compute_p(0.2).unwrap();
    assert_eq!(model.cache_stats().misses, misses_before + 1);
}

#[test]
fn test_evicted_matrix_remains_valid() {
    let mut model = small_cache_model(1);
    let held = model.compute_p(0.25).unwrap();
    let snapshot = held.matrix().clone();
    model.compute_p(0.5).unwrap();
    model.compute_p(0.75).unwrap();

    assert_eq!(held.matrix(), &snapshot);
    assert_eq!(held.time(), 0.25);
}

#[test]
fn test_update_clears_cache() {
    let mut model = small_cache_model(8);
    model.compute_p(0.1).unwrap();
    model.compute_p(0.2).unwrap();
    assert_eq!(model.cache_len(), 2);

    model.update().unwrap();
    assert_eq!(model.cache_len(), 0);

    model.clear_cache();
    assert_eq!(model.cache_stats().invalidations, 2);
}

#[test]
fn test_shared_eigensystem_across_threads() {
    use rayon::prelude::*;
    use seqevo::TransitionMatrix;

    let mut model = small_cache_model(8);
    let eigen = Arc::clone(model.eigensystem());
    let times: Vec<f64> = (1..=32).map(|i| i as f64 * 0.03).collect();

    let parallel: Vec<TransitionMatrix> = times
        .par_iter()
        .map(|&t| TransitionMatrix::from_eigensystem(&eigen, t))
        .collect();

    for (p, &t) in parallel.iter().zip(&times) {
        let cached = model.compute_p(t).unwrap();
        assert_eq!(p.matrix(), cached.matrix());
    }
}
