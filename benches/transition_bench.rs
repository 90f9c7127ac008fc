use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use seqevo::{SequenceType, TransitionConfig, TransitionModel};

fn uniform_model(seq_type: SequenceType) -> TransitionModel {
    let n = seq_type.alphabet_size();
    TransitionModel::new(
        format!("uniform-{}", seq_type),
        seq_type,
        vec![1.0; n * (n - 1) / 2],
        vec![1.0 / n as f64; n],
        TransitionConfig::default(),
    )
    .unwrap()
}

fn bench_compute_p(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_p");

    for seq_type in [SequenceType::Dna, SequenceType::AminoAcid, SequenceType::Codon] {
        let n = seq_type.alphabet_size();

        let mut cold = uniform_model(seq_type);
        let mut t = 0.0;
        group.bench_with_input(BenchmarkId::new("miss", n), &n, |b, _| {
            b.iter(|| {
                // Fresh time on every call
                t += 1e-6;
                black_box(cold.compute_p(t).unwrap());
            })
        });

        let mut warm = uniform_model(seq_type);
        warm.compute_p(0.1).unwrap();
        group.bench_with_input(BenchmarkId::new("hit", n), &n, |b, _| {
            b.iter(|| black_box(warm.compute_p(black_box(0.1)).unwrap()))
        });
    }

    group.finish();
}

fn bench_compute_many(c: &mut Criterion) {
    let times: Vec<f64> = (1..=200).map(|i| i as f64 * 0.005).collect();
    c.bench_function("compute_many_codon_200", |b| {
        b.iter(|| {
            let mut model = uniform_model(SequenceType::Codon);
            black_box(model.compute_many(&times).unwrap());
        })
    });
}

criterion_group!(benches, bench_compute_p, bench_compute_many);
criterion_main!(benches);
