use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use std::collections::HashMap;

use jobcat::pipeline::ranker::StaticLabelMap;
use jobcat::ResultRanker;

fn distribution(n: usize) -> Array1<f32> {
    // Deterministic pseudo-distribution, normalized to sum 1
    let raw: Vec<f32> = (0..n).map(|i| ((i * 37 % 101) + 1) as f32).collect();
    let sum: f32 = raw.iter().sum();
    Array1::from(raw.into_iter().map(|x| x / sum).collect::<Vec<_>>())
}

fn labeled_ranker(n: usize) -> ResultRanker {
    let labels: HashMap<i64, String> = (0..n as i64).map(|i| (i, format!("category-{}", i))).collect();
    ResultRanker::new().with_resolver(Box::new(StaticLabelMap::new(labels)))
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ranking");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for &n in &[10usize, 100, 1000] {
        let probs = distribution(n);
        let ranker = labeled_ranker(n);
        group.bench_function(format!("top5_of_{}", n), |b| {
            b.iter(|| ranker.rank(black_box(probs.view())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ranking);
criterion_main!(benches);
