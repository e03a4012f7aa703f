//! Engine throughput: full analysis runs at two ensemble sizes.

use causalimpact_core::{AnalysisData, CausalImpact, Covariate, ImpactConfig, Period};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic(n: usize) -> AnalysisData {
    let x: Vec<f64> = (0..n).map(|t| 50.0 + (t as f64 * 0.31).sin() * 5.0).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(t, v)| 1.5 * v + 3.0 + 0.05 * (t as f64 * 1.7).sin())
        .collect();
    AnalysisData::from_steps(
        y,
        vec![Covariate {
            name: "x".into(),
            values: x,
        }],
    )
    .expect("valid synthetic data")
}

fn bench_analysis(c: &mut Criterion) {
    let data = synthetic(200);
    let pre = Period::steps(0, 139).expect("valid pre period");
    let post = Period::steps(140, 199).expect("valid post period");

    for n_simulations in [100usize, 1000] {
        c.bench_function(&format!("causal_impact_{n_simulations}_sims"), |b| {
            b.iter(|| {
                let config = ImpactConfig {
                    n_simulations,
                    ..ImpactConfig::default()
                };
                let ci = CausalImpact::run(
                    black_box(data.clone()),
                    black_box(pre),
                    black_box(post),
                    config,
                )
                .expect("analysis runs");
                black_box(ci.p_value().expect("p-value available"))
            })
        });
    }
}

criterion_group!(benches, bench_analysis);
criterion_main!(benches);
