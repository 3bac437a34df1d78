use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use waves_ext::calculate::{Calculator, PhantomProp, ScoringFormulas, CALCULATE_MODULE};
use waves_ext::extension::{ExtensionLoader, LoadOptions};

/// Benchmark the cost of forwarding through the published snapshot
fn bench_forward(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("calculate.lua");
    std::fs::write(
        &path,
        r#"
        return {
            get_total_score_bg = function(name, score) return score > 50 and "gold" or "grey" end,
            calc_phantom_score = function(role_id, props, cost)
                return #props * cost, "S"
            end,
        }
        "#,
    )
    .expect("write module");

    let loader = Arc::new(ExtensionLoader::new(CALCULATE_MODULE, &path, LoadOptions::default()));
    let calc = Calculator::new(Arc::clone(&loader));
    let props = vec![PhantomProp::new("暴击", "10.5%"); 5];

    let mut group = c.benchmark_group("forward");

    group.bench_function("scalar_args", |b| {
        b.iter(|| calc.get_total_score_bg(black_box("今汐"), black_box(64.0), None));
    });

    group.bench_function("serde_args", |b| {
        b.iter(|| calc.calc_phantom_score(black_box("1304"), black_box(&props), 4, None));
    });

    group.bench_function("reload", |b| {
        b.iter(|| loader.reload());
    });

    group.finish();
}

criterion_group!(benches, bench_forward);
criterion_main!(benches);
