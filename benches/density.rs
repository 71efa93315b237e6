use criterion::{black_box, criterion_group, criterion_main, Criterion};
use yieldreg::dist::{Gaussian, LeftTruncated, StudentsT};
use yieldreg::traits::*;

fn bench_ln_f(c: &mut Criterion) {
    let g = Gaussian::new(0.5, 1.5).unwrap();
    let t = StudentsT::new(5.0, 0.0, 1.0).unwrap();
    let lt = LeftTruncated::new(StudentsT::new(5.0, 0.0, 1.0).unwrap(), -1.0).unwrap();
    let xs: Vec<f64> = (0..1000).map(|i| f64::from(i) / 100.0 - 5.0).collect();

    let mut group = c.benchmark_group("ln_f");
    group.bench_function("gaussian", |b| {
        b.iter(|| xs.iter().map(|x| g.ln_f(black_box(x))).sum::<f64>())
    });
    group.bench_function("students_t", |b| {
        b.iter(|| xs.iter().map(|x| t.ln_f(black_box(x))).sum::<f64>())
    });
    group.bench_function("left_truncated_t", |b| {
        b.iter(|| xs.iter().map(|x| lt.ln_f(black_box(x))).sum::<f64>())
    });
    group.finish();
}

criterion_group!(density_benches, bench_ln_f);
criterion_main!(density_benches);
