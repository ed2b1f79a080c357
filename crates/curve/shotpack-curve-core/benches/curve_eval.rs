use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shotpack_curve_core::{Curve, Shot, TangentMode};

fn dense_curve(keys: usize) -> Curve {
    let mut curve = Curve::new();
    for i in 0..keys {
        let t = i as f64 * 0.25;
        if let Some(index) = curve.insert_key_at(t, (t * 1.7).sin()) {
            let mode = TangentMode::ALL[i % 4];
            curve.set_tangent_mode(index, mode);
        }
    }
    curve
}

fn bench_evaluate(c: &mut Criterion) {
    let curve = dense_curve(512);
    c.bench_function("curve_evaluate_512_keys", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1024 {
                acc += curve.evaluate(black_box(i as f64 * 0.125));
            }
            acc
        })
    });
}

fn bench_bake(c: &mut Criterion) {
    let mut shot = Shot::new("bench", "scene", 0.0, 64.0);
    shot.speed = 1.5;
    shot.preroll = 2.0;
    for name in ["uA.x", "uA.y", "uA.z", "uB"] {
        shot.curves.insert(name.to_string(), dense_curve(256));
    }
    c.bench_function("shot_bake_4x256", |b| {
        b.iter(|| {
            let mut baked = shot.clone();
            baked.bake().ok();
            black_box(baked)
        })
    });
}

criterion_group!(benches, bench_evaluate, bench_bake);
criterion_main!(benches);
