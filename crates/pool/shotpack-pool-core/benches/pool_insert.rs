use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shotpack_pool_core::{FloatPool, StitchPool};

fn key_arrays(count: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..(4 * (i % 7) + 2))
                .map(|j| ((i * 31 + j * 17) % 97) as f32 * 0.25)
                .collect()
        })
        .collect()
}

fn bench_float_pool(c: &mut Criterion) {
    let arrays = key_arrays(400);
    c.bench_function("float_pool_400_curves", |b| {
        b.iter(|| {
            let mut pool = FloatPool::new();
            for values in &arrays {
                black_box(pool.ensure_exists(values));
            }
            pool.len()
        })
    });
}

fn bench_stitch_pool(c: &mut Criterion) {
    let programs: Vec<Vec<u32>> = (0..200u32)
        .map(|i| vec![0, 1, 2 + i % 16, 40 + i % 5])
        .collect();
    c.bench_function("stitch_pool_200_programs", |b| {
        b.iter(|| {
            let mut pool = StitchPool::new();
            for stitches in &programs {
                black_box(pool.add_program(stitches));
            }
            pool.program_count()
        })
    });
}

criterion_group!(benches, bench_float_pool, bench_stitch_pool);
criterion_main!(benches);
