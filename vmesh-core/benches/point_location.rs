//! Benchmarks the amortised point-location cost under Hilbert-ordered
//! insertion versus insertion order, over a batch large enough that the
//! `last_simplex` seed matters.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use vmesh_core::config::TessellatorConfig;
use vmesh_core::hilbert::hilbert_sort3;
use vmesh_core::Tessellator3D;

fn random_points(n: usize, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            [
                rng.gen_range(0.0..1000.0),
                rng.gen_range(0.0..1000.0),
                rng.gen_range(0.0..1000.0),
            ]
        })
        .collect()
}

fn insert_all(points: &[[f64; 3]]) -> Tessellator3D {
    let config = TessellatorConfig::new(vec![0.0, 0.0, 0.0], 1000.0).with_capacity_hint(points.len());
    let mut tess = Tessellator3D::init(config);
    for &p in points {
        tess.add_local_vertex(p).unwrap();
    }
    tess
}

fn bench_point_location(c: &mut Criterion) {
    let n = 2000;
    let points = random_points(n, 1);

    c.bench_function("insertion_order_as_generated", |b| {
        b.iter(|| black_box(insert_all(&points)));
    });

    let order = hilbert_sort3(&points);
    let sorted: Vec<[f64; 3]> = order.into_iter().map(|i| points[i]).collect();
    c.bench_function("insertion_order_hilbert_sorted", |b| {
        b.iter(|| black_box(insert_all(&sorted)));
    });
}

criterion_group!(benches, bench_point_location);
criterion_main!(benches);
