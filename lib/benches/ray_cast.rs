use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::{DVec3, dvec3};
use nucdeck_mesh::primitives::{DEFAULT_SECTIONS, cylinder};
use nucdeck_mesh::ray::RayCaster;

pub fn ray_cast_benchmark(c: &mut Criterion) {
    let mesh = cylinder(40.0, 20.0, DEFAULT_SECTIONS * 8);
    let caster = RayCaster::new(&mesh);

    c.bench_function("intersect_all_grid", |b| {
        b.iter(|| {
            let mut hits = 0;
            for i in 0..20 {
                for j in 0..20 {
                    let origin = dvec3(f64::from(i) * 4.0 - 40.0, f64::from(j) * 4.0 - 40.0, 50.0);
                    hits += caster.intersect_all(black_box(origin), -DVec3::Z).len();
                }
            }
            assert!(hits > 0, "Rays should hit the cylinder");
        })
    });

    c.bench_function("contains", |b| {
        b.iter(|| {
            assert!(caster.contains(black_box(dvec3(1.0, 2.0, 3.0))));
        })
    });
}

criterion_group!(benches, ray_cast_benchmark);
criterion_main!(benches);
