use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::dvec3;
use nucdeck_mesh::csg::difference;
use nucdeck_mesh::primitives::{DEFAULT_SECTIONS, cuboid, rounded_rectangle};

pub fn phone_opening_benchmark(c: &mut Criterion) {
    let cover = cuboid(dvec3(200.0, 100.0, 4.0));
    let opening = rounded_rectangle(153.0, 71.0, 10.0, 1.0, DEFAULT_SECTIONS);

    c.bench_function("phone_opening", |b| {
        b.iter(|| {
            let mesh = difference(black_box(&cover), black_box(&opening));
            assert!(!mesh.is_empty(), "Difference should leave a frame");
        })
    });
}

criterion_group!(benches, phone_opening_benchmark);
criterion_main!(benches);
