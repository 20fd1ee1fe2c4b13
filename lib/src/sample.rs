use glam::DVec3;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::mesh::Mesh;

/// Seed used by the reports so repeated runs print the same numbers.
pub const DEFAULT_SEED: u64 = 0x5EED_0F_DECC;

/// A point on the surface and the face it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    /// Position.
    pub point: DVec3,
    /// Source face.
    pub face: usize,
}

/// `count` points uniformly distributed over the surface area.
///
/// Empty or zero-area meshes yield no samples.
#[must_use]
pub fn sample_surface(mesh: &Mesh, count: usize, seed: u64) -> Vec<SurfaceSample> {
    let mut cumulative = Vec::with_capacity(mesh.face_count());
    let mut total = 0.0;
    for area in mesh.face_areas() {
        total += area;
        cumulative.push(total);
    }
    if total <= 0.0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let target = rng.r#gen::<f64>() * total;
            let face = cumulative
                .partition_point(|&c| c <= target)
                .min(cumulative.len() - 1);
            let [a, b, c] = mesh.triangle(face).0;
            let (mut u, mut v) = (rng.r#gen::<f64>(), rng.r#gen::<f64>());
            if u + v > 1.0 {
                u = 1.0 - u;
                v = 1.0 - v;
            }
            SurfaceSample {
                point: a + (b - a) * u + (c - a) * v,
                face,
            }
        })
        .collect()
}
