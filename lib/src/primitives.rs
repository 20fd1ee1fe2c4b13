use std::f64::consts::TAU;

use glam::DMat4;
use glam::DQuat;
use glam::DVec3;
use glam::dvec3;

use crate::hull::convex_hull;
use crate::mesh::Mesh;

/// Default number of segments around a cylinder.
pub const DEFAULT_SECTIONS: usize = 32;

/// Box centred on the origin.
#[must_use]
pub fn cuboid(extents: DVec3) -> Mesh {
    let h = extents * 0.5;
    // Vertex i has +x when bit 0 is set, +y for bit 1, +z for bit 2.
    let vertices = (0..8)
        .map(|i| {
            dvec3(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            )
        })
        .collect();
    let faces = vec![
        [0, 2, 3],
        [0, 3, 1],
        [4, 5, 7],
        [4, 7, 6],
        [0, 1, 5],
        [0, 5, 4],
        [2, 6, 7],
        [2, 7, 3],
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
    ];
    Mesh::new(vertices, faces)
}

/// Cylinder along Z centred on the origin.
///
/// `sections` is raised to at least 3.
#[must_use]
pub fn cylinder(radius: f64, height: f64, sections: usize) -> Mesh {
    let n = sections.max(3);
    let half = height * 0.5;
    let mut vertices = Vec::with_capacity(2 * n + 2);
    for z in [-half, half] {
        for i in 0..n {
            let angle = TAU * i as f64 / n as f64;
            vertices.push(dvec3(radius * angle.cos(), radius * angle.sin(), z));
        }
    }
    vertices.push(dvec3(0.0, 0.0, -half));
    vertices.push(dvec3(0.0, 0.0, half));

    let n32 = n as u32;
    let (bottom, top) = (2 * n32, 2 * n32 + 1);
    let mut faces = Vec::with_capacity(4 * n);
    for i in 0..n32 {
        let j = (i + 1) % n32;
        faces.push([i, j, n32 + j]);
        faces.push([i, n32 + j, n32 + i]);
        faces.push([bottom, j, i]);
        faces.push([top, n32 + i, n32 + j]);
    }
    Mesh::new(vertices, faces)
}

/// Box with rounded vertical edges, centred on the origin.
///
/// `width` runs along X, `height` along Y and `depth` along Z. A corner
/// radius of zero or less gives a plain box; larger radii are limited to
/// half the shorter side.
#[must_use]
pub fn rounded_rectangle(
    width: f64,
    height: f64,
    depth: f64,
    corner_radius: f64,
    sections: usize,
) -> Mesh {
    let r = corner_radius.min(width * 0.5).min(height * 0.5);
    if r <= 0.0 {
        return cuboid(dvec3(width, height, depth));
    }
    let corner = cylinder(r, depth, sections);
    let (cx, cy) = (width * 0.5 - r, height * 0.5 - r);
    let points: Vec<DVec3> = [(-cx, -cy), (cx, -cy), (cx, cy), (-cx, cy)]
        .into_iter()
        .flat_map(|(x, y)| corner.vertices.iter().map(move |v| *v + dvec3(x, y, 0.0)))
        .collect();
    convex_hull(&points).unwrap_or_else(|| cuboid(dvec3(width, height, depth)))
}

/// Cylinder whose axis runs from `start` to `end`, `None` for a zero length.
#[must_use]
pub fn cylinder_between(start: DVec3, end: DVec3, radius: f64, sections: usize) -> Option<Mesh> {
    let axis = end - start;
    let length = axis.length();
    if length <= f64::EPSILON {
        return None;
    }
    let mut mesh = cylinder(radius, length, sections);
    let rotation = DQuat::from_rotation_arc(DVec3::Z, axis / length);
    mesh.transform(&DMat4::from_rotation_translation(
        rotation,
        (start + end) * 0.5,
    ));
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    use super::*;
    use crate::adjacency::MeshAdjacency;
    use crate::adjacency::is_winding_consistent;

    fn closed(mesh: &Mesh) -> bool {
        MeshAdjacency::build(&mesh.faces).is_watertight() && is_winding_consistent(&mesh.faces)
    }

    #[test]
    fn cuboid_is_closed_and_outward() {
        let b = cuboid(dvec3(2.0, 3.0, 4.0));
        assert!(closed(&b));
        assert_relative_eq!(b.volume(), 24.0, epsilon = 1e-12);
    }

    #[test]
    fn cylinder_volume_approaches_pi_r2_h() {
        let c = cylinder(2.0, 5.0, 128);
        assert!(closed(&c));
        assert_relative_eq!(c.volume(), PI * 4.0 * 5.0, max_relative = 1e-3);
    }

    #[test]
    fn rounded_rectangle_between_box_and_inner_box() {
        let r = rounded_rectangle(153.0, 71.0, 10.0, 1.0, 32);
        assert!(closed(&r));
        let full = 153.0 * 71.0 * 10.0;
        let corner_loss = (4.0 - PI) * 10.0;
        assert_relative_eq!(r.volume(), full - corner_loss, max_relative = 1e-4);
        assert_relative_eq!(r.extents().x, 153.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_radius_is_a_box() {
        let r = rounded_rectangle(10.0, 5.0, 2.0, 0.0, 32);
        assert_eq!(r.face_count(), 12);
    }

    #[test]
    fn cylinder_between_points() {
        let c = cylinder_between(DVec3::ZERO, dvec3(10.0, 0.0, 0.0), 1.0, 32).unwrap();
        assert!(closed(&c));
        assert!(c.volume() > 0.0);
        let b = c.bounds().unwrap();
        assert_relative_eq!(b.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.x, 10.0, epsilon = 1e-9);
        assert!(cylinder_between(DVec3::ONE, DVec3::ONE, 1.0, 8).is_none());
    }
}
