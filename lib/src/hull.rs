use chull::ConvexHullWrapper;
use glam::DVec3;
use glam::dvec3;
use log::debug;

use crate::mesh::Mesh;

/// Convex hull of `points` as a closed, outward wound mesh.
///
/// Returns `None` when fewer than four points are given or all of them are
/// coplanar.
#[must_use]
pub fn convex_hull(points: &[DVec3]) -> Option<Mesh> {
    if points.len() < 4 {
        return None;
    }
    let input: Vec<Vec<f64>> = points.iter().map(|p| vec![p.x, p.y, p.z]).collect();
    let hull = match ConvexHullWrapper::try_new(&input, None) {
        Ok(hull) => hull,
        Err(e) => {
            debug!("convex hull of {} points failed: {e:?}", points.len());
            return None;
        }
    };
    let (corners, indices) = hull.vertices_indices();
    let vertices: Vec<DVec3> = corners.iter().map(|c| dvec3(c[0], c[1], c[2])).collect();
    if vertices.len() < 4 {
        return None;
    }
    let interior = vertices.iter().copied().sum::<DVec3>() / vertices.len() as f64;

    // The hull is convex, so a face points outward when it faces away from
    // the mean of its vertices.
    let faces: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|t| {
            let [a, b, c] = [t[0], t[1], t[2]];
            let normal = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
            let face = if normal.dot(vertices[a] - interior) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            };
            face.map(|i| i as u32)
        })
        .collect();

    let mut mesh = Mesh::new(vertices, faces);
    mesh.remove_unreferenced_vertices();
    debug!(
        "convex hull: {} input points, {} hull vertices",
        points.len(),
        mesh.vertex_count()
    );
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::dvec3;

    use super::*;
    use crate::adjacency::MeshAdjacency;
    use crate::primitives::cuboid;

    #[test]
    fn hull_of_cube_with_interior_points() {
        let mut points = cuboid(dvec3(2.0, 2.0, 2.0)).vertices;
        points.extend([DVec3::ZERO, dvec3(0.5, -0.2, 0.1), dvec3(0.9, 0.9, 0.9)]);
        let hull = convex_hull(&points).unwrap();
        assert_eq!(hull.vertex_count(), 8);
        assert_relative_eq!(hull.volume(), 8.0, epsilon = 1e-9);
        assert!(MeshAdjacency::build(&hull.faces).is_watertight());
    }

    #[test]
    fn hull_of_non_convex_shape_is_larger() {
        // An L-shaped prism made of two boxes sharing a corner region.
        let mut points = cuboid(dvec3(4.0, 1.0, 1.0)).vertices;
        points.extend(cuboid(dvec3(1.0, 4.0, 1.0)).translated(dvec3(1.5, 1.5, 0.0)).vertices);
        let hull = convex_hull(&points).unwrap();
        assert!(hull.volume() > 4.0 + 4.0 - 1.0);
    }

    #[test]
    fn hull_of_rounded_corners_is_outward() {
        let corner = crate::primitives::cylinder(1.0, 2.0, 32);
        let mut points = corner.vertices.clone();
        points.extend(corner.translated(dvec3(5.0, 0.0, 0.0)).vertices);
        let hull = convex_hull(&points).unwrap();
        let adjacency = MeshAdjacency::build(&hull.faces);
        assert!(adjacency.is_watertight());
        assert!(crate::adjacency::is_winding_consistent(&hull.faces));
        assert!(hull.volume() > corner.volume());
        let normals = hull.face_normals();
        for (normal, center) in normals.iter().zip(hull.face_centers()) {
            if *normal != DVec3::ZERO {
                assert!(normal.dot(center - dvec3(2.5, 0.0, 0.0)) > -1e-9);
            }
        }
    }

    #[test]
    fn flat_input_has_no_hull() {
        let points = [
            DVec3::ZERO,
            DVec3::X,
            DVec3::Y,
            dvec3(1.0, 1.0, 0.0),
            dvec3(0.5, 0.5, 0.0),
        ];
        assert!(convex_hull(&points).is_none());
        assert!(convex_hull(&points[..3]).is_none());
    }
}
