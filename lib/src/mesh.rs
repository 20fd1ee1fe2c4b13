use std::collections::HashMap;
use std::collections::HashSet;

use glam::DMat4;
use glam::DVec3;
use log::debug;
use log::info;
use serde::Deserialize;
use serde::Serialize;

use crate::MeshError;
use crate::MeshResult;
use crate::Triangle;
use crate::grid::Grid;

/// Axis aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb {
    /// Constructor
    #[must_use]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.expand(p);
        }
        Some(aabb)
    }

    /// Grow the box to include `p`.
    pub fn expand(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Width, depth and height.
    #[must_use]
    pub fn extents(&self) -> DVec3 {
        self.max - self.min
    }

    /// Geometric center of the box.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Box volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e.x * e.y * e.z
    }

    /// Strict per-axis overlap with another box.
    #[must_use]
    pub fn overlap_axes(&self, other: &Self) -> [bool; 3] {
        [0, 1, 2].map(|i| other.min[i] < self.max[i] && other.max[i] > self.min[i])
    }

    /// Shared region of two boxes, `None` when they are disjoint on any axis.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if self.overlap_axes(other).iter().all(|&o| o) {
            Some(Self::new(self.min.max(other.min), self.max.min(other.max)))
        } else {
            None
        }
    }

    /// True when `p` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Indexed triangle mesh.
///
/// Faces are wound counter clockwise when seen from outside, so a closed
/// mesh has a positive [`Mesh::volume`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions in millimetres.
    pub vertices: Vec<DVec3>,
    /// Vertex indices, three per face.
    pub faces: Vec<[u32; 3]>,
}

// -0.0 and 0.0 must share a key.
fn weld_key(p: DVec3) -> [u64; 3] {
    [p.x, p.y, p.z].map(|c| if c == 0.0 { 0_u64 } else { c.to_bits() })
}

impl Mesh {
    /// Constructor
    #[must_use]
    pub const fn new(vertices: Vec<DVec3>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Build an indexed mesh from a triangle soup, sharing identical corners.
    #[must_use]
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let mut lookup: HashMap<[u64; 3], u32> = HashMap::with_capacity(triangles.len() * 3 / 2);
        let mut vertices = Vec::with_capacity(triangles.len() / 2);
        let mut faces = Vec::with_capacity(triangles.len());
        for t in triangles {
            let face = t.0.map(|p| {
                *lookup.entry(weld_key(p)).or_insert_with(|| {
                    vertices.push(p);
                    (vertices.len() - 1) as u32
                })
            });
            faces.push(face);
        }
        Self { vertices, faces }
    }

    /// Every face index refers to an existing vertex.
    ///
    /// # Errors
    ///   [`MeshError::InvalidTopology`] naming the first bad face.
    pub fn check_faces(&self) -> MeshResult<()> {
        let count = self.vertices.len();
        match self
            .faces
            .iter()
            .position(|f| f.iter().any(|&v| v as usize >= count))
        {
            Some(i) => Err(MeshError::InvalidTopology(format!(
                "face {i} refers to a vertex beyond the {count} stored"
            ))),
            None => Ok(()),
        }
    }

    /// Expand back into a triangle soup.
    #[must_use]
    pub fn to_triangles(&self) -> Vec<Triangle> {
        (0..self.faces.len()).map(|i| self.triangle(i)).collect()
    }

    /// Corner positions of face `i`.
    #[must_use]
    pub fn triangle(&self, i: usize) -> Triangle {
        Triangle(self.faces[i].map(|v| self.vertices[v as usize]))
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to render.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Bounding box of all vertices.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }

    /// Width, depth and height, zero for an empty mesh.
    #[must_use]
    pub fn extents(&self) -> DVec3 {
        self.bounds().map_or(DVec3::ZERO, |b| b.extents())
    }

    /// Center of the bounding box.
    #[must_use]
    pub fn geometric_center(&self) -> DVec3 {
        self.bounds().map_or(DVec3::ZERO, |b| b.center())
    }

    /// Signed enclosed volume (divergence theorem).
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|v| self.vertices[v as usize]);
                a.dot(b.cross(c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Total surface area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.face_areas().iter().sum()
    }

    /// Area of every face.
    #[must_use]
    pub fn face_areas(&self) -> Vec<f64> {
        (0..self.faces.len()).map(|i| self.triangle(i).area()).collect()
    }

    /// Unit normal of every face.
    #[must_use]
    pub fn face_normals(&self) -> Vec<DVec3> {
        (0..self.faces.len())
            .map(|i| self.triangle(i).normal())
            .collect()
    }

    /// Centroid of every face.
    #[must_use]
    pub fn face_centers(&self) -> Vec<DVec3> {
        (0..self.faces.len())
            .map(|i| self.triangle(i).center())
            .collect()
    }

    /// Center of mass assuming uniform density.
    ///
    /// Falls back to the area weighted surface centroid for open or flat
    /// meshes where the enclosed volume vanishes.
    #[must_use]
    pub fn center_mass(&self) -> DVec3 {
        let mut weighted = DVec3::ZERO;
        let mut total = 0.0;
        for f in &self.faces {
            let [a, b, c] = f.map(|v| self.vertices[v as usize]);
            let v = a.dot(b.cross(c)) / 6.0;
            weighted += v * (a + b + c) / 4.0;
            total += v;
        }
        if total.abs() > 1e-12 {
            return weighted / total;
        }

        let mut weighted = DVec3::ZERO;
        let mut area = 0.0;
        for i in 0..self.faces.len() {
            let t = self.triangle(i);
            weighted += t.area() * t.center();
            area += t.area();
        }
        if area > 0.0 {
            weighted / area
        } else {
            self.geometric_center()
        }
    }

    /// Unique undirected edges.
    #[must_use]
    pub fn unique_edges(&self) -> Vec<(u32, u32)> {
        let mut seen = HashSet::with_capacity(self.faces.len() * 3 / 2);
        let mut edges = Vec::with_capacity(self.faces.len() * 3 / 2);
        for &[a, b, c] in &self.faces {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let key = if u < v { (u, v) } else { (v, u) };
                if seen.insert(key) {
                    edges.push(key);
                }
            }
        }
        edges
    }

    /// Euler characteristic `V - E + F`.
    #[must_use]
    pub fn euler_number(&self) -> i64 {
        self.vertices.len() as i64 - self.unique_edges().len() as i64 + self.faces.len() as i64
    }

    /// Move every vertex by `offset`.
    pub fn translate(&mut self, offset: DVec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: DVec3) -> Self {
        let mut out = self.clone();
        out.translate(offset);
        out
    }

    /// Apply an affine transform; mirrored transforms keep faces outward.
    pub fn transform(&mut self, matrix: &DMat4) {
        for v in &mut self.vertices {
            *v = matrix.transform_point3(*v);
        }
        if matrix.determinant() < 0.0 {
            self.invert();
        }
    }

    /// Reverse the winding of every face.
    pub fn invert(&mut self) {
        for f in &mut self.faces {
            f.swap(1, 2);
        }
    }

    /// Merge several meshes into one without welding.
    #[must_use]
    pub fn concatenate(meshes: &[Self]) -> Self {
        let mut out = Self::default();
        for m in meshes {
            let offset = out.vertices.len() as u32;
            out.vertices.extend_from_slice(&m.vertices);
            out.faces
                .extend(m.faces.iter().map(|f| f.map(|v| v + offset)));
        }
        out
    }

    /// Merge vertices closer than `tolerance`, returns the number merged.
    ///
    /// Faces collapsing onto a repeated index are removed.
    pub fn merge_vertices(&mut self, tolerance: f64) -> usize {
        if self.vertices.is_empty() {
            return 0;
        }
        let grid = Grid::new(&self.vertices, tolerance);
        let mut remap: Vec<u32> = (0..self.vertices.len() as u32).collect();
        let mut merged = 0;
        for i in 0..self.vertices.len() {
            if remap[i] != i as u32 {
                continue;
            }
            for j in grid.neighbors(self.vertices[i], tolerance) {
                if j > i && remap[j] == j as u32 {
                    remap[j] = i as u32;
                    merged += 1;
                }
            }
        }
        if merged == 0 {
            return 0;
        }
        for f in &mut self.faces {
            *f = f.map(|v| remap[v as usize]);
        }
        self.faces.retain(|&[a, b, c]| a != b && b != c && a != c);
        self.remove_unreferenced_vertices();
        debug!("merged {merged} vertices (tolerance {tolerance})");
        merged
    }

    /// Drop faces with repeated indices or an area below `area_threshold`.
    pub fn remove_degenerate_faces(&mut self, area_threshold: f64) -> usize {
        let before = self.faces.len();
        let vertices = &self.vertices;
        self.faces.retain(|f| {
            let [a, b, c] = *f;
            a != b
                && b != c
                && a != c
                && Triangle(f.map(|v| vertices[v as usize])).area() >= area_threshold
        });
        let removed = before - self.faces.len();
        if removed > 0 {
            info!("Removed {removed} degenerate faces");
        }
        removed
    }

    /// Drop faces that reference the same three vertices as an earlier face.
    pub fn remove_duplicate_faces(&mut self) -> usize {
        let before = self.faces.len();
        let mut seen = HashSet::with_capacity(before);
        self.faces.retain(|f| {
            let mut key = *f;
            key.sort_unstable();
            seen.insert(key)
        });
        let removed = before - self.faces.len();
        if removed > 0 {
            info!("Removed {removed} duplicate faces");
        }
        removed
    }

    /// Compact the vertex array, returns the number of vertices dropped.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for f in &self.faces {
            for &v in f {
                if remap[v as usize] == u32::MAX {
                    remap[v as usize] = kept.len() as u32;
                    kept.push(self.vertices[v as usize]);
                }
            }
        }
        let removed = self.vertices.len() - kept.len();
        for f in &mut self.faces {
            *f = f.map(|v| remap[v as usize]);
        }
        self.vertices = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::dvec3;

    use super::*;
    use crate::primitives::cuboid;

    #[test]
    fn unit_cube_properties() {
        let cube = cuboid(dvec3(1.0, 1.0, 1.0));
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.face_count(), 12);
        assert_relative_eq!(cube.volume(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cube.area(), 6.0, epsilon = 1e-12);
        assert_eq!(cube.euler_number(), 2);
        assert!(cube.center_mass().length() < 1e-12);
    }

    #[test]
    fn welding_shares_corners() {
        let a = Triangle([DVec3::ZERO, DVec3::X, DVec3::Y]);
        let b = Triangle([DVec3::X, dvec3(1.0, 1.0, 0.0), DVec3::Y]);
        let mesh = Mesh::from_triangles(&[a, b]);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.to_triangles(), vec![a, b]);
    }

    #[test]
    fn negative_zero_is_welded() {
        let a = Triangle([dvec3(-0.0, 0.0, 0.0), DVec3::X, DVec3::Y]);
        let b = Triangle([DVec3::ZERO, DVec3::Y, DVec3::NEG_X]);
        assert_eq!(Mesh::from_triangles(&[a, b]).vertex_count(), 4);
    }

    #[test]
    fn mirrored_transform_keeps_volume_positive() {
        let mut cube = cuboid(dvec3(2.0, 1.0, 1.0));
        cube.transform(&DMat4::from_scale(dvec3(-1.0, 1.0, 1.0)));
        assert_relative_eq!(cube.volume(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn cleanup_counts() {
        let mut mesh = Mesh::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y, dvec3(5.0, 5.0, 5.0), dvec3(1e-12, 0.0, 0.0)],
            vec![[0, 1, 2], [1, 2, 0], [0, 0, 1], [1, 2, 4]],
        );
        assert_eq!(mesh.remove_duplicate_faces(), 1);
        assert_eq!(mesh.remove_degenerate_faces(0.0), 1);
        assert_eq!(mesh.merge_vertices(1e-9), 1);
        assert_eq!(mesh.vertex_count(), 3);
        // [1, 2, 4] collapses onto a copy of [0, 1, 2].
        assert_eq!(mesh.remove_duplicate_faces(), 1);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn aabb_intersection() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        let b = Aabb::new(DVec3::ONE, DVec3::splat(3.0));
        let c = Aabb::new(dvec3(5.0, 0.0, 0.0), dvec3(6.0, 1.0, 1.0));
        assert_eq!(a.intersection(&b), Some(Aabb::new(DVec3::ONE, DVec3::splat(2.0))));
        assert_eq!(a.overlap_axes(&c), [false, true, true]);
        assert!(a.intersection(&c).is_none());
        assert!(Mesh::default().bounds().is_none());
    }
}
