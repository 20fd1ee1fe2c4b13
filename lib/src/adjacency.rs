use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use glam::DVec3;
use serde::Serialize;

use crate::mesh::Aabb;
use crate::mesh::Mesh;

/// Edge and vertex to face lookups for a face list.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Vertex index to the faces using it.
    pub vertex_to_faces: HashMap<u32, Vec<u32>>,

    /// Edge `(min, max)` to the faces sharing it.
    pub edge_to_faces: HashMap<(u32, u32), Vec<u32>>,
}

const fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

impl MeshAdjacency {
    /// Build adjacency structures from a face list.
    #[must_use]
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut vertex_to_faces: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut edge_to_faces: HashMap<(u32, u32), Vec<u32>> = HashMap::new();

        for (face_idx, &[v0, v1, v2]) in faces.iter().enumerate() {
            let face_idx = face_idx as u32;
            for v in [v0, v1, v2] {
                vertex_to_faces.entry(v).or_default().push(face_idx);
            }
            for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
                edge_to_faces.entry(edge_key(a, b)).or_default().push(face_idx);
            }
        }

        Self {
            vertex_to_faces,
            edge_to_faces,
        }
    }

    /// Edges used by exactly one face.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Count boundary edges.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() == 1).count()
    }

    /// Count edges shared by more than two faces.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() > 2).count()
    }

    /// At most two faces on every edge.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() <= 2)
    }

    /// Exactly two faces on every edge.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        !self.edge_to_faces.is_empty() && self.edge_to_faces.values().all(|f| f.len() == 2)
    }

    /// Faces sharing the edge `v0`-`v1`, in either order.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[u32]> {
        self.edge_to_faces.get(&edge_key(v0, v1)).map(Vec::as_slice)
    }

    /// Sorted, deduplicated vertices that lie on a boundary edge.
    #[must_use]
    pub fn boundary_vertices(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self.boundary_edges().flat_map(|(a, b)| [a, b]).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// True when every interior edge is walked in opposite directions by its two faces.
#[must_use]
pub fn is_winding_consistent(faces: &[[u32; 3]]) -> bool {
    let adjacency = MeshAdjacency::build(faces);
    let mut directed = HashSet::with_capacity(faces.len() * 3);
    for &[a, b, c] in faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let shared = adjacency
                .faces_for_edge(u, v)
                .is_some_and(|f| f.len() == 2);
            if shared && !directed.insert((u, v)) {
                return false;
            }
        }
    }
    true
}

/// Closed loops of boundary vertices, each ordered along the face winding.
///
/// Open chains (possible around non-manifold vertices) are dropped.
#[must_use]
pub fn boundary_loops(faces: &[[u32; 3]]) -> Vec<Vec<u32>> {
    let adjacency = MeshAdjacency::build(faces);
    let mut next: HashMap<u32, Vec<u32>> = HashMap::new();
    for &[a, b, c] in faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            if adjacency.faces_for_edge(u, v).is_some_and(|f| f.len() == 1) {
                // The hole is walked opposite to the face that borders it.
                next.entry(v).or_default().push(u);
            }
        }
    }

    let mut starts: Vec<u32> = next.keys().copied().collect();
    starts.sort_unstable();
    let mut loops = Vec::new();
    for start in starts {
        while next.get(&start).is_some_and(|n| !n.is_empty()) {
            let mut chain = vec![start];
            let mut current = start;
            let closed = loop {
                let Some(step) = next.get_mut(&current).and_then(Vec::pop) else {
                    break false;
                };
                if step == start {
                    break true;
                }
                chain.push(step);
                current = step;
            };
            if closed && chain.len() >= 3 {
                loops.push(chain);
            }
        }
    }
    loops
}

/// Summary of a mesh's topology and size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeshReport {
    /// Number of vertices.
    pub vertices: usize,
    /// Number of faces.
    pub faces: usize,
    /// Edges with one face.
    pub boundary_edges: usize,
    /// Edges with more than two faces.
    pub non_manifold_edges: usize,
    /// Closed two-manifold surface.
    pub watertight: bool,
    /// No edge with more than two faces.
    pub manifold: bool,
    /// Neighbouring faces agree on orientation.
    pub winding_consistent: bool,
    /// Bounding box, `None` when empty.
    pub bounds: Option<Aabb>,
    /// Width, depth and height.
    pub dimensions: DVec3,
}

impl MeshReport {
    /// Inspect `mesh`.
    #[must_use]
    pub fn new(mesh: &Mesh) -> Self {
        let adjacency = MeshAdjacency::build(&mesh.faces);
        Self {
            vertices: mesh.vertex_count(),
            faces: mesh.face_count(),
            boundary_edges: adjacency.boundary_edge_count(),
            non_manifold_edges: adjacency.non_manifold_edge_count(),
            watertight: adjacency.is_watertight(),
            manifold: adjacency.is_manifold(),
            winding_consistent: is_winding_consistent(&mesh.faces),
            bounds: mesh.bounds(),
            dimensions: mesh.extents(),
        }
    }
}

impl fmt::Display for MeshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vertices: {}", self.vertices)?;
        writeln!(f, "Faces: {}", self.faces)?;
        writeln!(f, "Watertight: {}", self.watertight)?;
        writeln!(
            f,
            "Manifold: {} ({} boundary, {} non-manifold edges)",
            self.manifold, self.boundary_edges, self.non_manifold_edges
        )?;
        writeln!(f, "Winding consistent: {}", self.winding_consistent)?;
        if let Some(b) = self.bounds {
            writeln!(
                f,
                "Bounds: [{:.2}, {:.2}, {:.2}] - [{:.2}, {:.2}, {:.2}]",
                b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
            )?;
        }
        write!(
            f,
            "Dimensions: {:.2} x {:.2} x {:.2} mm",
            self.dimensions.x, self.dimensions.y, self.dimensions.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Vec<[u32; 3]> {
        vec![[0, 2, 1], [0, 3, 2], [0, 1, 3], [1, 2, 3]]
    }

    #[test]
    fn single_triangle_is_not_watertight() {
        let adj = MeshAdjacency::build(&[[0, 1, 2]]);
        assert!(!adj.is_watertight());
        assert!(adj.is_manifold());
        assert_eq!(adj.boundary_edge_count(), 3);
        assert_eq!(adj.boundary_vertices(), vec![0, 1, 2]);
    }

    #[test]
    fn tetrahedron_is_closed() {
        let adj = MeshAdjacency::build(&tetrahedron());
        assert!(adj.is_watertight());
        assert_eq!(adj.non_manifold_edge_count(), 0);
        assert!(is_winding_consistent(&tetrahedron()));
        assert!(boundary_loops(&tetrahedron()).is_empty());
    }

    #[test]
    fn flipped_face_breaks_winding() {
        let mut faces = tetrahedron();
        faces[1] = [0, 2, 3];
        assert!(!is_winding_consistent(&faces));
        assert!(MeshAdjacency::build(&faces).is_watertight());
    }

    #[test]
    fn open_tetrahedron_has_one_loop() {
        let faces = &tetrahedron()[..3];
        let loops = boundary_loops(faces);
        assert_eq!(loops.len(), 1);
        let mut ring = loops[0].clone();
        ring.sort_unstable();
        assert_eq!(ring, vec![1, 2, 3]);
    }

    #[test]
    fn empty_is_not_watertight() {
        assert!(!MeshAdjacency::build(&[]).is_watertight());
    }
}
