use std::collections::VecDeque;
use std::fmt;

use log::debug;
use log::info;
use serde::Serialize;

use crate::adjacency::MeshAdjacency;
use crate::adjacency::boundary_loops;
use crate::mesh::Mesh;

/// Vertices closer than this are considered the same point, in millimetres.
pub const WELD_EPSILON: f64 = 1e-6;

/// What [`repair`] changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Faces repeating an earlier face.
    pub duplicate_faces: usize,
    /// Zero area faces.
    pub degenerate_faces: usize,
    /// Vertices welded onto a neighbour.
    pub merged_vertices: usize,
    /// Vertices no face used.
    pub unreferenced_vertices: usize,
    /// Faces flipped to agree with their neighbours.
    pub flipped_faces: usize,
    /// Connected components turned inside out.
    pub inverted_components: usize,
    /// Boundary loops closed.
    pub filled_holes: usize,
    /// Faces added while closing holes.
    pub added_faces: usize,
    /// Result is a closed surface.
    pub watertight: bool,
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Removed duplicate faces: {}", self.duplicate_faces)?;
        writeln!(f, "Removed degenerate faces: {}", self.degenerate_faces)?;
        writeln!(f, "Merged vertices: {}", self.merged_vertices)?;
        writeln!(f, "Removed unreferenced vertices: {}", self.unreferenced_vertices)?;
        writeln!(f, "Flipped faces: {}", self.flipped_faces)?;
        writeln!(f, "Inverted components: {}", self.inverted_components)?;
        writeln!(
            f,
            "Filled holes: {} ({} faces)",
            self.filled_holes, self.added_faces
        )?;
        write!(f, "Watertight: {}", self.watertight)
    }
}

/// Clean up `mesh` in place.
pub fn repair(mesh: &mut Mesh) -> RepairReport {
    let mut report = RepairReport {
        duplicate_faces: mesh.remove_duplicate_faces(),
        degenerate_faces: mesh.remove_degenerate_faces(1e-12),
        ..RepairReport::default()
    };
    report.unreferenced_vertices = mesh.remove_unreferenced_vertices();
    report.merged_vertices = mesh.merge_vertices(WELD_EPSILON);
    report.flipped_faces = fix_winding(mesh);
    let (holes, added) = fill_holes(mesh);
    report.filled_holes = holes;
    report.added_faces = added;
    report.inverted_components = fix_inverted_components(mesh);
    report.watertight = MeshAdjacency::build(&mesh.faces).is_watertight();
    info!(
        "repair: flipped {} faces, filled {} holes, watertight {}",
        report.flipped_faces, report.filled_holes, report.watertight
    );
    report
}

/// True when `face` walks from `a` to `b`.
fn has_directed_edge(face: &[u32; 3], a: u32, b: u32) -> bool {
    (0..3).any(|i| face[i] == a && face[(i + 1) % 3] == b)
}

/// Face indices of each edge-connected component.
fn components(faces: &[[u32; 3]], adjacency: &MeshAdjacency) -> Vec<Vec<usize>> {
    let mut seen = vec![false; faces.len()];
    let mut out = Vec::new();
    for start in 0..faces.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(fi) = queue.pop_front() {
            let [a, b, c] = faces[fi];
            for (u, v) in [(a, b), (b, c), (c, a)] {
                for &n in adjacency.faces_for_edge(u, v).unwrap_or_default() {
                    let n = n as usize;
                    if !seen[n] {
                        seen[n] = true;
                        component.push(n);
                        queue.push_back(n);
                    }
                }
            }
        }
        out.push(component);
    }
    out
}

/// Propagate the orientation of the first face of each component to its
/// neighbours across manifold edges, returns the number of faces flipped.
pub fn fix_winding(mesh: &mut Mesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut visited = vec![false; mesh.faces.len()];
    let mut flipped = 0;
    for start in 0..mesh.faces.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(fi) = queue.pop_front() {
            let [a, b, c] = mesh.faces[fi];
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let Some(neighbors) = adjacency.faces_for_edge(u, v) else {
                    continue;
                };
                if neighbors.len() != 2 {
                    continue;
                }
                for &n in neighbors {
                    let n = n as usize;
                    if visited[n] {
                        continue;
                    }
                    visited[n] = true;
                    if has_directed_edge(&mesh.faces[n], u, v) {
                        mesh.faces[n].swap(1, 2);
                        flipped += 1;
                    }
                    queue.push_back(n);
                }
            }
        }
    }
    if flipped > 0 {
        info!("Fixed winding order: flipped {flipped} faces");
    } else {
        debug!("Winding order already consistent");
    }
    flipped
}

/// Close each boundary loop, returns loops filled and faces added.
///
/// A three vertex loop gets a single face; longer loops are fanned around a
/// new vertex at their centroid.
pub fn fill_holes(mesh: &mut Mesh) -> (usize, usize) {
    let loops = boundary_loops(&mesh.faces);
    let before = mesh.faces.len();
    for ring in &loops {
        if ring.len() == 3 {
            mesh.faces.push([ring[0], ring[1], ring[2]]);
            continue;
        }
        let centroid = ring
            .iter()
            .map(|&v| mesh.vertices[v as usize])
            .sum::<glam::DVec3>()
            / ring.len() as f64;
        mesh.vertices.push(centroid);
        let center = (mesh.vertices.len() - 1) as u32;
        for i in 0..ring.len() {
            mesh.faces.push([ring[i], ring[(i + 1) % ring.len()], center]);
        }
    }
    let added = mesh.faces.len() - before;
    if !loops.is_empty() {
        info!("Filled {} holes with {added} faces", loops.len());
    }
    (loops.len(), added)
}

/// Flip every component whose enclosed volume is negative.
pub fn fix_inverted_components(mesh: &mut Mesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut inverted = 0;
    for component in components(&mesh.faces, &adjacency) {
        let volume: f64 = component
            .iter()
            .map(|&fi| {
                let [a, b, c] = mesh.faces[fi].map(|v| mesh.vertices[v as usize]);
                a.dot(b.cross(c))
            })
            .sum();
        if volume < 0.0 {
            for &fi in &component {
                mesh.faces[fi].swap(1, 2);
            }
            inverted += 1;
        }
    }
    if inverted > 0 {
        info!("Inverted {inverted} inside-out components");
    }
    inverted
}
