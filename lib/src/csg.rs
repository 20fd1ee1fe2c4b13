//! Boolean operations on closed triangle meshes.
//!
//! Each operand is turned into a BSP tree of convex polygons. Polygons of
//! one tree are clipped against the other and the survivors are merged,
//! exactly as in the classic csg.js formulation:
//!
//! ```text
//! union:        a.clip(b); b.clip(a); b.invert(); b.clip(a); b.invert(); a.build(b)
//! difference:   a.invert(); union steps; a.invert()
//! intersection: a.invert(); b.clip(a); b.invert(); a.clip(b); b.clip(a); a.build(b); a.invert()
//! ```
//!
//! Nodes live in an arena so deep trees never recurse on the call stack.

use glam::DVec3;
use log::debug;

use crate::Triangle;
use crate::mesh::Mesh;

/// Plane thickness used to classify points as coplanar, in millimetres.
const PLANE_EPSILON: f64 = 1e-5;

/// Vertices closer than this are merged in the result.
const WELD_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug)]
struct Plane {
    normal: DVec3,
    w: f64,
}

impl Plane {
    fn from_points(a: DVec3, b: DVec3, c: DVec3) -> Option<Self> {
        let normal = (b - a).cross(c - a).try_normalize()?;
        Some(Self {
            normal,
            w: normal.dot(a),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }
}

#[derive(Clone, Debug)]
struct Polygon {
    vertices: Vec<DVec3>,
    plane: Plane,
}

impl Polygon {
    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Where the pieces of a split polygon go.
#[derive(Default)]
struct Split {
    coplanar_front: Vec<Polygon>,
    coplanar_back: Vec<Polygon>,
    front: Vec<Polygon>,
    back: Vec<Polygon>,
}

fn split_polygon(plane: &Plane, polygon: Polygon, out: &mut Split) {
    let types: Vec<u8> = polygon
        .vertices
        .iter()
        .map(|v| {
            let t = plane.normal.dot(*v) - plane.w;
            if t < -PLANE_EPSILON {
                BACK
            } else if t > PLANE_EPSILON {
                FRONT
            } else {
                COPLANAR
            }
        })
        .collect();
    let polygon_type = types.iter().fold(COPLANAR, |acc, t| acc | t);

    match polygon_type {
        COPLANAR => {
            if plane.normal.dot(polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon);
            } else {
                out.coplanar_back.push(polygon);
            }
        }
        FRONT => out.front.push(polygon),
        BACK => out.back.push(polygon),
        _ => {
            let n = polygon.vertices.len();
            let mut f = Vec::with_capacity(n + 1);
            let mut b = Vec::with_capacity(n + 1);
            for i in 0..n {
                let j = (i + 1) % n;
                let (ti, tj) = (types[i], types[j]);
                let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                if ti != BACK {
                    f.push(vi);
                }
                if ti != FRONT {
                    b.push(vi);
                }
                if (ti | tj) == SPANNING {
                    let t = (plane.w - plane.normal.dot(vi)) / plane.normal.dot(vj - vi);
                    let v = vi.lerp(vj, t);
                    f.push(v);
                    b.push(v);
                }
            }
            if f.len() >= 3 {
                out.front.push(Polygon {
                    vertices: f,
                    plane: polygon.plane,
                });
            }
            if b.len() >= 3 {
                out.back.push(Polygon {
                    vertices: b,
                    plane: polygon.plane,
                });
            }
        }
    }
}

#[derive(Clone, Debug)]
struct BspNode {
    plane: Plane,
    front: Option<usize>,
    back: Option<usize>,
    polygons: Vec<Polygon>,
}

#[derive(Clone, Debug, Default)]
struct Bsp {
    nodes: Vec<BspNode>,
}

impl Bsp {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut bsp = Self::default();
        bsp.build(polygons);
        bsp
    }

    fn add_node(&mut self, plane: Plane) -> usize {
        self.nodes.push(BspNode {
            plane,
            front: None,
            back: None,
            polygons: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Insert polygons, growing the tree where they fall off a leaf.
    fn build(&mut self, polygons: Vec<Polygon>) {
        let Some(first) = polygons.first() else {
            return;
        };
        if self.nodes.is_empty() {
            self.add_node(first.plane);
        }
        let mut work = vec![(0_usize, polygons)];
        while let Some((index, polygons)) = work.pop() {
            let plane = self.nodes[index].plane;
            let mut split = Split::default();
            for p in polygons {
                split_polygon(&plane, p, &mut split);
            }
            let node = &mut self.nodes[index];
            node.polygons.append(&mut split.coplanar_front);
            node.polygons.append(&mut split.coplanar_back);

            for (side, pieces) in [(FRONT, split.front), (BACK, split.back)] {
                let Some(first) = pieces.first() else {
                    continue;
                };
                let child = if side == FRONT {
                    self.nodes[index].front
                } else {
                    self.nodes[index].back
                };
                let child = child.unwrap_or_else(|| {
                    let created = self.add_node(first.plane);
                    if side == FRONT {
                        self.nodes[index].front = Some(created);
                    } else {
                        self.nodes[index].back = Some(created);
                    }
                    created
                });
                work.push((child, pieces));
            }
        }
    }

    /// Swap solid and empty space.
    fn invert(&mut self) {
        for node in &mut self.nodes {
            for p in &mut node.polygons {
                p.flip();
            }
            node.plane.flip();
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` inside this solid.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        if self.nodes.is_empty() {
            return polygons;
        }
        let mut kept = Vec::with_capacity(polygons.len());
        let mut work = vec![(0_usize, polygons)];
        while let Some((index, polygons)) = work.pop() {
            let node = &self.nodes[index];
            let mut split = Split::default();
            for p in polygons {
                split_polygon(&node.plane, p, &mut split);
            }
            let mut front = split.front;
            front.append(&mut split.coplanar_front);
            let mut back = split.back;
            back.append(&mut split.coplanar_back);

            match node.front {
                Some(child) if !front.is_empty() => work.push((child, front)),
                Some(_) => {}
                None => kept.append(&mut front),
            }
            // Polygons behind a leaf are inside the solid and dropped.
            if let Some(child) = node.back {
                if !back.is_empty() {
                    work.push((child, back));
                }
            }
        }
        kept
    }

    /// Clip every polygon of this tree against `other`.
    fn clip_to(&mut self, other: &Self) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|n| n.polygons.iter().cloned())
            .collect()
    }
}

fn to_polygons(mesh: &Mesh) -> Vec<Polygon> {
    mesh.to_triangles()
        .into_iter()
        .filter_map(|t| {
            let [a, b, c] = t.0;
            let plane = Plane::from_points(a, b, c)?;
            Some(Polygon {
                vertices: t.0.to_vec(),
                plane,
            })
        })
        .collect()
}

fn to_mesh(polygons: &[Polygon]) -> Mesh {
    let triangles: Vec<Triangle> = polygons
        .iter()
        .flat_map(|p| {
            (1..p.vertices.len() - 1)
                .map(move |i| Triangle([p.vertices[0], p.vertices[i], p.vertices[i + 1]]))
        })
        .collect();
    let mut mesh = Mesh::from_triangles(&triangles);
    mesh.merge_vertices(WELD_TOLERANCE);
    mesh.remove_degenerate_faces(1e-12);
    mesh.remove_duplicate_faces();
    mesh.remove_unreferenced_vertices();
    mesh
}

/// Space inside either mesh.
#[must_use]
pub fn union(a: &Mesh, b: &Mesh) -> Mesh {
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }
    let mut a = Bsp::new(to_polygons(a));
    let mut b = Bsp::new(to_polygons(b));
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    let out = to_mesh(&a.all_polygons());
    debug!("union: {} faces", out.face_count());
    out
}

/// Space inside `a` but not inside `b`.
#[must_use]
pub fn difference(a: &Mesh, b: &Mesh) -> Mesh {
    if a.is_empty() {
        return Mesh::default();
    }
    if b.is_empty() {
        return a.clone();
    }
    let mut a = Bsp::new(to_polygons(a));
    let mut b = Bsp::new(to_polygons(b));
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    let out = to_mesh(&a.all_polygons());
    debug!("difference: {} faces", out.face_count());
    out
}

/// Space inside both meshes.
#[must_use]
pub fn intersection(a: &Mesh, b: &Mesh) -> Mesh {
    if a.is_empty() || b.is_empty() {
        return Mesh::default();
    }
    let mut a = Bsp::new(to_polygons(a));
    let mut b = Bsp::new(to_polygons(b));
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.all_polygons());
    a.invert();
    let out = to_mesh(&a.all_polygons());
    debug!("intersection: {} faces", out.face_count());
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::dvec3;

    use super::*;
    use crate::primitives::cuboid;
    use crate::primitives::cylinder;

    fn unit_boxes() -> (Mesh, Mesh) {
        let a = cuboid(dvec3(2.0, 2.0, 2.0));
        let b = cuboid(dvec3(2.0, 2.0, 2.0)).translated(dvec3(1.0, 1.0, 1.0));
        (a, b)
    }

    #[test]
    fn box_volumes() {
        let (a, b) = unit_boxes();
        assert_relative_eq!(union(&a, &b).volume(), 15.0, epsilon = 1e-6);
        assert_relative_eq!(difference(&a, &b).volume(), 7.0, epsilon = 1e-6);
        assert_relative_eq!(intersection(&a, &b).volume(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn drilling_a_plate() {
        let plate = cuboid(dvec3(20.0, 20.0, 4.0));
        let drill = cylinder(3.0, 10.0, 64);
        let drilled = difference(&plate, &drill);
        let hole = 0.5 * 64.0 * (std::f64::consts::TAU / 64.0).sin() * 9.0 * 4.0;
        assert_relative_eq!(drilled.volume(), 1600.0 - hole, epsilon = 1e-6);
    }

    #[test]
    fn disjoint_operands() {
        let a = cuboid(dvec3(1.0, 1.0, 1.0));
        let b = a.translated(dvec3(5.0, 0.0, 0.0));
        assert_relative_eq!(difference(&a, &b).volume(), 1.0, epsilon = 1e-9);
        assert!(intersection(&a, &b).is_empty());
        assert_relative_eq!(union(&a, &b).volume(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_operands() {
        let a = cuboid(dvec3(1.0, 1.0, 1.0));
        let empty = Mesh::default();
        assert_eq!(difference(&a, &empty), a);
        assert!(difference(&empty, &a).is_empty());
        assert_eq!(union(&empty, &a), a);
        assert!(intersection(&a, &empty).is_empty());
    }

    #[test]
    fn subtracting_everything_leaves_nothing() {
        let a = cuboid(dvec3(1.0, 1.0, 1.0));
        let b = cuboid(dvec3(3.0, 3.0, 3.0));
        assert!(difference(&a, &b).is_empty());
    }
}
