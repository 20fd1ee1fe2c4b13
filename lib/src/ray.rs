//! Ray queries against a triangle mesh.
//!
//! Faces are bucketed in a bounding volume hierarchy split at the median
//! centroid along the longest axis; leaves hold a handful of faces that are
//! tested with the Möller–Trumbore algorithm.

use glam::DVec3;
use glam::dvec3;

use crate::mesh::Aabb;
use crate::mesh::Mesh;

const LEAF_SIZE: usize = 8;
const HIT_EPSILON: f64 = 1e-9;

/// Directions used for the inside test, deliberately off every axis.
const PARITY_DIRECTIONS: [DVec3; 3] = [
    dvec3(0.577_350_3, 0.577_350_2, 0.577_350_4),
    dvec3(-0.612_372_4, 0.353_553_4, 0.707_106_8),
    dvec3(0.267_261_2, -0.801_783_7, 0.534_522_5),
];

/// One ray/triangle intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Distance along the (normalised) ray.
    pub t: f64,
    /// Intersection point.
    pub point: DVec3,
    /// Index of the face that was hit.
    pub face: usize,
}

/// A node of the hierarchy, either a leaf holding faces or two children.
#[derive(Debug, Clone)]
enum BvhNode {
    Leaf {
        aabb: Aabb,
        faces: Vec<usize>,
    },
    Internal {
        aabb: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    const fn aabb(&self) -> &Aabb {
        match self {
            Self::Leaf { aabb, .. } | Self::Internal { aabb, .. } => aabb,
        }
    }
}

fn build_node(items: &mut [(usize, Aabb, DVec3)]) -> BvhNode {
    let mut aabb = items[0].1;
    for (_, b, _) in items.iter() {
        aabb.expand(b.min);
        aabb.expand(b.max);
    }
    if items.len() <= LEAF_SIZE {
        return BvhNode::Leaf {
            aabb,
            faces: items.iter().map(|(i, _, _)| *i).collect(),
        };
    }

    let extents = aabb.extents();
    let axis = if extents.x >= extents.y && extents.x >= extents.z {
        0
    } else if extents.y >= extents.z {
        1
    } else {
        2
    };
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| a.2[axis].total_cmp(&b.2[axis]));
    let (left, right) = items.split_at_mut(mid);
    BvhNode::Internal {
        aabb,
        left: Box::new(build_node(left)),
        right: Box::new(build_node(right)),
    }
}

/// Slab test, entry distance when the ray meets the box in front of it.
fn ray_aabb(origin: DVec3, inv_dir: DVec3, aabb: &Aabb) -> Option<f64> {
    let mut t_min = 0.0_f64;
    let mut t_max = f64::INFINITY;
    for axis in 0..3 {
        let inv = inv_dir[axis];
        if inv.is_infinite() {
            if origin[axis] < aabb.min[axis] || origin[axis] > aabb.max[axis] {
                return None;
            }
            continue;
        }
        let t1 = (aabb.min[axis] - origin[axis]) * inv;
        let t2 = (aabb.max[axis] - origin[axis]) * inv;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }
    (t_max >= t_min).then_some(t_min)
}

/// Möller–Trumbore intersection, both faces, edges inclusive.
#[must_use]
pub fn intersect_triangle(origin: DVec3, dir: DVec3, corners: [DVec3; 3]) -> Option<f64> {
    let [a, b, c] = corners;
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-14 * e1.length() * e2.length() {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(-1e-12..=1.0 + 1e-12).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < -1e-12 || u + v > 1.0 + 1e-12 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > HIT_EPSILON).then_some(t)
}

/// Closest point on a triangle (Ericson, Real-Time Collision Detection 5.1.5).
#[must_use]
pub fn closest_point_on_triangle(p: DVec3, corners: [DVec3; 3]) -> DVec3 {
    let [a, b, c] = corners;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }
    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Ray caster over a borrowed mesh.
#[derive(Debug, Clone)]
pub struct RayCaster<'a> {
    mesh: &'a Mesh,
    root: Option<BvhNode>,
}

impl<'a> RayCaster<'a> {
    /// Build the hierarchy for `mesh`.
    #[must_use]
    pub fn new(mesh: &'a Mesh) -> Self {
        let mut items: Vec<(usize, Aabb, DVec3)> = (0..mesh.face_count())
            .filter_map(|i| {
                let t = mesh.triangle(i);
                let aabb = Aabb::from_points(t.0)?;
                Some((i, aabb, aabb.center()))
            })
            .collect();
        let root = (!items.is_empty()).then(|| build_node(&mut items));
        Self { mesh, root }
    }

    /// The mesh being queried.
    #[must_use]
    pub const fn mesh(&self) -> &'a Mesh {
        self.mesh
    }

    /// Every intersection along the ray, nearest first.
    ///
    /// Hits within 1e-9 of each other (a ray through a shared edge or
    /// vertex) are reported once.
    #[must_use]
    pub fn intersect_all(&self, origin: DVec3, direction: DVec3) -> Vec<Hit> {
        let dir = direction.normalize_or_zero();
        if dir == DVec3::ZERO {
            return Vec::new();
        }
        let inv_dir = dir.recip();
        let mut hits = Vec::new();
        let mut stack: Vec<&BvhNode> = self.root.iter().collect();
        while let Some(node) = stack.pop() {
            if ray_aabb(origin, inv_dir, node.aabb()).is_none() {
                continue;
            }
            match node {
                BvhNode::Leaf { faces, .. } => {
                    for &face in faces {
                        if let Some(t) = intersect_triangle(origin, dir, self.mesh.triangle(face).0)
                        {
                            hits.push(Hit {
                                t,
                                point: origin + dir * t,
                                face,
                            });
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        hits.sort_by(|a, b| a.t.total_cmp(&b.t).then(a.face.cmp(&b.face)));
        hits.dedup_by(|later, kept| later.t - kept.t < HIT_EPSILON);
        hits
    }

    /// Nearest intersection along the ray.
    #[must_use]
    pub fn first_hit(&self, origin: DVec3, direction: DVec3) -> Option<Hit> {
        self.intersect_all(origin, direction).into_iter().next()
    }

    /// Inside test by hit parity, majority of three skewed directions.
    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        let inside = PARITY_DIRECTIONS
            .iter()
            .filter(|d| self.intersect_all(point, **d).len() % 2 == 1)
            .count();
        inside >= 2
    }

    /// Nearest point on the surface, its distance and face, `None` when empty.
    #[must_use]
    pub fn closest_point(&self, point: DVec3) -> Option<(DVec3, f64, usize)> {
        (0..self.mesh.face_count())
            .map(|i| {
                let q = closest_point_on_triangle(point, self.mesh.triangle(i).0);
                (q, q.distance(point), i)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::primitives::cuboid;
    use crate::primitives::cylinder;

    #[test]
    fn ray_through_box_hits_twice() {
        let cube = cuboid(dvec3(10.0, 10.0, 10.0));
        let caster = RayCaster::new(&cube);
        let hits = caster.intersect_all(dvec3(0.0, 0.0, 20.0), DVec3::NEG_Z);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].t, 15.0, epsilon = 1e-9);
        assert_relative_eq!(hits[1].point.z, -5.0, epsilon = 1e-9);
    }

    #[test]
    fn miss_and_zero_direction() {
        let cube = cuboid(dvec3(1.0, 1.0, 1.0));
        let caster = RayCaster::new(&cube);
        assert!(caster.intersect_all(dvec3(5.0, 5.0, 5.0), DVec3::Z).is_empty());
        assert!(caster.intersect_all(DVec3::ZERO, DVec3::ZERO).is_empty());
        assert!(caster.first_hit(dvec3(0.0, 0.0, 3.0), DVec3::Z).is_none());
    }

    #[test]
    fn inside_outside() {
        let cyl = cylinder(5.0, 10.0, 32);
        let caster = RayCaster::new(&cyl);
        assert!(caster.contains(DVec3::ZERO));
        assert!(caster.contains(dvec3(3.0, 0.0, 4.0)));
        assert!(!caster.contains(dvec3(6.0, 0.0, 0.0)));
        assert!(!caster.contains(dvec3(0.0, 0.0, 6.0)));
    }

    #[test]
    fn closest_point_on_face() {
        let cube = cuboid(dvec3(2.0, 2.0, 2.0));
        let caster = RayCaster::new(&cube);
        let (p, d, _) = caster.closest_point(dvec3(0.2, 0.1, 4.0)).unwrap();
        assert_relative_eq!(d, 3.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-9);
    }
}
