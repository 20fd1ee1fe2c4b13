//! Finding gaming control openings in a housing.
//!
//! Two detector families exist. The feature map pass works on vertex rings
//! and large horizontal faces; the control pass works on open boundary loops
//! and clusters of upward faces. Each has its own classification table and
//! its own notion of a passing layout.

use glam::DVec2;
use glam::DVec3;
use glam::dvec2;
use glam::dvec3;
use log::debug;
use log::info;
use serde::Serialize;

use crate::adjacency::MeshAdjacency;
use crate::analysis::decimetre_key;
use crate::cluster::clusters;
use crate::cluster::dbscan;
use crate::cluster::dbscan_2d;
use crate::fit::centroid_circle;
use crate::fit::fit_circle_2d;
use crate::fit::linspace;
use crate::fit::mean;
use crate::mesh::Aabb;
use crate::mesh::Mesh;
use crate::ray::RayCaster;

/// A ring of vertices at one height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CircularFeature {
    /// Ring centre, Z is the level the ring was found on.
    pub center: DVec3,
    /// Mean distance of the ring points from the centre.
    pub radius: f64,
    /// Spread of those distances.
    pub radius_std: f64,
    /// Vertices in the ring.
    pub point_count: usize,
    /// `1 - radius_std / radius`.
    pub circularity: f64,
}

/// Rings of vertices with a radius in `min_radius..=max_radius`.
///
/// Vertex heights are rounded to 0.1 mm. Each distinct height with at least
/// ten vertices within 0.5 mm is clustered in XY; a cluster of eight or more
/// points whose distance spread is under 30% of its radius is a ring.
#[must_use]
pub fn detect_circular_features(
    mesh: &Mesh,
    min_radius: f64,
    max_radius: f64,
    z_range: Option<(f64, f64)>,
) -> Vec<CircularFeature> {
    let vertices: Vec<DVec3> = mesh
        .vertices
        .iter()
        .copied()
        .filter(|v| z_range.is_none_or(|(lo, hi)| v.z >= lo && v.z <= hi))
        .collect();

    let mut levels: Vec<i64> = vertices.iter().map(|v| decimetre_key(v.z)).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut out = Vec::new();
    for key in levels {
        let z = key as f64 / 10.0;
        let xy: Vec<DVec2> = vertices
            .iter()
            .filter(|v| (v.z - z).abs() < 0.5)
            .map(|v| v.truncate())
            .collect();
        if xy.len() < 10 {
            continue;
        }
        let labels = dbscan_2d(&xy, 2.0, 5);
        for members in clusters(&labels) {
            if members.len() < 8 {
                continue;
            }
            let points: Vec<DVec2> = members.iter().map(|&i| xy[i]).collect();
            let Some(circle) = centroid_circle(&points) else {
                continue;
            };
            if circle.radius_std < circle.radius * 0.3
                && (min_radius..=max_radius).contains(&circle.radius)
            {
                out.push(CircularFeature {
                    center: circle.center.extend(z),
                    radius: circle.radius,
                    radius_std: circle.radius_std,
                    point_count: points.len(),
                    circularity: 1.0 - circle.radius_std / circle.radius,
                });
            }
        }
    }
    info!("found {} circular features", out.len());
    out
}

/// An open loop of boundary edges fitted with a circle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CircularHole {
    /// Fitted centre, Z is the mean height of the loop.
    pub center: DVec3,
    /// Fitted radius.
    pub radius: f64,
    /// Boundary edge endpoints in the cluster.
    pub point_count: usize,
}

/// Circles fitted to clusters of boundary edge endpoints.
///
/// Endpoints are clustered in 3D (eps 5 mm, 3 samples); clusters of at least
/// four points get an algebraic circle fit in XY.
#[must_use]
pub fn detect_circular_holes(mesh: &Mesh, min_radius: f64, max_radius: f64) -> Vec<CircularHole> {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut edges: Vec<(u32, u32)> = adjacency.boundary_edges().collect();
    edges.sort_unstable();
    let points: Vec<DVec3> = edges
        .iter()
        .flat_map(|&(a, b)| [a, b])
        .map(|v| mesh.vertices[v as usize])
        .collect();
    if points.len() <= 3 {
        debug!("{} boundary points, no holes to fit", points.len());
        return Vec::new();
    }

    let labels = dbscan(&points, 5.0, 3);
    let mut out = Vec::new();
    for members in clusters(&labels) {
        if members.len() < 4 {
            continue;
        }
        let xy: Vec<DVec2> = members.iter().map(|&i| points[i].truncate()).collect();
        let Some(circle) = fit_circle_2d(&xy) else {
            continue;
        };
        if (min_radius..=max_radius).contains(&circle.radius) {
            let z: Vec<f64> = members.iter().map(|&i| points[i].z).collect();
            out.push(CircularHole {
                center: circle.center.extend(mean(&z)),
                radius: circle.radius,
                point_count: members.len(),
            });
        }
    }
    info!("found {} circular holes", out.len());
    out
}

/// A cluster of horizontal faces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RectangularFeature {
    /// Centre of the cluster.
    pub center: DVec3,
    /// Box around the face centres.
    pub bounds: Aabb,
    /// Size of that box.
    pub dimensions: DVec3,
    /// Total face area.
    pub area: f64,
    /// Faces in the cluster.
    pub face_count: usize,
}

fn face_cluster(
    mesh: &Mesh,
    faces: &[usize],
    center_of_bounds: bool,
) -> Option<RectangularFeature> {
    let centers: Vec<DVec3> = faces.iter().map(|&f| mesh.triangle(f).center()).collect();
    let bounds = Aabb::from_points(centers.iter().copied())?;
    let center = if center_of_bounds {
        bounds.center()
    } else {
        centers.iter().copied().sum::<DVec3>() / centers.len() as f64
    };
    Some(RectangularFeature {
        center,
        bounds,
        dimensions: bounds.extents(),
        area: faces.iter().map(|&f| mesh.triangle(f).area()).sum(),
        face_count: faces.len(),
    })
}

/// Groups of large horizontal faces with a total area in
/// `min_area..=max_area`.
///
/// Faces with `|n.z| > 0.8` and more than 50 mm² are clustered by their XY
/// centres (eps 10 mm, 2 samples).
#[must_use]
pub fn detect_rectangular_features(
    mesh: &Mesh,
    min_area: f64,
    max_area: f64,
) -> Vec<RectangularFeature> {
    let candidates: Vec<usize> = (0..mesh.face_count())
        .filter(|&f| {
            let t = mesh.triangle(f);
            t.normal().z.abs() > 0.8 && t.area() > 50.0
        })
        .collect();
    let xy: Vec<DVec2> = candidates
        .iter()
        .map(|&f| mesh.triangle(f).center().truncate())
        .collect();

    let out: Vec<RectangularFeature> = clusters(&dbscan_2d(&xy, 10.0, 2))
        .iter()
        .filter_map(|members| {
            let faces: Vec<usize> = members.iter().map(|&i| candidates[i]).collect();
            face_cluster(mesh, &faces, false)
        })
        .filter(|r| (min_area..=max_area).contains(&r.area))
        .collect();
    info!("found {} rectangular features", out.len());
    out
}

/// Clusters of upward facing faces between 5 and 50 mm on both sides.
///
/// Face centres with `n.z > 0.8` are clustered in 3D (eps 3 mm, 5 samples).
#[must_use]
pub fn detect_upward_rectangles(mesh: &Mesh) -> Vec<RectangularFeature> {
    let upward: Vec<usize> = (0..mesh.face_count())
        .filter(|&f| mesh.triangle(f).normal().z > 0.8)
        .collect();
    let centers: Vec<DVec3> = upward
        .iter()
        .map(|&f| mesh.triangle(f).center())
        .collect();
    let within = |v: f64| v > 5.0 && v < 50.0;

    let out: Vec<RectangularFeature> = clusters(&dbscan(&centers, 3.0, 5))
        .iter()
        .filter(|members| members.len() >= 4)
        .filter_map(|members| {
            let faces: Vec<usize> = members.iter().map(|&i| upward[i]).collect();
            face_cluster(mesh, &faces, true)
        })
        .filter(|r| within(r.dimensions.x) && within(r.dimensions.y))
        .collect();
    info!("found {} upward rectangles", out.len());
    out
}

/// What a downward ray through the part found.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RayHoleKind {
    /// The ray missed the part entirely.
    ThroughHole,
    /// The ray crossed more than two surfaces spanning over 5 mm.
    Cutout {
        /// Height spanned by the hits.
        depth: f64,
        /// Lowest hit.
        z_min: f64,
        /// Highest hit.
        z_max: f64,
    },
}

/// A ray position that looks like an opening.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RayHole {
    /// XY position of the ray.
    pub center: DVec2,
    /// What was found.
    #[serde(flatten)]
    pub kind: RayHoleKind,
}

/// Cast a 50 by 20 grid of rays straight down, inset 5 mm from the bounds
/// and starting 10 mm above the part.
#[must_use]
pub fn detect_ray_holes(mesh: &Mesh) -> Vec<RayHole> {
    let Some(bounds) = mesh.bounds() else {
        return Vec::new();
    };
    let caster = RayCaster::new(mesh);
    let z_start = bounds.max.z + 10.0;
    let xs = linspace(bounds.min.x + 5.0, bounds.max.x - 5.0, 50);
    let ys = linspace(bounds.min.y + 5.0, bounds.max.y - 5.0, 20);

    let mut out = Vec::new();
    for &x in &xs {
        for &y in &ys {
            let hits = caster.intersect_all(dvec3(x, y, z_start), DVec3::NEG_Z);
            let center = dvec2(x, y);
            if hits.is_empty() {
                out.push(RayHole {
                    center,
                    kind: RayHoleKind::ThroughHole,
                });
            } else if hits.len() > 2 {
                let (z_min, z_max) = hits.iter().fold((f64::MAX, f64::MIN), |(lo, hi), h| {
                    (lo.min(h.point.z), hi.max(h.point.z))
                });
                if z_max - z_min > 5.0 {
                    out.push(RayHole {
                        center,
                        kind: RayHoleKind::Cutout {
                            depth: z_max - z_min,
                            z_min,
                            z_max,
                        },
                    });
                }
            }
        }
    }
    info!(
        "cast {} rays, {} openings",
        xs.len() * ys.len(),
        out.len()
    );
    out
}

/// Control a detected feature was matched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Analog stick opening, radius 14 to 18 mm.
    Joystick,
    /// ABXY sized button in the feature map.
    LargeButton,
    /// Start or menu sized button in the feature map.
    SmallButton,
    /// ABXY button in the control layout.
    Abxy,
    /// Start or menu button in the control layout.
    StartMenu,
    /// Roughly square 20 to 30 mm opening.
    Dpad,
    /// Shoulder button slot.
    Shoulder,
    /// Trigger slot.
    Trigger,
    /// Matched nothing in the feature map.
    Unknown,
    /// Unmatched round opening in the control layout.
    Circular,
    /// Unmatched rectangular opening in the control layout.
    Rectangular,
}

/// Size of a detected feature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Shape {
    /// A round opening.
    Round {
        /// Radius.
        radius: f64,
        /// Twice the radius.
        diameter: f64,
    },
    /// A rectangular opening.
    Rect {
        /// Width, depth and height of the face centre box.
        dimensions: DVec3,
        /// Total face area, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        area: Option<f64>,
    },
}

impl Shape {
    const fn round(radius: f64) -> Self {
        Self::Round {
            radius,
            diameter: radius * 2.0,
        }
    }
}

/// A feature after classification.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DetectedFeature {
    /// Position.
    pub center: DVec3,
    /// Matched control.
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    /// Size.
    #[serde(flatten)]
    pub shape: Shape,
}

/// Detected controls, as reported by the feature map pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FeatureMap {
    /// Radius 14 to 18 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joysticks: Vec<DetectedFeature>,
    /// Radius 5 to 8 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub large_buttons: Vec<DetectedFeature>,
    /// Radius 3 to 5 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub small_buttons: Vec<DetectedFeature>,
    /// Square 20 to 30 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dpad: Vec<DetectedFeature>,
    /// 15 to 22 by 6 to 10 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<DetectedFeature>,
    /// Round, other sizes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_circular: Vec<DetectedFeature>,
    /// Rectangular, other sizes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_rectangular: Vec<DetectedFeature>,
}

/// Sort rings and face clusters into controls by size.
#[must_use]
pub fn classify_features(
    circular: &[CircularFeature],
    rectangular: &[RectangularFeature],
) -> FeatureMap {
    let mut map = FeatureMap::default();
    for c in circular {
        let (kind, list) = match c.radius {
            r if (14.0..=18.0).contains(&r) => (FeatureKind::Joystick, &mut map.joysticks),
            r if (5.0..=8.0).contains(&r) => (FeatureKind::LargeButton, &mut map.large_buttons),
            r if (3.0..=5.0).contains(&r) => (FeatureKind::SmallButton, &mut map.small_buttons),
            _ => (FeatureKind::Unknown, &mut map.unknown_circular),
        };
        list.push(DetectedFeature {
            center: c.center,
            kind,
            shape: Shape::round(c.radius),
        });
    }
    for r in rectangular {
        let d = r.dimensions;
        let (long, short) = (d.x.max(d.y), d.x.min(d.y));
        let (kind, list) = if (20.0..=30.0).contains(&d.x)
            && (20.0..=30.0).contains(&d.y)
            && (d.x - d.y).abs() < 5.0
        {
            (FeatureKind::Dpad, &mut map.dpad)
        } else if (15.0..=22.0).contains(&long) && (6.0..=10.0).contains(&short) {
            (FeatureKind::Trigger, &mut map.triggers)
        } else {
            (FeatureKind::Unknown, &mut map.unknown_rectangular)
        };
        list.push(DetectedFeature {
            center: r.center,
            kind,
            shape: Shape::Rect {
                dimensions: d,
                area: Some(r.area),
            },
        });
    }
    map
}

/// Expected and found count of one control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ControlCount {
    /// Category name.
    pub name: &'static str,
    /// How many the design calls for.
    pub expected: usize,
    /// How many were detected.
    pub found: usize,
    /// Design size.
    pub description: &'static str,
}

impl ControlCount {
    /// At least as many as expected.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.found >= self.expected
    }

    /// Exactly as many as expected.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.found == self.expected
    }
}

impl FeatureMap {
    /// Found against expected count per category.
    #[must_use]
    pub fn verify(&self) -> Vec<ControlCount> {
        let count = |name, expected, list: &Vec<_>, description| ControlCount {
            name,
            expected,
            found: list.len(),
            description,
        };
        vec![
            count("joysticks", 2, &self.joysticks, "∅32mm (radius ~16mm)"),
            count("large_buttons", 4, &self.large_buttons, "∅12mm ABXY buttons"),
            count(
                "small_buttons",
                2,
                &self.small_buttons,
                "∅8mm Start/Menu buttons",
            ),
            count(
                "dpad",
                1,
                &self.dpad,
                "24×24mm square with rounded corners",
            ),
            count("triggers", 2, &self.triggers, "18×8mm trigger slots (L2/R2)"),
        ]
    }

    /// Every category has at least its expected count.
    #[must_use]
    pub fn all_present(&self) -> bool {
        self.verify().iter().all(ControlCount::is_present)
    }

    /// Named lists in report order.
    #[must_use]
    pub fn categories(&self) -> [(&'static str, &[DetectedFeature]); 7] {
        [
            ("joysticks", &self.joysticks),
            ("large_buttons", &self.large_buttons),
            ("small_buttons", &self.small_buttons),
            ("dpad", &self.dpad),
            ("triggers", &self.triggers),
            ("unknown_circular", &self.unknown_circular),
            ("unknown_rectangular", &self.unknown_rectangular),
        ]
    }
}

/// Detected controls, as reported by the control verification pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ControlLayout {
    /// Radius 14 to 18 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joysticks: Vec<DetectedFeature>,
    /// 20 to 30 mm on both sides.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dpad: Vec<DetectedFeature>,
    /// Radius 5 to 7 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abxy: Vec<DetectedFeature>,
    /// Radius 3 to 5 mm.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub start_menu: Vec<DetectedFeature>,
    /// 8 to 15 by 3 to 6 mm, either way round.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shoulder_buttons: Vec<DetectedFeature>,
    /// 15 to 25 by 6 to 12 mm, either way round.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<DetectedFeature>,
    /// Anything else.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub other_features: Vec<DetectedFeature>,
}

fn either_way(d: DVec3, a: (f64, f64), b: (f64, f64)) -> bool {
    let within = |v: f64, (lo, hi): (f64, f64)| (lo..=hi).contains(&v);
    (within(d.x, a) && within(d.y, b)) || (within(d.x, b) && within(d.y, a))
}

/// Sort boundary holes and upward rectangles into controls by size.
#[must_use]
pub fn classify_controls(
    holes: &[CircularHole],
    rectangles: &[RectangularFeature],
) -> ControlLayout {
    let mut layout = ControlLayout::default();
    for h in holes {
        let (kind, list) = match h.radius {
            r if (14.0..=18.0).contains(&r) => (FeatureKind::Joystick, &mut layout.joysticks),
            r if (5.0..=7.0).contains(&r) => (FeatureKind::Abxy, &mut layout.abxy),
            r if (3.0..=5.0).contains(&r) => (FeatureKind::StartMenu, &mut layout.start_menu),
            _ => (FeatureKind::Circular, &mut layout.other_features),
        };
        list.push(DetectedFeature {
            center: h.center,
            kind,
            shape: Shape::round(h.radius),
        });
    }
    for r in rectangles {
        let d = r.dimensions;
        let (kind, list) = if (20.0..=30.0).contains(&d.x) && (20.0..=30.0).contains(&d.y) {
            (FeatureKind::Dpad, &mut layout.dpad)
        } else if either_way(d, (8.0, 15.0), (3.0, 6.0)) {
            (FeatureKind::Shoulder, &mut layout.shoulder_buttons)
        } else if either_way(d, (15.0, 25.0), (6.0, 12.0)) {
            (FeatureKind::Trigger, &mut layout.triggers)
        } else {
            (FeatureKind::Rectangular, &mut layout.other_features)
        };
        list.push(DetectedFeature {
            center: r.center,
            kind,
            shape: Shape::Rect {
                dimensions: d,
                area: None,
            },
        });
    }
    layout
}

impl ControlLayout {
    /// Found against expected count per control.
    #[must_use]
    pub fn validate(&self) -> Vec<ControlCount> {
        let count = |name, expected, list: &Vec<_>, description| ControlCount {
            name,
            expected,
            found: list.len(),
            description,
        };
        vec![
            count("joysticks", 2, &self.joysticks, "∅32mm"),
            count("dpad", 1, &self.dpad, "24×24mm"),
            count("abxy", 4, &self.abxy, "∅12mm"),
            count("start_menu", 2, &self.start_menu, "∅8mm"),
            count("shoulder_buttons", 2, &self.shoulder_buttons, "11×4mm"),
            count("triggers", 2, &self.triggers, "18×8mm"),
        ]
    }

    /// Every control found exactly the expected number of times.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().iter().all(ControlCount::is_exact)
    }
}

/// Everything the feature map pass produced.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureScan {
    /// Vertex rings of radius 3 to 20 mm.
    pub circular: Vec<CircularFeature>,
    /// Horizontal face groups of 50 to 2000 mm².
    pub rectangular: Vec<RectangularFeature>,
    /// Classified result.
    pub map: FeatureMap,
}

/// Run the feature map pass.
#[must_use]
pub fn scan_features(mesh: &Mesh) -> FeatureScan {
    let circular = detect_circular_features(mesh, 3.0, 20.0, None);
    let rectangular = detect_rectangular_features(mesh, 50.0, 2000.0);
    let map = classify_features(&circular, &rectangular);
    FeatureScan {
        circular,
        rectangular,
        map,
    }
}

/// Everything the control verification pass produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlScan {
    /// Boundary loops of radius 4 to 20 mm.
    pub holes: Vec<CircularHole>,
    /// Upward face clusters.
    pub rectangles: Vec<RectangularFeature>,
    /// Classified result.
    pub layout: ControlLayout,
}

/// Run the control verification pass.
#[must_use]
pub fn scan_controls(mesh: &Mesh) -> ControlScan {
    let holes = detect_circular_holes(mesh, 4.0, 20.0);
    let rectangles = detect_upward_rectangles(mesh);
    let layout = classify_controls(&holes, &rectangles);
    ControlScan {
        holes,
        rectangles,
        layout,
    }
}

#[derive(Clone, Debug, Serialize)]
struct FeatureMapMetadata<'a> {
    generated_by: &'static str,
    mesh_file: &'a str,
    mesh_bounds: Option<Aabb>,
    units: &'static str,
}

/// JSON document written by the feature map pass.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureMapDocument<'a> {
    metadata: FeatureMapMetadata<'a>,
    features: &'a FeatureMap,
}

impl<'a> FeatureMapDocument<'a> {
    /// Wrap `map` with the mesh file name and bounds.
    #[must_use]
    pub fn new(mesh_file: &'a str, mesh: &Mesh, map: &'a FeatureMap) -> Self {
        Self {
            metadata: FeatureMapMetadata {
                generated_by: "nucdeck feature detection",
                mesh_file,
                mesh_bounds: mesh.bounds(),
                units: "millimeters",
            },
            features: map,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct MeshInfo {
    bounds: Option<[DVec3; 2]>,
    dimensions: DVec3,
    center: DVec3,
    volume: f64,
    area: f64,
}

/// JSON document written by the control verification pass.
#[derive(Clone, Debug, Serialize)]
pub struct ControlMapDocument<'a> {
    mesh_info: MeshInfo,
    gaming_controls: &'a ControlLayout,
}

impl<'a> ControlMapDocument<'a> {
    /// Wrap `layout` with summary measurements of `mesh`.
    #[must_use]
    pub fn new(mesh: &Mesh, layout: &'a ControlLayout) -> Self {
        Self {
            mesh_info: MeshInfo {
                bounds: mesh.bounds().map(|b| [b.min, b.max]),
                dimensions: mesh.extents(),
                center: mesh.center_mass(),
                volume: mesh.volume(),
                area: mesh.area(),
            },
            gaming_controls: layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use approx::assert_relative_eq;

    use super::*;
    use crate::csg::difference;
    use crate::primitives::cuboid;

    fn ring(center: DVec3, radius: f64, n: usize) -> Vec<DVec3> {
        (0..n)
            .map(|i| {
                let a = TAU * i as f64 / n as f64;
                center + radius * dvec3(a.cos(), a.sin(), 0.0)
            })
            .collect()
    }

    // Flat annulus: the inner loop is an open hole, the outer loop is too
    // coarse to cluster.
    fn annulus(center: DVec3, inner: f64, outer: f64, n: usize) -> Mesh {
        let mut vertices = ring(center, inner, n);
        vertices.extend(ring(center, outer, n));
        let n = n as u32;
        let faces = (0..n)
            .flat_map(|i| {
                let j = (i + 1) % n;
                [[i, n + i, n + j], [i, n + j, j]]
            })
            .collect();
        Mesh::new(vertices, faces)
    }

    // Upward facing grid of `cells` by `cells` squares.
    fn patch(origin: DVec3, cell: f64, cells: u32) -> Mesh {
        let side = cells + 1;
        let vertices = (0..side * side)
            .map(|k| origin + dvec3(f64::from(k % side) * cell, f64::from(k / side) * cell, 0.0))
            .collect();
        let faces = (0..cells)
            .flat_map(|y| (0..cells).map(move |x| (x, y)))
            .flat_map(|(x, y)| {
                let a = y * side + x;
                [[a, a + 1, a + side + 1], [a, a + side + 1, a + side]]
            })
            .collect();
        Mesh::new(vertices, faces)
    }

    #[test]
    fn vertex_ring_is_circular_feature() {
        let mut vertices = ring(dvec3(36.5, 15.0, 4.0), 16.0, 128);
        vertices.extend(ring(dvec3(120.0, 15.0, 4.0), 40.0, 8));
        let mesh = Mesh::new(vertices, Vec::new());
        let found = detect_circular_features(&mesh, 3.0, 20.0, None);
        assert_eq!(found.len(), 1);
        assert_relative_eq!(found[0].center.x, 36.5, epsilon = 1e-9);
        assert_relative_eq!(found[0].radius, 16.0, epsilon = 1e-9);
        assert_relative_eq!(found[0].circularity, 1.0, epsilon = 1e-9);
        assert!(detect_circular_features(&mesh, 3.0, 20.0, Some((10.0, 20.0))).is_empty());
    }

    #[test]
    fn open_loop_is_circular_hole() {
        let mesh = annulus(dvec3(257.5, 15.0, 2.0), 16.0, 30.0, 32);
        let holes = detect_circular_holes(&mesh, 4.0, 20.0);
        assert_eq!(holes.len(), 1);
        assert_relative_eq!(holes[0].center.x, 257.5, epsilon = 1e-6);
        assert_relative_eq!(holes[0].center.z, 2.0, epsilon = 1e-9);
        assert_relative_eq!(holes[0].radius, 16.0, epsilon = 1e-6);
        assert!(detect_circular_holes(&cuboid(DVec3::ONE), 4.0, 20.0).is_empty());
    }

    #[test]
    fn upward_patch_is_dpad() {
        let mesh = patch(dvec3(20.0, -30.0, 3.0), 2.0, 12);
        let found = detect_upward_rectangles(&mesh);
        assert_eq!(found.len(), 1);
        let d = found[0].dimensions;
        assert_relative_eq!(d.x, 24.0 - 4.0 / 3.0, epsilon = 1e-9);
        let layout = classify_controls(&[], &found);
        assert_eq!(layout.dpad.len(), 1);
        assert_eq!(layout.dpad[0].kind, FeatureKind::Dpad);
    }

    #[test]
    fn large_faces_group_by_area() {
        let mesh = patch(DVec3::ZERO, 12.0, 2);
        let found = detect_rectangular_features(&mesh, 50.0, 2000.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].face_count, 8);
        assert_relative_eq!(found[0].area, 576.0, epsilon = 1e-9);
        assert!(detect_rectangular_features(&mesh, 50.0, 500.0).is_empty());
    }

    #[test]
    fn through_hole_rays() {
        let plate = cuboid(dvec3(100.0, 40.0, 2.0));
        let drilled = difference(&plate, &cuboid(dvec3(20.0, 20.0, 10.0)));
        let holes = detect_ray_holes(&drilled);
        assert_eq!(holes.len(), 120);
        assert!(holes.iter().all(|h| h.kind == RayHoleKind::ThroughHole
            && h.center.x.abs() < 10.0
            && h.center.y.abs() < 10.0));
        assert!(detect_ray_holes(&plate).is_empty());
    }

    fn round(radius: f64) -> CircularFeature {
        CircularFeature {
            center: DVec3::ZERO,
            radius,
            radius_std: 0.0,
            point_count: 16,
            circularity: 1.0,
        }
    }

    fn rect(x: f64, y: f64) -> RectangularFeature {
        let bounds = Aabb::new(DVec3::ZERO, dvec3(x, y, 0.0));
        RectangularFeature {
            center: bounds.center(),
            bounds,
            dimensions: bounds.extents(),
            area: 100.0,
            face_count: 4,
        }
    }

    #[test]
    fn feature_map_classification() {
        let circles = [16.0, 6.0, 6.0, 6.0, 6.0, 4.0, 4.0, 16.0, 2.0].map(round);
        let rects = [rect(24.0, 24.0), rect(8.0, 18.0), rect(18.0, 8.0), rect(40.0, 4.0)];
        let map = classify_features(&circles, &rects);
        assert_eq!(map.joysticks.len(), 2);
        assert_eq!(map.large_buttons.len(), 4);
        assert_eq!(map.small_buttons.len(), 2);
        assert_eq!(map.dpad.len(), 1);
        assert_eq!(map.triggers.len(), 2);
        assert_eq!(map.unknown_circular.len(), 1);
        assert_eq!(map.unknown_rectangular.len(), 1);
        assert!(map.all_present());
    }

    #[test]
    fn boundary_radius_takes_first_match() {
        // Radius 5 is both a large and a small button; large wins.
        let map = classify_features(&[round(5.0)], &[]);
        assert_eq!(map.large_buttons.len(), 1);
        let holes = [CircularHole {
            center: DVec3::ZERO,
            radius: 5.0,
            point_count: 8,
        }];
        assert_eq!(classify_controls(&holes, &[]).abxy.len(), 1);
    }

    #[test]
    fn control_layout_requires_exact_counts() {
        let rects = [
            rect(24.0, 24.0),
            rect(11.0, 4.0),
            rect(4.0, 11.0),
            rect(18.0, 8.0),
            rect(8.0, 18.0),
        ];
        let holes: Vec<CircularHole> = [16.0, 16.0, 6.0, 6.0, 6.0, 6.0, 4.0, 4.0]
            .map(|radius| CircularHole {
                center: DVec3::ZERO,
                radius,
                point_count: 8,
            })
            .to_vec();
        let mut layout = classify_controls(&holes, &rects);
        assert!(layout.is_valid());
        layout.joysticks.push(layout.joysticks[0]);
        assert!(!layout.is_valid());
        let joysticks = layout.validate()[0];
        assert!(joysticks.is_present() && !joysticks.is_exact());
    }

    #[test]
    fn feature_map_json_layout() {
        let map = classify_features(&[round(16.0)], &[rect(24.0, 24.0)]);
        let mesh = cuboid(dvec3(2.0, 2.0, 2.0));
        let json = serde_json::to_value(FeatureMapDocument::new("front.stl", &mesh, &map)).unwrap();
        assert_eq!(json["metadata"]["units"], "millimeters");
        assert_eq!(json["metadata"]["mesh_bounds"]["min"][0], -1.0);
        assert_eq!(json["features"]["joysticks"][0]["type"], "joystick");
        assert_eq!(json["features"]["joysticks"][0]["diameter"], 32.0);
        assert_eq!(json["features"]["dpad"][0]["area"], 100.0);
        assert!(json["features"].get("triggers").is_none());

        let layout = classify_controls(&[], &[rect(11.0, 4.0)]);
        let json = serde_json::to_value(ControlMapDocument::new(&mesh, &layout)).unwrap();
        assert_relative_eq!(json["mesh_info"]["volume"].as_f64().unwrap(), 8.0, epsilon = 1e-9);
        assert_eq!(json["gaming_controls"]["shoulder_buttons"][0]["type"], "shoulder");
        assert!(json["gaming_controls"]["shoulder_buttons"][0].get("area").is_none());
    }
}
