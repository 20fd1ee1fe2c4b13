//! Whole-mesh measurements used to plan component placement.
//!
//! Every function here is read only. Reports implement [`fmt::Display`] in
//! the layout the command line tool prints.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec2;
use glam::DVec3;
use glam::dvec2;
use glam::dvec3;
use log::debug;
use log::warn;
use serde::Serialize;

use crate::MeshError;
use crate::MeshResult;
use crate::adjacency::MeshAdjacency;
use crate::adjacency::is_winding_consistent;
use crate::cutout::MIN_EFFECTIVE_REMOVAL;
use crate::fit::histogram;
use crate::fit::linspace;
use crate::fit::mean;
use crate::fit::percentile;
use crate::fit::std_dev;
use crate::hull::convex_hull;
use crate::mesh::Aabb;
use crate::mesh::Mesh;
use crate::ray::RayCaster;
use crate::sample::DEFAULT_SEED;
use crate::sample::sample_surface;

/// How much of its convex hull a part fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Ratio below 0.3.
    HighlyComplex,
    /// Ratio below 0.7.
    ModeratelyComplex,
    /// Anything fuller.
    Simple,
}

impl Complexity {
    /// Classify a volume to hull volume ratio.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.3 {
            Self::HighlyComplex
        } else if ratio < 0.7 {
            Self::ModeratelyComplex
        } else {
            Self::Simple
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HighlyComplex => "Highly complex with major internal cavities",
            Self::ModeratelyComplex => "Moderately complex with some internal features",
            Self::Simple => "Relatively simple geometry",
        })
    }
}

/// Basic measurements of one part.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeshAnalysis {
    /// Number of vertices.
    pub vertices: usize,
    /// Number of faces.
    pub faces: usize,
    /// Enclosed volume in mm³.
    pub volume: f64,
    /// Surface area in mm².
    pub area: f64,
    /// Closed surface.
    pub watertight: bool,
    /// Neighbouring faces agree on orientation.
    pub winding_consistent: bool,
    /// Bounding box.
    pub bounds: Aabb,
    /// Width, depth and height.
    pub dimensions: DVec3,
    /// Uniform density centre of mass.
    pub center_mass: DVec3,
    /// Centre of the bounding box.
    pub geometric_center: DVec3,
    /// `V - E + F`.
    pub euler_number: i64,
    /// Twice the mean distance from sampled surface points to the surface.
    pub wall_thickness: f64,
    /// Faces with `|n.z| < 0.1`.
    pub vertical_faces: usize,
    /// Faces with `|n.z| > 0.9`.
    pub horizontal_faces: usize,
    /// Volume divided by convex hull volume, `None` for a flat part.
    pub hull_ratio: Option<f64>,
}

impl MeshAnalysis {
    /// Complexity class of the hull ratio.
    #[must_use]
    pub fn complexity(&self) -> Option<Complexity> {
        self.hull_ratio.map(Complexity::from_ratio)
    }

    /// A part filling less than 80% of its hull probably has cavities.
    #[must_use]
    pub fn has_internal_cavities(&self) -> bool {
        self.hull_ratio.is_some_and(|r| r < 0.8)
    }
}

/// Measure `mesh`.
///
/// # Errors
///   When the mesh has no faces.
pub fn analyze(mesh: &Mesh) -> MeshResult<MeshAnalysis> {
    let bounds = mesh
        .bounds()
        .filter(|_| !mesh.is_empty())
        .ok_or_else(|| MeshError::EmptyMesh("nothing to analyse".into()))?;

    let caster = RayCaster::new(mesh);
    let distances: Vec<f64> = sample_surface(mesh, 1000, DEFAULT_SEED)
        .iter()
        .take(100)
        .filter_map(|s| caster.closest_point(s.point).map(|(_, d, _)| d))
        .collect();

    let normals = mesh.face_normals();
    let volume = mesh.volume();
    let hull_ratio = convex_hull(&mesh.vertices)
        .map(|h| h.volume())
        .filter(|v| *v > 0.0)
        .map(|hull| volume / hull);
    if hull_ratio.is_none() {
        warn!("convex hull is degenerate, skipping the hull ratio");
    }

    Ok(MeshAnalysis {
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        volume,
        area: mesh.area(),
        watertight: MeshAdjacency::build(&mesh.faces).is_watertight(),
        winding_consistent: is_winding_consistent(&mesh.faces),
        bounds,
        dimensions: bounds.extents(),
        center_mass: mesh.center_mass(),
        geometric_center: bounds.center(),
        euler_number: mesh.euler_number(),
        wall_thickness: mean(&distances) * 2.0,
        vertical_faces: normals.iter().filter(|n| n.z.abs() < 0.1).count(),
        horizontal_faces: normals.iter().filter(|n| n.z.abs() > 0.9).count(),
        hull_ratio,
    })
}

impl fmt::Display for MeshAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (b, d, c, g) = (
            self.bounds,
            self.dimensions,
            self.center_mass,
            self.geometric_center,
        );
        writeln!(f, "Vertices: {}", self.vertices)?;
        writeln!(f, "Faces: {}", self.faces)?;
        writeln!(f, "Volume: {:.2} mm³", self.volume)?;
        writeln!(f, "Surface Area: {:.2} mm²", self.area)?;
        writeln!(f, "Is Watertight: {}", self.watertight)?;
        writeln!(f, "Is Winding Consistent: {}", self.winding_consistent)?;
        writeln!(f)?;
        writeln!(f, "--- Bounding Box ---")?;
        writeln!(
            f,
            "Min coordinates (X, Y, Z): ({:.2}, {:.2}, {:.2}) mm",
            b.min.x, b.min.y, b.min.z
        )?;
        writeln!(
            f,
            "Max coordinates (X, Y, Z): ({:.2}, {:.2}, {:.2}) mm",
            b.max.x, b.max.y, b.max.z
        )?;
        writeln!(
            f,
            "Dimensions (Width, Depth, Height): ({:.2}, {:.2}, {:.2}) mm",
            d.x, d.y, d.z
        )?;
        writeln!(f, "Center of mass: ({:.2}, {:.2}, {:.2}) mm", c.x, c.y, c.z)?;
        writeln!(f, "Geometric center: ({:.2}, {:.2}, {:.2}) mm", g.x, g.y, g.z)?;
        writeln!(f)?;
        writeln!(f, "--- Internal Feature Analysis ---")?;
        writeln!(f, "Euler characteristic: {}", self.euler_number)?;
        writeln!(
            f,
            "Estimated average wall thickness: {:.2} mm",
            self.wall_thickness
        )?;
        writeln!(f, "Vertical faces (potential walls): {}", self.vertical_faces)?;
        write!(
            f,
            "Horizontal faces (potential floors/ceilings): {}",
            self.horizontal_faces
        )?;
        if let (Some(ratio), Some(class)) = (self.hull_ratio, self.complexity()) {
            writeln!(f)?;
            writeln!(f, "Volume to convex hull ratio: {ratio:.3}")?;
            writeln!(f, "  -> {class}")?;
            if self.has_internal_cavities() {
                write!(f, "  -> Indicates potential internal cavities or complex features")?;
            } else {
                write!(f, "  -> Relatively solid geometry")?;
            }
        }
        Ok(())
    }
}

/// How two mating parts compare.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssemblyComparison {
    /// Front cover dimensions.
    pub front: DVec3,
    /// Back cover dimensions.
    pub back: DVec3,
    /// Absolute per-axis difference.
    pub difference: DVec3,
    /// Per-axis maximum.
    pub envelope: DVec3,
    /// Front cover volume.
    pub front_volume: f64,
    /// Back cover volume.
    pub back_volume: f64,
}

/// Compare a front and a back cover.
#[must_use]
pub fn compare(front: &MeshAnalysis, back: &MeshAnalysis) -> AssemblyComparison {
    AssemblyComparison {
        front: front.dimensions,
        back: back.dimensions,
        difference: (front.dimensions - back.dimensions).abs(),
        envelope: front.dimensions.max(back.dimensions),
        front_volume: front.volume,
        back_volume: back.volume,
    }
}

impl fmt::Display for AssemblyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = |v: DVec3| format!("{:.1} × {:.1} × {:.1}", v.x, v.y, v.z);
        writeln!(f, "Front cover dimensions (W×D×H): {} mm", dims(self.front))?;
        writeln!(f, "Back cover dimensions (W×D×H): {} mm", dims(self.back))?;
        writeln!(f, "Dimension differences: {} mm", dims(self.difference))?;
        writeln!(f, "Estimated assembly envelope: {} mm", dims(self.envelope))?;
        writeln!(f, "Volume comparison:")?;
        writeln!(f, "  Front: {:.0} mm³", self.front_volume)?;
        writeln!(f, "  Back: {:.0} mm³", self.back_volume)?;
        write!(f, "  Total: {:.0} mm³", self.front_volume + self.back_volume)
    }
}

/// Rough component zones derived from the assembly envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementRecommendations {
    /// Assembly envelope.
    pub envelope: DVec3,
    /// Central phone pocket, 60% of the width by 80% of the depth.
    pub phone_pocket: DVec2,
    /// Grip width on each side, 15% of the width.
    pub grip_width: f64,
    /// Battery compartment depth, 60% of the height.
    pub battery_depth: f64,
    /// Left joystick position.
    pub left_joystick: DVec2,
    /// Right joystick position.
    pub right_joystick: DVec2,
}

/// Placement zones for an assembly of the given size.
#[must_use]
pub fn placement_recommendations(envelope: DVec3) -> PlacementRecommendations {
    let joystick_y = envelope.y * 0.3;
    let joystick_spacing = envelope.x * 0.4;
    PlacementRecommendations {
        envelope,
        phone_pocket: dvec2(envelope.x * 0.6, envelope.y * 0.8),
        grip_width: envelope.x * 0.15,
        battery_depth: envelope.z * 0.6,
        left_joystick: dvec2(-joystick_spacing / 2.0, joystick_y),
        right_joystick: dvec2(joystick_spacing / 2.0, joystick_y),
    }
}

impl fmt::Display for PlacementRecommendations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.envelope;
        writeln!(f, "Shell envelope: {:.1} × {:.1} × {:.1} mm", e.x, e.y, e.z)?;
        writeln!(f, "Recommended component placement zones:")?;
        writeln!(
            f,
            "  Central phone pocket: ~{:.1} × {:.1} mm",
            self.phone_pocket.x, self.phone_pocket.y
        )?;
        writeln!(f, "  Side grip areas: {:.1} mm wide each side", self.grip_width)?;
        writeln!(f, "  Battery compartment depth: ~{:.1} mm", self.battery_depth)?;
        writeln!(f, "  Suggested joystick positions:")?;
        writeln!(
            f,
            "    Left: X={:.1}, Y={:.1}",
            self.left_joystick.x, self.left_joystick.y
        )?;
        write!(
            f,
            "    Right: X={:.1}, Y={:.1}",
            self.right_joystick.x, self.right_joystick.y
        )
    }
}

/// Known component sizes, in millimetres.
pub mod components {
    use glam::DVec3;
    use glam::dvec3;

    /// Samsung Galaxy S20.
    pub const PHONE: DVec3 = dvec3(152.0, 70.0, 9.0);
    /// 8000 mAh battery pack.
    pub const BATTERY: DVec3 = dvec3(90.0, 60.0, 12.0);
    /// TP4056 charger board.
    pub const CHARGER: DVec3 = dvec3(23.0, 16.0, 5.0);
    /// USB-PD trigger / boost board.
    pub const BOOST: DVec3 = dvec3(23.3, 11.9, 4.0);
    /// Battery level indicator.
    pub const INDICATOR: DVec3 = dvec3(43.5, 20.0, 5.0);
    /// Latching power switch, bezel diameter and body depth.
    pub const POWER_SWITCH: DVec3 = dvec3(16.0, 16.0, 35.0);
    /// Analog stick module.
    pub const JOYSTICK: DVec3 = dvec3(32.0, 32.0, 18.0);
}

/// Whether the main components fit the two covers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentFit {
    /// Phone plus clearance fits in the front cover.
    pub phone_fits: bool,
    /// Suggested phone centre (X, Z) when it fits.
    pub phone_position: Option<DVec2>,
    /// Battery plus clearance fits in the back cover.
    pub battery_fits: bool,
    /// Width left on each side of the phone.
    pub grip_width: f64,
    /// Joystick positions (X, Y) when the grips are wide enough.
    pub joysticks: Option<[DVec2; 2]>,
    /// Back cover footprint minus the battery, mm².
    pub available_electronics_area: f64,
    /// Footprint of charger, boost board and indicator, mm².
    pub required_electronics_area: f64,
}

impl ComponentFit {
    /// Electronics fit with 50% margin.
    #[must_use]
    pub fn electronics_fit(&self) -> bool {
        self.available_electronics_area > self.required_electronics_area * 1.5
    }
}

/// Check the reference components against the two covers.
#[must_use]
pub fn component_fit(front: &MeshAnalysis, back: &MeshAnalysis) -> ComponentFit {
    use components::BATTERY;
    use components::BOOST;
    use components::CHARGER;
    use components::INDICATOR;
    use components::JOYSTICK;
    use components::PHONE;

    let (fd, bd) = (front.dimensions, back.dimensions);
    let phone_clearance = PHONE + dvec3(2.0, 2.0, 1.0);
    let phone_fits = phone_clearance.x < fd.x * 0.8
        && phone_clearance.y < fd.y
        && phone_clearance.z < fd.z * 0.8;
    let phone_position =
        phone_fits.then(|| dvec2(front.geometric_center.x, front.geometric_center.z));

    let battery_clearance = BATTERY + dvec3(2.0, 2.0, 1.0);
    let battery_fits = battery_clearance.cmplt(bd).all();

    let grip_width = (fd.x - PHONE.x) / 2.0;
    let joysticks = (grip_width > JOYSTICK.x).then(|| {
        let offset = PHONE.x / 2.0 + grip_width / 2.0;
        let cx = front.geometric_center.x;
        let y = fd.y * 0.8;
        [dvec2(cx - offset, y), dvec2(cx + offset, y)]
    });

    ComponentFit {
        phone_fits,
        phone_position,
        battery_fits,
        grip_width,
        joysticks,
        available_electronics_area: bd.x * bd.y - BATTERY.x * BATTERY.y,
        required_electronics_area: [CHARGER, BOOST, INDICATOR]
            .iter()
            .map(|c| c.x * c.y)
            .sum(),
    }
}

impl fmt::Display for ComponentFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Component Fit Analysis:")?;
        match self.phone_position {
            Some(p) => {
                writeln!(f, "  ✓ Samsung S20 fits in front cover")?;
                writeln!(f, "    Suggested position: X={:.1}, Z={:.1}", p.x, p.y)?;
            }
            None => writeln!(f, "  ✗ Samsung S20 may not fit - need larger cutout")?,
        }
        if self.battery_fits {
            writeln!(f, "  ✓ Battery fits in back cover")?;
        } else {
            writeln!(f, "  ⚠ Battery tight fit - verify internal cavity size")?;
        }
        writeln!(f, "Joystick Placement:")?;
        writeln!(
            f,
            "  Available grip width each side: {:.1} mm",
            self.grip_width
        )?;
        match self.joysticks {
            Some([l, r]) => {
                writeln!(f, "  ✓ Joysticks fit in grip areas")?;
                writeln!(f, "    Left joystick: X={:.1}, Y={:.1}", l.x, l.y)?;
                writeln!(f, "    Right joystick: X={:.1}, Y={:.1}", r.x, r.y)?;
            }
            None => writeln!(f, "  ⚠ Joysticks may not fit - need wider design")?,
        }
        writeln!(f, "Electronics Placement:")?;
        writeln!(
            f,
            "  Available electronics area: {:.0} mm²",
            self.available_electronics_area
        )?;
        writeln!(
            f,
            "  Required electronics area: {:.0} mm²",
            self.required_electronics_area
        )?;
        if self.electronics_fit() {
            write!(f, "  ✓ Sufficient space for electronics")
        } else {
            write!(f, "  ⚠ Tight fit for electronics - optimize layout")
        }
    }
}

/// Vertex count at one rounded Z height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ZLevel {
    /// Height rounded to 0.1 mm.
    pub z: f64,
    /// Vertices at that height.
    pub count: usize,
}

/// Key of a height rounded to 0.1 mm.
pub(crate) fn decimetre_key(z: f64) -> i64 {
    (z * 10.0).round() as i64
}

/// Distinct vertex heights rounded to 0.1 mm, ascending.
#[must_use]
pub fn z_levels(mesh: &Mesh) -> Vec<ZLevel> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for v in &mesh.vertices {
        *counts.entry(decimetre_key(v.z)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, count)| ZLevel {
            z: key as f64 / 10.0,
            count,
        })
        .collect()
}

/// The `top` most populated heights, fullest first.
#[must_use]
pub fn z_level_histogram(mesh: &Mesh, top: usize) -> Vec<ZLevel> {
    let mut levels = z_levels(mesh);
    levels.sort_by(|a, b| b.count.cmp(&a.count).then(b.z.total_cmp(&a.z)));
    levels.truncate(top);
    levels
}

/// A crowded cell of the XY grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DensityRegion {
    /// Cell centre.
    pub center: DVec2,
    /// Vertices inside the cell.
    pub vertices: usize,
    /// Height range of those vertices.
    pub z_span: f64,
}

/// Cells of an `nx` by `ny` XY grid holding more than `threshold` vertices.
///
/// Cells are half open, so vertices on the maximum X or Y edge are not
/// counted.
#[must_use]
pub fn density_regions(mesh: &Mesh, nx: usize, ny: usize, threshold: usize) -> Vec<DensityRegion> {
    let Some(bounds) = mesh.bounds() else {
        return Vec::new();
    };
    let (nx, ny) = (nx.max(1), ny.max(1));
    let size = bounds.extents();
    let step = dvec2(size.x / nx as f64, size.y / ny as f64);
    let mut cells: Vec<(usize, f64, f64)> = vec![(0, f64::MAX, f64::MIN); nx * ny];
    for v in &mesh.vertices {
        if v.x >= bounds.max.x || v.y >= bounds.max.y {
            continue;
        }
        let i = (((v.x - bounds.min.x) / step.x) as usize).min(nx - 1);
        let j = (((v.y - bounds.min.y) / step.y) as usize).min(ny - 1);
        let cell = &mut cells[i * ny + j];
        cell.0 += 1;
        cell.1 = cell.1.min(v.z);
        cell.2 = cell.2.max(v.z);
    }
    cells
        .iter()
        .enumerate()
        .filter(|(_, c)| c.0 > threshold)
        .map(|(index, &(count, lo, hi))| {
            let (i, j) = (index / ny, index % ny);
            DensityRegion {
                center: dvec2(
                    bounds.min.x + step.x * (i as f64 + 0.5),
                    bounds.min.y + step.y * (j as f64 + 0.5),
                ),
                vertices: count,
                z_span: hi - lo,
            }
        })
        .collect()
}

/// Which way a face points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// `n.z > 0.8`.
    HorizontalUp,
    /// `n.z < -0.8`.
    HorizontalDown,
    /// Everything else.
    Vertical,
}

impl Orientation {
    /// Classify a unit normal.
    #[must_use]
    pub fn from_normal(normal: DVec3) -> Self {
        if normal.z > 0.8 {
            Self::HorizontalUp
        } else if normal.z < -0.8 {
            Self::HorizontalDown
        } else {
            Self::Vertical
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HorizontalUp => "horizontal_up",
            Self::HorizontalDown => "horizontal_down",
            Self::Vertical => "vertical",
        })
    }
}

/// Counts of faces larger than 1 mm² by direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceOrientation {
    /// Facing up, potential mounting surfaces.
    pub up: usize,
    /// Facing down, potential recesses.
    pub down: usize,
    /// `|n.z| < 0.3`, walls and sides.
    pub vertical: usize,
}

/// Classify the larger faces of `mesh`.
#[must_use]
pub fn surface_orientation(mesh: &Mesh) -> SurfaceOrientation {
    let mut out = SurfaceOrientation::default();
    for (n, area) in mesh.face_normals().iter().zip(mesh.face_areas()) {
        if area <= 1.0 {
            continue;
        }
        if n.z > 0.8 {
            out.up += 1;
        }
        if n.z < -0.8 {
            out.down += 1;
        }
        if n.z.abs() < 0.3 {
            out.vertical += 1;
        }
    }
    out
}

/// A single large face.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FlatArea {
    /// Face index.
    pub face: usize,
    /// Face centroid.
    pub center: DVec3,
    /// Face area.
    pub area: f64,
    /// Unit normal.
    pub normal: DVec3,
    /// Direction class.
    pub orientation: Orientation,
}

fn flat_area(mesh: &Mesh, face: usize, area: f64) -> FlatArea {
    let t = mesh.triangle(face);
    let normal = t.normal();
    FlatArea {
        face,
        center: t.center(),
        area,
        normal,
        orientation: Orientation::from_normal(normal),
    }
}

/// Faces larger than `min_area`, largest first.
#[must_use]
pub fn large_flat_areas(mesh: &Mesh, min_area: f64) -> Vec<FlatArea> {
    let mut out: Vec<FlatArea> = mesh
        .face_areas()
        .into_iter()
        .enumerate()
        .filter(|(_, a)| *a > min_area)
        .map(|(i, a)| flat_area(mesh, i, a))
        .collect();
    out.sort_by(|a, b| b.area.total_cmp(&a.area));
    out
}

/// Horizontal faces in the largest 10% by area, in face order.
#[must_use]
pub fn mounting_surfaces(mesh: &Mesh) -> Vec<FlatArea> {
    let areas = mesh.face_areas();
    let Some(cutoff) = percentile(&areas, 90.0) else {
        return Vec::new();
    };
    let normals = mesh.face_normals();
    areas
        .iter()
        .enumerate()
        .filter(|(i, a)| **a > cutoff && normals[*i].z.abs() > 0.8)
        .map(|(i, a)| flat_area(mesh, i, *a))
        .collect()
}

/// Inside/outside classification of a coarse point lattice.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CavityAnalysis {
    /// Lattice points tested.
    pub tested: usize,
    /// Points inside the solid.
    pub inside: usize,
    /// Points outside the solid.
    pub outside: usize,
    /// Box around the inside points.
    pub cavity: Option<Aabb>,
}

/// Probe a `resolution`³ lattice over the bounding box, taking every third
/// X, every second Y and every third Z sample.
#[must_use]
pub fn internal_cavity(mesh: &Mesh, resolution: usize) -> CavityAnalysis {
    let Some(bounds) = mesh.bounds() else {
        return CavityAnalysis {
            tested: 0,
            inside: 0,
            outside: 0,
            cavity: None,
        };
    };
    let caster = RayCaster::new(mesh);
    let xs = linspace(bounds.min.x, bounds.max.x, resolution);
    let ys = linspace(bounds.min.y, bounds.max.y, resolution);
    let zs = linspace(bounds.min.z, bounds.max.z, resolution);

    let mut inside = Vec::new();
    let mut tested = 0;
    for x in xs.iter().step_by(3) {
        for y in ys.iter().step_by(2) {
            for z in zs.iter().step_by(3) {
                tested += 1;
                let p = dvec3(*x, *y, *z);
                if caster.contains(p) {
                    inside.push(p);
                }
            }
        }
    }
    debug!("cavity probe: {} of {tested} points inside", inside.len());
    CavityAnalysis {
        tested,
        inside: inside.len(),
        outside: tested - inside.len(),
        cavity: Aabb::from_points(inside),
    }
}

impl fmt::Display for CavityAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Internal cavity analysis:")?;
        writeln!(f, "  Total test points: {}", self.tested)?;
        writeln!(f, "  Internal points: {}", self.inside)?;
        write!(f, "  External points: {}", self.outside)?;
        if let Some(c) = self.cavity {
            let (d, m) = (c.extents(), c.center());
            writeln!(f)?;
            writeln!(
                f,
                "  Largest internal cavity: {:.1} × {:.1} × {:.1} mm",
                d.x, d.y, d.z
            )?;
            write!(f, "  Cavity center: ({:.1}, {:.1}, {:.1})", m.x, m.y, m.z)?;
        }
        Ok(())
    }
}

/// Shell thickness measured along the six axis directions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShellThickness {
    /// Distance between the first two hits of each ray that hit twice.
    pub samples: Vec<f64>,
    /// Mean of the samples.
    pub mean: f64,
    /// Population standard deviation of the samples.
    pub std_dev: f64,
}

/// Cast rays from the box centre along ±X, ±Y and ±Z.
///
/// Returns `None` when no ray crosses the shell twice.
#[must_use]
pub fn shell_thickness(mesh: &Mesh) -> Option<ShellThickness> {
    let center = mesh.bounds()?.center();
    let caster = RayCaster::new(mesh);
    let samples: Vec<f64> = [
        DVec3::X,
        DVec3::NEG_X,
        DVec3::Y,
        DVec3::NEG_Y,
        DVec3::Z,
        DVec3::NEG_Z,
    ]
    .into_iter()
    .filter_map(|dir| {
        let hits = caster.intersect_all(center, dir);
        (hits.len() >= 2).then(|| hits[1].t - hits[0].t)
    })
    .collect();
    if samples.is_empty() {
        return None;
    }
    Some(ShellThickness {
        mean: mean(&samples),
        std_dev: std_dev(&samples),
        samples,
    })
}

/// Height profile of the vertices around an XY position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PositionAnalysis {
    /// Vertices within the search radius.
    pub vertices: usize,
    /// Lowest of them.
    pub z_min: f64,
    /// Highest of them.
    pub z_max: f64,
    /// Mean height.
    pub z_mean: f64,
    /// Lower edge of the fullest of 50 height bins.
    pub surface_level: f64,
}

/// Vertices strictly within `radius` of `position` in XY.
fn heights_near(mesh: &Mesh, position: DVec2, radius: f64) -> Vec<f64> {
    mesh.vertices
        .iter()
        .filter(|v| v.truncate().distance(position) < radius)
        .map(|v| v.z)
        .collect()
}

/// Height profile around `position`, `None` when no vertex is near.
#[must_use]
pub fn analyze_position(mesh: &Mesh, position: DVec2, radius: f64) -> Option<PositionAnalysis> {
    let z = heights_near(mesh, position, radius);
    if z.is_empty() {
        return None;
    }
    let hist = histogram(&z, 50);
    let peak = hist.peak()?;
    Some(PositionAnalysis {
        vertices: z.len(),
        z_min: z.iter().copied().fold(f64::INFINITY, f64::min),
        z_max: z.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        z_mean: mean(&z),
        surface_level: hist.edges[peak],
    })
}

/// Evidence of an opening already cut near a position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExistingCutout {
    /// Surface samples near the position.
    pub samples: usize,
    /// Lowest sampled height.
    pub z_min: f64,
    /// Highest sampled height.
    pub z_max: f64,
    /// Lower edges of the sparse height bins.
    pub gap_levels: Vec<f64>,
}

/// Sample the surface near `center` and look for sparse height bins.
///
/// A cutout is reported when any of 20 bins holds less than 10% of the
/// samples.
#[must_use]
pub fn detect_existing_cutout(
    mesh: &Mesh,
    center: DVec2,
    radius: f64,
    samples: usize,
) -> Option<ExistingCutout> {
    let z: Vec<f64> = sample_surface(mesh, samples, DEFAULT_SEED)
        .iter()
        .filter(|s| s.point.truncate().distance(center) < radius)
        .map(|s| s.point.z)
        .collect();
    if z.is_empty() {
        return None;
    }
    let hist = histogram(&z, 20);
    let threshold = z.len() as f64 * 0.1;
    let gap_levels: Vec<f64> = hist
        .counts
        .iter()
        .zip(&hist.edges)
        .filter(|(c, _)| (**c as f64) < threshold)
        .map(|(_, e)| *e)
        .collect();
    if gap_levels.is_empty() {
        return None;
    }
    Some(ExistingCutout {
        samples: z.len(),
        z_min: z.iter().copied().fold(f64::INFINITY, f64::min),
        z_max: z.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        gap_levels,
    })
}

/// Volume change between an original part and its modified version.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ModificationDelta {
    /// Original volume.
    pub original_volume: f64,
    /// Modified volume.
    pub modified_volume: f64,
    /// Original vertex count.
    pub original_vertices: usize,
    /// Modified vertex count.
    pub modified_vertices: usize,
}

impl ModificationDelta {
    /// Compare two versions of a part.
    #[must_use]
    pub fn new(original: &Mesh, modified: &Mesh) -> Self {
        Self {
            original_volume: original.volume(),
            modified_volume: modified.volume(),
            original_vertices: original.vertex_count(),
            modified_vertices: modified.vertex_count(),
        }
    }

    /// Material removed in mm³.
    #[must_use]
    pub fn removed(&self) -> f64 {
        self.original_volume - self.modified_volume
    }

    /// More than [`MIN_EFFECTIVE_REMOVAL`] was removed.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.removed() > MIN_EFFECTIVE_REMOVAL
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::csg::difference;
    use crate::primitives::cuboid;

    #[test]
    fn complexity_thresholds() {
        assert_eq!(Complexity::from_ratio(0.29), Complexity::HighlyComplex);
        assert_eq!(Complexity::from_ratio(0.3), Complexity::ModeratelyComplex);
        assert_eq!(Complexity::from_ratio(0.7), Complexity::Simple);
    }

    #[test]
    fn analyze_box() {
        let b = cuboid(dvec3(20.0, 10.0, 4.0));
        let a = analyze(&b).unwrap();
        assert_relative_eq!(a.volume, 800.0, epsilon = 1e-9);
        assert_relative_eq!(a.hull_ratio.unwrap(), 1.0, epsilon = 1e-9);
        assert!(!a.has_internal_cavities());
        assert_eq!(a.horizontal_faces, 4);
        assert_eq!(a.vertical_faces, 8);
        assert!(a.wall_thickness < 1e-6);
        assert!(analyze(&Mesh::default()).is_err());
    }

    #[test]
    fn hollow_box_thickness_and_cavity() {
        let outer = cuboid(dvec3(40.0, 40.0, 40.0));
        let inner = cuboid(dvec3(30.0, 30.0, 30.0));
        let shell = Mesh::concatenate(&[outer, {
            let mut i = inner;
            i.invert();
            i
        }]);
        let t = shell_thickness(&shell).unwrap();
        assert_eq!(t.samples.len(), 6);
        assert_relative_eq!(t.mean, 5.0, epsilon = 1e-9);

        let cavity = internal_cavity(&shell, 20);
        assert_eq!(cavity.tested, 7 * 10 * 7);
        assert!(cavity.inside > 0);
        let a = analyze(&shell).unwrap();
        assert!(a.has_internal_cavities());
    }

    #[test]
    fn placement_ratios() {
        let p = placement_recommendations(dvec3(300.0, 20.0, 100.0));
        assert_relative_eq!(p.phone_pocket.x, 180.0);
        assert_relative_eq!(p.grip_width, 45.0);
        assert_relative_eq!(p.battery_depth, 60.0);
        assert_relative_eq!(p.left_joystick.x, -60.0);
        assert_relative_eq!(p.right_joystick.y, 6.0);
    }

    #[test]
    fn position_surface_level() {
        let plate = cuboid(dvec3(10.0, 10.0, 2.0));
        let p = analyze_position(&plate, DVec2::ZERO, 80.0).unwrap();
        assert_eq!(p.vertices, 8);
        assert_relative_eq!(p.z_min, -1.0);
        assert_relative_eq!(p.surface_level, -1.0);
        assert!(analyze_position(&plate, dvec2(500.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn z_levels_and_density() {
        let plate = cuboid(dvec3(10.0, 10.0, 2.0));
        let top = z_level_histogram(&plate, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], ZLevel { z: 1.0, count: 4 });
        assert!(density_regions(&plate, 19, 9, 100).is_empty());
        let regions = density_regions(&plate, 1, 1, 1);
        assert_eq!(regions[0].vertices, 2);
    }

    #[test]
    fn mounting_and_flat_areas() {
        let plate = cuboid(dvec3(30.0, 30.0, 2.0));
        let flats = large_flat_areas(&plate, 100.0);
        assert_eq!(flats.len(), 4);
        assert_ne!(flats[0].orientation, Orientation::Vertical);
        let o = surface_orientation(&plate);
        assert_eq!((o.up, o.down, o.vertical), (2, 2, 8));
        // Every face of the top and bottom ties for the largest area.
        assert!(mounting_surfaces(&plate).is_empty());
    }

    #[test]
    fn removal_threshold() {
        let block = cuboid(dvec3(40.0, 40.0, 10.0));
        let cut = difference(&block, &cuboid(dvec3(20.0, 20.0, 20.0)));
        let delta = ModificationDelta::new(&block, &cut);
        assert_relative_eq!(delta.removed(), 4000.0, epsilon = 1e-6);
        assert!(delta.is_significant());
    }
}
