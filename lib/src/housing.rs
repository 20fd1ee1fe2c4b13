//! Front and back cover modification.
//!
//! The front cover gets an opening sized for the phone; the back cover gets
//! pockets for the battery and power electronics. Both pipelines finish with
//! the same cleanup pass and return a report alongside the new mesh.

use std::fmt;

use glam::DVec2;
use glam::DVec3;
use glam::dvec2;
use glam::dvec3;
use log::info;
use log::warn;
use serde::Deserialize;
use serde::Serialize;

use crate::MeshError;
use crate::MeshResult;
use crate::adjacency::MeshAdjacency;
use crate::analysis::ModificationDelta;
use crate::analysis::PositionAnalysis;
use crate::analysis::analyze_position;
use crate::csg::difference;
use crate::cutout::Cutout;
use crate::cutout::CutoutRun;
use crate::cutout::IntersectionCheck;
use crate::cutout::MIN_EFFECTIVE_REMOVAL;
use crate::cutout::apply_cutouts;
use crate::cutout::validate_intersection;
use crate::mesh::Aabb;
use crate::mesh::Mesh;
use crate::primitives::DEFAULT_SECTIONS;
use crate::primitives::cuboid;
use crate::primitives::cylinder;
use crate::primitives::cylinder_between;
use crate::primitives::rounded_rectangle;
use crate::repair::RepairReport;
use crate::repair::WELD_EPSILON;
use crate::repair::repair;

/// Depth of the printable phone template, in millimetres.
pub const TEMPLATE_DEPTH: f64 = 10.0;

/// Diameter of the wiring channels between pockets.
pub const CABLE_DIAMETER: f64 = 2.5;

/// Phone opening in the front cover.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontCutoutParams {
    /// Phone width along X.
    pub phone_width: f64,
    /// Phone height along Y.
    pub phone_height: f64,
    /// Clearance added on every side.
    pub tolerance: f64,
    /// Fillet on the vertical edges.
    pub corner_radius: f64,
    /// XY centre of the opening.
    pub center: DVec2,
    /// Depth added to the mesh height so the cut goes right through.
    pub extra_depth: f64,
    /// Vertices within this XY distance of the centre decide the surface level.
    pub search_radius: f64,
}

impl Default for FrontCutoutParams {
    fn default() -> Self {
        Self {
            phone_width: 152.0,
            phone_height: 70.0,
            tolerance: 0.5,
            corner_radius: 1.0,
            center: dvec2(147.0, 9.5),
            extra_depth: 5.0,
            search_radius: 80.0,
        }
    }
}

impl FrontCutoutParams {
    /// Opening width including clearance.
    #[must_use]
    pub fn cutout_width(&self) -> f64 {
        2.0f64.mul_add(self.tolerance, self.phone_width)
    }

    /// Opening height including clearance.
    #[must_use]
    pub fn cutout_height(&self) -> f64 {
        2.0f64.mul_add(self.tolerance, self.phone_height)
    }

    fn solid(&self, depth: f64, center: DVec3) -> Mesh {
        rounded_rectangle(
            self.cutout_width(),
            self.cutout_height(),
            depth,
            self.corner_radius,
            DEFAULT_SECTIONS,
        )
        .translated(center)
    }
}

/// What [`modify_front`] did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontReport {
    /// Height profile around the opening.
    pub position: PositionAnalysis,
    /// Centre of the solid that was subtracted.
    pub cutout_center: DVec3,
    /// Z extent of the subtracted solid.
    pub cutout_depth: f64,
    /// Bounding box check of the final placement.
    pub intersection: IntersectionCheck,
    /// The surface placement missed and the mean height was used.
    pub retried: bool,
    /// Volume and vertex changes.
    pub delta: ModificationDelta,
    /// Cleanup, when the result was not closed.
    pub repair: Option<RepairReport>,
    /// Result is a closed surface.
    pub watertight: bool,
}

impl fmt::Display for FrontReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.position;
        writeln!(f, "Cutout positioning:")?;
        writeln!(f, "  Vertices near target: {}", p.vertices)?;
        writeln!(f, "  Z-range: {:.1} to {:.1} mm", p.z_min, p.z_max)?;
        writeln!(f, "  Surface level: {:.1} mm", p.surface_level)?;
        writeln!(f, "  Cutout depth: {:.1} mm", self.cutout_depth)?;
        writeln!(f, "  Cutout center Z: {:.1} mm", self.cutout_center.z)?;
        if self.retried {
            writeln!(f, "  Adjusted to mean height after validation failed")?;
        }
        writeln!(f, "{}", self.intersection)?;
        writeln!(f, "Result:")?;
        writeln!(f, "  Vertices: {}", self.delta.modified_vertices)?;
        writeln!(f, "  Volume removed: {:.0} mm³", self.delta.removed())?;
        if !self.delta.is_significant() {
            writeln!(
                f,
                "  ⚠ Warning: Very little volume removed - cutout may not be effective"
            )?;
        }
        write!(f, "  Final mesh watertight: {}", self.watertight)
    }
}

/// Remove duplicate faces and weld vertices, then repair an open result.
fn clean(mesh: &mut Mesh) -> (Option<RepairReport>, bool) {
    mesh.remove_duplicate_faces();
    mesh.merge_vertices(WELD_EPSILON);
    if MeshAdjacency::build(&mesh.faces).is_watertight() {
        return (None, true);
    }
    info!("attempting to repair non-watertight mesh");
    let report = repair(mesh);
    let watertight = report.watertight;
    (Some(report), watertight)
}

/// Cut the phone opening through the front cover.
///
/// The solid spans the full mesh height plus `extra_depth` and hangs below
/// the dominant surface level near the opening. When that placement misses
/// the mesh the solid is re-centred on the mean vertex height.
///
/// # Errors
///   When no vertex is near the opening or the subtraction leaves nothing.
pub fn modify_front(mesh: &Mesh, params: &FrontCutoutParams) -> MeshResult<(Mesh, FrontReport)> {
    let center = params.center;
    let position = analyze_position(mesh, center, params.search_radius).ok_or(
        MeshError::NoVerticesNear {
            x: center.x,
            y: center.y,
            radius: params.search_radius,
        },
    )?;
    let depth = mesh.extents().z + params.extra_depth;
    let mut cutout_center = center.extend(position.surface_level - depth / 2.0);
    let mut solid = params.solid(depth, cutout_center);
    let mut retried = false;
    let mut intersection = validate_intersection(mesh, &solid)
        .ok_or_else(|| MeshError::EmptyMesh("front cover".into()))?;
    if !intersection.overlaps() {
        warn!("cutout at surface level misses the mesh, using mean height");
        retried = true;
        cutout_center.z = position.z_mean;
        solid = params.solid(depth, cutout_center);
        intersection = validate_intersection(mesh, &solid)
            .ok_or_else(|| MeshError::EmptyMesh("front cover".into()))?;
    }

    let mut result = difference(mesh, &solid);
    if result.is_empty() {
        return Err(MeshError::Boolean {
            op: "difference",
            details: "the phone cutout removed the whole cover".into(),
        });
    }
    let delta = ModificationDelta::new(mesh, &result);
    info!("volume removed: {:.0} mm³", delta.removed());
    if delta.removed() < MIN_EFFECTIVE_REMOVAL {
        warn!("very little volume removed, cutout may not be effective");
    }
    let (repair, watertight) = clean(&mut result);
    let report = FrontReport {
        position,
        cutout_center,
        cutout_depth: depth,
        intersection,
        retried,
        delta,
        repair,
        watertight,
    };
    Ok((result, report))
}

/// Printable slab matching the phone opening, centred on the origin.
#[must_use]
pub fn phone_template(params: &FrontCutoutParams) -> Mesh {
    params.solid(TEMPLATE_DEPTH, DVec3::ZERO)
}

/// Outline of a back cover pocket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PocketShape {
    /// Axis aligned box.
    Box {
        /// Width, height and depth.
        size: DVec3,
    },
    /// Cylinder along Z.
    Round {
        /// Hole diameter.
        diameter: f64,
        /// Z extent.
        depth: f64,
    },
}

impl fmt::Display for PocketShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box { size } => write!(f, "{}×{}×{}mm", size.x, size.y, size.z),
            Self::Round { diameter, depth } => write!(f, "∅{diameter}×{depth}mm"),
        }
    }
}

/// A component pocket placed in the back cover.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Pocket {
    /// Component name.
    pub name: &'static str,
    /// Outline.
    #[serde(flatten)]
    pub shape: PocketShape,
    /// Centre of the solid.
    pub center: DVec3,
}

impl Pocket {
    /// Solid to subtract.
    #[must_use]
    pub fn mesh(&self) -> Mesh {
        match self.shape {
            PocketShape::Box { size } => cuboid(size),
            PocketShape::Round { diameter, depth } => {
                cylinder(diameter / 2.0, depth, DEFAULT_SECTIONS)
            }
        }
        .translated(self.center)
    }
}

/// Electronics pockets placed relative to the back cover bounds.
///
/// Battery, charger, boost converter, charge indicator and power switch, in
/// that order.
#[must_use]
pub fn electronics_pockets(bounds: &Aabb) -> Vec<Pocket> {
    let c = bounds.center();
    let (min, max) = (bounds.min, bounds.max);
    vec![
        Pocket {
            name: "battery",
            shape: PocketShape::Box {
                size: dvec3(92.0, 62.0, 13.0),
            },
            center: dvec3(c.x, c.y, min.z + 8.0),
        },
        Pocket {
            name: "charger",
            shape: PocketShape::Box {
                size: dvec3(24.0, 17.0, 6.0),
            },
            center: dvec3(c.x - 35.0, c.y, min.z + 4.0),
        },
        Pocket {
            name: "boost",
            shape: PocketShape::Box {
                size: dvec3(25.0, 13.0, 5.0),
            },
            center: dvec3(c.x + 35.0, c.y, min.z + 4.0),
        },
        Pocket {
            name: "indicator",
            shape: PocketShape::Box {
                size: dvec3(45.0, 21.0, 6.0),
            },
            center: dvec3(c.x, min.y + 3.0, max.z - 3.0),
        },
        Pocket {
            name: "power switch",
            shape: PocketShape::Round {
                diameter: 16.0,
                depth: 15.0,
            },
            center: dvec3(max.x - 15.0, c.y, max.z - 8.0),
        },
    ]
}

/// Pairs of pockets joined by a wiring channel.
const CABLE_ROUTES: [(&str, &str); 4] = [
    ("battery", "charger"),
    ("charger", "boost"),
    ("battery", "indicator"),
    ("boost", "power switch"),
];

/// Wiring channels between pocket centres.
#[must_use]
pub fn cable_channels(pockets: &[Pocket]) -> Vec<Cutout> {
    let center = |name: &str| pockets.iter().find(|p| p.name == name).map(|p| p.center);
    CABLE_ROUTES
        .iter()
        .filter_map(|&(from, to)| {
            let mesh = cylinder_between(center(from)?, center(to)?, CABLE_DIAMETER / 2.0, 16)?;
            Some(Cutout::new(format!("channel {from} to {to}"), mesh))
        })
        .collect()
}

/// What [`modify_back`] did.
#[derive(Clone, Debug, PartialEq)]
pub struct BackReport {
    /// Pockets in the order they were cut.
    pub pockets: Vec<Pocket>,
    /// Per-cutout outcomes, channels included.
    pub run: CutoutRun,
    /// Volume and vertex changes.
    pub delta: ModificationDelta,
    /// Cleanup, when the result was not closed.
    pub repair: Option<RepairReport>,
    /// Result is a closed surface.
    pub watertight: bool,
}

impl fmt::Display for BackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Component cutouts:")?;
        for p in &self.pockets {
            let c = p.center;
            writeln!(
                f,
                "  {}: {} at ({:.1}, {:.1}, {:.1})",
                p.name, p.shape, c.x, c.y, c.z
            )?;
        }
        writeln!(f, "Boolean operations:")?;
        for step in &self.run.steps {
            writeln!(f, "  {step}")?;
        }
        writeln!(
            f,
            "  Successful operations: {}/{}",
            self.run.successes(),
            self.run.steps.len()
        )?;
        writeln!(f, "  Total material removed: {:.0} mm³", self.run.total_removed())?;
        writeln!(f, "  Final mesh watertight: {}", self.watertight)?;
        write!(f, "  Final volume: {:.0} mm³", self.delta.modified_volume)
    }
}

/// Cut the electronics pockets, and optionally wiring channels, into the back
/// cover.
///
/// # Errors
///   When the mesh is empty.
pub fn modify_back(mesh: &Mesh, channels: bool) -> MeshResult<(Mesh, BackReport)> {
    let bounds = mesh
        .bounds()
        .ok_or_else(|| MeshError::EmptyMesh("back cover".into()))?;
    let pockets = electronics_pockets(&bounds);
    let mut cutouts: Vec<Cutout> = pockets
        .iter()
        .map(|p| Cutout::new(p.name, p.mesh()))
        .collect();
    if channels {
        cutouts.extend(cable_channels(&pockets));
    }
    let run = apply_cutouts(mesh, &cutouts);
    let mut result = run.mesh.clone();
    let (repair, watertight) = clean(&mut result);
    let report = BackReport {
        pockets,
        delta: ModificationDelta::new(mesh, &result),
        run,
        repair,
        watertight,
    };
    Ok((result, report))
}

/// Assembly instructions for the modified covers.
#[must_use]
pub fn assembly_guide(front_file: &str, back_file: &str) -> String {
    let front = FrontCutoutParams::default();
    let placeholder = Aabb::new(DVec3::ZERO, DVec3::ZERO);
    let mut lines = vec![
        "NUCDECK ASSEMBLY GUIDE".to_string(),
        "=".repeat(50),
        String::new(),
        "FRONT COVER:".to_string(),
        format!(
            "✓ Phone cutout ({}×{}mm)",
            front.cutout_width(),
            front.cutout_height()
        ),
        "✓ Gaming control features (verify manually)".to_string(),
        format!("  - File: {front_file}"),
        String::new(),
        "BACK COVER:".to_string(),
    ];
    lines.extend(
        electronics_pockets(&placeholder)
            .iter()
            .map(|pocket| format!("✓ {} pocket ({})", pocket.name, pocket.shape)),
    );
    lines.extend([
        format!("✓ Cable routing channels (∅{CABLE_DIAMETER}mm)"),
        format!("  - File: {back_file}"),
        String::new(),
        "ASSEMBLY ORDER:".to_string(),
    ]);
    lines.extend(
        [
            "Install electronics in back cover pockets",
            "Route cables through channels",
            "Insert battery into compartment",
            "Mount phone in front cover",
            "Connect joysticks and buttons",
            "Secure covers together",
        ]
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1)),
    );
    lines.extend(
        [
            "",
            "3D PRINTING NOTES:",
            "- Print covers separately",
            "- Support material may be needed for overhangs",
            "- Test fit components before final assembly",
            "- Use 0.2mm layer height for good detail",
        ]
        .map(String::from),
    );
    lines.join("\n") + "\n"
}

/// Reference sheet describing the phone opening.
#[must_use]
pub fn cutout_measurements(params: &FrontCutoutParams) -> String {
    format!(
        "NucDeck Front Cover Cutout Measurements
{rule}

Phone Cutout Specifications:
  Phone dimensions: {:.1} × {:.1} mm
  Cutout dimensions: {:.1} × {:.1} mm (with {}mm tolerance)
  Center position: ({:.1}, {:.1}) mm
  Corner radius: {:.1} mm
  Depth: Full shell thickness

Quality Requirements:
  - Watertight mesh: Required
  - Smooth corners: {}mm fillet radius
  - Print tolerance: ±0.2mm typical
  - Friction fit: Phone should slide in with light pressure
",
        params.phone_width,
        params.phone_height,
        params.cutout_width(),
        params.cutout_height(),
        params.tolerance,
        params.center.x,
        params.center.y,
        params.corner_radius,
        params.corner_radius,
        rule = "=".repeat(50),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::cutout::CutoutOutcome;

    #[test]
    fn template_matches_opening() {
        let template = phone_template(&FrontCutoutParams::default());
        let size = template.extents();
        assert_relative_eq!(size.x, 153.0, epsilon = 1e-9);
        assert_relative_eq!(size.y, 71.0, epsilon = 1e-9);
        assert_relative_eq!(size.z, TEMPLATE_DEPTH, epsilon = 1e-9);
        assert!(MeshAdjacency::build(&template.faces).is_watertight());
    }

    #[test]
    fn front_opening_retries_at_mean_height() {
        let params = FrontCutoutParams {
            phone_width: 40.0,
            phone_height: 20.0,
            center: DVec2::ZERO,
            ..FrontCutoutParams::default()
        };
        let plate = cuboid(dvec3(100.0, 60.0, 4.0));
        let (result, report) = modify_front(&plate, &params).unwrap();

        // Both faces hold four vertices so the lowest bin wins and the first
        // placement ends exactly at the bottom face.
        assert_relative_eq!(report.position.surface_level, -2.0);
        assert!(report.retried);
        assert_relative_eq!(report.cutout_center.z, 0.0);
        assert_relative_eq!(report.cutout_depth, 9.0);
        assert!(report.intersection.overlaps());

        let removed = report.delta.removed();
        assert!(removed > 41.0 * 21.0 * 4.0 - 10.0, "{removed}");
        assert!(removed < 41.0 * 21.0 * 4.0 + 1e-6, "{removed}");
        assert_relative_eq!(result.volume(), plate.volume() - removed, epsilon = 1e-6);
    }

    #[test]
    fn front_opening_far_from_mesh() {
        let plate = cuboid(dvec3(10.0, 10.0, 4.0));
        let err = modify_front(&plate, &FrontCutoutParams::default()).unwrap_err();
        assert!(matches!(err, MeshError::NoVerticesNear { .. }));
    }

    #[test]
    fn opening_larger_than_cover() {
        let cover = cuboid(dvec3(40.0, 20.0, 4.0)).translated(dvec3(147.0, 9.5, 2.0));
        let err = modify_front(&cover, &FrontCutoutParams::default()).unwrap_err();
        assert!(
            matches!(err, MeshError::Boolean { op: "difference", .. }),
            "{err}"
        );
    }

    #[test]
    fn pockets_follow_bounds() {
        let bounds = Aabb::new(dvec3(0.0, 0.0, 0.0), dvec3(200.0, 100.0, 30.0));
        let pockets = electronics_pockets(&bounds);
        let centers: Vec<DVec3> = pockets.iter().map(|p| p.center).collect();
        assert_eq!(
            centers,
            [
                dvec3(100.0, 50.0, 8.0),
                dvec3(65.0, 50.0, 4.0),
                dvec3(135.0, 50.0, 4.0),
                dvec3(100.0, 3.0, 27.0),
                dvec3(185.0, 50.0, 22.0),
            ]
        );
        assert_eq!(cable_channels(&pockets).len(), 4);
    }

    #[test]
    fn back_cover_pockets_are_cut() {
        let shell = cuboid(dvec3(200.0, 100.0, 30.0));
        let (result, report) = modify_back(&shell, true).unwrap();
        assert_eq!(report.run.steps.len(), 9);
        for step in &report.run.steps[..5] {
            assert!(
                matches!(step.outcome, CutoutOutcome::Applied { .. }),
                "{step}"
            );
        }
        // The battery to charger channel runs inside the battery pocket.
        assert_eq!(report.run.steps[5].outcome, CutoutOutcome::NothingRemoved);
        assert!(report.run.total_removed() > 92.0 * 62.0 * 13.0);
        assert!(result.volume() < shell.volume());
        assert!(modify_back(&Mesh::default(), false).is_err());
    }

    #[test]
    fn guide_lists_every_pocket() {
        let guide = assembly_guide("front.stl", "back.stl");
        assert!(guide.starts_with("NUCDECK ASSEMBLY GUIDE\n"));
        assert!(guide.contains("✓ Phone cutout (153×71mm)"));
        assert!(guide.contains("✓ battery pocket (92×62×13mm)"));
        assert!(guide.contains("✓ power switch pocket (∅16×15mm)"));
        assert!(guide.contains("  - File: back.stl"));
        assert!(guide.contains("6. Secure covers together"));

        let sheet = cutout_measurements(&FrontCutoutParams::default());
        assert!(sheet.contains("Cutout dimensions: 153.0 × 71.0 mm (with 0.5mm tolerance)"));
        assert!(sheet.contains("Center position: (147.0, 9.5) mm"));
    }
}
