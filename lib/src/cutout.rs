use std::fmt;

use glam::DVec2;
use glam::DVec3;
use log::info;
use log::warn;
use serde::Serialize;

use crate::MeshError;
use crate::MeshResult;
use crate::adjacency::MeshAdjacency;
use crate::csg::difference;
use crate::mesh::Aabb;
use crate::mesh::Mesh;

/// Removing less material than this means a cutout missed the part, in mm³.
pub const MIN_EFFECTIVE_REMOVAL: f64 = 1000.0;

/// A named solid to subtract from a housing.
#[derive(Clone, Debug, PartialEq)]
pub struct Cutout {
    /// Label used in reports.
    pub name: String,
    /// Closed, outward wound solid.
    pub mesh: Mesh,
}

impl Cutout {
    /// Constructor
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
        }
    }

    /// Check the solid can be subtracted.
    ///
    /// # Errors
    ///   When the solid is open or encloses no volume.
    pub fn validate(&self) -> MeshResult<()> {
        let invalid = |details: String| MeshError::InvalidCutout {
            name: self.name.clone(),
            details,
        };
        if !MeshAdjacency::build(&self.mesh.faces).is_watertight() {
            return Err(invalid("not watertight".into()));
        }
        let volume = self.mesh.volume();
        if volume <= 0.0 {
            return Err(invalid(format!("volume is {volume:.3} mm³")));
        }
        Ok(())
    }
}

/// Bounding box comparison of a target and a cutout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IntersectionCheck {
    /// Target bounds.
    pub target: Aabb,
    /// Cutout bounds.
    pub cutout: Aabb,
    /// Strict overlap on X, Y and Z.
    pub overlap: [bool; 3],
    /// Volume of the shared box when all three axes overlap.
    pub estimated_volume: Option<f64>,
}

impl IntersectionCheck {
    /// Boxes overlap on every axis.
    #[must_use]
    pub fn overlaps(&self) -> bool {
        self.overlap.iter().all(|&o| o)
    }
}

impl fmt::Display for IntersectionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (t, c) = (self.target, self.cutout);
        writeln!(f, "  Original bounds: {} to {}", t.min, t.max)?;
        writeln!(f, "  Cutout bounds: {} to {}", c.min, c.max)?;
        let [x, y, z] = self.overlap;
        write!(f, "  Overlap - X: {x}, Y: {y}, Z: {z}")?;
        match self.estimated_volume {
            Some(v) => write!(f, "\n  Estimated intersection volume: {v:.0} mm³"),
            None => write!(f, "\n  ⚠ Warning: Cutout may not intersect with original mesh!"),
        }
    }
}

/// Compare the boxes of `target` and `cutout`, `None` when either is empty.
#[must_use]
pub fn validate_intersection(target: &Mesh, cutout: &Mesh) -> Option<IntersectionCheck> {
    let (t, c) = (target.bounds()?, cutout.bounds()?);
    Some(IntersectionCheck {
        target: t,
        cutout: c,
        overlap: t.overlap_axes(&c),
        estimated_volume: t.intersection(&c).map(|i| i.volume()),
    })
}

/// Result of one subtraction.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CutoutOutcome {
    /// Subtracted.
    Applied {
        /// Volume removed by this cutout.
        removed: f64,
    },
    /// The cutout solid failed [`Cutout::validate`].
    Invalid {
        /// Why.
        reason: String,
    },
    /// Bounding boxes do not meet.
    NoOverlap,
    /// The difference left nothing.
    EmptyResult,
    /// The difference did not reduce the volume.
    NothingRemoved,
}

/// Outcome of one named cutout.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CutoutStep {
    /// Cutout name.
    pub name: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: CutoutOutcome,
}

impl fmt::Display for CutoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CutoutOutcome::Applied { removed } => {
                write!(f, "✓ {} (removed {removed:.0} mm³)", self.name)
            }
            CutoutOutcome::Invalid { reason } => write!(f, "❌ {} invalid: {reason}", self.name),
            CutoutOutcome::NoOverlap => write!(f, "❌ {} (no intersection)", self.name),
            CutoutOutcome::EmptyResult => write!(f, "❌ {} (empty result)", self.name),
            CutoutOutcome::NothingRemoved => write!(f, "❌ {} (no material removed)", self.name),
        }
    }
}

/// A target after a series of subtractions.
#[derive(Clone, Debug, PartialEq)]
pub struct CutoutRun {
    /// Final mesh.
    pub mesh: Mesh,
    /// One entry per cutout, in order.
    pub steps: Vec<CutoutStep>,
}

impl CutoutRun {
    /// Number of cutouts actually subtracted.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, CutoutOutcome::Applied { .. }))
            .count()
    }

    /// Sum of the volume removed by each applied cutout.
    #[must_use]
    pub fn total_removed(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| match s.outcome {
                CutoutOutcome::Applied { removed } => removed,
                _ => 0.0,
            })
            .sum()
    }
}

/// Subtract each cutout from `target` in turn.
///
/// Invalid cutouts, cutouts whose box misses the current mesh and
/// subtractions that empty the mesh or remove nothing are skipped; the mesh
/// carries on unchanged.
#[must_use]
pub fn apply_cutouts(target: &Mesh, cutouts: &[Cutout]) -> CutoutRun {
    let mut mesh = target.clone();
    let mut steps = Vec::with_capacity(cutouts.len());
    for cutout in cutouts {
        let outcome = subtract(&mut mesh, cutout);
        let step = CutoutStep {
            name: cutout.name.clone(),
            outcome,
        };
        info!("{step}");
        steps.push(step);
    }
    let run = CutoutRun { mesh, steps };
    info!(
        "applied {}/{} cutouts, removed {:.0} mm³",
        run.successes(),
        cutouts.len(),
        run.total_removed()
    );
    run
}

fn subtract(mesh: &mut Mesh, cutout: &Cutout) -> CutoutOutcome {
    if let Err(e) = cutout.validate() {
        warn!("{e}");
        return CutoutOutcome::Invalid {
            reason: e.to_string(),
        };
    }
    if !validate_intersection(mesh, &cutout.mesh).is_some_and(|c| c.overlaps()) {
        return CutoutOutcome::NoOverlap;
    }
    let result = difference(mesh, &cutout.mesh);
    if result.is_empty() {
        return CutoutOutcome::EmptyResult;
    }
    let removed = mesh.volume() - result.volume();
    if removed <= 1e-6 {
        return CutoutOutcome::NothingRemoved;
    }
    *mesh = result;
    CutoutOutcome::Applied { removed }
}

/// Extent of the vertices around an expected opening.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CutoutVerification {
    /// Vertices within the search radius.
    pub vertices: usize,
    /// Lowest of them.
    pub z_min: f64,
    /// Highest of them.
    pub z_max: f64,
    /// X extent of them.
    pub x_range: f64,
    /// Y extent of them.
    pub y_range: f64,
    /// Expected width.
    pub width: f64,
    /// Expected height.
    pub height: f64,
}

/// Dimensions may differ by less than this, in millimetres.
const DIMENSION_TOLERANCE: f64 = 5.0;

impl CutoutVerification {
    /// X extent within tolerance of the expected width.
    #[must_use]
    pub fn width_matches(&self) -> bool {
        (self.x_range - self.width).abs() < DIMENSION_TOLERANCE
    }

    /// Y extent within tolerance of the expected height.
    #[must_use]
    pub fn height_matches(&self) -> bool {
        (self.y_range - self.height).abs() < DIMENSION_TOLERANCE
    }

    /// Both dimensions match.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.width_matches() && self.height_matches()
    }
}

impl fmt::Display for CutoutVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Vertices near cutout: {}", self.vertices)?;
        writeln!(
            f,
            "  Z-range in cutout area: {:.1} to {:.1} mm",
            self.z_min, self.z_max
        )?;
        writeln!(f, "  Z-span: {:.1} mm", self.z_max - self.z_min)?;
        writeln!(f, "  Detected opening X-range: {:.1} mm", self.x_range)?;
        writeln!(f, "  Detected opening Y-range: {:.1} mm", self.y_range)?;
        writeln!(
            f,
            "  Width match: {} (diff: {:.1} mm)",
            self.width_matches(),
            (self.x_range - self.width).abs()
        )?;
        write!(
            f,
            "  Height match: {} (diff: {:.1} mm)",
            self.height_matches(),
            (self.y_range - self.height).abs()
        )
    }
}

/// Measure the vertices within `max(width, height) / 2 + 10` of `center`.
///
/// Returns `None` when no vertex is that close.
#[must_use]
pub fn verify_cutout_dimensions(
    mesh: &Mesh,
    center: DVec2,
    width: f64,
    height: f64,
) -> Option<CutoutVerification> {
    let radius = width.max(height) / 2.0 + 10.0;
    let near = Aabb::from_points(
        mesh.vertices
            .iter()
            .copied()
            .filter(|v| v.truncate().distance(center) < radius),
    )?;
    let vertices = mesh
        .vertices
        .iter()
        .filter(|v| v.truncate().distance(center) < radius)
        .count();
    let size: DVec3 = near.extents();
    Some(CutoutVerification {
        vertices,
        z_min: near.min.z,
        z_max: near.max.z,
        x_range: size.x,
        y_range: size.y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::dvec2;
    use glam::dvec3;

    use super::*;
    use crate::primitives::cuboid;
    use crate::primitives::cylinder;

    fn plate() -> Mesh {
        cuboid(dvec3(100.0, 60.0, 4.0))
    }

    #[test]
    fn open_cutout_is_invalid() {
        let mut open = cuboid(DVec3::ONE);
        open.faces.pop();
        assert!(Cutout::new("open", open).validate().is_err());
        let mut inverted = cuboid(DVec3::ONE);
        inverted.invert();
        let err = Cutout::new("inside out", inverted).validate().unwrap_err();
        assert!(err.to_string().contains("inside out"));
        assert!(Cutout::new("ok", cuboid(DVec3::ONE)).validate().is_ok());
    }

    #[test]
    fn intersection_box_estimate() {
        let check = validate_intersection(&plate(), &cuboid(dvec3(20.0, 20.0, 10.0))).unwrap();
        assert!(check.overlaps());
        assert_relative_eq!(check.estimated_volume.unwrap(), 20.0 * 20.0 * 4.0);

        let far = cuboid(DVec3::ONE).translated(dvec3(0.0, 0.0, 50.0));
        let check = validate_intersection(&plate(), &far).unwrap();
        assert_eq!(check.overlap, [true, true, false]);
        assert!(check.estimated_volume.is_none());
        assert!(validate_intersection(&Mesh::default(), &far).is_none());
    }

    #[test]
    fn sequential_cutouts_skip_failures() {
        let mut open = cuboid(DVec3::ONE);
        open.faces.pop();
        let cutouts = [
            Cutout::new(
                "pocket",
                cuboid(dvec3(20.0, 20.0, 10.0)).translated(dvec3(-20.0, 0.0, 0.0)),
            ),
            Cutout::new("open", open),
            Cutout::new("miss", cuboid(DVec3::ONE).translated(dvec3(500.0, 0.0, 0.0))),
            Cutout::new("hole", cylinder(5.0, 10.0, 32).translated(dvec3(25.0, 0.0, 0.0))),
            Cutout::new(
                "again",
                cuboid(dvec3(10.0, 10.0, 10.0)).translated(dvec3(-20.0, 0.0, 0.0)),
            ),
        ];
        let run = apply_cutouts(&plate(), &cutouts);
        let outcomes: Vec<_> = run.steps.iter().map(|s| &s.outcome).collect();
        assert!(matches!(outcomes[0], CutoutOutcome::Applied { .. }));
        assert!(matches!(outcomes[1], CutoutOutcome::Invalid { .. }));
        assert_eq!(outcomes[2], &CutoutOutcome::NoOverlap);
        assert!(matches!(outcomes[3], CutoutOutcome::Applied { .. }));
        assert_eq!(outcomes[4], &CutoutOutcome::NothingRemoved);
        assert_eq!(run.successes(), 2);
        assert_relative_eq!(
            run.total_removed(),
            plate().volume() - run.mesh.volume(),
            epsilon = 1e-6
        );
        assert!(run.total_removed() > 1600.0);
    }

    #[test]
    fn subtracting_everything_is_skipped() {
        let everything = Cutout::new("all", cuboid(dvec3(200.0, 200.0, 200.0)));
        let run = apply_cutouts(&plate(), &[everything]);
        assert_eq!(run.steps[0].outcome, CutoutOutcome::EmptyResult);
        assert_eq!(run.mesh, plate());
    }

    #[test]
    fn frame_dimensions_match_opening() {
        let frame = crate::csg::difference(
            &cuboid(dvec3(173.0, 91.0, 4.0)),
            &cuboid(dvec3(153.0, 71.0, 10.0)),
        )
        .translated(dvec3(147.0, 9.5, 0.0));
        let v = verify_cutout_dimensions(&frame, dvec2(147.0, 9.5), 153.0, 71.0).unwrap();
        // The search circle reaches the inner rim and part of the outer rim.
        assert!(v.vertices > 0);
        assert_relative_eq!(v.z_max - v.z_min, 4.0, epsilon = 1e-9);
        assert!(v.x_range >= 153.0);
        assert!(verify_cutout_dimensions(&frame, dvec2(1000.0, 0.0), 10.0, 10.0).is_none());
    }
}
