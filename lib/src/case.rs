//! Two part clamshell case generated from a parameter set.
//!
//! The front shell carries the phone opening and the gaming controls, the
//! back shell carries the electronics pockets. Every length is in
//! millimetres, X runs along the width and Y along the height, with the
//! origin at the centre of the case and each shell sitting on Z = 0.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use glam::DVec3;
use glam::dvec3;
use log::info;
use serde::Deserialize;
use serde::Serialize;

use crate::MeshResult;
use crate::adjacency::MeshAdjacency;
use crate::csg::difference;
use crate::csg::union;
use crate::cutout::Cutout;
use crate::cutout::CutoutRun;
use crate::cutout::apply_cutouts;
use crate::io::ExportCheck;
use crate::io::load_toml;
use crate::io::save_text;
use crate::io::verify_export;
use crate::mesh::Mesh;
use crate::primitives::DEFAULT_SECTIONS;
use crate::primitives::cuboid;
use crate::primitives::cylinder;
use crate::primitives::rounded_rectangle;
use crate::repair::WELD_EPSILON;

/// File name of the exported front shell.
pub const FRONT_FILE: &str = "Parametric_Front_Shell_S20.stl";
/// File name of the exported back shell.
pub const BACK_FILE: &str = "Parametric_Back_Shell_Electronics.stl";
/// File name of the design summary.
pub const SUMMARY_FILE: &str = "parametric_case_design_summary.txt";

/// Width of the thumb relief cut into each grip.
const BEVEL_WIDTH: f64 = 8.0;
/// Segments around button holes.
const BUTTON_SECTIONS: usize = 16;

/// Every dimension of the case.
///
/// Missing fields take their default when decoded, so a parameter file only
/// needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CaseParams {
    pub case_width: f64,
    pub case_height: f64,
    pub case_depth: f64,
    pub front_depth: f64,
    pub back_depth: f64,
    pub wall_thickness: f64,

    pub phone_width: f64,
    pub phone_height: f64,
    pub phone_depth: f64,
    pub phone_cutout_width: f64,
    pub phone_cutout_height: f64,

    pub grip_width: f64,
    pub grip_height: f64,
    /// Grips sit this far above (positive) or below the case centre line.
    pub grip_offset_y: f64,

    pub joystick_diameter: f64,
    pub joystick_depth: f64,
    pub dpad_size: f64,
    pub dpad_corner_radius: f64,
    pub abxy_diameter: f64,
    /// Distance between opposite face buttons.
    pub abxy_spacing: f64,
    pub start_menu_diameter: f64,
    pub shoulder_width: f64,
    pub shoulder_height: f64,
    pub trigger_width: f64,
    pub trigger_height: f64,

    pub battery_width: f64,
    pub battery_height: f64,
    pub battery_depth: f64,
    pub tp4056_width: f64,
    pub tp4056_height: f64,
    pub tp4056_depth: f64,
    pub boost_width: f64,
    pub boost_height: f64,
    pub boost_depth: f64,
    pub power_switch_diameter: f64,
    pub power_switch_depth: f64,
    pub usb_splitter_width: f64,
    pub usb_splitter_height: f64,
    pub usb_splitter_depth: f64,
    pub indicator_width: f64,
    pub indicator_height: f64,
    pub indicator_depth: f64,

    pub fit_tolerance: f64,
    /// Clearance added to each electronics pocket dimension.
    pub electronics_tolerance: f64,
    pub edge_fillet: f64,
    /// Corner radius of the phone opening.
    pub internal_fillet: f64,
}

impl Default for CaseParams {
    fn default() -> Self {
        Self {
            case_width: 294.0,
            case_height: 115.0,
            case_depth: 19.0,
            front_depth: 10.0,
            back_depth: 9.0,
            wall_thickness: 2.5,

            phone_width: 151.7,
            phone_height: 69.1,
            phone_depth: 7.9,
            phone_cutout_width: 153.0,
            phone_cutout_height: 71.0,

            grip_width: 71.5,
            grip_height: 95.0,
            grip_offset_y: -10.0,

            joystick_diameter: 32.0,
            joystick_depth: 8.0,
            dpad_size: 24.0,
            dpad_corner_radius: 4.0,
            abxy_diameter: 12.0,
            abxy_spacing: 20.0,
            start_menu_diameter: 8.0,
            shoulder_width: 11.0,
            shoulder_height: 4.0,
            trigger_width: 18.0,
            trigger_height: 8.0,

            battery_width: 90.0,
            battery_height: 60.0,
            battery_depth: 12.0,
            tp4056_width: 23.0,
            tp4056_height: 16.0,
            tp4056_depth: 5.0,
            boost_width: 23.3,
            boost_height: 11.9,
            boost_depth: 4.0,
            power_switch_diameter: 16.0,
            power_switch_depth: 35.0,
            usb_splitter_width: 40.0,
            usb_splitter_height: 14.0,
            usb_splitter_depth: 10.0,
            indicator_width: 43.5,
            indicator_height: 20.0,
            indicator_depth: 5.0,

            fit_tolerance: 0.5,
            electronics_tolerance: 1.0,
            edge_fillet: 1.5,
            internal_fillet: 0.5,
        }
    }
}

impl CaseParams {
    /// Read a TOML parameter file.
    ///
    /// # Errors
    ///   When the file cannot be read or does not decode.
    pub fn from_toml_file(path: &Path) -> MeshResult<Self> {
        load_toml(path)
    }

    /// Width of the body between the grips.
    #[must_use]
    pub fn main_width(&self) -> f64 {
        2.0f64.mul_add(-self.grip_width, self.case_width)
    }

    /// Centre of the left (`sign = -1`) or right (`sign = 1`) joystick.
    fn joystick_center(&self, sign: f64) -> DVec3 {
        dvec3(sign * 120.0, self.grip_offset_y + 15.0, 0.0)
    }
}

/// Which half of the clamshell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shell {
    /// Display and controls.
    Front,
    /// Electronics.
    Back,
}

impl Shell {
    /// Z extent of this shell.
    #[must_use]
    pub const fn depth(self, params: &CaseParams) -> f64 {
        match self {
            Self::Front => params.front_depth,
            Self::Back => params.back_depth,
        }
    }
}

/// Box of `size` centred on `center`.
fn block(size: DVec3, center: DVec3) -> Mesh {
    cuboid(size).translated(center)
}

/// Parametric case generator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandheldCase {
    /// Dimensions.
    pub params: CaseParams,
}

impl HandheldCase {
    /// Constructor
    #[must_use]
    pub const fn new(params: CaseParams) -> Self {
        Self { params }
    }

    /// Central body joined to the two grips.
    #[must_use]
    pub fn base_shell(&self, shell: Shell) -> Mesh {
        let p = &self.params;
        let depth = shell.depth(p);
        let main_width = p.main_width();
        let body = block(
            dvec3(main_width, p.case_height, depth),
            dvec3(0.0, 0.0, depth / 2.0),
        );
        let grip_x = main_width / 2.0 + p.grip_width / 2.0;
        let left = self.grip(dvec3(-grip_x, p.grip_offset_y, depth / 2.0), depth, true);
        let right = self.grip(dvec3(grip_x, p.grip_offset_y, depth / 2.0), depth, false);
        union(&union(&body, &left), &right)
    }

    /// Grip block with a relief slot on the thumb side.
    fn grip(&self, center: DVec3, depth: f64, is_left: bool) -> Mesh {
        let p = &self.params;
        let grip = block(dvec3(p.grip_width, p.grip_height, depth), center);
        let inward = if is_left { 1.0 } else { -1.0 };
        let bevel = block(
            dvec3(BEVEL_WIDTH, p.grip_height * 0.8, depth + 2.0),
            center + dvec3(inward * p.grip_width / 3.0, 0.0, 0.0),
        );
        let relieved = difference(&grip, &bevel);
        if relieved.is_empty() { grip } else { relieved }
    }

    /// Phone opening, sticks, D-pad, face buttons, start/menu, shoulders and
    /// triggers.
    #[must_use]
    pub fn front_cutouts(&self) -> Vec<Cutout> {
        let p = &self.params;
        let through = p.front_depth + 2.0;
        let mut cutouts = vec![Cutout::new(
            "phone",
            rounded_rectangle(
                p.phone_cutout_width,
                p.phone_cutout_height,
                through,
                p.internal_fillet,
                DEFAULT_SECTIONS,
            )
            .translated(dvec3(0.0, 0.0, p.front_depth / 2.0)),
        )];

        let stick = |sign: f64| {
            let c = p.joystick_center(sign);
            cylinder(p.joystick_diameter / 2.0, p.joystick_depth, DEFAULT_SECTIONS)
                .translated(dvec3(c.x, c.y, p.joystick_depth / 2.0))
        };
        cutouts.push(Cutout::new("left joystick", stick(-1.0)));
        cutouts.push(Cutout::new("right joystick", stick(1.0)));

        let dpad = p.joystick_center(-1.0) - dvec3(0.0, 40.0, 0.0);
        cutouts.push(Cutout::new(
            "dpad",
            rounded_rectangle(
                p.dpad_size,
                p.dpad_size,
                through,
                p.dpad_corner_radius,
                BUTTON_SECTIONS,
            )
            .translated(dvec3(dpad.x, dpad.y, p.front_depth / 2.0)),
        ));

        let abxy = p.joystick_center(1.0) - dvec3(0.0, 40.0, 0.0);
        let half = p.abxy_spacing / 2.0;
        let buttons = [
            ("y", (0.0, half)),
            ("b", (half, 0.0)),
            ("a", (0.0, -half)),
            ("x", (-half, 0.0)),
        ];
        for (name, offset) in buttons {
            let button = cylinder(p.abxy_diameter / 2.0, through, BUTTON_SECTIONS)
                .translated(dvec3(abxy.x + offset.0, abxy.y + offset.1, through / 2.0));
            cutouts.push(Cutout::new(format!("{name} button"), button));
        }

        for (name, x) in [("start", -15.0), ("menu", 15.0)] {
            let button = cylinder(p.start_menu_diameter / 2.0, through, BUTTON_SECTIONS)
                .translated(dvec3(x, 25.0, through / 2.0));
            cutouts.push(Cutout::new(name, button));
        }

        let shoulder_x = p.case_width / 2.0 - 20.0;
        let shoulder_y = p.case_height / 2.0 - 5.0;
        let z = p.front_depth / 2.0;
        for (name, sign) in [("l1", -1.0), ("r1", 1.0)] {
            cutouts.push(Cutout::new(
                name,
                block(
                    dvec3(p.shoulder_width, p.shoulder_height, through),
                    dvec3(sign * shoulder_x, shoulder_y, z),
                ),
            ));
        }
        for (name, sign) in [("l2", -1.0), ("r2", 1.0)] {
            cutouts.push(Cutout::new(
                name,
                block(
                    dvec3(p.trigger_width, p.trigger_height, through),
                    dvec3(sign * shoulder_x, shoulder_y - 10.0, z),
                ),
            ));
        }
        cutouts
    }

    /// Battery, charger, boost, switch, USB splitter and indicator pockets.
    #[must_use]
    pub fn back_cutouts(&self) -> Vec<Cutout> {
        let p = &self.params;
        let tol = DVec3::splat(p.electronics_tolerance);
        let d = p.back_depth;
        let pocket = |name: &str, size: DVec3, center: DVec3| {
            Cutout::new(name, block(size + tol, center))
        };
        vec![
            pocket(
                "battery",
                dvec3(p.battery_width, p.battery_height, p.battery_depth),
                dvec3(0.0, 0.0, d / 2.0),
            ),
            pocket(
                "tp4056 charger",
                dvec3(p.tp4056_width, p.tp4056_height, p.tp4056_depth),
                dvec3(-50.0, 0.0, d / 4.0),
            ),
            pocket(
                "boost",
                dvec3(p.boost_width, p.boost_height, p.boost_depth),
                dvec3(50.0, 0.0, d / 4.0),
            ),
            Cutout::new(
                "power switch",
                cylinder(p.power_switch_diameter / 2.0, d + 2.0, DEFAULT_SECTIONS).translated(
                    dvec3(p.case_width / 2.0 - 20.0, p.case_height / 2.0 - 20.0, d / 2.0),
                ),
            ),
            pocket(
                "usb splitter",
                dvec3(p.usb_splitter_width, p.usb_splitter_height, p.usb_splitter_depth),
                dvec3(0.0, -p.case_height / 2.0 + 15.0, d / 3.0),
            ),
            pocket(
                "indicator",
                dvec3(p.indicator_width, p.indicator_height, p.indicator_depth),
                dvec3(0.0, p.case_height / 2.0 - 10.0, d - 2.0),
            ),
        ]
    }

    /// Base shell with its cutouts applied.
    #[must_use]
    pub fn shell(&self, shell: Shell) -> CutoutRun {
        info!("creating {shell:?} shell");
        let cutouts = match shell {
            Shell::Front => self.front_cutouts(),
            Shell::Back => self.back_cutouts(),
        };
        apply_cutouts(&self.base_shell(shell), &cutouts)
    }

    /// Human readable design sheet.
    #[must_use]
    pub const fn summary(&self) -> DesignSummary<'_> {
        DesignSummary(&self.params)
    }

    /// Build both shells and write them, with the design summary, into `dir`.
    ///
    /// # Errors
    ///   When a file cannot be written or re-read.
    pub fn export(&self, dir: &Path) -> MeshResult<CaseExport> {
        let front = self.export_shell(Shell::Front, &dir.join(FRONT_FILE))?;
        let back = self.export_shell(Shell::Back, &dir.join(BACK_FILE))?;
        let summary = dir.join(SUMMARY_FILE);
        save_text(&summary, &self.summary().to_string())?;
        info!("design summary saved: {}", summary.display());
        Ok(CaseExport {
            front,
            back,
            summary,
        })
    }

    fn export_shell(&self, shell: Shell, path: &Path) -> MeshResult<ShellExport> {
        let run = self.shell(shell);
        let mut mesh = run.mesh.clone();
        mesh.remove_duplicate_faces();
        mesh.merge_vertices(WELD_EPSILON);
        let check = verify_export(path, &mesh)?;
        Ok(ShellExport {
            shell,
            volume: mesh.volume(),
            watertight: MeshAdjacency::build(&mesh.faces).is_watertight(),
            check,
            run,
        })
    }
}

/// One exported shell.
#[derive(Clone, Debug, PartialEq)]
pub struct ShellExport {
    /// Which shell.
    pub shell: Shell,
    /// Volume after cleanup.
    pub volume: f64,
    /// Closed after cleanup.
    pub watertight: bool,
    /// Reloaded file statistics.
    pub check: ExportCheck,
    /// Per-cutout outcomes.
    pub run: CutoutRun,
}

impl fmt::Display for ShellExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.run.steps {
            writeln!(f, "  {step}")?;
        }
        writeln!(
            f,
            "✅ {:?} shell exported: {}",
            self.shell,
            self.check.path.display()
        )?;
        writeln!(f, "   Vertices: {}", self.check.vertices)?;
        writeln!(f, "   Faces: {}", self.check.faces)?;
        writeln!(f, "   Volume: {:.0} mm³", self.volume)?;
        write!(f, "   Watertight: {}", self.watertight)
    }
}

/// Files written by [`HandheldCase::export`].
#[derive(Clone, Debug, PartialEq)]
pub struct CaseExport {
    /// Front shell.
    pub front: ShellExport,
    /// Back shell.
    pub back: ShellExport,
    /// Design summary text.
    pub summary: PathBuf,
}

impl fmt::Display for CaseExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", self.front)?;
        writeln!(f, "{}", self.back)?;
        write!(f, "📄 Design summary saved: {}", self.summary.display())
    }
}

/// Specification sheet for a parameter set.
#[derive(Debug)]
pub struct DesignSummary<'a>(&'a CaseParams);

impl fmt::Display for DesignSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0;
        writeln!(f, "PARAMETRIC HANDHELD CASE - DESIGN SUMMARY")?;
        writeln!(f, "{}\n", "=".repeat(70))?;

        writeln!(f, "CASE DIMENSIONS:")?;
        writeln!(
            f,
            "Overall size: {} × {} × {} mm",
            p.case_width, p.case_height, p.case_depth
        )?;
        for (name, depth) in [("Front", p.front_depth), ("Back", p.back_depth)] {
            writeln!(
                f,
                "{name} shell: {} × {} × {depth} mm",
                p.case_width, p.case_height
            )?;
        }
        writeln!(f, "Wall thickness: {} mm", p.wall_thickness)?;
        writeln!(f, "Edge fillets: {} mm\n", p.edge_fillet)?;

        writeln!(f, "PHONE:")?;
        writeln!(
            f,
            "Device size: {} × {} × {} mm",
            p.phone_width, p.phone_height, p.phone_depth
        )?;
        writeln!(
            f,
            "Cutout size: {} × {} mm",
            p.phone_cutout_width, p.phone_cutout_height
        )?;
        writeln!(
            f,
            "Tolerance: {:.1} mm clearance\n",
            p.phone_cutout_width - p.phone_width
        )?;

        writeln!(f, "GAMING CONTROLS (FRONT SHELL):")?;
        for side in ["Left", "Right"] {
            writeln!(
                f,
                "• {side} joystick: ∅{} mm, {} mm deep",
                p.joystick_diameter, p.joystick_depth
            )?;
        }
        writeln!(
            f,
            "• D-pad: {} × {} mm, {} mm corners",
            p.dpad_size, p.dpad_size, p.dpad_corner_radius
        )?;
        writeln!(
            f,
            "• ABXY buttons: 4 × ∅{} mm, {} mm spacing",
            p.abxy_diameter, p.abxy_spacing
        )?;
        writeln!(f, "• Start/Menu: 2 × ∅{} mm", p.start_menu_diameter)?;
        writeln!(
            f,
            "• L1/R1 shoulders: {} × {} mm",
            p.shoulder_width, p.shoulder_height
        )?;
        writeln!(
            f,
            "• L2/R2 triggers: {} × {} mm\n",
            p.trigger_width, p.trigger_height
        )?;

        writeln!(f, "ELECTRONICS (BACK SHELL):")?;
        writeln!(
            f,
            "• Battery: {} × {} × {} mm",
            p.battery_width, p.battery_height, p.battery_depth
        )?;
        writeln!(
            f,
            "• TP4056 charger: {} × {} × {} mm",
            p.tp4056_width, p.tp4056_height, p.tp4056_depth
        )?;
        writeln!(
            f,
            "• Boost module: {} × {} × {} mm",
            p.boost_width, p.boost_height, p.boost_depth
        )?;
        writeln!(
            f,
            "• Power switch: ∅{} mm hole, {} mm clearance",
            p.power_switch_diameter, p.power_switch_depth
        )?;
        writeln!(
            f,
            "• USB splitter: {} × {} × {} mm",
            p.usb_splitter_width, p.usb_splitter_height, p.usb_splitter_depth
        )?;
        writeln!(
            f,
            "• Indicator: {} × {} × {} mm",
            p.indicator_width, p.indicator_height, p.indicator_depth
        )?;
        writeln!(
            f,
            "• Electronics tolerance: {} mm clearance\n",
            p.electronics_tolerance
        )?;

        writeln!(f, "MANUFACTURING NOTES:")?;
        writeln!(f, "• Designed for FDM 3D printing")?;
        writeln!(f, "• Print orientation: Both shells face-up for minimal supports")?;
        writeln!(f, "• Layer height: 0.2mm recommended")?;
        writeln!(f, "• Infill: 20-30% for structural strength\n")?;

        writeln!(f, "ASSEMBLY INSTRUCTIONS:")?;
        writeln!(f, "1. Print both front and back shells")?;
        writeln!(f, "2. Test fit the phone in the front cutout")?;
        writeln!(f, "3. Install all electronics in back shell pockets")?;
        writeln!(f, "4. Route cables through planned pathways")?;
        writeln!(f, "5. Assemble shells with fasteners (screws or clips)")?;
        writeln!(f, "6. Test all controls and connections\n")?;

        writeln!(f, "OUTPUT FILES:")?;
        writeln!(f, "• {FRONT_FILE} - Front shell with gaming controls")?;
        writeln!(f, "• {BACK_FILE} - Back shell with electronics")?;
        writeln!(f, "• {SUMMARY_FILE} - This design documentation")
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::MeshError;
    use crate::cutout::CutoutOutcome;

    #[test]
    fn partial_parameter_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.toml");
        std::fs::write(&path, "case_width = 300.0\ngrip_width = 70.0\n").unwrap();
        let params = CaseParams::from_toml_file(&path).unwrap();
        assert_relative_eq!(params.case_width, 300.0);
        assert_relative_eq!(params.main_width(), 160.0);
        assert_relative_eq!(params.phone_cutout_width, 153.0);

        std::fs::write(&path, "case_width = \"wide\"\n").unwrap();
        assert!(matches!(
            CaseParams::from_toml_file(&path),
            Err(MeshError::Config { .. })
        ));
        assert!(matches!(
            CaseParams::from_toml_file(&dir.path().join("missing.toml")),
            Err(MeshError::IoRead { .. })
        ));
    }

    #[test]
    fn json_body_uses_defaults() {
        let params: CaseParams = serde_json::from_str(r#"{"front_depth": 12.0}"#).unwrap();
        assert_relative_eq!(params.front_depth, 12.0);
        assert_eq!(
            CaseParams {
                front_depth: 10.0,
                ..params
            },
            CaseParams::default()
        );
    }

    #[test]
    fn base_shell_volume() {
        let case = HandheldCase::default();
        let shell = case.base_shell(Shell::Front);
        let body = 151.0 * 115.0 * 10.0;
        let grip = 71.5 * 95.0 * 10.0 - 8.0 * 76.0 * 10.0;
        assert_relative_eq!(shell.volume(), body + 2.0 * grip, epsilon = 1e-3);
        let size = shell.extents();
        assert_relative_eq!(size.x, 294.0, epsilon = 1e-9);
        assert_relative_eq!(size.y, 115.0, epsilon = 1e-9);
    }

    #[test]
    fn cutout_layout() {
        let case = HandheldCase::default();
        let front = case.front_cutouts();
        assert_eq!(front.len(), 14);
        assert!(front.iter().all(|c| c.validate().is_ok()));
        let center = |name: &str| {
            front
                .iter()
                .find(|c| c.name == name)
                .and_then(|c| c.mesh.bounds())
                .map(|b| b.center())
                .unwrap()
        };
        let stick = center("right joystick");
        assert_relative_eq!(stick.x, 120.0, epsilon = 1e-9);
        assert_relative_eq!(stick.y, 5.0, epsilon = 1e-9);
        let dpad = center("dpad");
        assert_relative_eq!(dpad.x, -120.0, epsilon = 1e-9);
        assert_relative_eq!(dpad.y, -35.0, epsilon = 1e-9);
        let y = center("y button");
        assert_relative_eq!(y.y, -25.0, epsilon = 1e-9);

        let back = case.back_cutouts();
        assert_eq!(back.len(), 6);
        let battery = back[0].mesh.extents();
        assert_relative_eq!(battery.x, 91.0, epsilon = 1e-9);
        assert_relative_eq!(battery.z, 13.0, epsilon = 1e-9);
    }

    #[test]
    fn front_shell_operations() {
        let case = HandheldCase::default();
        let run = case.shell(Shell::Front);
        let CutoutOutcome::Applied { removed } = run.steps[0].outcome else {
            panic!("phone opening not applied: {}", run.steps[0]);
        };
        let phone = 153.0 * 71.0 * 10.0;
        assert!(removed <= phone + 1e-6 && removed > phone - 10.0, "{removed}");

        // Start and menu fall inside the phone opening.
        for step in run.steps.iter().filter(|s| s.name == "start" || s.name == "menu") {
            assert_eq!(step.outcome, CutoutOutcome::NothingRemoved);
        }
        assert!(run.successes() >= 7);
    }

    #[test]
    fn export_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let export = HandheldCase::default().export(dir.path()).unwrap();
        assert!(dir.path().join(FRONT_FILE).exists());
        assert!(dir.path().join(BACK_FILE).exists());
        assert!(export.front.check.faces > 0);
        assert!(export.back.volume > 0.0);
        let summary = std::fs::read_to_string(&export.summary).unwrap();
        assert!(summary.contains("Overall size: 294 × 115 × 19 mm"));
        assert!(summary.contains("• Boost module: 23.3 × 11.9 × 4 mm"));
    }
}
