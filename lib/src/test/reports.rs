use glam::dvec3;
use insta::assert_debug_snapshot;
use insta::assert_snapshot;

use crate::analysis::z_level_histogram;
use crate::case::CaseParams;
use crate::case::HandheldCase;
use crate::cutout::CutoutOutcome;
use crate::cutout::CutoutStep;
use crate::housing::FrontCutoutParams;
use crate::housing::assembly_guide;
use crate::housing::cutout_measurements;
use crate::primitives::cuboid;
use crate::repair::repair;

#[test]
fn repair_report_of_clean_cube() {
    let mut cube = cuboid(dvec3(10.0, 10.0, 10.0));
    assert_snapshot!(repair(&mut cube).to_string(), @r"
    Removed duplicate faces: 0
    Removed degenerate faces: 0
    Merged vertices: 0
    Removed unreferenced vertices: 0
    Flipped faces: 0
    Inverted components: 0
    Filled holes: 0 (0 faces)
    Watertight: true
    ");
}

#[test]
fn cube_z_levels() {
    let cube = cuboid(dvec3(2.0, 2.0, 2.0));
    assert_debug_snapshot!(z_level_histogram(&cube, 10), @r"
    [
        ZLevel {
            z: 1.0,
            count: 4,
        },
        ZLevel {
            z: -1.0,
            count: 4,
        },
    ]
    ");
}

#[test]
fn cutout_step_lines() {
    let lines: Vec<String> = [
        CutoutOutcome::Applied { removed: 1600.4 },
        CutoutOutcome::Invalid {
            reason: "not watertight".into(),
        },
        CutoutOutcome::NoOverlap,
        CutoutOutcome::EmptyResult,
        CutoutOutcome::NothingRemoved,
    ]
    .into_iter()
    .map(|outcome| {
        CutoutStep {
            name: "battery".into(),
            outcome,
        }
        .to_string()
    })
    .collect();
    assert_snapshot!(lines.join("\n"), @r"
    ✓ battery (removed 1600 mm³)
    ❌ battery invalid: not watertight
    ❌ battery (no intersection)
    ❌ battery (empty result)
    ❌ battery (no material removed)
    ");
}

#[test]
fn assembly_guide_text() {
    assert_snapshot!(assembly_guide("front.stl", "back.stl"), @r"
    NUCDECK ASSEMBLY GUIDE
    ==================================================

    FRONT COVER:
    ✓ Phone cutout (153×71mm)
    ✓ Gaming control features (verify manually)
      - File: front.stl

    BACK COVER:
    ✓ battery pocket (92×62×13mm)
    ✓ charger pocket (24×17×6mm)
    ✓ boost pocket (25×13×5mm)
    ✓ indicator pocket (45×21×6mm)
    ✓ power switch pocket (∅16×15mm)
    ✓ Cable routing channels (∅2.5mm)
      - File: back.stl

    ASSEMBLY ORDER:
    1. Install electronics in back cover pockets
    2. Route cables through channels
    3. Insert battery into compartment
    4. Mount phone in front cover
    5. Connect joysticks and buttons
    6. Secure covers together

    3D PRINTING NOTES:
    - Print covers separately
    - Support material may be needed for overhangs
    - Test fit components before final assembly
    - Use 0.2mm layer height for good detail
    ");
}

#[test]
fn cutout_measurement_sheet() {
    assert_snapshot!(cutout_measurements(&FrontCutoutParams::default()), @r"
    NucDeck Front Cover Cutout Measurements
    ==================================================

    Phone Cutout Specifications:
      Phone dimensions: 152.0 × 70.0 mm
      Cutout dimensions: 153.0 × 71.0 mm (with 0.5mm tolerance)
      Center position: (147.0, 9.5) mm
      Corner radius: 1.0 mm
      Depth: Full shell thickness

    Quality Requirements:
      - Watertight mesh: Required
      - Smooth corners: 1mm fillet radius
      - Print tolerance: ±0.2mm typical
      - Friction fit: Phone should slide in with light pressure
    ");
}

#[test]
fn design_summary_text() {
    let case = HandheldCase::new(CaseParams::default());
    assert_snapshot!(case.summary().to_string(), @r"
    PARAMETRIC HANDHELD CASE - DESIGN SUMMARY
    ======================================================================

    CASE DIMENSIONS:
    Overall size: 294 × 115 × 19 mm
    Front shell: 294 × 115 × 10 mm
    Back shell: 294 × 115 × 9 mm
    Wall thickness: 2.5 mm
    Edge fillets: 1.5 mm

    PHONE:
    Device size: 151.7 × 69.1 × 7.9 mm
    Cutout size: 153 × 71 mm
    Tolerance: 1.3 mm clearance

    GAMING CONTROLS (FRONT SHELL):
    • Left joystick: ∅32 mm, 8 mm deep
    • Right joystick: ∅32 mm, 8 mm deep
    • D-pad: 24 × 24 mm, 4 mm corners
    • ABXY buttons: 4 × ∅12 mm, 20 mm spacing
    • Start/Menu: 2 × ∅8 mm
    • L1/R1 shoulders: 11 × 4 mm
    • L2/R2 triggers: 18 × 8 mm

    ELECTRONICS (BACK SHELL):
    • Battery: 90 × 60 × 12 mm
    • TP4056 charger: 23 × 16 × 5 mm
    • Boost module: 23.3 × 11.9 × 4 mm
    • Power switch: ∅16 mm hole, 35 mm clearance
    • USB splitter: 40 × 14 × 10 mm
    • Indicator: 43.5 × 20 × 5 mm
    • Electronics tolerance: 1 mm clearance

    MANUFACTURING NOTES:
    • Designed for FDM 3D printing
    • Print orientation: Both shells face-up for minimal supports
    • Layer height: 0.2mm recommended
    • Infill: 20-30% for structural strength

    ASSEMBLY INSTRUCTIONS:
    1. Print both front and back shells
    2. Test fit the phone in the front cutout
    3. Install all electronics in back shell pockets
    4. Route cables through planned pathways
    5. Assemble shells with fasteners (screws or clips)
    6. Test all controls and connections

    OUTPUT FILES:
    • Parametric_Front_Shell_S20.stl - Front shell with gaming controls
    • Parametric_Back_Shell_Electronics.stl - Back shell with electronics
    • parametric_case_design_summary.txt - This design documentation
    ");
}
