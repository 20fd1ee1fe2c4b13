#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
//! Analyse, inspect and modify handheld housing STL files.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use glam::dvec2;
use log::info;
use nucdeck_mesh::Mesh;
use nucdeck_mesh::adjacency::MeshReport;
use nucdeck_mesh::analysis;
use nucdeck_mesh::case::CaseParams;
use nucdeck_mesh::case::HandheldCase;
use nucdeck_mesh::cutout::verify_cutout_dimensions;
use nucdeck_mesh::features;
use nucdeck_mesh::features::ControlCount;
use nucdeck_mesh::features::ControlMapDocument;
use nucdeck_mesh::features::FeatureMapDocument;
use nucdeck_mesh::features::RayHoleKind;
use nucdeck_mesh::housing;
use nucdeck_mesh::housing::FrontCutoutParams;
use nucdeck_mesh::io::load_stl;
use nucdeck_mesh::io::load_toml;
use nucdeck_mesh::io::save_json;
use nucdeck_mesh::io::save_text;
use nucdeck_mesh::io::verify_export;
use nucdeck_mesh::library::ModelLibrary;

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measurements and placement recommendations for one part.
    Analyze {
        /// STL file.
        input: PathBuf,
        #[arg(long, help = "also write the measurements as JSON")]
        json: Option<PathBuf>,
    },
    /// Compare a front and back cover and check the electronics fit.
    Compare {
        #[arg(long, short = 'f')]
        front: PathBuf,
        #[arg(long, short = 'b')]
        back: PathBuf,
    },
    /// Surface orientation, Z levels, density, cavities and shell thickness.
    Inspect {
        /// STL file.
        input: PathBuf,
        #[arg(long, default_value_t = 20, help = "cavity probe lattice size")]
        resolution: usize,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Detect and classify controls from vertex rings and flat regions.
    Features {
        /// STL file.
        input: PathBuf,
        #[arg(long, short = 'o', help = "feature map JSON")]
        output: Option<PathBuf>,
    },
    /// Verify controls from boundary holes and upward faces.
    Controls {
        /// STL file.
        input: PathBuf,
        #[arg(long, short = 'o', help = "control map JSON")]
        output: Option<PathBuf>,
    },
    /// Cast rays for openings and look for an existing cutout.
    Holes {
        /// STL file.
        input: PathBuf,
        #[arg(long, default_value_t = 147.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 9.5, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value_t = 80.0)]
        radius: f64,
        #[arg(long, default_value_t = 10_000)]
        samples: usize,
    },
    /// Cut the phone opening through the front cover.
    ModifyFront {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, help = "TOML file overriding the opening parameters")]
        params: Option<PathBuf>,
        #[arg(long, help = "write the measurement sheet here")]
        measurements: Option<PathBuf>,
    },
    /// Cut the electronics pockets into the back cover.
    ModifyBack {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, help = "also route cable channels between pockets")]
        channels: bool,
        #[arg(long, help = "write the assembly guide here")]
        guide: Option<PathBuf>,
    },
    /// Measure the vertices around an opening against the expected size.
    VerifyCutout {
        input: PathBuf,
        #[arg(long, default_value_t = 147.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 9.5, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value_t = 153.0)]
        width: f64,
        #[arg(long, default_value_t = 71.0)]
        height: f64,
    },
    /// Export a slab matching the phone opening for test prints.
    Template {
        output: PathBuf,
        #[arg(long, help = "TOML file overriding the opening parameters")]
        params: Option<PathBuf>,
    },
    /// Generate the parametric two part case.
    Case {
        #[arg(default_value = "output")]
        output_dir: PathBuf,
        #[arg(long, help = "TOML file overriding the case parameters")]
        params: Option<PathBuf>,
    },
    /// Catalog the STL and STEP files below a directory.
    Catalog {
        root: PathBuf,
        #[arg(long, help = "catalog JSON")]
        json: Option<PathBuf>,
        #[arg(long, help = "OpenSCAD import module file")]
        scad: Option<PathBuf>,
        #[arg(long, help = "list only this category, e.g. button_dpad")]
        category: Option<String>,
    },
}

fn load(path: &Path) -> Result<Mesh> {
    let mesh = load_stl(path).with_context(|| format!("loading {}", path.display()))?;
    info!(
        "{}: {} vertices, {} faces",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

fn front_params(path: Option<&Path>) -> Result<FrontCutoutParams> {
    Ok(match path {
        Some(p) => load_toml(p)?,
        None => FrontCutoutParams::default(),
    })
}

fn print_counts(counts: &[ControlCount]) {
    for c in counts {
        let mark = if c.is_exact() {
            "✅"
        } else if c.is_present() {
            "⚠️"
        } else {
            "❌"
        };
        println!(
            "  {mark} {}: {}/{} ({})",
            c.name, c.found, c.expected, c.description
        );
    }
}

fn analyze(input: &Path, json: Option<&Path>) -> Result<()> {
    let mesh = load(input)?;
    println!("{}\n", MeshReport::new(&mesh));
    let a = analysis::analyze(&mesh)?;
    println!("{a}\n");
    println!("{}", analysis::placement_recommendations(a.dimensions));
    if let Some(path) = json {
        save_json(path, &a)?;
    }
    Ok(())
}

fn compare(front: &Path, back: &Path) -> Result<()> {
    let front = analysis::analyze(&load(front)?)?;
    let back = analysis::analyze(&load(back)?)?;
    println!("{}\n", analysis::compare(&front, &back));
    let fit = analysis::component_fit(&front, &back);
    println!("{fit}\n");
    println!("{}", analysis::placement_recommendations(back.dimensions));
    if !fit.electronics_fit() {
        bail!("electronics do not fit the back cover");
    }
    Ok(())
}

fn inspect(input: &Path, resolution: usize, top: usize) -> Result<()> {
    let mesh = load(input)?;
    let o = analysis::surface_orientation(&mesh);
    println!("Surface orientation (faces over 1 mm²):");
    println!("  Upward facing: {}", o.up);
    println!("  Downward facing: {}", o.down);
    println!("  Vertical: {}\n", o.vertical);

    println!("Mounting surfaces:");
    for s in analysis::mounting_surfaces(&mesh).iter().take(top) {
        let c = s.center;
        println!(
            "  ({:.1}, {:.1}, {:.1}) area {:.1} mm² {}",
            c.x, c.y, c.z, s.area, s.orientation
        );
    }

    println!("\nMost populated Z levels:");
    for level in analysis::z_level_histogram(&mesh, top) {
        println!("  Z = {:.1} mm: {} vertices", level.z, level.count);
    }

    println!("\nHigh density regions:");
    for r in analysis::density_regions(&mesh, 20, 10, 50).iter().take(top) {
        println!(
            "  ({:.1}, {:.1}): {} vertices, Z span {:.1} mm",
            r.center.x, r.center.y, r.vertices, r.z_span
        );
    }

    println!("\n{}", analysis::internal_cavity(&mesh, resolution));
    match analysis::shell_thickness(&mesh) {
        Some(t) => println!(
            "Shell thickness: {:.2} ± {:.2} mm over {} rays",
            t.mean,
            t.std_dev,
            t.samples.len()
        ),
        None => println!("Shell thickness: no ray crossed two surfaces"),
    }
    Ok(())
}

fn feature_map(input: &Path, output: Option<&Path>) -> Result<()> {
    let mesh = load(input)?;
    let scan = features::scan_features(&mesh);
    println!(
        "Found {} circular and {} rectangular features",
        scan.circular.len(),
        scan.rectangular.len()
    );
    for (name, list) in scan.map.categories() {
        if list.is_empty() {
            continue;
        }
        println!("{name}:");
        for f in list {
            println!("  ({:.1}, {:.1}, {:.1})", f.center.x, f.center.y, f.center.z);
        }
    }
    println!("\nVerification:");
    print_counts(&scan.map.verify());
    if let Some(path) = output {
        let name = input.file_name().map(|n| n.to_string_lossy().into_owned());
        let doc = FeatureMapDocument::new(name.as_deref().unwrap_or_default(), &mesh, &scan.map);
        save_json(path, &doc)?;
    }
    Ok(())
}

fn controls(input: &Path, output: Option<&Path>) -> Result<()> {
    let mesh = load(input)?;
    let scan = features::scan_controls(&mesh);
    println!(
        "Found {} circular holes and {} upward rectangles",
        scan.holes.len(),
        scan.rectangles.len()
    );
    print_counts(&scan.layout.validate());
    if let Some(path) = output {
        save_json(path, &ControlMapDocument::new(&mesh, &scan.layout))?;
    }
    if scan.layout.is_valid() {
        println!("✅ All gaming controls detected");
    } else {
        println!("🔍 Manual verification of gaming controls recommended");
    }
    Ok(())
}

fn holes(input: &Path, x: f64, y: f64, radius: f64, samples: usize) -> Result<()> {
    let mesh = load(input)?;
    let found = features::detect_ray_holes(&mesh);
    let through = found
        .iter()
        .filter(|h| matches!(h.kind, RayHoleKind::ThroughHole))
        .count();
    println!("Ray openings: {through} through holes, {} cutouts", found.len() - through);
    for h in found.iter().take(10) {
        match h.kind {
            RayHoleKind::ThroughHole => {
                println!("  through hole at ({:.1}, {:.1})", h.center.x, h.center.y);
            }
            RayHoleKind::Cutout { depth, .. } => println!(
                "  cutout at ({:.1}, {:.1}) depth {depth:.1} mm",
                h.center.x, h.center.y
            ),
        }
    }
    match analysis::detect_existing_cutout(&mesh, dvec2(x, y), radius, samples) {
        Some(c) => println!(
            "Existing cutout near ({x:.1}, {y:.1}): Z {:.1} to {:.1}, gaps at {:?}",
            c.z_min, c.z_max, c.gap_levels
        ),
        None => println!("No existing cutout near ({x:.1}, {y:.1})"),
    }
    Ok(())
}

fn modify_front(
    input: &Path,
    output: &Path,
    params: Option<&Path>,
    measurements: Option<&Path>,
) -> Result<()> {
    let params = front_params(params)?;
    let mesh = load(input)?;
    let (modified, report) = housing::modify_front(&mesh, &params)?;
    println!("{report}");
    let check = verify_export(output, &modified)?;
    println!(
        "✓ Export successful! File size: {} bytes ({} vertices, {} faces)",
        check.file_size, check.vertices, check.faces
    );
    if let Some(path) = measurements {
        save_text(path, &housing::cutout_measurements(&params))?;
    }
    Ok(())
}

fn modify_back(input: &Path, output: &Path, channels: bool, guide: Option<&Path>) -> Result<()> {
    let mesh = load(input)?;
    let (modified, report) = housing::modify_back(&mesh, channels)?;
    println!("{report}");
    let check = verify_export(output, &modified)?;
    println!(
        "✓ Export successful! File size: {} bytes ({} vertices, {} faces)",
        check.file_size, check.vertices, check.faces
    );
    if let Some(path) = guide {
        let front = "FrontCover_Modified.stl";
        let back = output
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        save_text(path, &housing::assembly_guide(front, &back))?;
    }
    if report.run.successes() == 0 {
        bail!("no electronics pocket could be cut");
    }
    Ok(())
}

fn verify_cutout(input: &Path, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
    let mesh = load(input)?;
    let Some(v) = verify_cutout_dimensions(&mesh, dvec2(x, y), width, height) else {
        bail!("no vertices near ({x:.1}, {y:.1})");
    };
    println!("{v}");
    if !v.passed() {
        bail!("cutout dimensions do not match {width} × {height} mm");
    }
    println!("✅ Cutout dimensions verified");
    Ok(())
}

fn template(output: &Path, params: Option<&Path>) -> Result<()> {
    let params = front_params(params)?;
    let check = verify_export(output, &housing::phone_template(&params))?;
    println!(
        "Template {:.1} × {:.1} × {:.1} mm written to {} ({} bytes)",
        params.cutout_width(),
        params.cutout_height(),
        housing::TEMPLATE_DEPTH,
        check.path.display(),
        check.file_size
    );
    Ok(())
}

fn case(output_dir: &Path, params: Option<&Path>) -> Result<()> {
    let params = match params {
        Some(p) => CaseParams::from_toml_file(p)?,
        None => CaseParams::default(),
    };
    println!(
        "Case dimensions: {}×{}×{}mm",
        params.case_width, params.case_height, params.case_depth
    );
    let export = HandheldCase::new(params).export(output_dir)?;
    println!("{export}");
    Ok(())
}

fn catalog(
    root: &Path,
    json: Option<&Path>,
    scad: Option<&Path>,
    category: Option<&str>,
) -> Result<()> {
    let library = ModelLibrary::scan(root)?;
    for (c, models) in library.catalog() {
        println!("  {c}: {} files", models.len());
    }
    if let Some(wanted) = category {
        println!("Models in category '{wanted}':");
        for m in library.models().iter().filter(|m| m.category.as_str() == wanted) {
            println!("  - {}: {}", m.name, m.description);
        }
    }
    if let Some(path) = json {
        library.export_catalog(path)?;
        println!("Model catalog exported to {}", path.display());
    }
    if let Some(path) = scad {
        save_text(path, &library.openscad_imports())?;
        println!("OpenSCAD imports generated in {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    info!("starting up");

    let args = Cli::parse();
    match args.command {
        Command::Analyze { input, json } => analyze(&input, json.as_deref()),
        Command::Compare { front, back } => compare(&front, &back),
        Command::Inspect {
            input,
            resolution,
            top,
        } => inspect(&input, resolution, top),
        Command::Features { input, output } => feature_map(&input, output.as_deref()),
        Command::Controls { input, output } => controls(&input, output.as_deref()),
        Command::Holes {
            input,
            x,
            y,
            radius,
            samples,
        } => holes(&input, x, y, radius, samples),
        Command::ModifyFront {
            input,
            output,
            params,
            measurements,
        } => modify_front(&input, &output, params.as_deref(), measurements.as_deref()),
        Command::ModifyBack {
            input,
            output,
            channels,
            guide,
        } => modify_back(&input, &output, channels, guide.as_deref()),
        Command::VerifyCutout {
            input,
            x,
            y,
            width,
            height,
        } => verify_cutout(&input, x, y, width, height),
        Command::Template { output, params } => template(&output, params.as_deref()),
        Command::Case { output_dir, params } => case(&output_dir, params.as_deref()),
        Command::Catalog {
            root,
            json,
            scad,
            category,
        } => catalog(&root, json.as_deref(), scad.as_deref(), category.as_deref()),
    }
}
