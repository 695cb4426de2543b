//! Normalforge CLI - bevel weight and custom normal tool.
//!
//! Usage: normalforge [--config FILE] [-v] <COMMAND> <INPUT> [OUTPUT]
//!
//! Run `normalforge --help` for available commands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use normalforge::algo::normals::WeightMode;
use normalforge::algo::weights::WeightSource;
use normalforge::algo::{classify, weights};
use normalforge::config::WorkflowConfig;
use normalforge::error::MeshError;
use normalforge::io;
use normalforge::mesh::PolyMesh;
use normalforge::workflow::{MeshObject, NormalMode, Session};

#[derive(Parser)]
#[command(name = "normalforge")]
#[command(author, version, about = "Bevel weight and custom normal CLI", long_about = None)]
struct Cli {
    /// Workflow configuration file (TOML); flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log algorithm internals (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Derive bevel weights and save the mesh with its edge attributes
    Weights {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file (PLY keeps edge attributes)
        output: PathBuf,

        /// Where the weights come from
        #[arg(short, long, value_enum, default_value = "angle")]
        source: SourceArg,

        /// Dihedral threshold in radians
        #[arg(short, long)]
        angle: Option<f64>,

        /// Also mark weighted edges as seams
        #[arg(long)]
        seams: bool,
    },

    /// Report bevel faces found by area flood fill
    Classify {
        /// Input mesh file
        input: PathBuf,

        /// Area ratio below the median that marks a face as small (0.0 to 1.0]
        #[arg(short, long)]
        ratio: Option<f64>,
    },

    /// Write custom normals on the original faces of a beveled mesh
    Normals {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file (OBJ keeps custom normals)
        output: PathBuf,

        /// Area ratio for bevel detection
        #[arg(short, long)]
        ratio: Option<f64>,

        /// Normal synthesis mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Weighted modes: only the original faces contribute
        #[arg(long, overrides_with = "no_selected_only")]
        selected_only: bool,

        /// Weighted modes: every face contributes (overrides the config file)
        #[arg(long, overrides_with = "selected_only")]
        no_selected_only: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    /// Edges marked sharp
    Sharp,
    /// Edges marked as seams
    Seam,
    /// Dihedral angle above the threshold
    Angle,
    /// Keep existing weights, falling back to the angle test
    Existing,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Copy each face's flat normal to its corners
    FaceCopy,
    /// Area-weighted vertex normals
    Area,
    /// Corner-angle-weighted vertex normals
    Angle,
    /// Area-weighted vertex normals (combined mode)
    Combined,
}

impl From<ModeArg> for NormalMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FaceCopy => NormalMode::FaceCopy,
            ModeArg::Area => NormalMode::Weighted(WeightMode::Area),
            ModeArg::Angle => NormalMode::Weighted(WeightMode::Angle),
            ModeArg::Combined => NormalMode::Weighted(WeightMode::Combined),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };

    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Weights {
            input,
            output,
            source,
            angle,
            seams,
        } => {
            if let Some(angle) = angle {
                config.sharp_angle = angle;
            }
            config.mark_seams |= seams;
            cmd_weights(&input, &output, source, &config)?;
        }

        Commands::Classify { input, ratio } => {
            if let Some(ratio) = ratio {
                config.ratio = ratio;
            }
            cmd_classify(&input, &config)?;
        }

        Commands::Normals {
            input,
            output,
            ratio,
            mode,
            selected_only,
            no_selected_only,
            sequential,
        } => {
            if let Some(ratio) = ratio {
                config.ratio = ratio;
            }
            if let Some(mode) = mode {
                config.normals = mode.into();
            }
            if let Some(selected_only) = flag_pair(selected_only, no_selected_only) {
                config.selected_only = selected_only;
            }
            config.parallel &= !sequential;
            cmd_normals(&input, &output, &config)?;
        }
    }

    Ok(())
}

/// Resolve a `--flag`/`--no-flag` pair. `None` when neither was given.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: PolyMesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());
    println!("Loops: {}", mesh.num_loops());

    let mut min_area = f64::MAX;
    let mut max_area = 0.0_f64;
    for fid in mesh.face_ids() {
        let area = mesh.face_area(fid);
        min_area = min_area.min(area);
        max_area = max_area.max(area);
    }

    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    let adjacency = mesh.adjacency();
    let boundary = adjacency.boundary_edge_count();
    if boundary == 0 {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary edges)", boundary);
    }
    let non_manifold = adjacency.non_manifold_edge_count();
    if non_manifold > 0 {
        println!("Non-manifold edges: {}", non_manifold);
    }

    println!("Sharp edges: {}", mesh.count_sharp());
    println!("Seam edges: {}", mesh.count_seams());
    println!("Weighted edges: {}", mesh.count_weighted());
    println!(
        "Custom normals: {}",
        if mesh.has_custom_normals() { "yes" } else { "no" }
    );

    if !mesh.material_slots().is_empty() {
        println!("Material slots:");
        for (i, slot) in mesh.material_slots().iter().enumerate() {
            println!("  [{}] {}", i, slot.name);
        }
    }

    Ok(())
}

fn cmd_weights(
    input: &Path,
    output: &Path,
    source: SourceArg,
    config: &WorkflowConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh: PolyMesh = io::load(input)?;

    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let source = match source {
        SourceArg::Sharp => WeightSource::Sharp,
        SourceArg::Seam => WeightSource::Seam,
        SourceArg::Angle => config.angle_source(),
        SourceArg::Existing => WeightSource::Existing {
            fallback_angle: config.sharp_angle,
        },
    };

    let weighted = weights::propagate(&mut mesh, source)?;
    if weighted == 0 {
        return Err(MeshError::NoOp {
            step: source.step_name(),
        }
        .into());
    }
    println!("Weighted edges: {}", weighted);

    if config.mark_seams {
        let seams = weights::seams_from_weight(&mut mesh);
        println!("Seams marked: {}", seams);
    }

    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());

    Ok(())
}

fn cmd_classify(input: &Path, config: &WorkflowConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: PolyMesh = io::load(input)?;

    let start = Instant::now();
    let result = classify::classify_bevel_faces(&mesh, &config.classify_options())?;
    let elapsed = start.elapsed();

    if result.is_empty() {
        println!("No bevel faces detected (ratio {})", config.ratio);
        return Ok(());
    }

    println!("Bevel faces: {}", result.bevel_count);
    println!("Original faces: {}", result.original_faces.len());
    println!("Done in {:.2?}", elapsed);

    Ok(())
}

fn cmd_normals(
    input: &Path,
    output: &Path,
    config: &WorkflowConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: PolyMesh = io::load(input)?;
    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh")
        .to_string();
    let mut object = MeshObject::new(name, mesh);

    println!(
        "Loaded: {} vertices, {} faces",
        object.mesh.num_vertices(),
        object.mesh.num_faces()
    );

    let mode = if config.parallel { "parallel" } else { "sequential" };
    println!("Synthesizing normals ({:?}, {})...", config.normals, mode);

    let mut session = Session::new();
    let start = Instant::now();
    let report = session.run_from_geometry(
        &mut object,
        &config.classify_options(),
        &config.workflow_options(),
    )?;
    let elapsed = start.elapsed();

    println!(
        "Bevel faces: {}, original faces: {}, loops written: {}",
        report.bevel_faces, report.original_faces, report.normals_written
    );
    println!("Done in {:.2?}", elapsed);

    io::save(&object.mesh, output)?;
    println!("Saved: {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected_only(flags: &[&str]) -> Option<bool> {
        let mut args = vec!["normalforge", "normals", "in.ply", "out.obj"];
        args.extend_from_slice(flags);
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Normals {
                selected_only,
                no_selected_only,
                ..
            } => flag_pair(selected_only, no_selected_only),
            _ => panic!("expected the normals command"),
        }
    }

    #[test]
    fn test_selected_only_flags_override_both_ways() {
        assert_eq!(selected_only(&[]), None);
        assert_eq!(selected_only(&["--selected-only"]), Some(true));
        assert_eq!(selected_only(&["--no-selected-only"]), Some(false));
        assert_eq!(
            selected_only(&["--selected-only", "--no-selected-only"]),
            Some(false)
        );
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
