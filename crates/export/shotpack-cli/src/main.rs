use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::error;
use serde::Serialize;
use shotpack_curve_core::UniformValue;
use shotpack_export_core::{
    timeline, write_atomic, ErrorCategory, ExportConfig, ExportError, Exporter, Project,
};

mod logging;
mod settings;

#[derive(Parser)]
#[command(name = "shotpack")]
#[command(about = "Export shader demo projects for the size-constrained player", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Export configuration file (toml, json or yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a project as a generated C++ unit
    Export {
        /// Project file; shader paths resolve against its directory
        project: PathBuf,

        /// Generated header destination
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,

        /// Also write the packed binary tables
        #[arg(long, value_name = "PATH")]
        blob: Option<PathBuf>,

        /// Write export statistics as JSON
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,
    },
    /// Evaluate the animated uniforms of one shot
    Sample {
        project: PathBuf,

        /// Shot name
        #[arg(long)]
        shot: String,

        /// Absolute timeline times, in beats
        #[arg(long = "at", value_name = "BEATS", required = true)]
        times: Vec<f64>,

        /// Evaluate the baked curves instead of the authored ones
        #[arg(long)]
        baked: bool,
    },
    /// Print the timeline and check that it is playable
    Inspect { project: PathBuf },
}

#[derive(Serialize)]
struct Sample {
    time: f64,
    local_time: f64,
    uniforms: BTreeMap<String, UniformValue>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("shotpack: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    match cli.command {
        Commands::Export {
            project,
            output,
            blob,
            summary,
        } => export(&project, &output, blob.as_deref(), summary.as_deref(), config),
        Commands::Sample {
            project,
            shot,
            times,
            baked,
        } => sample(&project, &shot, &times, baked, &config),
        Commands::Inspect { project } => inspect(&project, &config),
    }
}

fn project_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_project(path: &Path) -> Result<Project> {
    Project::load(path).with_context(|| format!("cannot load project {}", path.display()))
}

fn export(
    path: &Path,
    output: &Path,
    blob: Option<&Path>,
    summary: Option<&Path>,
    config: ExportConfig,
) -> Result<()> {
    let project = load_project(path)?;
    let artifact = Exporter::new(&project, project_root(path), config)
        .with_blob(blob.is_some())
        .run()
        .map_err(describe)?;

    let summary_json = serde_json::to_vec_pretty(&artifact.summary)?;
    let mut outputs: Vec<(&Path, &[u8])> = vec![(output, artifact.source.as_bytes())];
    if let (Some(path), Some(bytes)) = (blob, artifact.blob.as_deref()) {
        outputs.push((path, bytes));
    }
    if let Some(path) = summary {
        outputs.push((path, summary_json.as_slice()));
    }
    write_atomic(&outputs)?;
    println!(
        "wrote {} ({} bytes, {} shots, {} programs)",
        output.display(),
        artifact.summary.source_bytes,
        artifact.summary.shots,
        artifact.summary.programs
    );
    Ok(())
}

/// Prefix an export error with its category.
fn describe(err: ExportError) -> anyhow::Error {
    let kind = match err.category() {
        ErrorCategory::Input => "invalid project",
        ErrorCategory::Unsupported => "unsupported",
        ErrorCategory::Io => "io",
    };
    anyhow::Error::new(err).context(format!("export failed ({kind})"))
}

fn sample(path: &Path, name: &str, times: &[f64], baked: bool, config: &ExportConfig) -> Result<()> {
    let project = load_project(path)?;
    let (scene, def) = project
        .scenes
        .iter()
        .find_map(|scene| {
            scene
                .shots
                .iter()
                .find(|shot| shot.name == name)
                .map(|shot| (scene, shot))
        })
        .ok_or_else(|| anyhow!("no shot named '{name}' in {}", path.display()))?;
    let mut shot = def.to_shot(&scene.name, config.extremum_pivot)?;
    if baked {
        shot.bake()?;
    }

    let mut samples = Vec::with_capacity(times.len());
    for &time in times {
        let uniforms = shot
            .evaluate(time)
            .with_context(|| format!("cannot evaluate shot '{name}'"))?;
        samples.push(Sample {
            time,
            local_time: shot.local_time(time),
            uniforms: uniforms.into_iter().collect(),
        });
    }
    println!("{}", serde_json::to_string_pretty(&samples)?);
    Ok(())
}

fn inspect(path: &Path, config: &ExportConfig) -> Result<()> {
    let project = load_project(path)?;
    let mut rows: Vec<_> = project
        .scenes
        .iter()
        .flat_map(|scene| scene.shots.iter().map(move |shot| (scene, shot)))
        .collect();
    rows.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
    println!("{:>9} {:>9} {:>6}  {:<16} {:<16} channels", "start", "end", "speed", "scene", "shot");
    for (scene, shot) in &rows {
        println!(
            "{:>9.3} {:>9.3} {:>6.2}  {:<16} {:<16} {}{}",
            shot.start,
            shot.end,
            shot.speed,
            scene.name,
            shot.name,
            shot.channels.len(),
            if shot.enabled { "" } else { "  (disabled)" }
        );
    }
    let shots = timeline::collect(&project, config).map_err(describe)?;
    let end = shots.iter().map(|s| s.shot.end).fold(0.0, f64::max);
    println!("timeline ok: {} enabled shots, ends at {end}", shots.len());
    Ok(())
}
