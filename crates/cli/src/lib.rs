use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use takeoff_core::csv_export::{measurements_to_csv_string, CsvExportConfig};
use takeoff_core::persistence::{self, SessionSnapshot};
use takeoff_core::{
    Feedback, InputEvent, InteractionController, MeasureIntent, MeasurementSession,
    TakeoffSummary, ToolConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "takeoff")]
#[command(about = "Takeoff measurement CLI")]
pub struct Cli {
    /// JSON tool configuration (thresholds, default unit).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a session file and print its measurements and totals.
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run a scripted sequence of input events and print the resulting session.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        /// Pricing unit deciding linear vs area (e.g. "ft", "sqft").
        #[arg(long)]
        service_unit: Option<String>,
        /// Write the session file here instead of printing it.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Save the session beside this drawing as `<IMAGE>.takeoff.json`.
        #[arg(long, value_name = "IMAGE", conflicts_with = "output")]
        image: Option<PathBuf>,
    },
    /// Export the measurement list of a session file as CSV.
    ExportCsv {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

/// Replay input: either a bare event array or an object with options
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayScript {
    Events(Vec<InputEvent>),
    Full {
        #[serde(default)]
        service_unit: Option<String>,
        events: Vec<InputEvent>,
    },
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    path: String,
    scale: ScaleOutput,
    measurements: Vec<MeasurementOutput>,
    strokes: usize,
    summary: TakeoffSummary,
}

#[derive(Debug, Serialize)]
struct ScaleOutput {
    pixels_per_unit: f64,
    unit: String,
    calibrated: bool,
}

#[derive(Debug, Serialize)]
struct MeasurementOutput {
    id: String,
    label: String,
    kind: String,
    points: usize,
    value: f64,
    unit: String,
    display: String,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { file } => run_inspect(&file, config),
        Commands::Replay { script, service_unit, output, image } => {
            let output = output.or_else(|| image.as_deref().map(persistence::snapshot_path));
            run_replay(&script, service_unit.as_deref(), output.as_deref(), config)
        }
        Commands::ExportCsv { file, output } => run_export_csv(&file, output.as_deref(), config),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ToolConfig> {
    let Some(path) = path else {
        return Ok(ToolConfig::default());
    };
    ensure_file_exists(path)?;

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ToolConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
}

fn load_session(file: &Path, config: ToolConfig) -> Result<MeasurementSession> {
    ensure_file_exists(file)?;
    persistence::load_session(file, MeasureIntent::default(), config)
        .with_context(|| format!("failed to load session {}", file.display()))
}

fn run_inspect(file: &Path, config: ToolConfig) -> Result<()> {
    let session = load_session(file, config)?;
    let scale = session.scale();

    let payload = InspectOutput {
        path: file.display().to_string(),
        scale: ScaleOutput {
            pixels_per_unit: scale.pixels_per_unit(),
            unit: scale.unit().to_string(),
            calibrated: scale.is_calibrated(),
        },
        measurements: session
            .measurements()
            .iter()
            .map(|m| MeasurementOutput {
                id: m.id().to_string(),
                label: m.label().to_string(),
                kind: m.kind().name().to_string(),
                points: m.points().len(),
                value: m.value_real_units(),
                unit: m.display_unit(),
                display: m.formatted_value(),
            })
            .collect(),
        strokes: session.strokes().len(),
        summary: session.summary(),
    };

    if !payload.scale.calibrated {
        tracing::warn!("session is not calibrated; values are in pixels");
    }

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}

fn run_replay(
    script: &Path,
    service_unit: Option<&str>,
    output: Option<&Path>,
    config: ToolConfig,
) -> Result<()> {
    ensure_file_exists(script)?;

    let json = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let (script_unit, events) = match serde_json::from_str::<ReplayScript>(&json)
        .with_context(|| format!("invalid replay script {}", script.display()))?
    {
        ReplayScript::Events(events) => (None, events),
        ReplayScript::Full { service_unit, events } => (service_unit, events),
    };

    let intent = service_unit
        .or(script_unit.as_deref())
        .map(MeasureIntent::from_service_unit)
        .unwrap_or_default();

    let mut controller = InteractionController::new(intent, config);
    let mut rejected = 0usize;
    for (index, event) in events.into_iter().enumerate() {
        match controller.handle(event) {
            Feedback::Rejected(err) => {
                rejected += 1;
                tracing::warn!(index, %err, "event rejected");
            }
            feedback => tracing::debug!(index, ?feedback, "event applied"),
        }
    }

    if rejected > 0 {
        tracing::info!(rejected, "replay finished with rejected events");
    }

    let snapshot: SessionSnapshot = controller.session().snapshot();
    match output {
        Some(path) => {
            persistence::save_session(path, &snapshot)
                .with_context(|| format!("failed to write session to {}", path.display()))?;
            println!("{}", path.display());
        }
        None => println!("{}", persistence::to_json(&snapshot)?),
    }
    Ok(())
}

fn run_export_csv(file: &Path, output: Option<&Path>, config: ToolConfig) -> Result<()> {
    let session = load_session(file, config)?;
    let csv = measurements_to_csv_string(session.measurements(), &CsvExportConfig::default())
        .context("failed to export CSV")?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, csv)
                .with_context(|| format!("failed to write CSV to {}", path.display()))?;
            println!("{}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
