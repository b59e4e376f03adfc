//! veil: blur sensitive regions that a vision model found in an image.
//!
//! The model itself is not called from here. `veil prompt` prints the
//! instruction to send along with the image; the model's answer is then
//! fed back through `--response` (a file, or `-` for stdin).
//!
//! # Usage
//!
//! ```text
//! veil prompt
//! veil detect photo.png --response answer.txt
//! veil preview photo.png --response answer.txt --output check.png
//! veil redact photo.png --response answer.txt --only 0,2
//! veil restore photo_backup.png
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use veil_io::{Config, RecordedResponse, Redactor, VeilError, detect_and_offer_redaction};
use veil_pipeline::{
    Detection, Dimensions, PipelineError, PixelRegion, annotate, codec, map_to_pixels,
};

/// Blur AI-detected sensitive regions in images, with automatic backup
/// and restore.
#[derive(Debug, Parser)]
#[command(name = "veil", version)]
struct Cli {
    /// Configuration file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the detection prompt to send to the vision model.
    Prompt,

    /// List the detections in a captured model answer.
    Detect {
        /// Image the answer refers to.
        image: PathBuf,

        /// File holding the model's answer, or `-` for stdin.
        #[arg(long)]
        response: PathBuf,

        /// Print detections as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Blur detections in place, backing up the original first.
    ///
    /// Concurrent operations on one file are only refused within a single
    /// process; do not run two `veil redact` or `veil restore` commands on
    /// the same image at once.
    Redact {
        /// Image to redact.
        image: PathBuf,

        #[command(flatten)]
        input: DetectionInput,

        /// Only redact these detection indices (as listed by `detect`).
        #[arg(long, value_delimiter = ',')]
        only: Vec<usize>,

        /// Blur intensity, overriding the configured value.
        #[arg(long)]
        intensity: Option<u32>,
    },

    /// Write a copy of the image with detections outlined.
    Preview {
        /// Image the answer refers to.
        image: PathBuf,

        /// File holding the model's answer, or `-` for stdin.
        #[arg(long)]
        response: PathBuf,

        /// Where to write the annotated image.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Put an original back from its backup and delete the backup.
    Restore {
        /// Backup file, e.g. `photo_backup.png`.
        backup: PathBuf,
    },
}

/// Where redaction targets come from.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct DetectionInput {
    /// File holding the model's answer, or `-` for stdin.
    #[arg(long)]
    response: Option<PathBuf>,

    /// JSON array of detections (`box_2d`, `label`, `value`), or the
    /// output of `detect --json`.
    #[arg(long)]
    detections: Option<PathBuf>,
}

/// One entry of `detect --json` output.
#[derive(Debug, Serialize)]
struct ListedDetection<'a> {
    index: usize,
    detection: &'a Detection,
    region: Option<PixelRegion>,
}

/// One entry of a `--detections` file: either as listed by
/// `detect --json`, or a bare detection.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetectionEntry {
    Listed { detection: Detection },
    Bare(Detection),
}

impl From<DetectionEntry> for Detection {
    fn from(entry: DetectionEntry) -> Self {
        match entry {
            DetectionEntry::Listed { detection } | DetectionEntry::Bare(detection) => detection,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Veil(#[from] VeilError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid detections file {}: {source}", .path.display())]
    Detections {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write preview {}: {source}", .path.display())]
    Preview {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot serialize output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("detection index {index} is out of range ({count} detections)")]
    IndexOutOfRange { index: usize, count: usize },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for `--json` and `prompt`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Command::Prompt => {
            println!("{}", config.detection_prompt());
            Ok(())
        }
        Command::Detect {
            image,
            response,
            json,
        } => run_detect(&config, &image, &response, json),
        Command::Redact {
            image,
            input,
            only,
            intensity,
        } => run_redact(&config, &image, &input, &only, intensity),
        Command::Preview {
            image,
            response,
            output,
        } => run_preview(&config, &image, &response, &output),
        Command::Restore { backup } => {
            let original = Redactor::new(config.redaction()).restore_from_backup(&backup)?;
            println!("Restored {}", original.display());
            Ok(())
        }
    }
}

fn run_detect(config: &Config, image: &Path, response: &Path, json: bool) -> Result<(), CliError> {
    let detections = detections_from_answer(config, image, response)?;
    let dimensions = codec::decode(&read_bytes(image)?)?.dimensions();

    if json {
        println!("{}", detections_json(&detections, dimensions)?);
        return Ok(());
    }

    if detections.is_empty() {
        println!("No sensitive data found");
        return Ok(());
    }

    println!(
        "{} detection(s) in {} ({}x{}):",
        detections.len(),
        image.display(),
        dimensions.width,
        dimensions.height,
    );
    for (index, detection) in detections.iter().enumerate() {
        match map_to_pixels(&detection.normalized_box, dimensions) {
            Some(region) => println!("  [{index}] {}  {region}", detection.display_label()),
            None => println!("  [{index}] {}  (no valid region)", detection.display_label()),
        }
    }
    Ok(())
}

fn run_redact(
    config: &Config,
    image: &Path,
    input: &DetectionInput,
    only: &[usize],
    intensity: Option<u32>,
) -> Result<(), CliError> {
    let detections = match (&input.response, &input.detections) {
        (Some(response), _) => detections_from_answer(config, image, response)?,
        (None, Some(path)) => detections_from_file(path)?,
        (None, None) => Vec::new(),
    };
    if detections.is_empty() {
        println!("No sensitive data found");
        return Ok(());
    }

    let selected = select(detections, only)?;
    let mut redaction = config.redaction();
    if let Some(intensity) = intensity {
        redaction.blur_intensity = intensity;
    }

    let report = Redactor::new(redaction).redact(image, &selected)?;
    if report.regions_redacted() == 0 {
        println!(
            "No valid regions among {} detection(s); {} left unchanged",
            selected.len(),
            image.display(),
        );
    } else {
        println!(
            "Redacted {} region(s) in {}",
            report.regions_redacted(),
            image.display(),
        );
    }
    let state = if report.backup.is_created() {
        "created"
    } else {
        "kept existing"
    };
    println!("Backup: {} ({state})", report.backup.path().display());
    Ok(())
}

fn run_preview(
    config: &Config,
    image: &Path,
    response: &Path,
    output: &Path,
) -> Result<(), CliError> {
    let detections = detections_from_answer(config, image, response)?;
    let decoded = codec::decode(&read_bytes(image)?)?;
    let annotated = annotate(&decoded.to_rgba8(), &detections, config.preview);
    annotated.save(output).map_err(|source| CliError::Preview {
        path: output.to_path_buf(),
        source,
    })?;
    eprintln!(
        "Preview with {} detection(s) written to {}",
        detections.len(),
        output.display(),
    );
    Ok(())
}

/// Replay a captured model answer through the detection seam.
fn detections_from_answer(
    config: &Config,
    image: &Path,
    response: &Path,
) -> Result<Vec<Detection>, CliError> {
    let answer = RecordedResponse::new(read_text(response)?);
    Ok(detect_and_offer_redaction(
        &answer,
        image,
        &config.detection_prompt(),
    )?)
}

/// Render detections with their index and pixel region, as read back by
/// [`detections_from_file`].
fn detections_json(
    detections: &[Detection],
    dimensions: Dimensions,
) -> Result<String, serde_json::Error> {
    let listed: Vec<ListedDetection<'_>> = detections
        .iter()
        .enumerate()
        .map(|(index, detection)| ListedDetection {
            index,
            detection,
            region: map_to_pixels(&detection.normalized_box, dimensions),
        })
        .collect();
    serde_json::to_string_pretty(&listed)
}

fn detections_from_file(path: &Path) -> Result<Vec<Detection>, CliError> {
    let entries: Vec<DetectionEntry> =
        serde_json::from_str(&read_text(path)?).map_err(|source| CliError::Detections {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(entries.into_iter().map(Detection::from).collect())
}

/// Keep only the detections at `only`, in the order given. Empty means
/// keep everything.
fn select(detections: Vec<Detection>, only: &[usize]) -> Result<Vec<Detection>, CliError> {
    if only.is_empty() {
        return Ok(detections);
    }
    only.iter()
        .map(|&index| {
            detections
                .get(index)
                .cloned()
                .ok_or(CliError::IndexOutOfRange {
                    index,
                    count: detections.len(),
                })
        })
        .collect()
}

fn read_text(path: &Path) -> Result<String, CliError> {
    let read = if path == Path::new("-") {
        io::read_to_string(io::stdin())
    } else {
        fs::read_to_string(path)
    };
    read.map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
