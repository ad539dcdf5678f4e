use clap::{Parser, Subcommand};
use crop_worker::config::{self, WorkerConfig};
use crop_worker::formats::FormatCatalog;
use crop_worker::imaging::RustBackend;
use crop_worker::origin::HttpOrigin;
use crop_worker::output;
use crop_worker::worker::Worker;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crop-worker")]
#[command(about = "Derive cropped JPEG variants from remote source images")]
#[command(long_about = "\
Derive cropped JPEG variants from remote source images

A job is a JSON object:

  {\"url\": \"https://cdn.example.com/a.jpg\", \"name\": \"a\",
   \"crop_type\": \"hero\", \"crop\": \"middle\", \"force_crop\": false}

The source is cached under original_folder and only re-downloaded when the
origin's content changes. One JPEG is written per format listed for the
crop type:

  images/
  ├── 300_200/
  │   └── a-hero.jpg
  └── 1200_400/
      └── a-hero.jpg

Run 'crop-worker gen-config' to generate a documented worker.toml.")]
#[command(version)]
struct Cli {
    /// Worker config file (missing file = stock defaults)
    #[arg(long, default_value = "worker.toml", global = true)]
    config: PathBuf,

    /// JSON format catalog, replaces [image_formats] from the config
    #[arg(long, global = true)]
    formats: Option<PathBuf>,

    /// Log filter, e.g. `info` or `crop_worker=debug` (default: RUST_LOG, else warn)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single job read from a file, or `-` for stdin
    Run {
        /// Path to a JSON job file
        job: PathBuf,
    },
    /// Process newline-delimited JSON jobs from stdin until EOF
    Worker,
    /// Print a stock worker.toml with all options documented
    GenConfig,
    /// Load and validate the config, then list the format catalog
    CheckConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::CheckConfig => {
            let config = load(&cli.config, cli.formats.as_deref())?;
            println!("==> Config is valid");
            for crop_type in config.image_formats.crop_types() {
                let formats = config
                    .image_formats
                    .formats(crop_type)
                    .unwrap_or_default()
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>();
                println!("    {}: {}", crop_type, formats.join(", "));
            }
        }
        Command::Run { job } => {
            let worker = build_worker(&cli.config, cli.formats.as_deref())?;
            let message = if job == Path::new("-") {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(&job)?
            };
            let report = worker.run_message(&message)?;
            output::print_job_report(&report, worker.layout());
        }
        Command::Worker => {
            let worker = build_worker(&cli.config, cli.formats.as_deref())?;
            for (i, line) in io::stdin().lock().lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match worker.run_message(&line) {
                    Ok(report) => output::print_job_report(&report, worker.layout()),
                    Err(e) => {
                        error!(line = i + 1, error = %e, "job failed");
                        output::print_job_failure(&format!("line {}", i + 1), &e);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `--log-level` wins over `RUST_LOG`; with neither, only warnings and
/// errors are shown.
fn init_tracing(level: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn load(
    config_path: &Path,
    formats_path: Option<&Path>,
) -> Result<WorkerConfig, Box<dyn std::error::Error>> {
    let mut config = config::load_config(config_path)?;
    if let Some(path) = formats_path {
        config.image_formats = FormatCatalog::load_json(path)?;
    }
    if config.image_formats.is_empty() {
        warn!("format catalog is empty; every job will fail with an unknown crop type");
    }
    Ok(config)
}

fn build_worker(
    config_path: &Path,
    formats_path: Option<&Path>,
) -> Result<Worker<HttpOrigin, RustBackend>, Box<dyn std::error::Error>> {
    let config = load(config_path, formats_path)?;
    init_thread_pool(&config.processing);
    let origin = HttpOrigin::new(&config.http)?;
    Ok(Worker::new(config, origin, RustBackend::new()))
}

/// Size the global rayon pool used for per-format work.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
