use anyhow::{Context, Result};
use clade_diagram::loader::SaveDirectory;
use clade_diagram::{batch, CladeConfig, CladeError};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cladegen")]
#[command(about = "Draw a clade diagram from a directory of simulation saves")]
#[command(version)]
struct Cli {
    /// Directory holding the `name@time.json` saves
    dir: PathBuf,

    /// Configuration file (defaults to `<DIR>/clade/config.ini`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output image for a single-batch run (defaults to `<DIR>/clade.<file_type>`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Index of the first generation to draw
    #[arg(long)]
    start: Option<usize>,

    /// Index one past the last generation to draw
    #[arg(long)]
    end: Option<usize>,

    /// Generations per image; 0 draws everything into one image
    #[arg(long)]
    split_interval: Option<usize>,

    /// Discard cached censuses and re-read every save
    #[arg(long)]
    refresh_cache: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(&cli.log_level) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<CladeError>() {
            Some(CladeError::OutOfMemory { width, height }) => {
                error!(width, height, "image does not fit in memory");
                eprintln!(
                    "Not enough memory for a {width}x{height} image. \
                     Set a smaller clade_split_interval (or pass --split-interval) \
                     to render fewer generations per image."
                );
                ExitCode::from(2)
            }
            _ => {
                error!("{err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let saves = SaveDirectory::open(&cli.dir)
        .with_context(|| format!("Failed to open save directory: {:?}", cli.dir))?;

    let config_path = match cli.config {
        Some(path) => path,
        None => saves
            .config_path()
            .context("Failed to prepare the default configuration")?,
    };
    info!("Loading configuration from: {:?}", config_path);
    let mut config = CladeConfig::load(Some(config_path.as_path()))
        .with_context(|| format!("Failed to load configuration: {:?}", config_path))?;

    if let Some(start) = cli.start {
        config.batch.clade_start = start;
    }
    if cli.end.is_some() {
        config.batch.clade_end = cli.end;
    }
    if let Some(interval) = cli.split_interval {
        config.batch.clade_split_interval = interval;
    }

    if cli.refresh_cache {
        saves.clear_cache().context("Failed to clear the census cache")?;
        info!("Cleared census cache");
    }

    let written = batch::run(&saves, &config, cli.output.as_deref())?;
    for path in &written {
        info!("Wrote {:?}", path);
    }
    Ok(())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
