use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flashcast_core::{
    convert_file, load_config, load_default_config, output_path_for, validate_config,
    CleanupStatus, Config, ConvertRequest, FfmpegTranscoder, RunOutcome, TerminalDisplay,
    Transcoder,
};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "flashcast.toml";

#[derive(Debug, Parser)]
#[command(
    name = "flashcast",
    version,
    about = "Convert a downloaded video to SWF with a live progress bar"
)]
struct Cli {
    /// Source video file
    input: PathBuf,

    /// Configuration file (default: ./flashcast.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long)]
    outdir: Option<PathBuf>,

    /// Base name for the SWF file, without extension
    #[arg(long)]
    basename: Option<String>,

    /// SWF frame rate
    #[arg(long)]
    framerate: Option<u32>,

    /// Video quality, 1 (best) to 31 (worst)
    #[arg(long)]
    quality: Option<u8>,

    /// Known duration in seconds; skips probing
    #[arg(long)]
    duration: Option<f64>,

    /// Keep the source file after the SWF is created
    #[arg(long)]
    keep_source: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Command-line flags take precedence over file and environment settings.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.outdir {
            config.output.directory = dir.clone();
        }
        if let Some(quality) = self.quality {
            config.encoding.quality = quality;
        }
        if let Some(framerate) = self.framerate {
            config.encoding.framerate = framerate;
        }
        if self.keep_source {
            config.output.keep_source = true;
        }
    }

    fn load_config(&self) -> Result<Config> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None if default_path.exists() => load_config(default_path)
                .with_context(|| format!("Failed to load config from {:?}", default_path))?,
            None => load_default_config().context("Failed to read configuration")?,
        };

        self.apply_overrides(&mut config);
        validate_config(&config).context("Configuration validation failed")?;
        Ok(config)
    }
}

/// Process exit code for a failed encode: the encoder's own code when it
/// fits, 1 otherwise.
fn failure_exit_code(encoder_code: Option<i32>) -> u8 {
    encoder_code
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so they never break the progress line on stdout.
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.load_config()?;
    info!(
        ffmpeg = %config.converter.ffmpeg_path.display(),
        quality = config.encoding.quality,
        framerate = config.encoding.framerate,
        "Configuration loaded"
    );

    let transcoder = FfmpegTranscoder::new(config.converter.clone());
    transcoder
        .validate()
        .await
        .context("ffmpeg is not available; install it or set converter.ffmpeg_path")?;

    let output_path = output_path_for(
        &cli.input,
        &config.output.directory,
        cli.basename.as_deref(),
    );
    let request = ConvertRequest {
        input_path: cli.input.clone(),
        output_path,
        duration_hint: cli.duration,
        params: config.encoding.params(),
        keep_source: config.output.keep_source,
    };

    let mut display = TerminalDisplay::stdout(config.converter.bar_width);
    let report = convert_file(&transcoder, request, &mut display)
        .await
        .context("Conversion could not run")?;

    match &report.outcome {
        RunOutcome::Success => {
            println!(
                "Done!\nSource: {}\nSWF: {}",
                report.job.input_path.display(),
                report.job.output_path.display()
            );
            match &report.cleanup {
                CleanupStatus::Removed => {
                    println!("Removed source file (use --keep-source to retain).")
                }
                CleanupStatus::Failed(reason) => {
                    println!("Could not remove source file: {}", reason)
                }
                CleanupStatus::Kept | CleanupStatus::Skipped => {}
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failure {
            exit_code,
            input_path,
            output_path,
            stderr_tail,
        } => {
            error!(
                exit_code = ?exit_code,
                input = %input_path.display(),
                output = %output_path.display(),
                "Conversion failed"
            );
            if let Some(tail) = stderr_tail {
                eprintln!("{}", tail);
            }
            Ok(ExitCode::from(failure_exit_code(*exit_code)))
        }
    }
}
