//! Match Observer
//!
//! Reads a directory of numbered broadcast frames and prints what each
//! frame shows as a JSON array.
//!
//! Usage: `match-observer <frame-dir> [--config|-c <path>]`

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use match_observer::harness::{
    ExecutionMode, FrameEntry, FrameWorkerPool, HarnessConfig, VisionWorkerFactory, list_frames,
    session_dimensions,
};
use match_observer::ocr::{TesseractEngine, TesseractPaths, locate_tesseract};
use match_observer::paths;
use match_observer::vision::LabelLocator;

#[derive(Debug, Parser)]
#[command(
    name = "match-observer",
    version,
    about = "Read match information from numbered FRC broadcast frames"
)]
struct Args {
    /// Directory holding the numbered frame images
    frame_dir: PathBuf,

    /// Configuration file (defaults to config.json next to the executable)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(paths::default_config_path)
    }
}

/// Everything the batch needs, checked before any frame is processed.
struct Session {
    config: HarnessConfig,
    frames: Vec<FrameEntry>,
    locator: LabelLocator,
}

/// Fails on anything that would make every frame fail.
fn prepare(args: &Args) -> Result<Session> {
    let config = HarnessConfig::load(&args.config_path());

    let frames = list_frames(&args.frame_dir, config.start_frame, config.end_frame)?;
    if frames.is_empty() {
        bail!(
            "No frames in {} within {}..={}",
            args.frame_dir.display(),
            config.start_frame,
            config.end_frame
        );
    }
    let (width, height) = session_dimensions(&frames)?;
    info!("Frames are {}x{}", width, height);

    let locator = LabelLocator::from_template_file(&config.logo_template)
        .context("Cannot load the logo template")?;

    Ok(Session {
        config,
        frames,
        locator,
    })
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let Session {
        config,
        frames,
        locator,
    } = prepare(args)?;

    let tesseract = match locate_tesseract(
        config.tesseract_path.as_deref(),
        config.tessdata_dir.as_deref(),
    ) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("{:#}. Falling back to `tesseract` on PATH.", e);
            TesseractPaths {
                executable: PathBuf::from("tesseract"),
                tessdata: None,
            }
        }
    };

    let mode = if config.parallel {
        ExecutionMode::Parallel {
            workers: config.worker_count(),
            chunk_size: config.chunk_size(),
        }
    } else {
        ExecutionMode::Sequential
    };
    let factory = VisionWorkerFactory::new(
        TesseractEngine::new(tesseract),
        locator,
        config.advanced_scraping,
    );

    let started = Instant::now();
    let records = FrameWorkerPool::new(factory, mode).run(&frames);
    let failures = records.iter().filter(|r| r.is_failure()).count();

    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to serialize results")?
    );
    info!(
        "Processed {} frames ({} failed) in {:.1}s",
        records.len(),
        failures,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
