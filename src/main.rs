//! histeq - live histogram equalization viewer.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use histeq::config::AppConfig;
use histeq::videoio::{open_camera, open_source, VideoCapture};
use histeq::viewer::{run_headless, run_native_viewer, HeadlessOptions, Session, ViewerOptions};

mod cli;

use cli::Cli;

const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(&cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.merge(cli.overrides());
    config.validate()?;

    histeq::init_thread_pool(config.runtime.threads)
        .map_err(anyhow::Error::msg)
        .context("initializing thread pool")?;
    tracing::debug!(threads = histeq::core::current_cpu_threads(), "thread pool ready");

    let capture = open_capture(&config)?;
    let session = Session::new(capture, config.session_config());

    if cli.headless {
        let options = HeadlessOptions {
            output_dir: cli.output.clone(),
            max_frames: cli.max_frames,
            pace: cli.pace,
        };
        let stats = run_headless(session, &options)?;
        println!("{stats}");
        return Ok(());
    }

    let stats = run_native_viewer(session, ViewerOptions::default())?;
    println!("{stats}");
    Ok(())
}

fn open_capture(config: &AppConfig) -> Result<Box<dyn VideoCapture>> {
    let source = &config.source;
    if let Some(device) = &source.camera {
        let width = source.camera_width.unwrap_or(DEFAULT_CAMERA_WIDTH);
        let height = source.camera_height.unwrap_or(DEFAULT_CAMERA_HEIGHT);
        return open_camera(device, width, height)
            .with_context(|| format!("opening camera {device}"));
    }

    match &source.path {
        Some(path) => open_source(path).with_context(|| format!("opening {}", path.display())),
        None => bail!("no input given; pass a video path, a PNG directory or --camera"),
    }
}
