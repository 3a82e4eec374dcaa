//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use histeq::config::{AppConfig, HistogramConfig, PlaybackConfig, RuntimeConfig, SourceConfig};

/// Live histogram equalization for grayscale video
#[derive(Debug, Parser)]
#[command(name = "histeq")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Video file, animated GIF or directory of PNG frames
    pub input: Option<PathBuf>,

    /// Capture from a camera device instead of a file (e.g. /dev/video0)
    #[arg(long, conflicts_with = "input")]
    pub camera: Option<String>,

    /// Requested camera frame width
    #[arg(long, requires = "camera")]
    pub camera_width: Option<u32>,

    /// Requested camera frame height
    #[arg(long, requires = "camera")]
    pub camera_height: Option<u32>,

    /// Configuration file layered over the XDG and project configs
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start with equalization enabled (toggle with E)
    #[arg(short, long)]
    pub equalize: bool,

    /// Stop at the end of the input instead of restarting it
    #[arg(long)]
    pub no_loop: bool,

    /// Playback rate for inputs without timing information
    #[arg(long)]
    pub fps: Option<f64>,

    /// Histogram canvas width in pixels
    #[arg(long)]
    pub hist_width: Option<u32>,

    /// Histogram canvas height in pixels
    #[arg(long)]
    pub hist_height: Option<u32>,

    /// Worker threads for the parallel passes
    #[arg(long)]
    pub threads: Option<usize>,

    /// Process frames without opening a window
    #[arg(long)]
    pub headless: bool,

    /// Write processed frames and histograms as PNG sequences (headless only)
    #[arg(short, long, value_name = "DIR", requires = "headless")]
    pub output: Option<PathBuf>,

    /// Stop after this many frames (headless only)
    #[arg(long, requires = "headless")]
    pub max_frames: Option<u64>,

    /// Sleep between frames to match the source rate (headless only)
    #[arg(long, requires = "headless")]
    pub pace: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Flags expressed as a config layer; unset flags leave lower layers alone.
    pub fn overrides(&self) -> AppConfig {
        AppConfig {
            source: SourceConfig {
                path: self.input.clone(),
                camera: self.camera.clone(),
                camera_width: self.camera_width,
                camera_height: self.camera_height,
                loop_playback: self.no_loop.then_some(false),
                fps: self.fps,
            },
            histogram: HistogramConfig {
                width: self.hist_width,
                height: self.hist_height,
            },
            playback: PlaybackConfig {
                equalize: self.equalize.then_some(true),
            },
            runtime: RuntimeConfig {
                threads: self.threads,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_do_not_override() {
        let cli = Cli::parse_from(["histeq", "clip.mp4"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.source.path, Some(PathBuf::from("clip.mp4")));
        assert_eq!(overrides.source.loop_playback, None);
        assert_eq!(overrides.playback.equalize, None);
        assert_eq!(overrides.histogram, HistogramConfig::default());
    }

    #[test]
    fn flags_override_config_values() {
        let mut config: AppConfig =
            toml::from_str("[playback]\nequalize = false\n[histogram]\nwidth = 300\n").unwrap();
        let cli = Cli::parse_from([
            "histeq", "clip.gif", "--equalize", "--no-loop", "--hist-width", "512",
        ]);
        config.merge(cli.overrides());

        let session = config.session_config();
        assert!(session.equalize);
        assert!(!session.loop_playback);
        assert_eq!(session.processing.canvas_width, 512);
    }

    #[test]
    fn headless_only_flags_require_headless() {
        assert!(Cli::try_parse_from(["histeq", "clip.mp4", "--max-frames", "5"]).is_err());
        assert!(Cli::try_parse_from(["histeq", "clip.mp4", "--headless", "--max-frames", "5"]).is_ok());
    }

    #[test]
    fn camera_conflicts_with_input() {
        assert!(Cli::try_parse_from(["histeq", "clip.mp4", "--camera", "/dev/video0"]).is_err());
    }
}
