//! Configuration file support.
//!
//! TOML configuration is read from, lowest priority first:
//! - XDG config: `~/.config/histeq/config.toml`
//! - Project-local: `.histeq.toml` (searched up the directory tree)
//! - An explicit `--config` file
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use histeq_viewer::{ProcessingConfig, SessionConfig, DEFAULT_FPS};
use serde::Deserialize;
use tracing::{debug, info};

pub const PROJECT_CONFIG_FILE: &str = ".histeq.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub histogram: HistogramConfig,
    pub playback: PlaybackConfig,
    pub runtime: RuntimeConfig,
}

/// Where frames come from.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Video file, GIF or directory of PNG frames.
    pub path: Option<PathBuf>,
    /// Camera device, e.g. `/dev/video0`.
    pub camera: Option<String>,
    pub camera_width: Option<u32>,
    pub camera_height: Option<u32>,
    /// Restart the source when it ends.
    pub loop_playback: Option<bool>,
    /// Playback rate for sources without timing information.
    pub fps: Option<f64>,
}

/// Histogram canvas size.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistogramConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Start with equalization enabled.
    pub equalize: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Rayon worker threads.
    pub threads: Option<usize>,
}

impl AppConfig {
    /// Load the XDG and project-local files, then `explicit` if given.
    ///
    /// Missing XDG/project files are ignored; an explicit file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                config.merge(load_file(&xdg_path)?);
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            config.merge(load_file(&project_path)?);
        }

        if let Some(path) = explicit {
            info!("Loading config: {}", path.display());
            config.merge(load_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.histogram.width == Some(0) || self.histogram.height == Some(0) {
            return Err(ConfigError::Invalid(
                "histogram.width and histogram.height must be >= 1".into(),
            ));
        }
        if let Some(fps) = self.source.fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "source.fps must be a positive number, got {fps}"
                )));
            }
        }
        if self.runtime.threads == Some(0) {
            return Err(ConfigError::Invalid("runtime.threads must be >= 1".into()));
        }
        if self.source.camera_width == Some(0) || self.source.camera_height == Some(0) {
            return Err(ConfigError::Invalid(
                "source.camera_width and source.camera_height must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Self) {
        self.source.path = other.source.path.or_else(|| self.source.path.take());
        self.source.camera = other.source.camera.or_else(|| self.source.camera.take());
        self.source.camera_width = other.source.camera_width.or(self.source.camera_width);
        self.source.camera_height = other.source.camera_height.or(self.source.camera_height);
        self.source.loop_playback = other.source.loop_playback.or(self.source.loop_playback);
        self.source.fps = other.source.fps.or(self.source.fps);

        self.histogram.width = other.histogram.width.or(self.histogram.width);
        self.histogram.height = other.histogram.height.or(self.histogram.height);

        self.playback.equalize = other.playback.equalize.or(self.playback.equalize);

        self.runtime.threads = other.runtime.threads.or(self.runtime.threads);
    }

    /// Frame loop settings with defaults filled in.
    pub fn session_config(&self) -> SessionConfig {
        let defaults = ProcessingConfig::default();
        SessionConfig {
            processing: ProcessingConfig {
                canvas_width: self.histogram.width.unwrap_or(defaults.canvas_width),
                canvas_height: self.histogram.height.unwrap_or(defaults.canvas_height),
            },
            equalize: self.playback.equalize.unwrap_or(false),
            loop_playback: self.source.loop_playback.unwrap_or(true),
            fallback_fps: self.source.fps.unwrap_or(DEFAULT_FPS),
        }
    }
}

pub fn load_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("histeq").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.histeq.toml` in the given directory and its parents.
pub fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
