//! Frame loop for live histogram equalization.
//!
//! A [`Session`] pulls grayscale frames from a capture source, optionally
//! equalizes them, renders the histogram canvas and keeps timing statistics.
//! The same session drives both the native window and the headless runner.

pub mod headless;
pub mod session;

#[cfg(not(target_arch = "wasm32"))]
pub mod native_viewer;

pub use headless::{run_headless, HeadlessOptions};
pub use session::*;

#[cfg(not(target_arch = "wasm32"))]
pub use native_viewer::{run_native_viewer, HistogramViewer, ViewerOptions};

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Video(#[from] histeq_videoio::VideoError),

    #[error(transparent)]
    Imgproc(#[from] histeq_imgproc::ImgprocError),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("UI error: {0}")]
    Ui(String),
}
