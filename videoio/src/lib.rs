//! Video input/output and camera capture
//!
//! Every source yields 8-bit grayscale frames; color input is converted with
//! BT.601 luma weights as it is decoded.

use image::GrayImage;
use std::fmt::Debug;
use std::path::Path;

pub type Result<T> = std::result::Result<T, VideoError>;

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("End of stream")]
    EndOfStream,
}

/// Generic interface for video capture devices
pub trait VideoCapture: Send + Debug {
    fn is_opened(&self) -> bool;
    fn grab(&mut self) -> Result<()>;
    fn retrieve(&mut self) -> Result<GrayImage>;
    fn read(&mut self) -> Result<GrayImage> {
        self.grab()?;
        self.retrieve()
    }

    /// Native frame rate, when the container or device reports one.
    fn fps(&self) -> Option<f64> {
        None
    }

    /// Restart from the first frame. Live devices have nothing to rewind.
    fn rewind(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink for processed frames
pub trait VideoWriter: Send + Debug {
    fn write(&mut self, frame: &GrayImage) -> Result<()>;
}

pub mod backends;

/// Open a video file using native FFmpeg backend
#[cfg(feature = "ffmpeg")]
pub fn open_video<P: AsRef<Path>>(path: P) -> Result<Box<dyn VideoCapture>> {
    let cap = backends::NativeFfmpegCapture::new(path)?;
    Ok(Box::new(cap))
}

#[cfg(not(feature = "ffmpeg"))]
pub fn open_video<P: AsRef<Path>>(path: P) -> Result<Box<dyn VideoCapture>> {
    Err(VideoError::Backend(format!(
        "cannot decode {}: built without the `ffmpeg` feature",
        path.as_ref().display()
    )))
}

/// Open a frame source by path: a directory is read as a PNG sequence, a
/// `.gif` as an animation, anything else goes to the video decoder.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn VideoCapture>> {
    let path = path.as_ref();
    if path.is_dir() {
        tracing::info!("opening PNG sequence {}", path.display());
        return Ok(Box::new(backends::PngSequenceCapture::new(path)?));
    }
    if !path.exists() {
        return Err(VideoError::InvalidParameters(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let is_gif = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"));
    if is_gif {
        tracing::info!("opening GIF {}", path.display());
        return Ok(Box::new(backends::GifCapture::new(path)?));
    }

    tracing::info!("opening video {}", path.display());
    open_video(path)
}

/// Open a camera device (V4L2 on Linux)
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub fn open_camera(path: &str, width: u32, height: u32) -> Result<Box<dyn VideoCapture>> {
    let mut cap = backends::V4L2Capture::new(path)?;
    cap.start_stream(width, height)?;
    Ok(Box::new(cap))
}

#[cfg(not(all(target_os = "linux", feature = "v4l2")))]
pub fn open_camera(path: &str, _width: u32, _height: u32) -> Result<Box<dyn VideoCapture>> {
    Err(VideoError::Backend(format!(
        "cannot open camera {path}: built without the `v4l2` feature"
    )))
}
