use crate::{Result, VideoCapture, VideoError, VideoWriter};
use histeq_imgproc::convert_rgb_to_gray;
use image::{DynamicImage, GrayImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads the `.png` files of a directory in filename order.
#[derive(Debug)]
pub struct PngSequenceCapture {
    frames: Vec<PathBuf>,
    current_idx: usize,
    fps: Option<f64>,
}

impl PngSequenceCapture {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        let mut frames = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if path.is_file() && is_png {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(VideoError::InvalidParameters(format!(
                "no PNG frames in {}",
                directory.display()
            )));
        }
        tracing::debug!("found {} frames in {}", frames.len(), directory.display());

        Ok(Self {
            frames,
            current_idx: 0,
            fps: None,
        })
    }

    /// PNG sequences carry no timing, so the playback rate is supplied here.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl VideoCapture for PngSequenceCapture {
    fn is_opened(&self) -> bool {
        !self.frames.is_empty()
    }

    fn grab(&mut self) -> Result<()> {
        if self.current_idx < self.frames.len() {
            Ok(())
        } else {
            Err(VideoError::EndOfStream)
        }
    }

    fn retrieve(&mut self) -> Result<GrayImage> {
        let path = self.frames.get(self.current_idx).ok_or(VideoError::EndOfStream)?;
        let decoded = image::open(path)?;
        self.current_idx += 1;

        Ok(match decoded {
            DynamicImage::ImageLuma8(gray) => gray,
            other => convert_rgb_to_gray(&other.into_rgb8()),
        })
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn rewind(&mut self) -> Result<()> {
        self.current_idx = 0;
        Ok(())
    }
}

#[derive(Debug)]
pub struct PngSequenceWriter {
    directory: PathBuf,
    prefix: String,
    frame_count: usize,
}

impl PngSequenceWriter {
    pub fn new(directory: &Path, prefix: &str) -> Result<Self> {
        if !directory.exists() {
            fs::create_dir_all(directory)?;
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            frame_count: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }
}

impl VideoWriter for PngSequenceWriter {
    fn write(&mut self, frame: &GrayImage) -> Result<()> {
        let filename = format!("{}_{:06}.png", self.prefix, self.frame_count);
        let path = self.directory.join(filename);

        frame
            .save(&path)
            .map_err(|e| VideoError::Backend(format!("Failed to save frame: {}", e)))?;
        self.frame_count += 1;
        Ok(())
    }
}
