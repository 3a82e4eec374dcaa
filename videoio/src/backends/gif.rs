use crate::{Result, VideoCapture, VideoError};
use histeq_imgproc::convert_rgba_to_gray;
use image::{AnimationDecoder, GrayImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct GifCapture {
    frames: Vec<GrayImage>,
    current_idx: usize,
    fps: Option<f64>,
}

impl std::fmt::Debug for GifCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifCapture")
            .field("frame_count", &self.frames.len())
            .field("current_idx", &self.current_idx)
            .field("fps", &self.fps)
            .finish()
    }
}

impl GifCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let decoder = image::codecs::gif::GifDecoder::new(reader)
            .map_err(|e| VideoError::Backend(format!("Failed to decode GIF: {}", e)))?;

        let frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| VideoError::Backend(format!("Failed to collect frames: {}", e)))?;

        let first = frames
            .first()
            .ok_or_else(|| VideoError::Backend("GIF contains no frames".to_string()))?;
        let (numer, denom) = first.delay().numer_denom_ms();
        let fps = (numer > 0).then(|| 1000.0 * denom as f64 / numer as f64);

        // Converted once; rewinding replays from memory.
        let frames = frames
            .iter()
            .map(|frame| convert_rgba_to_gray(frame.buffer()))
            .collect();

        Ok(Self {
            frames,
            current_idx: 0,
            fps,
        })
    }
}

impl VideoCapture for GifCapture {
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
        let frame = self
            .frames
            .get(self.current_idx)
            .cloned()
            .ok_or(VideoError::EndOfStream)?;
        self.current_idx += 1;
        Ok(frame)
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn rewind(&mut self) -> Result<()> {
        self.current_idx = 0;
        Ok(())
    }
}
