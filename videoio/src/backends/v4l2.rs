//! Video4Linux2 capture backend

use crate::{Result, VideoCapture, VideoError};
use image::GrayImage;
use v4l::buffer::Type;
use v4l::format::FourCC;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

pub struct V4L2Capture {
    device: Device,
    stream: Option<MmapStream<'static>>,
    width: u32,
    height: u32,
    fps: Option<f64>,
}

impl std::fmt::Debug for V4L2Capture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4L2Capture")
            .field("device", &"v4l::Device")
            .field("stream_active", &self.stream.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl V4L2Capture {
    pub fn new(path: &str) -> Result<Self> {
        let device = Device::with_path(path)
            .map_err(|e| VideoError::Backend(format!("Failed to open device: {}", e)))?;

        Ok(Self {
            device,
            stream: None,
            width: 0,
            height: 0,
            fps: None,
        })
    }

    pub fn start_stream(&mut self, width: u32, height: u32) -> Result<()> {
        let mut fmt = self
            .device
            .format()
            .map_err(|e| VideoError::Backend(format!("Failed to get format: {}", e)))?;

        fmt.width = width;
        fmt.height = height;
        // YUYV carries luma in every other byte.
        fmt.fourcc = FourCC::new(b"YUYV");

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|e| VideoError::Backend(format!("Failed to set format: {}", e)))?;
        if fmt.fourcc != FourCC::new(b"YUYV") {
            return Err(VideoError::InvalidParameters(format!(
                "device does not support YUYV, got {}",
                fmt.fourcc
            )));
        }
        self.width = fmt.width;
        self.height = fmt.height;

        if let Ok(params) = self.device.params() {
            let interval = params.interval;
            if interval.numerator > 0 {
                self.fps = Some(interval.denominator as f64 / interval.numerator as f64);
            }
        }

        let stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, 4)
            .map_err(|e| VideoError::Backend(format!("Failed to create stream: {}", e)))?;

        tracing::info!(width = self.width, height = self.height, fps = ?self.fps, "camera stream started");
        self.stream = Some(stream);
        Ok(())
    }
}

impl VideoCapture for V4L2Capture {
    fn is_opened(&self) -> bool {
        self.stream.is_some()
    }

    fn grab(&mut self) -> Result<()> {
        // Dequeuing happens in `retrieve`.
        Ok(())
    }

    fn retrieve(&mut self) -> Result<GrayImage> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| VideoError::CaptureFailed("Stream not started".to_string()))?;

        let (data, _metadata) = stream
            .next()
            .map_err(|e| VideoError::CaptureFailed(format!("Failed to grab frame: {}", e)))?;

        let pixels = (self.width * self.height) as usize;
        if data.len() < pixels * 2 {
            return Err(VideoError::CaptureFailed(format!(
                "short frame: {} bytes for {}x{}",
                data.len(),
                self.width,
                self.height
            )));
        }

        // YUYV: Y0 U0 Y1 V0 ...
        let luma: Vec<u8> = data.iter().step_by(2).take(pixels).copied().collect();
        GrayImage::from_raw(self.width, self.height, luma)
            .ok_or_else(|| VideoError::CaptureFailed("Image creation failed".to_string()))
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }
}
