//! Native FFmpeg video capture backend using ffmpeg-next

use crate::{Result, VideoCapture, VideoError};
use ffmpeg_next as ffmpeg;
use histeq_imgproc::convert_rgb_to_gray;
use image::{GrayImage, RgbImage};
use std::path::Path;

pub struct NativeFfmpegCapture {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
    width: u32,
    height: u32,
    fps: Option<f64>,
    scaler: ffmpeg::software::scaling::Context,
    flushed: bool,
}

impl std::fmt::Debug for NativeFfmpegCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFfmpegCapture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fps", &self.fps)
            .finish()
    }
}

// SAFETY: `scaling::Context` is `!Send` because it wraps a raw `SwsContext`
// pointer. The context is owned exclusively by this capture, never shared or
// aliased, and only used through `&mut self`, so moving the whole capture to
// another thread cannot race on it. The demuxer and decoder are `Send` already.
unsafe impl Send for NativeFfmpegCapture {}

impl NativeFfmpegCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        ffmpeg::init().map_err(|e| VideoError::Backend(format!("FFmpeg init failed: {}", e)))?;

        let ictx = ffmpeg::format::input(&path.as_ref())
            .map_err(|e| VideoError::Backend(format!("Failed to open input: {}", e)))?;

        let input = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| VideoError::Backend("No video stream found".to_string()))?;

        let stream_index = input.index();
        let rate = input.avg_frame_rate();
        let fps = (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate));

        let context = ffmpeg::codec::context::Context::from_parameters(input.parameters())
            .map_err(|e| VideoError::Backend(format!("Failed to get codec context: {}", e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| VideoError::Backend(format!("Failed to get decoder: {}", e)))?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| VideoError::Backend(format!("Failed to initialize scaler: {}", e)))?;

        tracing::debug!(width, height, ?fps, "opened FFmpeg stream");

        Ok(Self {
            ictx,
            decoder,
            stream_index,
            width,
            height,
            fps,
            scaler,
            flushed: false,
        })
    }

    fn convert(&mut self, decoded: &ffmpeg::util::frame::Video) -> Result<GrayImage> {
        let mut rgb_frame = ffmpeg::util::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| VideoError::CaptureFailed(format!("Scaling failed: {}", e)))?;

        // Rows may be padded past `3 * width` bytes.
        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = rgb_frame.data(0);
        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in data.chunks(stride).take(self.height as usize) {
            packed.extend_from_slice(&row[..row_bytes]);
        }

        let rgb = RgbImage::from_raw(self.width, self.height, packed)
            .ok_or_else(|| VideoError::CaptureFailed("Image creation failed".to_string()))?;
        Ok(convert_rgb_to_gray(&rgb))
    }
}

impl VideoCapture for NativeFfmpegCapture {
    fn is_opened(&self) -> bool {
        true
    }

    fn grab(&mut self) -> Result<()> {
        // Demuxing and decoding both happen in `retrieve`.
        Ok(())
    }

    fn retrieve(&mut self) -> Result<GrayImage> {
        let mut decoded = ffmpeg::util::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded);
            }
            if self.flushed {
                return Err(VideoError::EndOfStream);
            }

            let mut sent = false;
            for (stream, packet) in self.ictx.packets() {
                if stream.index() == self.stream_index {
                    self.decoder
                        .send_packet(&packet)
                        .map_err(|e| VideoError::CaptureFailed(format!("Decode failed: {}", e)))?;
                    sent = true;
                    break;
                }
            }
            if !sent {
                self.decoder
                    .send_eof()
                    .map_err(|e| VideoError::CaptureFailed(format!("Flush failed: {}", e)))?;
                self.flushed = true;
            }
        }
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn rewind(&mut self) -> Result<()> {
        self.ictx
            .seek(0, ..)
            .map_err(|e| VideoError::Backend(format!("Seek failed: {}", e)))?;
        self.decoder.flush();
        self.flushed = false;
        Ok(())
    }
}
