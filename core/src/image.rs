use image::GrayImage;

/// Number of intensity levels in an 8-bit grayscale image.
pub const GRAY_LEVELS: usize = 256;

/// Geometry of a single-channel 8-bit frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total pixel count, widened so that `u32 x u32` never overflows.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
