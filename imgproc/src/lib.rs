pub mod color;
pub mod equalize;
pub mod histogram;
pub mod render;

pub use color::*;
pub use equalize::*;
pub use histogram::*;
pub use render::*;

use histeq_core::ImageInfo;
use image::GrayImage;

pub type Result<T> = std::result::Result<T, ImgprocError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImgprocError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Every pixel shares the lowest occupied intensity, so the equalization
    /// scale `255 / (total - cdf_min)` has a zero denominator.
    #[error("Degenerate image: all {total} pixels share one intensity (cdf_min = {cdf_min})")]
    DegenerateImage { cdf_min: u32, total: u32 },

    #[error("Degenerate histogram: every bin is zero")]
    DegenerateHistogram,
}

pub fn validate_image_size(width: u32, height: u32) -> Result<()> {
    validate_info(ImageInfo::new(width, height))
}

fn validate_info(info: ImageInfo) -> Result<()> {
    let ImageInfo { width, height } = info;
    if info.is_empty() {
        return Err(ImgprocError::InvalidImage(format!(
            "dimensions must be non-zero, got {width}x{height}"
        )));
    }
    if info.pixel_count() > u32::MAX as u64 {
        return Err(ImgprocError::InvalidImage(format!(
            "{width}x{height} exceeds the {} pixel limit of a 32-bit histogram",
            u32::MAX
        )));
    }
    Ok(())
}

/// Boundary check applied by every public operation before touching pixels.
pub fn validate_image(img: &GrayImage) -> Result<()> {
    validate_info(ImageInfo::of(img))
}
