use crate::histogram::{cdf_min, compute_cdf, compute_histogram, Cdf, Histogram};
use crate::{validate_image, ImgprocError, Result};
use histeq_core::GRAY_LEVELS;
use image::GrayImage;
use rayon::prelude::*;
use rayon::ThreadPool;

/// 256-entry intensity remapping table produced by histogram equalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualizationMap {
    lut: [u8; GRAY_LEVELS],
}

impl EqualizationMap {
    /// Map that leaves every intensity unchanged.
    pub fn identity() -> Self {
        let mut lut = [0u8; GRAY_LEVELS];
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self { lut }
    }

    pub fn from_histogram(hist: &Histogram) -> Result<Self> {
        let total = hist.iter().map(|&h| h as u64).sum::<u64>();
        let total = u32::try_from(total).map_err(|_| {
            ImgprocError::InvalidImage(format!("{total} pixels overflow a 32-bit histogram"))
        })?;
        Self::from_cdf(&compute_cdf(hist), total)
    }

    /// Builds `map[i] = trunc(k * (cdf[i] - cdf_min))` with
    /// `k = 255 / (total - cdf_min)`.
    ///
    /// Values are truncated toward zero, then clamped into `[0, 255]`. Only
    /// the empty levels below the darkest occupied one go negative, and no
    /// pixel ever looks those up.
    pub fn from_cdf(cdf: &Cdf, total: u32) -> Result<Self> {
        let min = cdf_min(cdf).ok_or_else(|| {
            ImgprocError::InvalidImage("cannot equalize an image without pixels".into())
        })?;
        if total <= min {
            return Err(ImgprocError::DegenerateImage { cdf_min: min, total });
        }

        let k = 255.0 / (total - min) as f64;
        let mut lut = [0u8; GRAY_LEVELS];
        for (v, &c) in lut.iter_mut().zip(cdf.iter()) {
            let mapped = (k * (c as f64 - min as f64)).trunc();
            *v = mapped.clamp(0.0, 255.0) as u8;
        }
        Ok(Self { lut })
    }

    #[inline]
    pub fn get(&self, intensity: u8) -> u8 {
        self.lut[intensity as usize]
    }

    pub fn as_array(&self) -> &[u8; GRAY_LEVELS] {
        &self.lut
    }

    pub fn is_identity(&self) -> bool {
        self.lut.iter().enumerate().all(|(i, &v)| i == v as usize)
    }

    /// Writes `map[src]` for every pixel into a fresh image of the same size.
    pub fn apply(&self, src: &GrayImage) -> GrayImage {
        self.apply_in_pool(src, None)
    }

    pub fn apply_in_pool(&self, src: &GrayImage, pool: Option<&ThreadPool>) -> GrayImage {
        let run = || {
            let mut output = GrayImage::new(src.width(), src.height());
            let width = src.width() as usize;
            if width == 0 {
                return output;
            }
            output
                .par_chunks_mut(width)
                .zip(src.as_raw().par_chunks(width))
                .for_each(|(dst_row, src_row)| {
                    for (d, &s) in dst_row.iter_mut().zip(src_row) {
                        *d = self.lut[s as usize];
                    }
                });
            output
        };

        if let Some(p) = pool {
            p.install(run)
        } else {
            run()
        }
    }
}

impl Default for EqualizationMap {
    fn default() -> Self {
        Self::identity()
    }
}

/// Equalization map for `image`, or [`ImgprocError::DegenerateImage`] when
/// every pixel has the same intensity.
pub fn equalization_map(image: &GrayImage) -> Result<EqualizationMap> {
    let hist = compute_histogram(image)?;
    EqualizationMap::from_histogram(&hist)
}

/// Histogram-equalizes `image` into a newly allocated image.
///
/// A flat image (one intensity everywhere) has no contrast to stretch and
/// is passed through unchanged.
pub fn equalize_histogram(image: &GrayImage) -> Result<GrayImage> {
    equalize_histogram_in_pool(image, None)
}

pub fn equalize_histogram_in_pool(image: &GrayImage, pool: Option<&ThreadPool>) -> Result<GrayImage> {
    validate_image(image)?;
    let map = match equalization_map(image) {
        Ok(map) => map,
        Err(ImgprocError::DegenerateImage { cdf_min, total }) => {
            tracing::debug!(cdf_min, total, "flat frame, equalization skipped");
            return Ok(image.clone());
        }
        Err(e) => return Err(e),
    };
    Ok(map.apply_in_pool(image, pool))
}
