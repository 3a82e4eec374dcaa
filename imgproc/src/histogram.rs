use crate::{validate_image, ImgprocError, Result};
use histeq_core::GRAY_LEVELS;
use image::GrayImage;
use rayon::prelude::*;
use rayon::ThreadPool;

/// Occurrence count per 8-bit intensity level.
pub type Histogram = [u32; GRAY_LEVELS];

/// Running inclusive sum of a [`Histogram`].
pub type Cdf = [u32; GRAY_LEVELS];

/// Rows handed to each rayon task when counting in parallel.
const ROWS_PER_TASK: usize = 64;

/// Counts how many pixels carry each intensity. Bin `v` holds the number of
/// pixels equal to `v`, so the bins always sum to `width * height`.
pub fn compute_histogram(image: &GrayImage) -> Result<Histogram> {
    validate_image(image)?;
    let mut hist = [0u32; GRAY_LEVELS];
    for pixel in image.pixels() {
        hist[pixel[0] as usize] += 1;
    }
    Ok(hist)
}

/// Same result as [`compute_histogram`], counted as per-band partial
/// histograms on rayon and merged by element-wise sum.
pub fn compute_histogram_in_pool(image: &GrayImage, pool: Option<&ThreadPool>) -> Result<Histogram> {
    validate_image(image)?;

    let run = || {
        let band = image.width() as usize * ROWS_PER_TASK;
        image
            .as_raw()
            .par_chunks(band)
            .map(|chunk| {
                let mut partial = [0u32; GRAY_LEVELS];
                for &v in chunk {
                    partial[v as usize] += 1;
                }
                partial
            })
            .reduce(|| [0u32; GRAY_LEVELS], merge_histograms)
    };

    Ok(if let Some(p) = pool { p.install(run) } else { run() })
}

fn merge_histograms(mut acc: Histogram, other: Histogram) -> Histogram {
    for (a, b) in acc.iter_mut().zip(other.iter()) {
        *a += b;
    }
    acc
}

/// Sum of all bins; equals the pixel count of the source image.
pub fn histogram_total<const N: usize>(hist: &[u32; N]) -> u64 {
    hist.iter().map(|&c| c as u64).sum()
}

/// Scale factor mapping the tallest bin onto `target_max`.
fn normalization_scale<const N: usize>(hist: &[u32; N], target_max: f64) -> Result<f64> {
    let max = hist.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Err(ImgprocError::DegenerateHistogram);
    }
    Ok(target_max / max as f64)
}

/// Rescales every bin linearly so the largest bin becomes exactly
/// `target_max`. An all-zero histogram yields all zeros.
pub fn normalize_histogram<const N: usize>(hist: &[u32; N], target_max: f64) -> [f64; N] {
    match normalization_scale(hist, target_max) {
        Ok(scale) => hist.map(|h| h as f64 * scale),
        Err(e) => {
            tracing::trace!("{e}; returning an all-zero histogram");
            [0.0; N]
        }
    }
}

/// Running inclusive sum: `cdf[0] = hist[0]`, `cdf[i] = cdf[i - 1] + hist[i]`.
///
/// Sums past `u32::MAX` saturate. Histograms of validated images never get there.
pub fn compute_cdf<const N: usize>(hist: &[u32; N]) -> [u32; N] {
    let mut cdf = [0u32; N];
    let mut running = 0u32;
    for (c, &h) in cdf.iter_mut().zip(hist.iter()) {
        running = running.saturating_add(h);
        *c = running;
    }
    cdf
}

/// First non-zero cumulative value, i.e. the CDF at the darkest occupied level.
pub fn cdf_min<const N: usize>(cdf: &[u32; N]) -> Option<u32> {
    cdf.iter().copied().find(|&c| c > 0)
}
