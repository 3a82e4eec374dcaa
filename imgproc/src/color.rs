use image::{GrayImage, RgbImage, RgbaImage};
use rayon::prelude::*;
use rayon::ThreadPool;

const W_R: f32 = 0.299;
const W_G: f32 = 0.587;
const W_B: f32 = 0.114;

/// Pixels converted per rayon task.
const PIXELS_PER_TASK: usize = 4096;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (W_R * r as f32 + W_G * g as f32 + W_B * b as f32) as u8
}

fn convert_interleaved(data: &[u8], channels: usize, gray: &mut [u8]) {
    gray.par_chunks_mut(PIXELS_PER_TASK)
        .zip(data.par_chunks(PIXELS_PER_TASK * channels))
        .for_each(|(g_chunk, px_chunk)| {
            for (g, px) in g_chunk.iter_mut().zip(px_chunk.chunks_exact(channels)) {
                *g = luma(px[0], px[1], px[2]);
            }
        });
}

pub fn convert_rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    convert_rgb_to_gray_in_pool(rgb, None)
}

/// BT.601 luma (`0.299 R + 0.587 G + 0.114 B`), truncated.
pub fn convert_rgb_to_gray_in_pool(rgb: &RgbImage, pool: Option<&ThreadPool>) -> GrayImage {
    let run = || {
        let (w, h) = rgb.dimensions();
        let mut gray = GrayImage::new(w, h);
        convert_interleaved(rgb.as_raw(), 3, &mut gray);
        gray
    };

    if let Some(p) = pool {
        p.install(run)
    } else {
        run()
    }
}

/// Alpha is ignored.
pub fn convert_rgba_to_gray(rgba: &RgbaImage) -> GrayImage {
    let (w, h) = rgba.dimensions();
    let mut gray = GrayImage::new(w, h);
    convert_interleaved(rgba.as_raw(), 4, &mut gray);
    gray
}
