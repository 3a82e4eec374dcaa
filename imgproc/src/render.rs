use crate::histogram::{compute_histogram, normalize_histogram};
use crate::{validate_image, validate_image_size, Result};
use histeq_core::GRAY_LEVELS;
use image::{GrayImage, Luma};

/// Intensity of the histogram polyline on the black canvas.
pub const HISTOGRAM_LINE: Luma<u8> = Luma([255]);

/// Draws the histogram of `image` as a connected line plot onto `canvas`.
///
/// Bins are normalized so the tallest one reaches the top row. Each bin is
/// `canvas.width() / 256` pixels wide; columns beyond `256 * bin_w` stay
/// untouched. Points that fall outside the canvas are clipped.
pub fn draw_histogram(image: &GrayImage, canvas: &mut GrayImage) -> Result<()> {
    draw_histogram_with(image, canvas, HISTOGRAM_LINE)
}

pub fn draw_histogram_with(image: &GrayImage, canvas: &mut GrayImage, color: Luma<u8>) -> Result<()> {
    validate_image(image)?;
    let hist = compute_histogram(image)?;

    let (hist_w, hist_h) = canvas.dimensions();
    let hist_h = hist_h as i32;
    let scaled = normalize_histogram(&hist, hist_h as f64);
    let bin_w = (hist_w / GRAY_LEVELS as u32) as i32;

    for i in 1..GRAY_LEVELS {
        let p1 = (bin_w * (i as i32 - 1), hist_h - scaled[i - 1] as i32);
        let p2 = (bin_w * i as i32, hist_h - scaled[i] as i32);
        draw_line_segment(canvas, p1, p2, color);
    }
    Ok(())
}

/// Allocates a black `width x height` canvas and draws the histogram of
/// `image` onto it.
pub fn render_histogram(image: &GrayImage, width: u32, height: u32) -> Result<GrayImage> {
    validate_image_size(width, height)?;
    let mut canvas = GrayImage::new(width, height);
    draw_histogram(image, &mut canvas)?;
    Ok(canvas)
}

// Bresenham's line algorithm
pub fn draw_line_segment(img: &mut GrayImage, p1: (i32, i32), p2: (i32, i32), color: Luma<u8>) {
    let (mut x0, mut y0) = p1;
    let (x1, y1) = p2;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && x0 < img.width() as i32 && y0 >= 0 && y0 < img.height() as i32 {
            img.put_pixel(x0 as u32, y0 as u32, color);
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
