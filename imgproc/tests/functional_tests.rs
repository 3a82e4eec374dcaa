use histeq_imgproc::*;
use image::{GrayImage, Luma};

fn noisy_dark_frame(width: u32, height: u32) -> GrayImage {
    // Low-contrast content squeezed into [40, 90).
    GrayImage::from_fn(width, height, |x, y| {
        let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 50;
        Luma([40 + v as u8])
    })
}

#[test]
fn test_histogram_sums_to_pixel_count() {
    for (w, h) in [(1, 1), (3, 7), (64, 48), (640, 3)] {
        let img = noisy_dark_frame(w, h);
        let hist = compute_histogram(&img).unwrap();
        assert_eq!(histogram_total(&hist), w as u64 * h as u64);
    }
}

#[test]
fn test_cdf_monotonic_with_final_total() {
    let img = noisy_dark_frame(120, 80);
    let hist = compute_histogram(&img).unwrap();
    let cdf = compute_cdf(&hist);
    assert!(cdf.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(cdf[255], 120 * 80);
}

#[test]
fn test_equalization_stretches_low_contrast_frame() {
    let img = noisy_dark_frame(160, 120);
    let out = equalize_histogram(&img).unwrap();
    assert_eq!(out.dimensions(), img.dimensions());

    let min = out.pixels().map(|p| p[0]).min().unwrap();
    let max = out.pixels().map(|p| p[0]).max().unwrap();
    assert_eq!(min, 0);
    // k * (total - cdf_min) may land a hair under 255 before truncation.
    assert!(max >= 254);
}

#[test]
fn test_equalization_is_deterministic() {
    let img = noisy_dark_frame(97, 61);
    let a = equalize_histogram(&img).unwrap();
    let b = equalize_histogram(&img).unwrap();
    assert_eq!(a.as_raw(), b.as_raw());
}

#[test]
fn test_equalization_preserves_intensity_order() {
    let img = noisy_dark_frame(50, 50);
    let map = equalization_map(&img).unwrap();
    let lut = map.as_array();
    assert!(lut.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_second_pass_is_noop_on_small_image() {
    // With at most 256 pixels k >= 1, so distinct levels never merge and a
    // second pass maps every occupied level onto itself.
    let img = noisy_dark_frame(16, 16);
    let once = equalize_histogram(&img).unwrap();
    let twice = equalize_histogram(&once).unwrap();
    assert_eq!(once.as_raw(), twice.as_raw());
}

#[test]
fn test_second_pass_stays_close_on_large_image() {
    let img = noisy_dark_frame(320, 240);
    let once = equalize_histogram(&img).unwrap();
    let twice = equalize_histogram(&once).unwrap();
    let max_diff = once
        .pixels()
        .zip(twice.pixels())
        .map(|(a, b)| (a[0] as i32 - b[0] as i32).abs())
        .max()
        .unwrap();
    assert!(max_diff <= 1, "second pass moved a pixel by {max_diff}");
}

#[test]
fn test_full_ramp_maps_to_identity() {
    let img = GrayImage::from_fn(256, 1, |x, _| Luma([x as u8]));
    let map = equalization_map(&img).unwrap();
    assert!(map.is_identity());
}

#[test]
fn test_flat_frame_does_not_crash() {
    let img = GrayImage::from_pixel(320, 240, Luma([128]));
    let out = equalize_histogram(&img).unwrap();
    assert_eq!(out.as_raw(), img.as_raw());
}

#[test]
fn test_zero_sized_frame_is_rejected() {
    let img = GrayImage::new(0, 0);
    assert!(matches!(equalize_histogram(&img), Err(ImgprocError::InvalidImage(_))));
}

#[test]
fn test_render_histogram_peak_touches_top() {
    let img = GrayImage::from_pixel(10, 10, Luma([128]));
    let canvas = render_histogram(&img, 1024, 512).unwrap();
    assert_eq!(canvas.dimensions(), (1024, 512));

    // bin_w = 4; the single occupied bin reaches y = 0 at x = 512.
    assert_eq!(canvas.get_pixel(512, 0)[0], 255);
    assert_eq!(canvas.get_pixel(100, 0)[0], 0);
    // Segment rising from (508, 512) towards the peak crosses the bottom row.
    assert_eq!(canvas.get_pixel(508, 511)[0], 255);
}

#[test]
fn test_render_histogram_leaves_trailing_columns() {
    let img = noisy_dark_frame(64, 64);
    // bin_w = 4, last point at x = 1020.
    let canvas = render_histogram(&img, 1030, 200).unwrap();
    for x in 1021..1030 {
        for y in 0..200 {
            assert_eq!(canvas.get_pixel(x, y)[0], 0);
        }
    }
}

#[test]
fn test_draw_histogram_mutates_existing_canvas() {
    let img = noisy_dark_frame(32, 32);
    let mut canvas = GrayImage::from_pixel(512, 100, Luma([7]));
    draw_histogram(&img, &mut canvas).unwrap();
    assert!(canvas.pixels().any(|p| p[0] == 255));
    assert!(canvas.pixels().any(|p| p[0] == 7));
}

#[test]
fn test_public_pipeline_on_tiny_frame() {
    let img = GrayImage::from_raw(2, 2, vec![0, 85, 170, 255]).unwrap();

    let hist: Histogram = compute_histogram(&img).unwrap();
    assert_eq!(compute_histogram_in_pool(&img, None).unwrap(), hist);
    assert_eq!(histogram_total(&hist), 4);

    let cdf: Cdf = compute_cdf(&hist);
    assert_eq!(cdf_min(&cdf), Some(1));
    assert_eq!(cdf[255], 4);

    assert!(normalize_histogram(&[0u32; 256], 512.0).iter().all(|&v| v == 0.0));

    let out = equalize_histogram(&img).unwrap();
    assert_eq!(out.as_raw(), &vec![0, 85, 170, 255]);

    let flat = GrayImage::from_pixel(3, 3, Luma([0]));
    let canvas = render_histogram(&flat, 1024, 512).unwrap();
    assert_eq!(canvas.get_pixel(0, 0)[0], 255);
}
