//! Benchmarks for the per-frame histogram pipeline
//!
//! Compares sequential and rayon histogram counting, and times equalization
//! and histogram rendering at common video resolutions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use histeq::imgproc::{
    compute_histogram, compute_histogram_in_pool, equalize_histogram, render_histogram,
};
use image::{GrayImage, Luma};
use std::time::Duration;

/// Low-contrast frame with a diagonal gradient and some texture.
fn create_frame(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let base = (x + y) * 64 / (width + height);
        let texture = (x * 7 ^ y * 3) % 16;
        Luma([(48 + base + texture) as u8])
    })
}

const RESOLUTIONS: [(u32, u32); 3] = [(640, 480), (1280, 720), (1920, 1080)];

fn benchmark_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");
    group.measurement_time(Duration::from_secs(5));

    for (w, h) in RESOLUTIONS {
        let frame = create_frame(w, h);
        let label = format!("{}x{}", w, h);

        group.bench_with_input(BenchmarkId::new("sequential", &label), &frame, |b, f| {
            b.iter(|| compute_histogram(black_box(f)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("parallel", &label), &frame, |b, f| {
            b.iter(|| compute_histogram_in_pool(black_box(f), None).unwrap());
        });
    }

    group.finish();
}

fn benchmark_equalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalize_histogram");
    group.measurement_time(Duration::from_secs(5));

    for (w, h) in RESOLUTIONS {
        let frame = create_frame(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", w, h)), &frame, |b, f| {
            b.iter(|| equalize_histogram(black_box(f)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let frame = create_frame(1280, 720);
    c.bench_function("render_histogram_1024x512", |b| {
        b.iter(|| render_histogram(black_box(&frame), 1024, 512).unwrap());
    });
}

criterion_group!(benches, benchmark_histogram, benchmark_equalization, benchmark_render);
criterion_main!(benches);
