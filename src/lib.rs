pub use histeq_core as core;
pub use histeq_imgproc as imgproc;
pub use histeq_videoio as videoio;
pub use histeq_viewer as viewer;

pub mod config;

pub use histeq_imgproc::{
    compute_cdf, compute_histogram, draw_histogram, equalize_histogram, normalize_histogram,
    render_histogram, EqualizationMap, ImgprocError,
};

/// Initialize a single global Rayon thread pool for the parallel histogram
/// and lookup-table passes.
///
/// Call this once at application startup before processing frames.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `HISTEQ_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    histeq_core::init_global_thread_pool(num_threads)
}
