pub mod image;
pub mod runtime;

pub use image::*;
pub use runtime::{current_cpu_threads, init_global_thread_pool};
