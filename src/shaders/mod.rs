// SPDX-License-Identifier: GPL-3.0-only
//! WGSL sources and shared GPU helpers
//!
//! - `histogram_compute.wgsl`: accumulate (entry 0) and clear (entry 1) kernels
//! - `histogram_overlay.wgsl`: full-screen overlay material

pub mod gpu_processor;

pub use gpu_processor::{compute_dispatch_size, padded_bytes_per_row, read_buffer_async};

/// Histogram binning kernels
pub const HISTOGRAM_COMPUTE_SHADER: &str = include_str!("histogram_compute.wgsl");

/// Overlay vertex + fragment shader
pub const HISTOGRAM_OVERLAY_SHADER: &str = include_str!("histogram_overlay.wgsl");
