// SPDX-License-Identifier: GPL-3.0-only

//! Histogram overlay - a post-processing effect that draws the per-channel
//! intensity histogram of each frame over the frame itself
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`histogram`]: The effect itself: buffers, kernel dispatch, peak reduction and compositing
//! - [`backend`]: Kernel runner and render backend abstraction (GPU and CPU)
//! - [`shaders`]: WGSL kernels and shared GPU helpers
//! - [`gpu`]: Device creation
//! - [`config`]: Display parameters and on-disk configuration
//!
//! # Example
//!
//! ```ignore
//! let mut effect = HistogramEffect::new(CpuBackend::new(), DisplayConfig::default());
//! let report = effect.on_frame(&source, &mut dest)?;
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod histogram;
pub mod shaders;

// Re-export commonly used types
pub use backend::{ComputeKernelRunner, CpuBackend, Kernel, RenderBackend, WgpuBackend};
pub use config::{Config, DisplayConfig, ZeroPeakPolicy};
pub use errors::{EffectError, EffectResult};
pub use histogram::{Bucket, FrameReport, HistogramEffect};
