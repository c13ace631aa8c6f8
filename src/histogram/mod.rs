// SPDX-License-Identifier: GPL-3.0-only

//! Histogram overlay effect
//!
//! Per frame, [`HistogramEffect::on_frame`] runs:
//!
//! 1. sampling texture refresh ([`SamplingBuffer::ensure_ready`])
//! 2. bucket buffer allocation ([`BucketBuffers::ensure_allocated`])
//! 3. clear + accumulate kernels ([`dispatch`])
//! 4. blocking readback and peak reduction ([`read_and_derive`])
//! 5. overlay draw ([`composite`])
//!
//! Nothing is carried between frames except the GPU resources themselves.

mod buckets;
mod compositor;
mod dispatch;
mod peak;
mod sampling;

pub use buckets::{Bucket, BucketArray, BucketBuffers};
pub use compositor::{OverlayMaterial, OverlayParams, bar_fill, composite};
pub use dispatch::{ThreadGroups, dispatch};
pub use peak::{DerivedScalar, NormalizationScalar, PeakReduction, derive_scalar, read_and_derive};
pub use sampling::{SamplingBuffer, SamplingRefresh};

use crate::backend::RenderBackend;
use crate::config::DisplayConfig;
use crate::errors::EffectResult;
use tracing::{debug, info};

/// Summary of one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Frames processed by this instance, starting at 0
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
    pub groups: ThreadGroups,
    pub peaks: PeakReduction,
    pub scalar: NormalizationScalar,
    pub sampling: SamplingRefresh,
}

/// One histogram overlay instance bound to a backend
pub struct HistogramEffect<B: RenderBackend> {
    backend: B,
    config: DisplayConfig,
    sampling: SamplingBuffer<B::Texture>,
    buckets: BucketBuffers<B::Buffer>,
    material: OverlayMaterial,
    frames: u64,
}

impl<B: RenderBackend> HistogramEffect<B> {
    pub fn new(backend: B, config: DisplayConfig) -> Self {
        Self {
            backend,
            config,
            sampling: SamplingBuffer::new(),
            buckets: BucketBuffers::new(),
            material: OverlayMaterial::new(),
            frames: 0,
        }
    }

    /// Allocate the bucket buffer up front instead of on the first frame
    pub fn init(&mut self) -> EffectResult<()> {
        self.buckets.ensure_allocated(&mut self.backend)?;
        info!("Histogram effect initialized");
        Ok(())
    }

    /// Render callback: analyze `source` and draw it with the overlay into `dest`
    pub fn on_frame(&mut self, source: &B::Frame, dest: &mut B::Frame) -> EffectResult<FrameReport> {
        let extent = self.backend.frame_extent(source);

        let (sampling, refresh) = self.sampling.ensure_ready(&mut self.backend, source)?;
        let (buffer, mirror) = self.buckets.ensure_allocated(&mut self.backend)?;

        let groups = dispatch(
            &mut self.backend,
            sampling,
            buffer,
            extent.width,
            extent.height,
        )?;

        let derived = read_and_derive(&mut self.backend, buffer, mirror, &self.config)?;

        composite(
            &mut self.backend,
            &mut self.material,
            source,
            dest,
            buffer,
            derived.scalar,
            &self.config,
        )?;

        let report = FrameReport {
            frame_index: self.frames,
            width: extent.width,
            height: extent.height,
            groups,
            peaks: derived.peaks,
            scalar: derived.scalar,
            sampling: refresh,
        };
        self.frames += 1;

        Ok(report)
    }

    /// Release GPU resources. Safe to call any number of times.
    pub fn shutdown(&mut self) {
        let released_buffer = self.buckets.release(&mut self.backend);
        let released_texture = self.sampling.release(&mut self.backend);

        if released_buffer || released_texture {
            debug!(frames = self.frames, "Histogram effect shut down");
        }
    }

    pub fn set_red_scaler(&mut self, value: f32) {
        self.config.set_red_scaler(value);
    }

    pub fn set_green_scaler(&mut self, value: f32) {
        self.config.set_green_scaler(value);
    }

    pub fn set_blue_scaler(&mut self, value: f32) {
        self.config.set_blue_scaler(value);
    }

    pub fn set_fade_size(&mut self, value: f32) {
        self.config.set_fade_size(value);
    }

    pub fn set_minimal_fill(&mut self, value: f32) {
        self.config.set_minimal_fill(value);
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Bucket values read back during the last frame
    pub fn last_buckets(&self) -> Option<&BucketArray> {
        self.buckets.mirror()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for HistogramEffect<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
