// SPDX-License-Identifier: GPL-3.0-only

//! Graphics backend seams
//!
//! The histogram pipeline never talks to a graphics API directly. It drives
//! a [`RenderBackend`], which owns textures and buffers and runs the two
//! compute kernels through the [`ComputeKernelRunner`] surface:
//!
//! - [`wgpu_backend::WgpuBackend`]: real GPU via wgpu compute + render passes
//! - [`cpu::CpuBackend`]: software execution of the same kernels on
//!   `image::RgbaImage` frames, used as fallback and by the test suite

pub mod cpu;
pub mod wgpu_backend;

pub use cpu::{BackendStats, CpuBackend};
pub use wgpu_backend::WgpuBackend;

use crate::errors::EffectResult;
use crate::histogram::{Bucket, OverlayParams};

/// Width, height and depth of a frame or sampling texture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Whether a buffer of this extent can hold `other` without reallocation.
    /// Only width and height take part; depth is carried for allocation.
    pub fn same_size(&self, other: &Extent) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Compute kernel entry points.
///
/// Discriminants are the kernel indices exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Bins every pixel of `InputTexture` into `HistogramBuffer`
    Accumulate = 0,
    /// Zeroes all 256 x 4 counters of `HistogramBuffer`
    Clear = 1,
}

impl Kernel {
    pub fn index(self) -> u32 {
        self as u32
    }

    /// WGSL entry point name
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::Accumulate => "accumulate",
            Kernel::Clear => "clear",
        }
    }
}

/// Binding and dispatch of the histogram compute kernels.
///
/// Bindings persist until replaced. Binding an unrecognized name is ignored
/// with a warning; a kernel dispatched with a required name unbound fails
/// with [`crate::EffectError::UnboundResource`].
pub trait ComputeKernelRunner {
    /// Sampling texture handle
    type Texture;
    /// Bucket buffer handle
    type Buffer;

    fn bind_texture(&mut self, kernel: Kernel, name: &str, texture: &Self::Texture);

    fn bind_buffer(&mut self, kernel: Kernel, name: &str, buffer: &Self::Buffer);

    /// Run `kernel` over a `groups_x` x `groups_y` x `groups_z` grid.
    ///
    /// Dispatches execute in call order: a later dispatch observes every
    /// write of an earlier one.
    fn dispatch(
        &mut self,
        kernel: Kernel,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> EffectResult<()>;
}

/// Host graphics operations needed by one histogram effect instance
pub trait RenderBackend: ComputeKernelRunner {
    /// Frames handed to the effect by the host render callback
    type Frame;

    fn frame_extent(&self, frame: &Self::Frame) -> Extent;

    /// Allocate a kernel-writable texture matching `like`'s size and format
    fn create_sampling_texture(&mut self, like: &Self::Frame) -> EffectResult<Self::Texture>;

    fn texture_extent(&self, texture: &Self::Texture) -> Extent;

    /// Whether the texture's backing storage still exists
    fn is_created(&self, texture: &Self::Texture) -> bool;

    fn release_texture(&mut self, texture: Self::Texture);

    /// Copy `source` into `target`; both must have the same size
    fn blit_to_texture(&mut self, source: &Self::Frame, target: &Self::Texture)
    -> EffectResult<()>;

    /// Allocate a structured buffer of `count` elements of `stride` bytes
    fn create_bucket_buffer(&mut self, count: usize, stride: usize) -> EffectResult<Self::Buffer>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Blocking GPU to CPU copy of the whole bucket buffer into `mirror`
    fn read_buckets(&mut self, buffer: &Self::Buffer, mirror: &mut [Bucket]) -> EffectResult<()>;

    /// Full-screen draw of the overlay material over `source` into `dest`
    fn draw_overlay(
        &mut self,
        source: &Self::Frame,
        dest: &mut Self::Frame,
        values: &Self::Buffer,
        params: &OverlayParams,
    ) -> EffectResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_indices() {
        assert_eq!(Kernel::Accumulate.index(), 0);
        assert_eq!(Kernel::Clear.index(), 1);
        assert_eq!(Kernel::Clear.entry_point(), "clear");
    }

    #[test]
    fn test_extent_ignores_depth() {
        let a = Extent::new(800, 600, 24);
        let b = Extent::new(800, 600, 1);
        assert!(a.same_size(&b));
        assert!(!a.same_size(&Extent::new(801, 600, 24)));
        assert_eq!(a.pixel_count(), 480_000);
    }
}
