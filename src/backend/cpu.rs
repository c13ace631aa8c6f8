// SPDX-License-Identifier: GPL-3.0-only

//! Software backend
//!
//! Executes the clear/accumulate kernels and the overlay draw on the CPU
//! with the same rules as the WGSL sources. Frames are `RgbaImage`s.
//! Every allocation, release, dispatch and readback is counted so the
//! resource lifecycle can be checked without a GPU.

use super::{ComputeKernelRunner, Extent, Kernel, RenderBackend};
use crate::constants::{BUCKET_COUNT, BUCKET_STRIDE, WORKGROUP_SIZE, kernel_names};
use crate::errors::{EffectError, EffectResult};
use crate::histogram::{Bucket, OverlayParams, bar_fill};
use image::RgbaImage;
use std::collections::HashMap;
use tracing::warn;

/// Handle to a sampling texture owned by a [`CpuBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuTexture(u64);

/// Handle to a bucket buffer owned by a [`CpuBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuBuffer(u64);

/// One recorded kernel dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRecord {
    pub kernel: Kernel,
    pub groups: [u32; 3],
}

/// Counters of backend operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub texture_allocations: u32,
    pub texture_releases: u32,
    pub buffer_allocations: u32,
    pub buffer_releases: u32,
    pub blits: u32,
    pub readbacks: u32,
    pub overlay_draws: u32,
    pub dispatches: Vec<DispatchRecord>,
}

struct TextureSlot {
    pixels: RgbaImage,
    created: bool,
}

/// CPU implementation of [`RenderBackend`]
#[derive(Default)]
pub struct CpuBackend {
    textures: HashMap<u64, TextureSlot>,
    buffers: HashMap<u64, Vec<Bucket>>,
    bound_textures: HashMap<Kernel, CpuTexture>,
    bound_buffers: HashMap<Kernel, CpuBuffer>,
    next_id: u64,
    fail_next_allocation: bool,
    stats: BackendStats,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    /// Make the next texture or buffer allocation fail
    pub fn fail_next_allocation(&mut self) {
        self.fail_next_allocation = true;
    }

    /// Drop the texture's storage, as a lost render target would
    pub fn invalidate_texture(&mut self, texture: CpuTexture) {
        if let Some(slot) = self.textures.get_mut(&texture.0) {
            slot.created = false;
        }
    }

    pub fn is_live_texture(&self, texture: CpuTexture) -> bool {
        self.textures.contains_key(&texture.0)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Current contents of a sampling texture
    pub fn texture_pixels(&self, texture: CpuTexture) -> Option<&RgbaImage> {
        self.textures.get(&texture.0).map(|slot| &slot.pixels)
    }

    /// Current contents of a bucket buffer
    pub fn buffer_contents(&self, buffer: CpuBuffer) -> Option<&[Bucket]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    fn allocate_id(&mut self, resource: &'static str) -> EffectResult<u64> {
        if std::mem::take(&mut self.fail_next_allocation) {
            return Err(EffectError::allocation(resource, "simulated allocation failure"));
        }
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn bound_buffer(&self, kernel: Kernel) -> EffectResult<CpuBuffer> {
        self.bound_buffers
            .get(&kernel)
            .copied()
            .filter(|buffer| self.buffers.contains_key(&buffer.0))
            .ok_or_else(|| EffectError::UnboundResource {
                kernel: kernel.entry_point(),
                name: kernel_names::HISTOGRAM_BUFFER.to_string(),
            })
    }

    fn bound_texture(&self, kernel: Kernel) -> EffectResult<CpuTexture> {
        self.bound_textures
            .get(&kernel)
            .copied()
            .filter(|texture| self.textures.contains_key(&texture.0))
            .ok_or_else(|| EffectError::UnboundResource {
                kernel: kernel.entry_point(),
                name: kernel_names::INPUT_TEXTURE.to_string(),
            })
    }

    fn run_clear(&mut self, buffer: CpuBuffer) {
        if let Some(buckets) = self.buffers.get_mut(&buffer.0) {
            buckets.fill(Bucket::default());
        }
    }

    fn run_accumulate(&mut self, texture: CpuTexture, buffer: CpuBuffer, groups: [u32; 3]) {
        let (Some(slot), Some(buckets)) =
            (self.textures.get(&texture.0), self.buffers.get_mut(&buffer.0))
        else {
            return;
        };

        // Threads outside the image return early, as in the kernel
        let covered_w = slot.pixels.width().min(groups[0].saturating_mul(WORKGROUP_SIZE));
        let covered_h = slot.pixels.height().min(groups[1].saturating_mul(WORKGROUP_SIZE));

        for y in 0..covered_h {
            for x in 0..covered_w {
                let [r, g, b, _] = slot.pixels.get_pixel(x, y).0;
                buckets[r as usize].r += 1;
                buckets[g as usize].g += 1;
                buckets[b as usize].b += 1;
            }
        }
    }
}

impl ComputeKernelRunner for CpuBackend {
    type Texture = CpuTexture;
    type Buffer = CpuBuffer;

    fn bind_texture(&mut self, kernel: Kernel, name: &str, texture: &CpuTexture) {
        if name == kernel_names::INPUT_TEXTURE {
            self.bound_textures.insert(kernel, *texture);
        } else {
            warn!(kernel = kernel.entry_point(), name, "Ignoring unrecognized texture binding");
        }
    }

    fn bind_buffer(&mut self, kernel: Kernel, name: &str, buffer: &CpuBuffer) {
        if name == kernel_names::HISTOGRAM_BUFFER {
            self.bound_buffers.insert(kernel, *buffer);
        } else {
            warn!(kernel = kernel.entry_point(), name, "Ignoring unrecognized buffer binding");
        }
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> EffectResult<()> {
        let groups = [groups_x, groups_y, groups_z];
        let buffer = self.bound_buffer(kernel)?;

        match kernel {
            Kernel::Clear => {
                // Workgroup (0, 0, 0) does the clearing
                if groups.iter().all(|&g| g > 0) {
                    self.run_clear(buffer);
                }
            }
            Kernel::Accumulate => {
                let texture = self.bound_texture(kernel)?;
                if groups_z > 0 {
                    self.run_accumulate(texture, buffer, groups);
                }
            }
        }

        self.stats.dispatches.push(DispatchRecord { kernel, groups });
        Ok(())
    }
}

impl RenderBackend for CpuBackend {
    type Frame = RgbaImage;

    fn frame_extent(&self, frame: &RgbaImage) -> Extent {
        Extent::new(frame.width(), frame.height(), 1)
    }

    fn create_sampling_texture(&mut self, like: &RgbaImage) -> EffectResult<CpuTexture> {
        let id = self.allocate_id("sampling texture")?;
        self.textures.insert(
            id,
            TextureSlot {
                pixels: RgbaImage::new(like.width(), like.height()),
                created: true,
            },
        );
        self.stats.texture_allocations += 1;
        Ok(CpuTexture(id))
    }

    fn texture_extent(&self, texture: &CpuTexture) -> Extent {
        self.textures
            .get(&texture.0)
            .map(|slot| Extent::new(slot.pixels.width(), slot.pixels.height(), 1))
            .unwrap_or_default()
    }

    fn is_created(&self, texture: &CpuTexture) -> bool {
        self.textures
            .get(&texture.0)
            .is_some_and(|slot| slot.created)
    }

    fn release_texture(&mut self, texture: CpuTexture) {
        if self.textures.remove(&texture.0).is_some() {
            self.stats.texture_releases += 1;
        }
        self.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn blit_to_texture(&mut self, source: &RgbaImage, target: &CpuTexture) -> EffectResult<()> {
        let slot = self
            .textures
            .get_mut(&target.0)
            .filter(|slot| slot.created)
            .ok_or_else(|| EffectError::Image("blit target texture is not created".to_string()))?;

        if slot.pixels.dimensions() != source.dimensions() {
            return Err(EffectError::Image(format!(
                "blit size mismatch: {:?} into {:?}",
                source.dimensions(),
                slot.pixels.dimensions()
            )));
        }

        slot.pixels.copy_from_slice(source.as_raw());
        self.stats.blits += 1;
        Ok(())
    }

    fn create_bucket_buffer(&mut self, count: usize, stride: usize) -> EffectResult<CpuBuffer> {
        if stride != BUCKET_STRIDE {
            return Err(EffectError::allocation(
                "bucket buffer",
                format!("unsupported stride {}", stride),
            ));
        }
        let id = self.allocate_id("bucket buffer")?;
        self.buffers.insert(id, vec![Bucket::default(); count]);
        self.stats.buffer_allocations += 1;
        Ok(CpuBuffer(id))
    }

    fn release_buffer(&mut self, buffer: CpuBuffer) {
        if self.buffers.remove(&buffer.0).is_some() {
            self.stats.buffer_releases += 1;
        }
        self.bound_buffers.retain(|_, bound| *bound != buffer);
    }

    fn read_buckets(&mut self, buffer: &CpuBuffer, mirror: &mut [Bucket]) -> EffectResult<()> {
        let contents = self
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| EffectError::Readback("bucket buffer was released".to_string()))?;

        if contents.len() != mirror.len() {
            return Err(EffectError::Readback(format!(
                "mirror holds {} buckets, buffer holds {}",
                mirror.len(),
                contents.len()
            )));
        }

        mirror.copy_from_slice(contents);
        self.stats.readbacks += 1;
        Ok(())
    }

    fn draw_overlay(
        &mut self,
        source: &RgbaImage,
        dest: &mut RgbaImage,
        values: &CpuBuffer,
        params: &OverlayParams,
    ) -> EffectResult<()> {
        let buckets = self
            .buffers
            .get(&values.0)
            .ok_or_else(|| EffectError::UnboundResource {
                kernel: "overlay",
                name: crate::constants::material_names::HISTOGRAM_VALUES.to_string(),
            })?;

        if source.dimensions() != dest.dimensions() {
            return Err(EffectError::Image(format!(
                "overlay source {:?} and destination {:?} differ in size",
                source.dimensions(),
                dest.dimensions()
            )));
        }

        let (width, height) = source.dimensions();
        for (x, y, out) in dest.enumerate_pixels_mut() {
            let bucket_index = ((x as u64 * BUCKET_COUNT as u64) / width as u64) as usize;
            let bucket = buckets
                .get(bucket_index.min(BUCKET_COUNT - 1))
                .copied()
                .unwrap_or_default();
            let level = 1.0 - (y as f32 + 0.5) / height as f32;
            let counts = [bucket.r, bucket.g, bucket.b];

            let mut pixel = *source.get_pixel(x, y);
            for channel in 0..3 {
                let bar = counts[channel] as f32 * params.scalar[channel];
                if let Some(fill) = bar_fill(bar, level, params) {
                    let value = pixel.0[channel] as f32 / 255.0;
                    let lifted = value + (1.0 - value) * fill;
                    pixel.0[channel] = (lifted * 255.0).round().clamp(0.0, 255.0) as u8;
                }
            }
            *out = pixel;
        }

        self.stats.overlay_draws += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn bound_backend(frame: &RgbaImage) -> (CpuBackend, CpuTexture, CpuBuffer) {
        let mut backend = CpuBackend::new();
        let texture = backend.create_sampling_texture(frame).unwrap();
        backend.blit_to_texture(frame, &texture).unwrap();
        let buffer = backend.create_bucket_buffer(BUCKET_COUNT, BUCKET_STRIDE).unwrap();
        backend.bind_texture(Kernel::Accumulate, kernel_names::INPUT_TEXTURE, &texture);
        backend.bind_buffer(Kernel::Accumulate, kernel_names::HISTOGRAM_BUFFER, &buffer);
        backend.bind_buffer(Kernel::Clear, kernel_names::HISTOGRAM_BUFFER, &buffer);
        (backend, texture, buffer)
    }

    #[test]
    fn test_black_frame_fills_bucket_zero() {
        let frame = RgbaImage::from_pixel(13, 7, Rgba([0, 0, 0, 255]));
        let (mut backend, _, buffer) = bound_backend(&frame);

        backend.dispatch(Kernel::Clear, 2, 1, 1).unwrap();
        backend.dispatch(Kernel::Accumulate, 2, 1, 1).unwrap();

        let buckets = backend.buffer_contents(buffer).unwrap();
        assert_eq!(buckets[0], Bucket::new(91, 91, 91));
        assert!(buckets[1..].iter().all(|b| *b == Bucket::default()));
    }

    #[test]
    fn test_accumulate_without_clear_keeps_residue() {
        let frame = RgbaImage::from_pixel(8, 8, Rgba([128, 64, 255, 255]));
        let (mut backend, _, buffer) = bound_backend(&frame);

        backend.dispatch(Kernel::Accumulate, 1, 1, 1).unwrap();
        backend.dispatch(Kernel::Accumulate, 1, 1, 1).unwrap();
        assert_eq!(backend.buffer_contents(buffer).unwrap()[128].r, 128);

        backend.dispatch(Kernel::Clear, 1, 1, 1).unwrap();
        backend.dispatch(Kernel::Accumulate, 1, 1, 1).unwrap();
        let buckets = backend.buffer_contents(buffer).unwrap();
        assert_eq!(buckets[128].r, 64);
        assert_eq!(buckets[64].g, 64);
        assert_eq!(buckets[255].b, 64);
        assert_eq!(buckets[128].unused, 0);
    }

    #[test]
    fn test_small_grid_covers_only_its_tiles() {
        let frame = RgbaImage::from_pixel(16, 16, Rgba([10, 10, 10, 255]));
        let (mut backend, _, buffer) = bound_backend(&frame);

        backend.dispatch(Kernel::Clear, 1, 1, 1).unwrap();
        backend.dispatch(Kernel::Accumulate, 1, 1, 1).unwrap();
        assert_eq!(backend.buffer_contents(buffer).unwrap()[10].r, 64);
    }

    #[test]
    fn test_dispatch_without_binding_fails() {
        let mut backend = CpuBackend::new();
        let err = backend.dispatch(Kernel::Clear, 1, 1, 1).unwrap_err();
        assert!(matches!(err, EffectError::UnboundResource { kernel: "clear", .. }));
    }

    #[test]
    fn test_unrecognized_name_is_not_bound() {
        let frame = RgbaImage::new(8, 8);
        let mut backend = CpuBackend::new();
        let texture = backend.create_sampling_texture(&frame).unwrap();
        let buffer = backend.create_bucket_buffer(BUCKET_COUNT, BUCKET_STRIDE).unwrap();
        backend.bind_texture(Kernel::Accumulate, "Input", &texture);
        backend.bind_buffer(Kernel::Accumulate, kernel_names::HISTOGRAM_BUFFER, &buffer);

        let err = backend.dispatch(Kernel::Accumulate, 1, 1, 1).unwrap_err();
        assert!(matches!(err, EffectError::UnboundResource { .. }));
    }

    #[test]
    fn test_blit_rejects_mismatched_size() {
        let mut backend = CpuBackend::new();
        let texture = backend.create_sampling_texture(&RgbaImage::new(4, 4)).unwrap();
        assert!(backend.blit_to_texture(&RgbaImage::new(5, 4), &texture).is_err());
    }

    #[test]
    fn test_overlay_lifts_channel_inside_bar() {
        let frame = RgbaImage::from_pixel(256, 4, Rgba([0, 0, 0, 200]));
        let mut backend = CpuBackend::new();
        let buffer = backend.create_bucket_buffer(BUCKET_COUNT, BUCKET_STRIDE).unwrap();
        backend.buffers.get_mut(&buffer.0).unwrap()[3] = Bucket::new(10, 0, 0);

        let params = OverlayParams {
            scalar: [0.1, 0.1, 0.1, 0.1],
            size: 0.0,
            ..Default::default()
        };
        let mut dest = RgbaImage::new(256, 4);
        backend.draw_overlay(&frame, &mut dest, &buffer, &params).unwrap();

        // Bucket 3 has a full-height red bar
        assert_eq!(dest.get_pixel(3, 0).0, [255, 0, 0, 200]);
        // Neighbours are untouched
        assert_eq!(dest.get_pixel(4, 0).0, [0, 0, 0, 200]);
    }
}
