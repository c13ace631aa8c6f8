// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU helpers
//!
//! - Workgroup count calculation
//! - Async buffer readback (map, poll, read, unmap)
//! - Row padding for texture to buffer copies

use crate::errors::{EffectError, EffectResult};
use crate::gpu::wgpu;

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
///
/// # Returns
/// The buffer contents as a Vec<u8>
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> EffectResult<Vec<u8>> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| EffectError::Readback(format!("device poll failed: {:?}", e)))?;

    receiver
        .await
        .map_err(|_| EffectError::Readback("failed to receive buffer mapping".to_string()))?
        .map_err(|e| EffectError::Readback(format!("failed to map buffer: {:?}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Calculate compute shader dispatch size (workgroups needed)
///
/// # Arguments
/// * `dimension` - The dimension to cover (width or height)
/// * `workgroup_size` - The workgroup size (8 for the histogram kernels)
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

/// Bytes per row of an RGBA8 image, padded for `copy_texture_to_buffer`
#[inline]
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}
