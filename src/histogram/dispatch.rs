// SPDX-License-Identifier: GPL-3.0-only

//! Two-phase compute dispatch: clear, then accumulate

use crate::backend::{ComputeKernelRunner, Kernel};
use crate::constants::{WORKGROUP_SIZE, kernel_names};
use crate::errors::EffectResult;
use crate::shaders::compute_dispatch_size;
use tracing::debug;

/// Workgroup grid covering a frame in 8x8 tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadGroups {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ThreadGroups {
    /// Grid for a `width` x `height` frame, partial edge tiles rounded up
    pub fn for_frame(width: u32, height: u32) -> Self {
        Self {
            x: compute_dispatch_size(width, WORKGROUP_SIZE),
            y: compute_dispatch_size(height, WORKGROUP_SIZE),
            z: 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

/// Bind the sampling texture and bucket buffer, zero the buckets, then bin
/// every pixel of the frame into them.
///
/// The clear dispatch is always issued before the accumulate dispatch; if
/// the clear fails, accumulation is not attempted. The clear grid is at
/// least 1x1x1 so an empty frame still zeroes the buckets.
pub fn dispatch<R: ComputeKernelRunner>(
    runner: &mut R,
    sampling: &R::Texture,
    buckets: &R::Buffer,
    frame_width: u32,
    frame_height: u32,
) -> EffectResult<ThreadGroups> {
    let groups = ThreadGroups::for_frame(frame_width, frame_height);

    runner.bind_texture(Kernel::Accumulate, kernel_names::INPUT_TEXTURE, sampling);
    runner.bind_buffer(Kernel::Accumulate, kernel_names::HISTOGRAM_BUFFER, buckets);
    runner.bind_buffer(Kernel::Clear, kernel_names::HISTOGRAM_BUFFER, buckets);

    runner.dispatch(Kernel::Clear, groups.x.max(1), groups.y.max(1), groups.z.max(1))?;
    runner.dispatch(Kernel::Accumulate, groups.x, groups.y, groups.z)?;

    debug!(
        groups_x = groups.x,
        groups_y = groups.y,
        "Dispatched histogram kernels"
    );

    Ok(groups)
}
