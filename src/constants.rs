// SPDX-License-Identifier: GPL-3.0-only

//! Shared constants for the histogram kernels and overlay material

/// Number of intensity levels per channel
pub const BUCKET_COUNT: usize = 256;

/// Bytes per bucket: four 4-byte integers (r, g, b, unused)
pub const BUCKET_STRIDE: usize = 4 * std::mem::size_of::<i32>();

/// Edge length of a compute thread tile (8x8 threads per workgroup)
pub const WORKGROUP_SIZE: u32 = 8;

/// First bucket included in the peak search (bucket 0 is clipped black)
pub const PEAK_SCAN_FIRST: usize = 1;

/// Last bucket included in the peak search (bucket 255 is clipped white)
pub const PEAK_SCAN_LAST: usize = BUCKET_COUNT - 2;

/// Compute kernel bound names
pub mod kernel_names {
    /// Read-only sampling image
    pub const INPUT_TEXTURE: &str = "InputTexture";
    /// Read-write structured buffer of 256 x 4 integers
    pub const HISTOGRAM_BUFFER: &str = "HistogramBuffer";
}

/// Overlay material bound names
pub mod material_names {
    /// Structured bucket buffer
    pub const HISTOGRAM_VALUES: &str = "_HistogramValues";
    /// Per-channel normalization vector
    pub const HISTOGRAM_SCALAR: &str = "_HistogramScalar";
    /// Overlay fade size
    pub const SIZE: &str = "_Size";
    /// Minimum fill threshold
    pub const MINIMUM: &str = "_Minimum";
}
