// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use histogram_overlay::Bucket;
use histogram_overlay::constants::{
    BUCKET_COUNT, BUCKET_STRIDE, PEAK_SCAN_FIRST, PEAK_SCAN_LAST, WORKGROUP_SIZE,
};

#[test]
fn test_bucket_stride_matches_layout() {
    assert_eq!(std::mem::size_of::<Bucket>(), BUCKET_STRIDE);
    assert_eq!(BUCKET_COUNT * BUCKET_STRIDE, 4096);
}

#[test]
fn test_peak_scan_skips_saturation_buckets() {
    assert_eq!(PEAK_SCAN_FIRST, 1);
    assert_eq!(PEAK_SCAN_LAST, BUCKET_COUNT - 2);
}

#[test]
fn test_workgroup_matches_kernel() {
    assert_eq!(WORKGROUP_SIZE, 8);
    assert!(
        histogram_overlay::shaders::HISTOGRAM_COMPUTE_SHADER.contains("@workgroup_size(8, 8, 1)")
    );
}
