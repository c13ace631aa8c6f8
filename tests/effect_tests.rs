// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end tests driving the effect on the CPU backend

use histogram_overlay::histogram::{SamplingRefresh, ThreadGroups};
use histogram_overlay::{Bucket, CpuBackend, DisplayConfig, HistogramEffect, ZeroPeakPolicy};
use image::{Rgba, RgbaImage};

fn effect() -> HistogramEffect<CpuBackend> {
    HistogramEffect::new(CpuBackend::new(), DisplayConfig::default())
}

fn channel_totals(buckets: &[Bucket]) -> (i64, i64, i64) {
    buckets.iter().fold((0, 0, 0), |(r, g, b), bucket| {
        (r + bucket.r as i64, g + bucket.g as i64, b + bucket.b as i64)
    })
}

#[test]
fn test_black_frame_fills_only_bucket_zero() {
    let mut effect = effect();
    let source = RgbaImage::from_pixel(13, 7, Rgba([0, 0, 0, 255]));
    let mut dest = RgbaImage::new(13, 7);

    let report = effect.on_frame(&source, &mut dest).unwrap();
    assert_eq!(report.groups, ThreadGroups { x: 2, y: 1, z: 1 });

    let buckets = effect.last_buckets().unwrap();
    assert_eq!(buckets[0], Bucket::new(91, 91, 91));
    assert!(buckets[1..].iter().all(|b| *b == Bucket::default()));

    // Nothing in the scanned range, so the base scalar is used as is
    assert!(report.peaks.is_empty());
    assert_eq!(report.scalar.0, [1.0, 1.0, 1.0, 1.0]);

    // Column 0 shows bucket 0 at minimal fill, column 1 shows an empty bucket
    assert_eq!(dest.get_pixel(0, 3).0, [64, 64, 64, 255]);
    assert_eq!(dest.get_pixel(1, 3).0, [0, 0, 0, 255]);
}

#[test]
fn test_single_level_peak_reaches_full_height() {
    let mut effect = effect();
    let source = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
    let mut dest = RgbaImage::new(16, 16);

    let report = effect.on_frame(&source, &mut dest).unwrap();

    assert_eq!(report.peaks.max_r, 256);
    assert_eq!(report.peaks.max_total, 256);
    assert_eq!(report.scalar.0[0], 1.0 / 256.0);

    // Bucket 128 maps to column 8; its bar covers the whole column
    for y in 0..16 {
        assert!(dest.get_pixel(8, y).0[0] > 128, "row {} not lifted", y);
    }
    assert_eq!(dest.get_pixel(0, 0), source.get_pixel(0, 0));
    assert_eq!(dest.get_pixel(15, 15), source.get_pixel(15, 15));
}

#[test]
fn test_each_frame_starts_from_cleared_buckets() {
    let mut effect = effect();
    let mut dest = RgbaImage::new(10, 10);

    let first = RgbaImage::from_pixel(10, 10, Rgba([200, 10, 50, 255]));
    effect.on_frame(&first, &mut dest).unwrap();

    let second = RgbaImage::from_pixel(10, 10, Rgba([20, 30, 40, 255]));
    effect.on_frame(&second, &mut dest).unwrap();

    let buckets = effect.last_buckets().unwrap();
    assert_eq!(channel_totals(buckets), (100, 100, 100));
    assert_eq!(buckets[200].r, 0);
    assert_eq!(buckets[20].r, 100);
}

#[test]
fn test_empty_frame_drops_previous_histogram() {
    let mut effect = effect();

    let gray = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
    let mut gray_dest = RgbaImage::new(16, 16);
    let report = effect.on_frame(&gray, &mut gray_dest).unwrap();
    assert_eq!(report.peaks.max_total, 256);

    let empty = RgbaImage::new(0, 16);
    let mut empty_dest = RgbaImage::new(0, 16);
    let report = effect.on_frame(&empty, &mut empty_dest).unwrap();

    assert_eq!(report.groups, ThreadGroups { x: 0, y: 2, z: 1 });
    assert_eq!(report.peaks.max_total, 0);
    let buckets = effect.last_buckets().unwrap();
    assert!(buckets.iter().all(|b| *b == Bucket::default()));
}

#[test]
fn test_resize_recreates_sampling_texture() {
    let mut effect = effect();

    let small = RgbaImage::new(16, 16);
    let mut small_dest = RgbaImage::new(16, 16);
    let report = effect.on_frame(&small, &mut small_dest).unwrap();
    assert_eq!(report.sampling, SamplingRefresh::Allocated);

    let report = effect.on_frame(&small, &mut small_dest).unwrap();
    assert_eq!(report.sampling, SamplingRefresh::Reused);

    let wide = RgbaImage::from_pixel(32, 8, Rgba([1, 2, 3, 255]));
    let mut wide_dest = RgbaImage::new(32, 8);
    let report = effect.on_frame(&wide, &mut wide_dest).unwrap();
    assert!(matches!(report.sampling, SamplingRefresh::RecreatedResized { .. }));
    assert_eq!(report.groups, ThreadGroups { x: 4, y: 1, z: 1 });

    let stats = effect.backend().stats();
    assert_eq!(stats.texture_allocations, 2);
    assert_eq!(stats.texture_releases, 1);
    assert_eq!(effect.backend().live_textures(), 1);

    let buckets = effect.last_buckets().unwrap();
    assert_eq!(channel_totals(buckets), (256, 256, 256));
}

#[test]
fn test_saturated_frame_gives_finite_scalar() {
    let mut effect = effect();
    let source = RgbaImage::from_pixel(9, 9, Rgba([255, 255, 255, 255]));
    let mut dest = RgbaImage::new(9, 9);

    let report = effect.on_frame(&source, &mut dest).unwrap();
    assert!(report.peaks.is_empty());
    assert!(report.scalar.is_finite());
}

#[test]
fn test_skip_frame_policy_leaves_image_untouched() {
    let mut config = DisplayConfig::default();
    config.set_zero_peak_policy(ZeroPeakPolicy::SkipFrame);
    let mut effect = HistogramEffect::new(CpuBackend::new(), config);

    let source = RgbaImage::from_pixel(12, 6, Rgba([0, 0, 0, 255]));
    let mut dest = RgbaImage::new(12, 6);

    let report = effect.on_frame(&source, &mut dest).unwrap();
    assert_eq!(report.scalar.0, [0.0; 4]);
    assert_eq!(dest, source);
}

#[test]
fn test_zero_red_scaler_hides_red_bars() {
    let mut effect = effect();
    effect.set_red_scaler(0.0);

    let source = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
    let mut dest = RgbaImage::new(16, 16);
    let report = effect.on_frame(&source, &mut dest).unwrap();

    assert_eq!(report.scalar.0[0], 0.0);
    let pixel = dest.get_pixel(8, 15).0;
    assert_eq!(pixel[0], 128);
    assert!(pixel[1] > 128);
}

#[test]
fn test_zero_fade_size_fills_bars_solid() {
    let mut effect = effect();
    effect.set_fade_size(0.0);

    let source = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
    let mut dest = RgbaImage::new(16, 16);
    effect.on_frame(&source, &mut dest).unwrap();

    assert_eq!(dest.get_pixel(8, 15).0, [255, 255, 255, 255]);
}

#[test]
fn test_teardown_twice_is_harmless() {
    let mut effect = effect();
    let source = RgbaImage::new(8, 8);
    let mut dest = RgbaImage::new(8, 8);
    effect.on_frame(&source, &mut dest).unwrap();

    effect.shutdown();
    effect.shutdown();
    assert_eq!(effect.backend().live_buffers(), 0);
    assert_eq!(effect.backend().live_textures(), 0);

    // Resources come back on the next frame
    effect.on_frame(&source, &mut dest).unwrap();
    assert_eq!(effect.backend().live_buffers(), 1);
    assert_eq!(effect.backend().live_textures(), 1);
}

#[test]
fn test_failed_buffer_allocation_is_reported() {
    let mut effect = effect();
    effect.backend_mut().fail_next_allocation();

    let err = effect.init().unwrap_err();
    assert!(err.is_fatal());

    // A later attempt succeeds
    effect.init().unwrap();
}
