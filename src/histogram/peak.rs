// SPDX-License-Identifier: GPL-3.0-only

//! Peak search over the read-back buckets and the derived display scalar

use super::buckets::{Bucket, BucketArray};
use crate::backend::RenderBackend;
use crate::config::{DisplayConfig, ZeroPeakPolicy};
use crate::constants::{PEAK_SCAN_FIRST, PEAK_SCAN_LAST};
use crate::errors::EffectResult;
use tracing::{debug, warn};

/// Per-channel and global maxima over buckets 1..=254
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakReduction {
    pub max_r: i32,
    pub max_g: i32,
    pub max_b: i32,
    pub max_total: i32,
}

impl PeakReduction {
    /// Scan `buckets`, skipping the two saturation buckets at either end.
    /// The unused channel does not take part.
    pub fn scan(buckets: &[Bucket]) -> Self {
        let last = PEAK_SCAN_LAST.min(buckets.len().saturating_sub(1));
        let peak = buckets
            .get(PEAK_SCAN_FIRST..=last)
            .unwrap_or_default()
            .iter()
            .fold(Bucket::default(), |acc, bucket| acc.max(*bucket));

        Self {
            max_r: peak.r,
            max_g: peak.g,
            max_b: peak.b,
            max_total: peak.r.max(peak.g).max(peak.b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_total <= 0
    }
}

/// Per-channel multiplier making the tallest scanned bar reach full height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationScalar(pub [f32; 4]);

impl NormalizationScalar {
    /// `base / max_total`, with `policy` deciding the empty-histogram case
    pub fn from_peaks(peaks: &PeakReduction, base: [f32; 4], policy: ZeroPeakPolicy) -> Self {
        if peaks.is_empty() {
            return match policy {
                ZeroPeakPolicy::ClampToOne => Self(base),
                ZeroPeakPolicy::SkipFrame => Self([0.0; 4]),
            };
        }

        let inverse = 1.0 / peaks.max_total as f32;
        Self(base.map(|component| component * inverse))
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

/// Result of one readback + reduction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedScalar {
    pub peaks: PeakReduction,
    pub scalar: NormalizationScalar,
}

/// Derive the display scalar from an already read-back mirror
pub fn derive_scalar(mirror: &BucketArray, config: &DisplayConfig) -> DerivedScalar {
    let peaks = PeakReduction::scan(mirror);
    let policy = config.zero_peak_policy();
    let scalar = NormalizationScalar::from_peaks(&peaks, config.base_scalar(), policy);

    if peaks.is_empty() {
        debug!(?policy, "Scanned histogram is empty, applying zero-peak policy");
    }

    DerivedScalar { peaks, scalar }
}

/// Blocking readback of `buffer` into `mirror`, then [`derive_scalar`]
pub fn read_and_derive<B: RenderBackend>(
    backend: &mut B,
    buffer: &B::Buffer,
    mirror: &mut BucketArray,
    config: &DisplayConfig,
) -> EffectResult<DerivedScalar> {
    backend.read_buckets(buffer, mirror)?;
    let derived = derive_scalar(mirror, config);

    if !derived.scalar.is_finite() {
        warn!(scalar = ?derived.scalar.0, "Base scalar produced a non-finite display scalar");
    }

    debug!(
        max_r = derived.peaks.max_r,
        max_g = derived.peaks.max_g,
        max_b = derived.peaks.max_b,
        max_total = derived.peaks.max_total,
        "Histogram peak reduction complete"
    );

    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BUCKET_COUNT;

    fn empty() -> BucketArray {
        [Bucket::default(); BUCKET_COUNT]
    }

    #[test]
    fn test_single_peak_at_128() {
        let mut buckets = empty();
        buckets[128] = Bucket::new(40, 0, 0);

        let peaks = PeakReduction::scan(&buckets);
        assert_eq!(peaks.max_total, 40);

        let scalar = NormalizationScalar::from_peaks(
            &peaks,
            [2.0, 4.0, 8.0, 1.0],
            ZeroPeakPolicy::ClampToOne,
        );
        assert_eq!(scalar.0, [2.0 / 40.0, 4.0 / 40.0, 8.0 / 40.0, 1.0 / 40.0]);
    }

    #[test]
    fn test_saturation_buckets_excluded() {
        let mut buckets = empty();
        buckets[0] = Bucket::new(1_000_000, 1_000_000, 1_000_000);
        buckets[255] = Bucket::new(999, 999, 999);
        buckets[1] = Bucket::new(3, 0, 0);
        buckets[254] = Bucket::new(0, 0, 5);

        let peaks = PeakReduction::scan(&buckets);
        assert_eq!(
            peaks,
            PeakReduction {
                max_r: 3,
                max_g: 0,
                max_b: 5,
                max_total: 5,
            }
        );
    }

    #[test]
    fn test_unused_channel_ignored() {
        let mut buckets = empty();
        buckets[10] = Bucket {
            r: 1,
            g: 2,
            b: 3,
            unused: 500,
        };
        assert_eq!(PeakReduction::scan(&buckets).max_total, 3);
    }

    #[test]
    fn test_channels_peak_in_different_buckets() {
        let mut buckets = empty();
        buckets[20] = Bucket::new(7, 1, 0);
        buckets[200] = Bucket::new(0, 9, 2);
        let peaks = PeakReduction::scan(&buckets);
        assert_eq!((peaks.max_r, peaks.max_g, peaks.max_b), (7, 9, 2));
        assert_eq!(peaks.max_total, 9);
    }

    #[test]
    fn test_zero_peak_clamp_to_one() {
        let mut buckets = empty();
        buckets[0] = Bucket::new(64, 64, 64);
        let config = DisplayConfig::default();

        let derived = derive_scalar(&buckets, &config);
        assert!(derived.peaks.is_empty());
        assert!(derived.scalar.is_finite());
        assert_eq!(derived.scalar.0, config.base_scalar());
    }

    #[test]
    fn test_zero_peak_skip_frame() {
        let mut config = DisplayConfig::default();
        config.set_zero_peak_policy(ZeroPeakPolicy::SkipFrame);

        let derived = derive_scalar(&empty(), &config);
        assert_eq!(derived.scalar.0, [0.0; 4]);
    }

    #[test]
    fn test_short_slice_does_not_panic() {
        assert!(PeakReduction::scan(&[]).is_empty());
        assert!(PeakReduction::scan(&[Bucket::new(9, 9, 9)]).is_empty());
        assert_eq!(
            PeakReduction::scan(&[Bucket::default(), Bucket::new(4, 0, 0)]).max_total,
            4
        );
    }
}
