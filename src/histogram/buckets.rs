// SPDX-License-Identifier: GPL-3.0-only

//! Bucket buffer ownership: the GPU counter array and its CPU mirror

use crate::backend::RenderBackend;
use crate::constants::{BUCKET_COUNT, BUCKET_STRIDE};
use crate::errors::EffectResult;
use tracing::debug;

/// Counters for one intensity level
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Bucket {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    /// Padding channel, never written by the kernels
    pub unused: i32,
}

impl Bucket {
    pub const fn new(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b, unused: 0 }
    }

    /// Elementwise max of the color channels; `unused` stays 0
    pub fn max(self, other: Bucket) -> Bucket {
        Bucket::new(
            self.r.max(other.r),
            self.g.max(other.g),
            self.b.max(other.b),
        )
    }
}

/// CPU side copy of the bucket buffer
pub type BucketArray = [Bucket; BUCKET_COUNT];

/// Lazily allocated bucket buffer and mirror.
///
/// Both keep their length of [`BUCKET_COUNT`] for the lifetime of the owner.
pub struct BucketBuffers<Buf> {
    buffer: Option<Buf>,
    mirror: Option<Box<BucketArray>>,
}

impl<Buf> Default for BucketBuffers<Buf> {
    fn default() -> Self {
        Self {
            buffer: None,
            mirror: None,
        }
    }
}

impl<Buf> BucketBuffers<Buf> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate whichever of the buffer and mirror is missing.
    ///
    /// Allocation failures from the backend propagate unchanged.
    pub fn ensure_allocated<B>(&mut self, backend: &mut B) -> EffectResult<(&Buf, &mut BucketArray)>
    where
        B: RenderBackend<Buffer = Buf>,
    {
        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => {
                let buffer = backend.create_bucket_buffer(BUCKET_COUNT, BUCKET_STRIDE)?;
                debug!(
                    count = BUCKET_COUNT,
                    stride = BUCKET_STRIDE,
                    "Allocated histogram bucket buffer"
                );
                buffer
            }
        };
        let buffer = self.buffer.insert(buffer);

        let mirror = self
            .mirror
            .get_or_insert_with(|| Box::new([Bucket::default(); BUCKET_COUNT]));

        Ok((&*buffer, &mut **mirror))
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Last read-back bucket values, if any frame has run
    pub fn mirror(&self) -> Option<&BucketArray> {
        self.mirror.as_deref()
    }

    /// Release the GPU buffer. Returns false if there was nothing to release.
    pub fn release<B>(&mut self, backend: &mut B) -> bool
    where
        B: RenderBackend<Buffer = Buf>,
    {
        match self.buffer.take() {
            Some(buffer) => {
                backend.release_buffer(buffer);
                debug!("Released histogram bucket buffer");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    #[test]
    fn test_bucket_layout_is_int4() {
        assert_eq!(std::mem::size_of::<Bucket>(), BUCKET_STRIDE);
    }

    #[test]
    fn test_bucket_max_is_elementwise() {
        let a = Bucket::new(5, 1, 9);
        let b = Bucket::new(2, 7, 9);
        assert_eq!(a.max(b), Bucket::new(5, 7, 9));
    }

    #[test]
    fn test_bucket_max_ignores_unused() {
        let a = Bucket {
            unused: 42,
            ..Bucket::new(1, 2, 3)
        };
        assert_eq!(a.max(Bucket::default()).unused, 0);
    }

    #[test]
    fn test_ensure_allocated_is_idempotent() {
        let mut backend = CpuBackend::new();
        let mut buckets = BucketBuffers::new();

        let first = *buckets.ensure_allocated(&mut backend).unwrap().0;
        let second = *buckets.ensure_allocated(&mut backend).unwrap().0;

        assert_eq!(first, second);
        assert_eq!(backend.stats().buffer_allocations, 1);
        assert_eq!(buckets.mirror().map(|m| m.len()), Some(BUCKET_COUNT));
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let mut backend = CpuBackend::new();
        backend.fail_next_allocation();
        let mut buckets = BucketBuffers::new();

        let err = buckets.ensure_allocated(&mut backend).unwrap_err();
        assert!(err.is_fatal());
        assert!(!buckets.is_allocated());

        // Next frame gets a fresh attempt
        assert!(buckets.ensure_allocated(&mut backend).is_ok());
    }

    #[test]
    fn test_release_twice_is_noop() {
        let mut backend = CpuBackend::new();
        let mut buckets = BucketBuffers::new();
        buckets.ensure_allocated(&mut backend).unwrap();

        assert!(buckets.release(&mut backend));
        assert!(!buckets.release(&mut backend));
        assert_eq!(backend.stats().buffer_releases, 1);
    }
}
