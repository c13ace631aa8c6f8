// SPDX-License-Identifier: GPL-3.0-only

//! Sampling texture lifecycle
//!
//! The compute kernels never read the host's frame directly. Each frame is
//! copied into a kernel-writable texture owned here, which is recreated
//! whenever the host frame changes size or the texture loses its storage.

use crate::backend::{Extent, RenderBackend};
use crate::errors::EffectResult;
use tracing::debug;

/// What `ensure_ready` had to do before refreshing the texture contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRefresh {
    /// First allocation
    Allocated,
    /// Old texture had lost its backing storage
    RecreatedInvalid,
    /// Old texture was released because the frame size changed
    RecreatedResized { from: Extent, to: Extent },
    /// Existing texture reused, contents copied in place
    Reused,
}

impl SamplingRefresh {
    pub fn reallocated(&self) -> bool {
        !matches!(self, SamplingRefresh::Reused)
    }
}

/// Owner of the sampling texture
pub struct SamplingBuffer<T> {
    texture: Option<T>,
}

impl<T> Default for SamplingBuffer<T> {
    fn default() -> Self {
        Self { texture: None }
    }
}

impl<T> SamplingBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the texture valid, sized like `source`, and filled with its pixels.
    ///
    /// Any previous handle is taken out of `self` before a replacement is
    /// allocated, so a failed allocation leaves no handle behind.
    pub fn ensure_ready<B>(
        &mut self,
        backend: &mut B,
        source: &B::Frame,
    ) -> EffectResult<(&T, SamplingRefresh)>
    where
        B: RenderBackend<Texture = T>,
    {
        let wanted = backend.frame_extent(source);

        let (texture, refresh) = match self.texture.take() {
            None => (backend.create_sampling_texture(source)?, SamplingRefresh::Allocated),
            Some(stale) if !backend.is_created(&stale) => {
                debug!("Sampling texture lost its storage, recreating");
                backend.release_texture(stale);
                (
                    backend.create_sampling_texture(source)?,
                    SamplingRefresh::RecreatedInvalid,
                )
            }
            Some(texture) if !backend.texture_extent(&texture).same_size(&wanted) => {
                let from = backend.texture_extent(&texture);
                debug!(
                    old_width = from.width,
                    old_height = from.height,
                    width = wanted.width,
                    height = wanted.height,
                    "Frame resized, reallocating sampling texture"
                );
                backend.release_texture(texture);
                (
                    backend.create_sampling_texture(source)?,
                    SamplingRefresh::RecreatedResized { from, to: wanted },
                )
            }
            Some(texture) => (texture, SamplingRefresh::Reused),
        };

        let texture = self.texture.insert(texture);
        backend.blit_to_texture(source, texture)?;

        Ok((&*texture, refresh))
    }

    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }

    /// Release the texture if one is held
    pub fn release<B>(&mut self, backend: &mut B) -> bool
    where
        B: RenderBackend<Texture = T>,
    {
        match self.texture.take() {
            Some(texture) => {
                backend.release_texture(texture);
                debug!("Released sampling texture");
                true
            }
            None => false,
        }
    }
}
