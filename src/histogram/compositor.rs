// SPDX-License-Identifier: GPL-3.0-only

//! Overlay material binding and the final full-screen draw

use super::peak::NormalizationScalar;
use crate::backend::RenderBackend;
use crate::config::DisplayConfig;
use crate::constants::material_names;
use crate::errors::{EffectError, EffectResult};

/// Overlay material uniform block
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayParams {
    /// `_HistogramScalar`
    pub scalar: [f32; 4],
    /// `_Size`
    pub size: f32,
    /// `_Minimum`
    pub minimum: f32,
    pub _padding: [f32; 2],
}

/// Name-addressed inputs of the overlay material.
///
/// `_HistogramValues` is a buffer and is passed to the draw call directly.
#[derive(Debug, Clone, Default)]
pub struct OverlayMaterial {
    params: OverlayParams,
}

impl OverlayMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vector(&mut self, name: &str, value: [f32; 4]) -> EffectResult<()> {
        match name {
            material_names::HISTOGRAM_SCALAR => {
                self.params.scalar = value;
                Ok(())
            }
            _ => Err(unknown_property(name)),
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> EffectResult<()> {
        match name {
            material_names::SIZE => self.params.size = value,
            material_names::MINIMUM => self.params.minimum = value,
            _ => return Err(unknown_property(name)),
        }
        Ok(())
    }

    pub fn params(&self) -> &OverlayParams {
        &self.params
    }
}

fn unknown_property(name: &str) -> EffectError {
    EffectError::UnboundResource {
        kernel: "overlay",
        name: name.to_string(),
    }
}

/// Bind scalar and display settings to `material`, then draw `source` with
/// the overlay into `dest`.
pub fn composite<B: RenderBackend>(
    backend: &mut B,
    material: &mut OverlayMaterial,
    source: &B::Frame,
    dest: &mut B::Frame,
    buckets: &B::Buffer,
    scalar: NormalizationScalar,
    config: &DisplayConfig,
) -> EffectResult<()> {
    material.set_vector(material_names::HISTOGRAM_SCALAR, scalar.0)?;
    material.set_float(material_names::SIZE, config.fade_size())?;
    material.set_float(material_names::MINIMUM, config.minimal_fill())?;

    backend.draw_overlay(source, dest, buckets, material.params())
}

/// Fill factor of one channel at normalized height `height` (0 = bottom).
///
/// `None` when the point is above the bar. The WGSL overlay shader applies
/// the same rule.
pub fn bar_fill(bar: f32, height: f32, params: &OverlayParams) -> Option<f32> {
    if bar <= height {
        return None;
    }
    if params.size <= 0.0 {
        return Some(1.0);
    }
    let depth = bar - height;
    Some((1.0 - depth / params.size).max(params.minimum).clamp(0.0, 1.0))
}
