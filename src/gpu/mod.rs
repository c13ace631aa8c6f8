// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities
//!
//! Creates the wgpu device and queue used by [`crate::backend::WgpuBackend`].

use crate::errors::{EffectError, EffectResult};
use std::sync::Arc;
use tracing::{debug, info};

pub use wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Whether the adapter is a software rasterizer
    pub software: bool,
}

/// Create a wgpu device and queue for compute and overlay work.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
pub async fn create_compute_device(
    label: &str,
) -> EffectResult<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo)> {
    info!(label = label, "Creating GPU device");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| EffectError::DeviceUnavailable(format!("no suitable adapter: {}", e)))?;

    let adapter_info = adapter.get_info();
    let adapter_limits = adapter.limits();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected"
    );

    debug!(
        max_compute_workgroups_per_dimension = adapter_limits.max_compute_workgroups_per_dimension,
        "Adapter compute limits"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter_limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| EffectError::DeviceUnavailable(format!("device request failed: {}", e)))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        software: adapter_info.device_type == wgpu::DeviceType::Cpu,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}
