// SPDX-License-Identifier: GPL-3.0-only

//! wgpu backend
//!
//! Frames are `wgpu::Texture`s supplied by the host. Source frames need
//! `TEXTURE_BINDING | COPY_SRC`, destination frames `RENDER_ATTACHMENT`.
//! Each dispatch and draw is its own queue submission, so submission order
//! gives the clear -> accumulate -> readback -> draw ordering.

use super::{ComputeKernelRunner, Extent, Kernel, RenderBackend};
use crate::constants::{BUCKET_STRIDE, kernel_names};
use crate::errors::{EffectError, EffectResult};
use crate::gpu::{self, GpuDeviceInfo, wgpu};
use crate::histogram::{Bucket, OverlayParams};
use crate::shaders::{
    HISTOGRAM_COMPUTE_SHADER, HISTOGRAM_OVERLAY_SHADER, padded_bytes_per_row, read_buffer_async,
};
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Kernel-writable copy of the current frame
pub struct GpuTexture {
    texture: Arc<wgpu::Texture>,
}

/// Structured bucket buffer
pub struct GpuBuffer {
    buffer: Arc<wgpu::Buffer>,
}

/// GPU implementation of [`RenderBackend`]
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: GpuDeviceInfo,
    accumulate_pipeline: wgpu::ComputePipeline,
    accumulate_layout: wgpu::BindGroupLayout,
    clear_pipeline: wgpu::ComputePipeline,
    clear_layout: wgpu::BindGroupLayout,
    overlay_shader: wgpu::ShaderModule,
    overlay_layout: wgpu::BindGroupLayout,
    overlay_pipeline_layout: wgpu::PipelineLayout,
    // One overlay pipeline per destination format
    overlay_pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    overlay_uniform: wgpu::Buffer,
    staging_buffer: Option<wgpu::Buffer>,
    bound_textures: HashMap<Kernel, Arc<wgpu::Texture>>,
    bound_buffers: HashMap<Kernel, Arc<wgpu::Buffer>>,
    device_lost: Arc<AtomicBool>,
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn extent3d(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: extent.depth.max(1),
    }
}

impl WgpuBackend {
    /// Create a device and build the kernel and overlay pipelines
    pub async fn new() -> EffectResult<Self> {
        info!("Initializing GPU histogram backend");

        let (device, queue, gpu_info) = gpu::create_compute_device("histogram_overlay_gpu").await?;

        info!(
            adapter_name = %gpu_info.adapter_name,
            adapter_backend = ?gpu_info.backend,
            software = gpu_info.software,
            "GPU device created for histogram overlay"
        );

        let device_lost = Arc::new(AtomicBool::new(false));
        {
            let device_lost = device_lost.clone();
            device.set_device_lost_callback(move |reason, message| {
                warn!(?reason, %message, "GPU device lost");
                device_lost.store(true, Ordering::SeqCst);
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("histogram_compute_shader"),
            source: wgpu::ShaderSource::Wgsl(HISTOGRAM_COMPUTE_SHADER.into()),
        });

        // Accumulate: sampling texture + bucket buffer
        let accumulate_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("histogram_accumulate_bind_group_layout"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
            ],
        });

        // Clear: bucket buffer only
        let clear_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("histogram_clear_bind_group_layout"),
            entries: &[storage_entry(1, wgpu::ShaderStages::COMPUTE, false)],
        });

        let accumulate_pipeline = Self::create_compute_pipeline(
            &device,
            &compute_shader,
            &accumulate_layout,
            Kernel::Accumulate,
        );
        let clear_pipeline =
            Self::create_compute_pipeline(&device, &compute_shader, &clear_layout, Kernel::Clear);

        let overlay_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("histogram_overlay_shader"),
            source: wgpu::ShaderSource::Wgsl(HISTOGRAM_OVERLAY_SHADER.into()),
        });

        let overlay_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("histogram_overlay_bind_group_layout"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let overlay_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("histogram_overlay_pipeline_layout"),
                bind_group_layouts: &[&overlay_layout],
                push_constant_ranges: &[],
            });

        let overlay_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histogram_overlay_uniform_buffer"),
            size: std::mem::size_of::<OverlayParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(EffectError::Shader(err.to_string()));
        }

        Ok(Self {
            device,
            queue,
            info: gpu_info,
            accumulate_pipeline,
            accumulate_layout,
            clear_pipeline,
            clear_layout,
            overlay_shader,
            overlay_layout,
            overlay_pipeline_layout,
            overlay_pipelines: HashMap::new(),
            overlay_uniform,
            staging_buffer: None,
            bound_textures: HashMap::new(),
            bound_buffers: HashMap::new(),
            device_lost,
        })
    }

    fn create_compute_pipeline(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
        kernel: Kernel,
    ) -> wgpu::ComputePipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("histogram_{}_pipeline_layout", kernel.entry_point())),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("histogram_{}_pipeline", kernel.entry_point())),
            layout: Some(&pipeline_layout),
            module,
            entry_point: Some(kernel.entry_point()),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    pub fn device_info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    /// Run `create` inside out-of-memory and validation error scopes
    fn scoped<T>(
        &self,
        resource: &'static str,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> EffectResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let value = create(&self.device);

        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        let validation = pollster::block_on(self.device.pop_error_scope());

        match out_of_memory.or(validation) {
            Some(err) => Err(EffectError::allocation(resource, err.to_string())),
            None => Ok(value),
        }
    }

    fn overlay_pipeline(&mut self, format: wgpu::TextureFormat) -> &wgpu::RenderPipeline {
        let device = &self.device;
        let shader = &self.overlay_shader;
        let layout = &self.overlay_pipeline_layout;

        self.overlay_pipelines.entry(format).or_insert_with(|| {
            debug!(?format, "Creating overlay pipeline");
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("histogram_overlay_pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            })
        })
    }

    fn staging_buffer(&mut self, size: u64) -> EffectResult<wgpu::Buffer> {
        if let Some(buffer) = &self.staging_buffer {
            if buffer.size() == size {
                return Ok(buffer.clone());
            }
        }

        let buffer = self.scoped("bucket staging buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("histogram_staging_buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        })?;
        self.staging_buffer = Some(buffer.clone());
        Ok(buffer)
    }

    /// Upload an RGBA image as a frame usable as both source and destination
    pub fn upload_frame(&self, image: &RgbaImage) -> EffectResult<wgpu::Texture> {
        let (width, height) = image.dimensions();
        let size = extent3d(Extent::new(width, height, 1));

        let texture = self.scoped("frame texture", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("histogram_frame_texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        })?;

        self.queue.write_texture(
            texture.as_image_copy(),
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        Ok(texture)
    }

    /// Read an Rgba8Unorm frame back into CPU memory
    pub fn download_frame(&mut self, texture: &wgpu::Texture) -> EffectResult<RgbaImage> {
        let (width, height) = (texture.width(), texture.height());
        let padded_row = padded_bytes_per_row(width);
        let size = padded_row as u64 * height as u64;

        let readback = self.scoped("frame readback buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("histogram_frame_readback_buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        })?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histogram_frame_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            extent3d(Extent::new(width, height, 1)),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let padded = pollster::block_on(read_buffer_async(&self.device, &readback))?;

        // Strip row padding
        let row_bytes = (width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in padded.chunks(padded_row as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..row_bytes]);
        }

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| EffectError::Readback("frame readback was truncated".to_string()))
    }

    fn submit_compute(
        &self,
        kernel: Kernel,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        groups: [u32; 3],
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histogram_compute_encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.entry_point()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl ComputeKernelRunner for WgpuBackend {
    type Texture = GpuTexture;
    type Buffer = GpuBuffer;

    fn bind_texture(&mut self, kernel: Kernel, name: &str, texture: &GpuTexture) {
        if name == kernel_names::INPUT_TEXTURE {
            self.bound_textures.insert(kernel, texture.texture.clone());
        } else {
            warn!(kernel = kernel.entry_point(), name, "Ignoring unrecognized texture binding");
        }
    }

    fn bind_buffer(&mut self, kernel: Kernel, name: &str, buffer: &GpuBuffer) {
        if name == kernel_names::HISTOGRAM_BUFFER {
            self.bound_buffers.insert(kernel, buffer.buffer.clone());
        } else {
            warn!(kernel = kernel.entry_point(), name, "Ignoring unrecognized buffer binding");
        }
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> EffectResult<()> {
        let unbound = |name: &str| EffectError::UnboundResource {
            kernel: kernel.entry_point(),
            name: name.to_string(),
        };

        let buffer = self
            .bound_buffers
            .get(&kernel)
            .ok_or_else(|| unbound(kernel_names::HISTOGRAM_BUFFER))?;

        match kernel {
            Kernel::Clear => {
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("histogram_clear_bind_group"),
                    layout: &self.clear_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                self.submit_compute(
                    kernel,
                    &self.clear_pipeline,
                    &bind_group,
                    [groups_x, groups_y, groups_z],
                );
            }
            Kernel::Accumulate => {
                let texture = self
                    .bound_textures
                    .get(&kernel)
                    .ok_or_else(|| unbound(kernel_names::INPUT_TEXTURE))?;
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("histogram_accumulate_bind_group"),
                    layout: &self.accumulate_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: buffer.as_entire_binding(),
                        },
                    ],
                });
                self.submit_compute(
                    kernel,
                    &self.accumulate_pipeline,
                    &bind_group,
                    [groups_x, groups_y, groups_z],
                );
            }
        }

        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    type Frame = wgpu::Texture;

    fn frame_extent(&self, frame: &wgpu::Texture) -> Extent {
        Extent::new(frame.width(), frame.height(), frame.depth_or_array_layers())
    }

    fn create_sampling_texture(&mut self, like: &wgpu::Texture) -> EffectResult<GpuTexture> {
        let format = like.format();
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if format
            .guaranteed_format_features(self.device.features())
            .allowed_usages
            .contains(wgpu::TextureUsages::STORAGE_BINDING)
        {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }

        let size = extent3d(self.frame_extent(like));
        debug!(
            width = size.width,
            height = size.height,
            ?format,
            "Allocating sampling texture"
        );

        let texture = self.scoped("sampling texture", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("histogram_sampling_texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        })?;

        Ok(GpuTexture {
            texture: Arc::new(texture),
        })
    }

    fn texture_extent(&self, texture: &GpuTexture) -> Extent {
        self.frame_extent(&texture.texture)
    }

    // Contents die with the device
    fn is_created(&self, _texture: &GpuTexture) -> bool {
        !self.device_lost.load(Ordering::SeqCst)
    }

    fn release_texture(&mut self, texture: GpuTexture) {
        self.bound_textures
            .retain(|_, bound| !Arc::ptr_eq(bound, &texture.texture));
        texture.texture.destroy();
    }

    fn blit_to_texture(&mut self, source: &wgpu::Texture, target: &GpuTexture) -> EffectResult<()> {
        let extent = self.frame_extent(source);
        if !extent.same_size(&self.texture_extent(target)) {
            return Err(EffectError::Image(format!(
                "blit size mismatch: {}x{} into {}x{}",
                extent.width,
                extent.height,
                target.texture.width(),
                target.texture.height()
            )));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histogram_sampling_blit_encoder"),
            });
        encoder.copy_texture_to_texture(
            source.as_image_copy(),
            target.texture.as_image_copy(),
            extent3d(extent),
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn create_bucket_buffer(&mut self, count: usize, stride: usize) -> EffectResult<GpuBuffer> {
        let size = (count * stride) as u64;
        let buffer = self.scoped("bucket buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("histogram_bucket_buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        Ok(GpuBuffer {
            buffer: Arc::new(buffer),
        })
    }

    fn release_buffer(&mut self, buffer: GpuBuffer) {
        self.bound_buffers
            .retain(|_, bound| !Arc::ptr_eq(bound, &buffer.buffer));
        buffer.buffer.destroy();
    }

    fn read_buckets(&mut self, buffer: &GpuBuffer, mirror: &mut [Bucket]) -> EffectResult<()> {
        let size = (mirror.len() * BUCKET_STRIDE) as u64;
        if buffer.buffer.size() != size {
            return Err(EffectError::Readback(format!(
                "mirror needs {} bytes, buffer holds {}",
                size,
                buffer.buffer.size()
            )));
        }

        let staging = self.staging_buffer(size)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histogram_readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        // Stalls until the GPU has finished every submitted dispatch
        let bytes = pollster::block_on(read_buffer_async(&self.device, &staging))?;

        for (bucket, chunk) in mirror.iter_mut().zip(bytes.chunks_exact(BUCKET_STRIDE)) {
            *bucket = bytemuck::pod_read_unaligned(chunk);
        }

        Ok(())
    }

    fn draw_overlay(
        &mut self,
        source: &wgpu::Texture,
        dest: &mut wgpu::Texture,
        values: &GpuBuffer,
        params: &OverlayParams,
    ) -> EffectResult<()> {
        if !self.frame_extent(source).same_size(&self.frame_extent(dest)) {
            return Err(EffectError::Image(format!(
                "overlay source {}x{} and destination {}x{} differ in size",
                source.width(),
                source.height(),
                dest.width(),
                dest.height()
            )));
        }

        self.queue
            .write_buffer(&self.overlay_uniform, 0, bytemuck::bytes_of(params));

        let source_view = source.create_view(&wgpu::TextureViewDescriptor::default());
        let dest_view = dest.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("histogram_overlay_bind_group"),
            layout: &self.overlay_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: values.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.overlay_uniform.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("histogram_overlay_encoder"),
            });

        let pipeline = self.overlay_pipeline(dest.format()).clone();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("histogram_overlay_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dest_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;
    use crate::histogram::HistogramEffect;
    use image::Rgba;

    #[tokio::test]
    async fn test_gpu_black_frame_histogram() {
        // This test requires a GPU, so it may be skipped in CI
        let backend = match WgpuBackend::new().await {
            Ok(backend) => backend,
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
                return;
            }
        };

        let image = RgbaImage::from_pixel(40, 24, Rgba([0, 0, 0, 255]));
        let source = backend.upload_frame(&image).unwrap();
        let mut dest = backend.upload_frame(&image).unwrap();

        let mut effect = HistogramEffect::new(backend, DisplayConfig::default());
        println!("Adapter: {:?}", effect.backend().device_info());

        let report = effect.on_frame(&source, &mut dest).unwrap();
        assert_eq!((report.groups.x, report.groups.y), (5, 3));

        let buckets = effect.last_buckets().unwrap();
        assert_eq!(buckets[0], Bucket::new(960, 960, 960));
        assert!(buckets[1..].iter().all(|b| *b == Bucket::default()));
        assert!(report.scalar.is_finite());

        let output = effect.backend_mut().download_frame(&dest).unwrap();
        assert_eq!(output.dimensions(), (40, 24));
    }
}
