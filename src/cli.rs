// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for offline frames
//!
//! This module provides command-line functionality for:
//! - Compositing the overlay onto an image
//! - Printing the histogram statistics of an image

use histogram_overlay::{
    Config, CpuBackend, FrameReport, HistogramEffect, RenderBackend, WgpuBackend,
};
use image::RgbaImage;
use std::path::Path;
use tracing::{info, warn};

/// Display parameters given on the command line
#[derive(Debug, Default)]
pub struct DisplayOverrides {
    pub red: Option<f32>,
    pub green: Option<f32>,
    pub blue: Option<f32>,
    pub fade_size: Option<f32>,
    pub minimal_fill: Option<f32>,
}

impl DisplayOverrides {
    fn apply<B: RenderBackend>(&self, effect: &mut HistogramEffect<B>) {
        if let Some(value) = self.red {
            effect.set_red_scaler(value);
        }
        if let Some(value) = self.green {
            effect.set_green_scaler(value);
        }
        if let Some(value) = self.blue {
            effect.set_blue_scaler(value);
        }
        if let Some(value) = self.fade_size {
            effect.set_fade_size(value);
        }
        if let Some(value) = self.minimal_fill {
            effect.set_minimal_fill(value);
        }
    }
}

enum Backend {
    Gpu(WgpuBackend),
    Cpu(CpuBackend),
}

/// Pick the GPU backend unless told otherwise, falling back to the CPU
fn select_backend(force_cpu: bool) -> Backend {
    if force_cpu {
        info!("Using CPU backend");
        return Backend::Cpu(CpuBackend::new());
    }

    match pollster::block_on(WgpuBackend::new()) {
        Ok(backend) => {
            let device = backend.device_info();
            info!(
                adapter = %device.adapter_name,
                software = device.software,
                "Using GPU backend"
            );
            Backend::Gpu(backend)
        }
        Err(e) => {
            warn!(error = %e, "GPU backend unavailable, falling back to CPU");
            Backend::Cpu(CpuBackend::new())
        }
    }
}

fn run_frames<B: RenderBackend>(
    effect: &mut HistogramEffect<B>,
    source: &B::Frame,
    dest: &mut B::Frame,
    frames: u32,
) -> Result<FrameReport, Box<dyn std::error::Error>> {
    let mut report = effect.on_frame(source, dest)?;
    for _ in 1..frames {
        report = effect.on_frame(source, dest)?;
    }

    info!(
        frame = report.frame_index,
        width = report.width,
        height = report.height,
        groups_x = report.groups.x,
        groups_y = report.groups.y,
        max_total = report.peaks.max_total,
        scalar = ?report.scalar.0,
        "Frame processed"
    );

    Ok(report)
}

fn load_image(path: &Path) -> Result<RgbaImage, Box<dyn std::error::Error>> {
    let image = image::open(path)?.to_rgba8();
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Loaded input image"
    );
    Ok(image)
}

/// Composite the overlay onto `input` and write the result to `output`
pub fn render(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    frames: u32,
    force_cpu: bool,
    overrides: &DisplayOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(config_path)?;
    let image = load_image(input)?;

    let composited = match select_backend(force_cpu || config.force_cpu) {
        Backend::Gpu(backend) => {
            let source = backend.upload_frame(&image)?;
            let mut dest = backend.upload_frame(&image)?;

            let mut effect = HistogramEffect::new(backend, config.display);
            overrides.apply(&mut effect);
            run_frames(&mut effect, &source, &mut dest, frames)?;

            effect.backend_mut().download_frame(&dest)?
        }
        Backend::Cpu(backend) => {
            let mut dest = RgbaImage::new(image.width(), image.height());

            let mut effect = HistogramEffect::new(backend, config.display);
            overrides.apply(&mut effect);
            run_frames(&mut effect, &image, &mut dest, frames)?;

            dest
        }
    };

    composited.save(output)?;
    println!("Saved: {}", output.display());

    Ok(())
}

fn print_report(report: &FrameReport) {
    let peaks = &report.peaks;
    let scalar = report.scalar.0;

    println!("Image: {}x{}", report.width, report.height);
    println!(
        "Thread groups: {}x{}x{}",
        report.groups.x, report.groups.y, report.groups.z
    );
    println!(
        "Peaks (buckets 1-254): R={} G={} B={}",
        peaks.max_r, peaks.max_g, peaks.max_b
    );
    println!("Max total: {}", peaks.max_total);
    println!(
        "Scalar: R={:.6} G={:.6} B={:.6}",
        scalar[0], scalar[1], scalar[2]
    );
}

/// Print peak statistics for `input` without writing an image
pub fn stats(input: &Path, force_cpu: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(None)?;
    let image = load_image(input)?;

    let report = match select_backend(force_cpu || config.force_cpu) {
        Backend::Gpu(backend) => {
            let source = backend.upload_frame(&image)?;
            let mut dest = backend.upload_frame(&image)?;
            let mut effect = HistogramEffect::new(backend, config.display);
            run_frames(&mut effect, &source, &mut dest, 1)?
        }
        Backend::Cpu(backend) => {
            let mut dest = RgbaImage::new(image.width(), image.height());
            let mut effect = HistogramEffect::new(backend, config.display);
            run_frames(&mut effect, &image, &mut dest, 1)?
        }
    };

    print_report(&report);
    Ok(())
}
