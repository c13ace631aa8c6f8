// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "histogram-overlay")]
#[command(about = "Draw a per-channel histogram overlay onto images")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Composite the histogram overlay onto an image
    Render {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path (PNG)
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration file (default: ~/.config/histogram-overlay/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of times to run the effect on the image
        #[arg(short, long, default_value = "1")]
        frames: u32,

        /// Use the CPU backend instead of the GPU
        #[arg(long)]
        cpu: bool,

        /// Red channel scaler
        #[arg(long)]
        red: Option<f32>,

        /// Green channel scaler
        #[arg(long)]
        green: Option<f32>,

        /// Blue channel scaler
        #[arg(long)]
        blue: Option<f32>,

        /// Height of the fade band below each bar top
        #[arg(long)]
        fade_size: Option<f32>,

        /// Lowest fill inside a bar
        #[arg(long)]
        minimal_fill: Option<f32>,
    },

    /// Print histogram peaks and the derived scalar for an image
    Stats {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Use the CPU backend instead of the GPU
        #[arg(long)]
        cpu: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=histogram_overlay=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            input,
            output,
            config,
            frames,
            cpu,
            red,
            green,
            blue,
            fade_size,
            minimal_fill,
        } => {
            let overrides = cli::DisplayOverrides {
                red,
                green,
                blue,
                fade_size,
                minimal_fill,
            };
            cli::render(&input, &output, config.as_deref(), frames, cpu, &overrides)
        }
        Commands::Stats { input, cpu } => cli::stats(&input, cpu),
    }
}
