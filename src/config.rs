// SPDX-License-Identifier: GPL-3.0-only

//! Display configuration for the histogram overlay
//!
//! The knobs here are pass-through values: the base scalar feeds the
//! normalization step, fade size and minimal fill go straight to the overlay
//! material. Nothing in this module is derived per frame.

use crate::errors::{EffectError, EffectResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What to do when every scanned bucket is zero
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ZeroPeakPolicy {
    /// Treat the peak as 1 so the scalar equals the base scalar
    #[default]
    ClampToOne,
    /// Output a zero scalar so no bars are drawn for the frame
    SkipFrame,
}

/// User-tunable overlay settings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Base per-channel multiplier (r, g, b, unused)
    scalar: [f32; 4],
    /// Height (normalized) over which a bar fades from full to minimal fill
    fade_size: f32,
    /// Lowest fill inside a bar
    minimal_fill: f32,
    /// Policy for frames whose scanned histogram is empty
    zero_peak_policy: ZeroPeakPolicy,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            scalar: [1.0, 1.0, 1.0, 1.0],
            fade_size: 0.05,
            minimal_fill: 0.25,
            zero_peak_policy: ZeroPeakPolicy::default(),
        }
    }
}

impl DisplayConfig {
    pub fn set_red_scaler(&mut self, value: f32) {
        self.scalar[0] = value;
    }

    pub fn set_green_scaler(&mut self, value: f32) {
        self.scalar[1] = value;
    }

    pub fn set_blue_scaler(&mut self, value: f32) {
        self.scalar[2] = value;
    }

    pub fn set_fade_size(&mut self, value: f32) {
        self.fade_size = value;
    }

    pub fn set_minimal_fill(&mut self, value: f32) {
        self.minimal_fill = value;
    }

    pub fn set_zero_peak_policy(&mut self, policy: ZeroPeakPolicy) {
        self.zero_peak_policy = policy;
    }

    pub fn base_scalar(&self) -> [f32; 4] {
        self.scalar
    }

    pub fn fade_size(&self) -> f32 {
        self.fade_size
    }

    pub fn minimal_fill(&self) -> f32 {
        self.minimal_fill
    }

    pub fn zero_peak_policy(&self) -> ZeroPeakPolicy {
        self.zero_peak_policy
    }
}

/// On-disk configuration file
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Overlay display settings
    pub display: DisplayConfig,
    /// Prefer the software backend even if a GPU is present
    pub force_cpu: bool,
}

impl Config {
    /// Default config path: `<config dir>/histogram-overlay/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("histogram-overlay").join("config.json"))
    }

    /// Load from an explicit path; the file must exist and parse
    pub fn load(path: &Path) -> EffectResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EffectError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| EffectError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path`, or from the default location if `None`.
    ///
    /// A missing default file yields defaults; an explicit path must exist.
    pub fn load_or_default(path: Option<&Path>) -> EffectResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> EffectResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
