// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the histogram effect

use std::fmt;

/// Result type alias using EffectError
pub type EffectResult<T> = Result<T, EffectError>;

/// Main error type for the effect, its backends and the CLI host
#[derive(Debug, Clone)]
pub enum EffectError {
    /// No usable graphics adapter or device
    DeviceUnavailable(String),
    /// GPU buffer or texture creation failed (fatal for the frame)
    Allocation {
        /// Which resource was being created
        resource: &'static str,
        /// Backend-provided reason
        reason: String,
    },
    /// A kernel was dispatched without one of its recognized inputs bound
    UnboundResource {
        /// Kernel entry point name
        kernel: &'static str,
        /// Bound name that was missing or not recognized
        name: String,
    },
    /// Bucket buffer readback (GPU to CPU) failed
    Readback(String),
    /// Shader module or pipeline creation failed
    Shader(String),
    /// Configuration could not be read or parsed
    Config(String),
    /// Filesystem error
    Io(String),
    /// Image decode/encode error
    Image(String),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::DeviceUnavailable(msg) => write!(f, "GPU device unavailable: {}", msg),
            EffectError::Allocation { resource, reason } => {
                write!(f, "Failed to allocate {}: {}", resource, reason)
            }
            EffectError::UnboundResource { kernel, name } => {
                write!(f, "Kernel '{}' has no resource bound for '{}'", kernel, name)
            }
            EffectError::Readback(msg) => write!(f, "Buffer readback failed: {}", msg),
            EffectError::Shader(msg) => write!(f, "Shader error: {}", msg),
            EffectError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EffectError::Io(msg) => write!(f, "I/O error: {}", msg),
            EffectError::Image(msg) => write!(f, "Image error: {}", msg),
        }
    }
}

impl std::error::Error for EffectError {}

impl EffectError {
    /// Shorthand for an allocation failure of the named resource
    pub fn allocation(resource: &'static str, reason: impl Into<String>) -> Self {
        EffectError::Allocation {
            resource,
            reason: reason.into(),
        }
    }

    /// Whether the error means the frame cannot be produced at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EffectError::DeviceUnavailable(_) | EffectError::Allocation { .. }
        )
    }
}

impl From<std::io::Error> for EffectError {
    fn from(err: std::io::Error) -> Self {
        EffectError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EffectError {
    fn from(err: serde_json::Error) -> Self {
        EffectError::Config(err.to_string())
    }
}

impl From<image::ImageError> for EffectError {
    fn from(err: image::ImageError) -> Self {
        EffectError::Image(err.to_string())
    }
}
