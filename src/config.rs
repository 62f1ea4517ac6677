// src/config.rs

//! Defines the configuration structures for the KMS video output.
//!
//! This module provides structs that can be deserialized from a
//! configuration file (e.g., JSON) to customize device probing and the
//! scanout pixel format. Default values reproduce the behavior of the
//! classic KMS backends: probe the well-known desktop DRM drivers in
//! order and register framebuffers as 24-bit depth, 32 bits per pixel.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Complete configuration for the video output.
///
/// The host constructs one of these (or deserializes it) and hands it to
/// [`crate::display::KmsOutput::new`]. There is deliberately no ambient
/// process-wide configuration object; the session it configures is an
/// explicitly owned value as well.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)] // Apply default values for the entire struct if a field is missing.
pub struct Config {
    /// Display controller device selection.
    pub device: DeviceConfig,
    /// Scanout framebuffer format.
    pub format: FormatConfig,
}

/// Controls how the DRM device node is selected at acquisition time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Kernel DRM driver modules accepted for scanout, in preference
    /// order. The first listed module that backs an openable device node
    /// wins, regardless of node numbering.
    pub modules: Vec<String>,
    /// Highest `/dev/dri/cardN` index probed during acquisition.
    pub max_card_index: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            modules: ["i915", "radeon", "nouveau", "vmwgfx", "omapdrm", "exynos"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_card_index: 7,
        }
    }
}

/// Pixel format parameters used when registering a buffer object as a
/// display-controller framebuffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Color depth in bits (XRGB8888 scanout uses 24).
    pub depth: u32,
    /// Bits per pixel including padding (XRGB8888 scanout uses 32).
    pub bpp: u32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self { depth: 24, bpp: 32 }
    }
}

impl Config {
    /// Parses a configuration from a JSON document. Missing fields fall
    /// back to their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse video output configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_module_probe_order_matches_known_drivers() {
        let config = Config::default();
        assert_eq!(
            config.device.modules,
            vec!["i915", "radeon", "nouveau", "vmwgfx", "omapdrm", "exynos"]
        );
        assert_eq!(config.device.max_card_index, 7);
    }

    #[test]
    fn default_format_is_24_depth_32_bpp() {
        let config = Config::default();
        assert_eq!(config.format.depth, 24);
        assert_eq!(config.format.bpp, 32);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = Config::from_json_str(r#"{"device": {"modules": ["amdgpu"]}}"#).unwrap();
        assert_eq!(config.device.modules, vec!["amdgpu"]);
        // Unspecified fields keep their defaults.
        assert_eq!(config.device.max_card_index, 7);
        assert_eq!(config.format.bpp, 32);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Config::from_json_str("{not json").is_err());
    }
}
