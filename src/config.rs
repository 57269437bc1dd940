// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Settings come from built-in defaults, optionally overridden by a YAML
//! file, then by command line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the segmentation backend
    pub backend_url: String,
    /// Global mask opacity (0.0 to 1.0)
    pub mask_opacity: f32,
    /// Clicks closer than this to a point (video pixels) remove it
    pub hit_radius: f64,
    /// Prompt marker radius in video pixels
    pub marker_radius: f32,
    /// Upper bound for a single backend request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080".to_string(),
            mask_opacity: 0.5,
            hit_radius: 10.0,
            marker_radius: 8.0,
            // Full-video tracking can take minutes
            request_timeout_secs: 600,
        }
    }
}

impl Config {
    /// Load settings from a YAML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config.validated())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Clamp values into their usable ranges.
    pub fn validated(mut self) -> Self {
        self.mask_opacity = self.mask_opacity.clamp(0.0, 1.0);
        self.hit_radius = self.hit_radius.max(0.0);
        self.marker_radius = self.marker_radius.max(1.0);
        self
    }
}
