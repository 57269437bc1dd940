// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-object intensity histograms returned by full-video tracking.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Histograms for every tracked frame.
///
/// Each frame holds `[channel][object][bin]` counts with 256 bins per
/// channel. Monochrome videos have one channel, color videos three.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Histograms {
    #[serde(default)]
    pub histograms: BTreeMap<usize, Vec<Vec<Vec<u64>>>>,
    #[serde(default)]
    pub bin_edges: Option<Vec<Vec<f64>>>,
}

/// Histogram channels of one object on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHistogram<'a> {
    pub channels: Vec<&'a [u64]>,
}

impl ObjectHistogram<'_> {
    /// Three channels means the video was color.
    pub fn is_color(&self) -> bool {
        self.channels.len() == 3
    }

    /// Largest bin across all channels, used to scale the plot.
    pub fn max_count(&self) -> u64 {
        self.channels
            .iter()
            .flat_map(|bins| bins.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

impl Histograms {
    /// Channels for a 1-based object id on a frame.
    pub fn for_object(&self, frame: usize, object_id: u32) -> Option<ObjectHistogram<'_>> {
        let index = object_id.checked_sub(1)? as usize;
        let channels = self
            .histograms
            .get(&frame)?
            .iter()
            .map(|objects| objects.get(index).map(Vec::as_slice))
            .collect::<Option<Vec<_>>>()?;
        if channels.is_empty() {
            return None;
        }
        Some(ObjectHistogram { channels })
    }
}
