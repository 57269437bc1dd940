// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tracked objects and their point prompts.
//!
//! This module defines the objects the user segments, the labeled
//! points that guide the backend, and the color palette used to tell
//! objects apart on the canvas.

use serde::{Deserialize, Serialize};

/// Prompt label: background (0) or foreground (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PointLabel {
    Negative,
    Positive,
}

impl From<PointLabel> for u8 {
    fn from(label: PointLabel) -> Self {
        match label {
            PointLabel::Negative => 0,
            PointLabel::Positive => 1,
        }
    }
}

impl TryFrom<u8> for PointLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PointLabel::Negative),
            1 => Ok(PointLabel::Positive),
            other => Err(format!("invalid point label {}, expected 0 or 1", other)),
        }
    }
}

/// A prompt point in source video pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromptPoint {
    pub x: f64,
    pub y: f64,
    pub label: PointLabel,
    pub object_id: u32,
    pub frame_index: usize,
}

impl PromptPoint {
    /// Euclidean distance to a video-space position.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An RGBA color with 8-bit channels and a fractional alpha.
///
/// Stored in prompt files as a CSS `rgba(...)` string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

/// Fallback when a color string cannot be parsed.
pub const DEFAULT_COLOR: Rgba = Rgba::new(255, 165, 0, 0.5);

/// Object colors, assigned round-robin by object id.
pub const PALETTE: [Rgba; 5] = [
    Rgba::new(255, 165, 0, 0.5),   // orange
    Rgba::new(106, 90, 205, 0.5),  // slate blue
    Rgba::new(50, 205, 50, 0.5),   // lime green
    Rgba::new(255, 105, 180, 0.5), // hot pink
    Rgba::new(70, 130, 180, 0.5),  // steel blue
];

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Palette color for a 1-based object id.
    pub fn for_object(id: u32) -> Self {
        let index = (id.max(1) - 1) as usize % PALETTE.len();
        PALETTE[index]
    }

    /// Parse a CSS `rgba(r, g, b, a)` string, falling back to orange.
    pub fn parse_css(text: &str) -> Self {
        Self::try_parse_css(text).unwrap_or(DEFAULT_COLOR)
    }

    fn try_parse_css(text: &str) -> Option<Self> {
        let inner = text
            .trim()
            .strip_prefix("rgba(")?
            .strip_suffix(')')?;
        let mut parts = inner.split(',').map(str::trim);
        let r = parts.next()?.parse().ok()?;
        let g = parts.next()?.parse().ok()?;
        let b = parts.next()?.parse().ok()?;
        let a: f32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || !(0.0..=1.0).contains(&a) {
            return None;
        }
        Some(Self { r, g, b, a })
    }

    /// Format as a CSS `rgba(...)` string.
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl From<String> for Rgba {
    fn from(text: String) -> Self {
        Self::parse_css(&text)
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_css()
    }
}

/// A user-defined object that accumulates prompts across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: u32,
    pub label: String,
    pub points: Vec<PromptPoint>,
    pub color: Rgba,
}

impl TrackedObject {
    /// Create an empty object with the default label and palette color for `id`.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            label: default_label(id),
            points: Vec::new(),
            color: Rgba::for_object(id),
        }
    }

    /// Points placed on the given frame.
    pub fn points_on_frame(&self, frame_index: usize) -> impl Iterator<Item = &PromptPoint> {
        self.points
            .iter()
            .filter(move |p| p.frame_index == frame_index)
    }

    /// Give the object a new id, relabeling and recoloring it and its points.
    pub(crate) fn renumber(&mut self, id: u32) {
        self.id = id;
        self.label = default_label(id);
        self.color = Rgba::for_object(id);
        for point in &mut self.points {
            point.object_id = id;
        }
    }
}

fn default_label(id: u32) -> String {
    format!("Object {}", id)
}
