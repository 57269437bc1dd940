// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the SEGTRACK application.

pub mod canvas;
pub mod histogram;
pub mod properties;
pub mod timeline;
pub mod toolbar;

use crate::models::object::Rgba;

/// Convert an object color to an egui color.
pub fn color32(color: Rgba) -> egui::Color32 {
    let alpha = (color.a.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, alpha)
}
