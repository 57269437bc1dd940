// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame compositing.
//!
//! Draws the current frame's masks and prompt markers over a decoded
//! video frame. Mask cells are mapped to frame pixels by integer floor
//! (nearest neighbor, no antialiasing), so a mask's coverage depends only
//! on its grid, never on how the backend happened to encode it.

use super::geometry::target_to_cell;
use crate::models::mask::MaskGrid;
use crate::models::object::{PointLabel, Rgba as Color};
use crate::models::session::SessionState;
use image::{Rgba, RgbaImage};

/// Marker fill for positive prompts.
pub const POSITIVE_MARKER: Color = Color::new(0, 255, 0, 0.7);
/// Marker fill for negative prompts.
pub const NEGATIVE_MARKER: Color = Color::new(255, 0, 0, 0.7);

/// How overlays are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Global mask opacity, multiplied with each object color's alpha
    pub opacity: f32,
    /// Marker radius in frame pixels
    pub marker_radius: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            opacity: 0.5,
            marker_radius: 8.0,
        }
    }
}

/// Composite masks and markers for the session's current frame.
pub fn compose_frame(frame: &RgbaImage, state: &SessionState, style: &OverlayStyle) -> RgbaImage {
    let mut canvas = frame.clone();
    let current = state.current_frame();

    for (object_id, grid) in state.masks().frame(current) {
        match state.object(object_id) {
            Some(object) => blend_mask(&mut canvas, grid, object.color, style.opacity),
            None => log::warn!("No object found for mask id {}", object_id),
        }
    }

    if let Some(video) = state.video() {
        let scale_x = canvas.width() as f64 / video.width.max(1) as f64;
        let scale_y = canvas.height() as f64 / video.height.max(1) as f64;
        for object in state.objects() {
            for point in object.points_on_frame(current) {
                let fill = match point.label {
                    PointLabel::Positive => POSITIVE_MARKER,
                    PointLabel::Negative => NEGATIVE_MARKER,
                };
                draw_marker(
                    &mut canvas,
                    point.x * scale_x,
                    point.y * scale_y,
                    style.marker_radius,
                    fill,
                );
            }
        }
    }

    canvas
}

/// Current-frame prompt positions in video pixels, with the object id
/// to print inside each marker.
pub fn marker_labels(state: &SessionState) -> Vec<(f64, f64, u32)> {
    let current = state.current_frame();
    state
        .objects()
        .iter()
        .flat_map(|object| object.points_on_frame(current))
        .map(|point| (point.x, point.y, point.object_id))
        .collect()
}

/// Alpha-blend every occupied mask cell onto the canvas.
pub fn blend_mask(canvas: &mut RgbaImage, grid: &MaskGrid, color: Color, opacity: f32) {
    let alpha = (color.a * opacity).clamp(0.0, 1.0);
    let (width, height) = canvas.dimensions();
    let columns: Vec<usize> = (0..width)
        .map(|x| target_to_cell(x, width, grid.width()))
        .collect();

    for y in 0..height {
        let row = target_to_cell(y, height, grid.height());
        for (x, &column) in columns.iter().enumerate() {
            if grid.is_set(column, row) {
                blend_pixel(canvas.get_pixel_mut(x as u32, y), color, alpha);
            }
        }
    }
}

fn blend_pixel(pixel: &mut Rgba<u8>, color: Color, alpha: f32) {
    let mix = |base: u8, over: u8| -> u8 {
        (base as f32 * (1.0 - alpha) + over as f32 * alpha).round() as u8
    };
    pixel[0] = mix(pixel[0], color.r);
    pixel[1] = mix(pixel[1], color.g);
    pixel[2] = mix(pixel[2], color.b);
}

/// Filled circle with a one pixel white outline.
fn draw_marker(canvas: &mut RgbaImage, cx: f64, cy: f64, radius: f32, fill: Color) {
    let radius = radius.max(1.0) as f64;
    let (width, height) = canvas.dimensions();
    let min_x = (cx - radius).floor().max(0.0) as u32;
    let min_y = (cy - radius).floor().max(0.0) as u32;
    let max_x = ((cx + radius).ceil().max(0.0) as u32).min(width.saturating_sub(1));
    let max_y = ((cy + radius).ceil().max(0.0) as u32).min(height.saturating_sub(1));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance > radius {
                continue;
            }
            let pixel = canvas.get_pixel_mut(x, y);
            if distance > radius - 1.0 {
                *pixel = Rgba([255, 255, 255, 255]);
            } else {
                blend_pixel(pixel, fill, fill.a);
            }
        }
    }
}
