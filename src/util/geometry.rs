// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides utilities for coordinate transformations between
//! the on-screen canvas, the source video and mask grids.

/// Fit a `width x height` image inside `available`, keeping its aspect
/// ratio. Returns the display size and the offset that centers it.
pub fn fit_within(width: u32, height: u32, available: (f32, f32)) -> ((f32, f32), (f32, f32)) {
    let (avail_w, avail_h) = available;
    if width == 0 || height == 0 || avail_w <= 0.0 || avail_h <= 0.0 {
        return ((0.0, 0.0), (0.0, 0.0));
    }
    let img_aspect = width as f32 / height as f32;
    let available_aspect = avail_w / avail_h;

    let (display_width, display_height) = if img_aspect > available_aspect {
        // Image is wider - fit to width
        (avail_w, avail_w / img_aspect)
    } else {
        // Image is taller - fit to height
        (avail_h * img_aspect, avail_h)
    };

    let offset = ((avail_w - display_width) / 2.0, (avail_h - display_height) / 2.0);
    ((display_width, display_height), offset)
}

/// Convert a position on a displayed image to source video pixels.
pub fn display_to_video(
    display_x: f32,
    display_y: f32,
    display_size: (f32, f32),
    width: u32,
    height: u32,
) -> (f64, f64) {
    let scale_x = width as f64 / display_size.0 as f64;
    let scale_y = height as f64 / display_size.1 as f64;
    (display_x as f64 * scale_x, display_y as f64 * scale_y)
}

/// Map a target pixel to the mask cell covering it.
///
/// Nearest-neighbor with integer floor: target pixel `x` of `target`
/// lands in cell `floor(x / (target / cells))`.
pub fn target_to_cell(x: u32, target: u32, cells: usize) -> usize {
    let scale = target as f64 / cells as f64;
    (x as f64 / scale).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_wide_image() {
        let ((w, h), (ox, oy)) = fit_within(1920, 1080, (960.0, 960.0));
        assert_eq!(w, 960.0);
        assert_eq!(h, 540.0);
        assert_eq!(ox, 0.0);
        assert_eq!(oy, 210.0);
    }

    #[test]
    fn test_fit_tall_image() {
        let ((w, h), (ox, _)) = fit_within(500, 1000, (800.0, 500.0));
        assert_eq!(w, 250.0);
        assert_eq!(h, 500.0);
        assert_eq!(ox, 275.0);
    }

    #[test]
    fn test_display_to_video_scales() {
        let (x, y) = display_to_video(480.0, 270.0, (960.0, 540.0), 1920, 1080);
        assert!((x - 960.0).abs() < 0.0001);
        assert!((y - 540.0).abs() < 0.0001);
    }

    #[test]
    fn test_target_to_cell_floors() {
        // Upscaling a 2-cell mask onto 5 pixels
        let cells: Vec<usize> = (0..5).map(|x| target_to_cell(x, 5, 2)).collect();
        assert_eq!(cells, vec![0, 0, 0, 1, 1]);
        // Downscaling
        assert_eq!(target_to_cell(3, 4, 8), 6);
    }
}
