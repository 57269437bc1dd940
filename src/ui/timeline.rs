// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video timeline scrubber control.
//!
//! This module provides play/pause and the scrubber for navigating
//! through video frames and selecting the frame to annotate.

use crate::models::video::{format_time, VideoSession};

/// Result of timeline interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineAction {
    None,
    TogglePlay,
    Seek(usize),
}

/// Display the timeline for the current frame.
pub fn show(ui: &mut egui::Ui, video: &VideoSession, frame: usize, playing: bool) -> TimelineAction {
    let mut action = TimelineAction::None;

    ui.horizontal(|ui| {
        let icon = if playing { "⏸" } else { "▶" };
        if ui.button(icon).clicked() {
            action = TimelineAction::TogglePlay;
        }

        let time = format!(
            "{} / {}",
            video.frame_label(frame),
            format_time(video.frame_to_seconds(video.frame_count))
        );
        // Reserve room for the labels on the right
        let slider_width = (ui.available_width() - 200.0).max(100.0);
        ui.spacing_mut().slider_width = slider_width;

        let mut scrub = frame;
        let response = ui.add(
            egui::Slider::new(&mut scrub, 0..=video.last_frame()).show_value(false),
        );
        if response.changed() && scrub != frame {
            action = TimelineAction::Seek(scrub);
        }

        ui.label(time);
        ui.separator();
        ui.label(format!("Frame {} / {}", frame, video.last_frame()));
    });

    action
}
