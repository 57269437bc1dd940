// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video canvas and point placement.
//!
//! This module displays the composited frame scaled to fit the central
//! panel and turns clicks on it into prompt placements in video pixel
//! coordinates.

use crate::models::object::PointLabel;
use crate::models::session::{SessionState, ViewMode};
use crate::util::composite::marker_labels;
use crate::util::geometry::{display_to_video, fit_within};

/// Result of canvas interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasAction {
    None,
    Place { x: f64, y: f64, label: PointLabel },
}

/// Display the canvas and handle mouse interactions.
pub fn show(
    ui: &mut egui::Ui,
    state: &SessionState,
    texture: Option<&egui::TextureHandle>,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size() - egui::vec2(0.0, 24.0);

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        match (state.video(), texture) {
            (Some(video), Some(texture)) => {
                let ((display_width, display_height), (x_offset, y_offset)) =
                    fit_within(video.width, video.height, (available_size.x, available_size.y));

                let image_rect = egui::Rect::from_min_size(
                    ui.min_rect().min + egui::vec2(x_offset, y_offset),
                    egui::vec2(display_width, display_height),
                );

                ui.painter().image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );

                let scale = display_width / video.width.max(1) as f32;
                for (x, y, id) in marker_labels(state) {
                    let pos = image_rect.min + egui::vec2(x as f32 * scale, y as f32 * scale);
                    ui.painter().text(
                        pos,
                        egui::Align2::CENTER_CENTER,
                        id.to_string(),
                        egui::FontId::proportional(11.0),
                        egui::Color32::WHITE,
                    );
                }

                let editable = state.mode() == ViewMode::Setup && !state.is_processing;
                let response = ui.allocate_rect(image_rect, egui::Sense::click());
                if editable {
                    let label = if response.clicked() {
                        Some(PointLabel::Positive)
                    } else if response.secondary_clicked() {
                        Some(PointLabel::Negative)
                    } else {
                        None
                    };

                    if let (Some(label), Some(pos)) = (label, response.interact_pointer_pos()) {
                        if image_rect.contains(pos) {
                            let (x, y) = display_to_video(
                                pos.x - image_rect.min.x,
                                pos.y - image_rect.min.y,
                                (display_width, display_height),
                                video.width,
                                video.height,
                            );
                            action = CanvasAction::Place { x, y, label };
                        }
                    }
                }
            }
            (Some(_), None) => {
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new("Decoding frame...").color(egui::Color32::WHITE));
                });
            }
            (None, _) => welcome(ui, state.is_processing),
        }
    });

    ui.separator();
    ui.horizontal(|ui| match state.video() {
        Some(video) => {
            ui.label(format!("{} ({}x{})", video.filename, video.width, video.height));
            ui.separator();
            ui.label(match state.mode() {
                ViewMode::Setup => "Left click: positive point, right click: negative point",
                ViewMode::Inspection => "Inspecting tracked masks",
            });
            ui.separator();
            ui.label(format!("{} points", state.point_count()));
        }
        None => {
            ui.label("No video loaded");
        }
    });

    action
}

fn welcome(ui: &mut egui::Ui, uploading: bool) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("SEGTRACK")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Interactive video object segmentation")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            if uploading {
                ui.spinner();
                ui.label(
                    egui::RichText::new("Uploading video...")
                        .color(egui::Color32::from_gray(180)),
                );
            } else {
                ui.label(
                    egui::RichText::new("Open or drop a video to begin")
                        .color(egui::Color32::from_gray(180)),
                );
                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new("File → Open Video...")
                        .weak()
                        .color(egui::Color32::from_gray(130)),
                );
            }
        });
    });
}
