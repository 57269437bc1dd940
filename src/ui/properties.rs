// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Object list panel.
//!
//! Lists the tracked objects with their colors and point counts, lets
//! the user pick the active object and remove objects.

use super::{color32, histogram};
use crate::models::session::{SessionState, ViewMode};

/// Result of object panel interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesAction {
    None,
    Select(u32),
    Remove(u32),
}

/// Display the object panel.
pub fn show(ui: &mut egui::Ui, state: &SessionState) -> PropertiesAction {
    let mut action = PropertiesAction::None;
    let editable = state.mode() == ViewMode::Setup;
    let can_remove = editable && !state.is_processing && state.objects().len() > 1;

    ui.heading("Objects");
    ui.separator();

    egui::ScrollArea::vertical()
        .id_source("objects")
        .max_height(ui.available_height() * 0.5)
        .show(ui, |ui| {
            for object in state.objects() {
                let active = state.active_object() == Some(object.id);
                ui.horizontal(|ui| {
                    let (swatch, _) =
                        ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                    ui.painter().rect_filled(swatch, 2.0, color32(object.color));

                    let text = format!("{} ({} points)", object.label, object.points.len());
                    if ui.selectable_label(active, text).clicked() && !active {
                        action = PropertiesAction::Select(object.id);
                    }

                    if ui
                        .add_enabled(can_remove, egui::Button::new("🗑").small())
                        .on_hover_text("Remove object")
                        .clicked()
                    {
                        action = PropertiesAction::Remove(object.id);
                    }
                });
            }
        });

    if state.mode() == ViewMode::Inspection {
        ui.add_space(8.0);
        ui.separator();
        ui.heading("Histogram");
        histogram::show(ui, state);
    }

    action
}
