// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with the workflow buttons.
//!
//! Buttons depend on the view mode: object setup offers tracking and
//! reset, inspection offers the way back. Backend actions are disabled
//! while a request is in flight.

use crate::models::session::{SessionState, ViewMode};

/// Result of toolbar interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    AddObject,
    StartOver,
    TrackObjects,
    FetchMasks,
    BackToSelection,
    Cancel,
}

/// Display the toolbar.
pub fn show(ui: &mut egui::Ui, state: &SessionState, opacity: &mut f32) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    let idle = !state.is_processing;
    let has_video = state.video().is_some();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        match state.mode() {
            ViewMode::Setup => {
                if ui
                    .add_enabled(has_video, egui::Button::new("＋ Add object"))
                    .clicked()
                {
                    action = ToolbarAction::AddObject;
                }
                if ui
                    .add_enabled(has_video, egui::Button::new("⟲ Start over"))
                    .clicked()
                {
                    action = ToolbarAction::StartOver;
                }
                ui.separator();
                let can_track = has_video && idle && state.point_count() > 0;
                if ui
                    .add_enabled(can_track, egui::Button::new("▶ Track objects"))
                    .on_disabled_hover_text("Place at least one point first")
                    .clicked()
                {
                    action = ToolbarAction::TrackObjects;
                }
                if ui
                    .add_enabled(has_video && idle, egui::Button::new("⬇ Fetch masks"))
                    .clicked()
                {
                    action = ToolbarAction::FetchMasks;
                }
            }
            ViewMode::Inspection => {
                if ui.button("⬅ Back to selection").clicked() {
                    action = ToolbarAction::BackToSelection;
                }
            }
        }

        ui.separator();
        ui.label("Mask opacity:");
        ui.add(egui::Slider::new(opacity, 0.0..=1.0).fixed_decimals(2));

        if state.is_processing {
            ui.separator();
            ui.spinner();
            ui.label(egui::RichText::new("Processing...").italics().weak());
            if ui.button("Cancel").clicked() {
                action = ToolbarAction::Cancel;
            }
        }
    });

    action
}
