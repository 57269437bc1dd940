// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Histogram plot for the active object.

use crate::models::session::SessionState;

const CHANNEL_COLORS: [egui::Color32; 3] = [
    egui::Color32::from_rgb(230, 60, 60),
    egui::Color32::from_rgb(60, 200, 60),
    egui::Color32::from_rgb(70, 110, 240),
];

/// Plot the active object's histogram on the current frame.
pub fn show(ui: &mut egui::Ui, state: &SessionState) {
    let frame = state.current_frame();
    let histogram = state
        .histograms()
        .zip(state.active_object())
        .and_then(|(histograms, id)| histograms.for_object(frame, id));

    let Some(histogram) = histogram else {
        ui.label(egui::RichText::new("No histogram for this frame").weak());
        return;
    };

    let size = egui::vec2(ui.available_width(), 140.0);
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(25));

    let max = histogram.max_count().max(1) as f32;
    for (channel, bins) in histogram.channels.iter().enumerate() {
        let color = if histogram.is_color() {
            CHANNEL_COLORS[channel % CHANNEL_COLORS.len()]
        } else {
            egui::Color32::WHITE
        };
        let step = rect.width() / bins.len().saturating_sub(1).max(1) as f32;
        let points: Vec<egui::Pos2> = bins
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                egui::pos2(
                    rect.min.x + i as f32 * step,
                    rect.max.y - count as f32 / max * rect.height(),
                )
            })
            .collect();
        painter.add(egui::Shape::line(points, egui::Stroke::new(1.5, color)));
    }

    ui.label(
        egui::RichText::new(format!("Frame {}, peak {}", frame, histogram.max_count()))
            .small()
            .weak(),
    );
}
