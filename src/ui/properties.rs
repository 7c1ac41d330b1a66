// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Information panel.
//!
//! This module shows the volume metadata, the latest segmentation
//! statistics and the interaction points of the displayed slice.

use crate::models::point::InteractionPoint;
use crate::session::controller::SessionState;

/// Display the information panel.
pub fn show(ui: &mut egui::Ui, session: Option<&SessionState>, points: &[InteractionPoint]) {
    ui.heading("Information");
    ui.separator();

    let Some(session) = session else {
        ui.label(egui::RichText::new("Select a case to view information").weak());
        return;
    };
    let Some(ref volume) = session.volume else {
        ui.label(format!("Loading {}...", session.case));
        return;
    };

    egui::Grid::new("volume_info").num_columns(2).show(ui, |ui| {
        ui.label("Case:");
        ui.strong(&session.case);
        ui.end_row();

        ui.label("Dimensions:");
        ui.label(format!(
            "{} × {} × {}",
            volume.shape[0], volume.shape[1], volume.shape[2]
        ));
        ui.end_row();

        ui.label("Total slices:");
        ui.label(volume.slice_count().to_string());
        ui.end_row();

        ui.label("Spacing:");
        ui.label(format!(
            "{:.2} × {:.2} × {:.2} mm",
            volume.spacing[0], volume.spacing[1], volume.spacing[2]
        ));
        ui.end_row();
    });

    if let Some(ref stats) = session.stats {
        ui.add_space(10.0);
        ui.label(egui::RichText::new("Segmentation Stats").strong());
        ui.label(format!("Segmented voxels: {}", stats.total_voxels));
        let labels: Vec<String> = stats.unique_values.iter().map(|v| v.to_string()).collect();
        ui.label(format!("Unique values: {}", labels.join(", ")));
    }

    if let Some(ref err) = session.last_error {
        ui.add_space(10.0);
        ui.colored_label(egui::Color32::from_rgb(210, 70, 70), format!("Last error: {}", err));
    }

    ui.add_space(10.0);
    ui.label(
        egui::RichText::new(format!("Interaction points on slice {}", session.current_slice))
            .strong(),
    );
    if points.is_empty() {
        ui.label(egui::RichText::new("None").weak());
        return;
    }
    egui::ScrollArea::vertical()
        .id_source("slice_points")
        .max_height(240.0)
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for point in points {
                    let (sign, color) = if point.positive {
                        ("+", egui::Color32::from_rgb(60, 170, 90))
                    } else {
                        ("-", egui::Color32::from_rgb(210, 70, 70))
                    };
                    ui.colored_label(color, format!("{} ({}, {})", sign, point.x, point.y));
                }
            });
        });
}
