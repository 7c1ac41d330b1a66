// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Results view shown after a processing job completed.

use crate::models::case::JobStatus;

pub enum ResultsAction {
    None,
    Download,
    Back,
}

pub fn show(ui: &mut egui::Ui, case: &str, status: Option<&JobStatus>) -> ResultsAction {
    let mut action = ResultsAction::None;

    ui.vertical_centered(|ui| {
        ui.add_space(40.0);
        ui.heading(format!("Results for {}", case));
        ui.add_space(10.0);
        ui.colored_label(egui::Color32::from_rgb(60, 170, 90), "Processing completed");
        if let Some(status) = status.filter(|s| !s.message.is_empty()) {
            ui.label(&status.message);
        }
        ui.add_space(20.0);
        if ui.button("Download Results...").clicked() {
            action = ResultsAction::Download;
        }
        ui.add_space(6.0);
        if ui.button("Back to Viewer").clicked() {
            action = ResultsAction::Back;
        }
    });

    action
}
