// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Case list and processing job panel.

use crate::models::case::{Case, CaseStatus, JobStatus};

/// Result of case panel interaction.
pub enum CasesAction {
    None,
    Refresh,
    Select(String),
    Process(String),
    Delete(String),
    FetchLogs(String),
}

/// What the panel needs to draw one frame.
pub struct CasesView<'a> {
    pub cases: &'a [Case],
    pub selected: Option<&'a str>,
    pub processing_active: bool,
    pub job: Option<(&'a str, &'a JobStatus)>,
    pub logs: Option<(&'a str, &'a [String])>,
}

pub fn status_color(status: CaseStatus) -> egui::Color32 {
    match status {
        CaseStatus::Uploaded | CaseStatus::Unknown => egui::Color32::from_gray(160),
        CaseStatus::Running => egui::Color32::from_rgb(220, 170, 40),
        CaseStatus::Completed => egui::Color32::from_rgb(60, 170, 90),
        CaseStatus::Error => egui::Color32::from_rgb(210, 70, 70),
    }
}

/// Display the case list, the tracked job and its logs.
pub fn show(ui: &mut egui::Ui, view: &CasesView<'_>) -> CasesAction {
    let mut action = CasesAction::None;

    ui.horizontal(|ui| {
        ui.heading("Cases");
        if ui.small_button("⟳").on_hover_text("Refresh case list").clicked() {
            action = CasesAction::Refresh;
        }
    });
    ui.separator();

    if view.cases.is_empty() {
        ui.label(egui::RichText::new("No uploaded cases").weak());
    }

    egui::ScrollArea::vertical()
        .id_source("case_list")
        .max_height(ui.available_height() * 0.6)
        .show(ui, |ui| {
            for case in view.cases {
                let selected = view.selected == Some(case.name.as_str());
                ui.horizontal(|ui| {
                    if ui.selectable_label(selected, &case.name).clicked() && !selected {
                        action = CasesAction::Select(case.name.clone());
                    }
                    ui.colored_label(status_color(case.status), case.status.label());
                });
                if !case.files.is_empty() {
                    ui.label(
                        egui::RichText::new(format!("{} file(s)", case.files.len()))
                            .small()
                            .weak(),
                    );
                }
                ui.horizontal(|ui| {
                    let can_process = !view.processing_active && case.status != CaseStatus::Running;
                    if ui
                        .add_enabled(can_process, egui::Button::new("Process"))
                        .on_hover_text("Run the batch segmentation job")
                        .clicked()
                    {
                        action = CasesAction::Process(case.name.clone());
                    }
                    if ui.button("Logs").clicked() {
                        action = CasesAction::FetchLogs(case.name.clone());
                    }
                    if ui.button("Delete").clicked() && confirm_delete(&case.name) {
                        action = CasesAction::Delete(case.name.clone());
                    }
                });
                ui.add_space(4.0);
            }
        });

    if let Some((case, status)) = view.job {
        ui.separator();
        ui.label(egui::RichText::new(format!("Job: {}", case)).strong());
        ui.horizontal(|ui| {
            if !status.status.is_terminal() {
                ui.spinner();
            }
            ui.colored_label(status_color(status.status), status.status.label());
        });
        if !status.message.is_empty() {
            ui.label(&status.message);
        }
    }

    if let Some((case, lines)) = view.logs {
        ui.separator();
        ui.label(egui::RichText::new(format!("Logs: {}", case)).strong());
        egui::ScrollArea::vertical()
            .id_source("job_logs")
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if lines.is_empty() {
                    ui.label(egui::RichText::new("No log output").weak());
                }
                for line in lines {
                    ui.monospace(line);
                }
            });
    }

    action
}

fn confirm_delete(case: &str) -> bool {
    let result = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title("Delete case")
        .set_description(format!("Delete case {} and all its results?", case))
        .set_buttons(rfd::MessageButtons::YesNo)
        .show();
    result == rfd::MessageDialogResult::Yes
}
