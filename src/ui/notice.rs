// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Notification banner.

use crate::session::notify::{Notification, Severity};

fn severity_color(severity: Severity) -> egui::Color32 {
    match severity {
        Severity::Info => egui::Color32::from_rgb(70, 130, 200),
        Severity::Success => egui::Color32::from_rgb(60, 170, 90),
        Severity::Warning => egui::Color32::from_rgb(220, 170, 40),
        Severity::Error => egui::Color32::from_rgb(210, 70, 70),
    }
}

/// Draw the banner. Returns true when the user dismissed it.
pub fn show(ui: &mut egui::Ui, notification: &Notification) -> bool {
    let mut dismissed = false;
    egui::Frame::none()
        .fill(severity_color(notification.severity).linear_multiply(0.25))
        .inner_margin(egui::Margin::symmetric(8.0, 4.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(
                    severity_color(notification.severity),
                    &notification.message,
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("✖").clicked() {
                        dismissed = true;
                    }
                });
            });
        });
    dismissed
}
