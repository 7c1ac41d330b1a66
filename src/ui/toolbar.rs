// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with slice navigation, interaction mode and clear.

use crate::models::point::InteractionMode;
use crate::session::controller::SessionState;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    SetMode(InteractionMode),
    ChangeSlice(i64),
    Clear,
}

/// Display the toolbar for the selected case.
pub fn show(ui: &mut egui::Ui, session: Option<&SessionState>, mode: InteractionMode) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Mode:");
        let mut selected = mode;
        ui.radio_value(&mut selected, InteractionMode::Positive, "Positive (include)");
        ui.radio_value(&mut selected, InteractionMode::Negative, "Negative (exclude)");
        if selected != mode {
            action = ToolbarAction::SetMode(selected);
        }

        ui.separator();

        let Some(session) = session else {
            ui.label(egui::RichText::new("Select a case to navigate slices").italics().weak());
            return;
        };
        let Some(ref volume) = session.volume else {
            ui.spinner();
            return;
        };

        let mut slice = session.current_slice;
        let slider = egui::Slider::new(&mut slice, 0..=volume.max_slice).text("Slice");
        if ui.add(slider).changed() && slice != session.current_slice {
            action = ToolbarAction::ChangeSlice(slice as i64);
        }

        ui.separator();

        let clear = egui::Button::new("Clear Segmentation");
        if ui.add_enabled(!session.requesting, clear).clicked() {
            action = ToolbarAction::Clear;
        }

        ui.label(
            egui::RichText::new(format!("Click to add {} points", mode.label().to_lowercase()))
                .italics()
                .weak(),
        );
    });

    action
}
