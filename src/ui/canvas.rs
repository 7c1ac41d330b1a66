// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Slice canvas.
//!
//! This module draws the current CT slice (with the mask overlay when the
//! service provides one) and the interaction points of that slice, and
//! reports clicks on the image.

use crate::models::case::VolumeInfo;
use crate::models::point::{InteractionMode, InteractionPoint};
use crate::util::geometry::{voxel_to_display, DisplayRect};

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    /// Pointer click at screen position inside (or near) the image
    Click { x: f32, y: f32, rect: DisplayRect },
}

/// What the canvas needs to draw one frame.
pub struct CanvasView<'a> {
    pub case: Option<&'a str>,
    pub texture: Option<&'a egui::TextureHandle>,
    pub volume: Option<&'a VolumeInfo>,
    pub current_slice: u32,
    pub points: &'a [InteractionPoint],
    pub mode: InteractionMode,
    pub busy: bool,
    pub loading: bool,
}

/// Display the slice canvas and handle mouse interactions.
pub fn show(ui: &mut egui::Ui, view: &CanvasView<'_>) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let (Some(texture), Some(volume)) = (view.texture, view.volume) else {
            show_placeholder(ui, view);
            return;
        };

        // Fit the volume's in-plane extent into the available space
        let available = ui.available_size();
        let img_aspect = volume.width() as f32 / volume.height().max(1) as f32;
        let available_aspect = available.x / available.y.max(1.0);
        let (display_width, display_height) = if img_aspect > available_aspect {
            (available.x, available.x / img_aspect)
        } else {
            (available.y * img_aspect, available.y)
        };

        let x_offset = (available.x - display_width) / 2.0;
        let y_offset = (available.y - display_height) / 2.0;
        let image_rect = egui::Rect::from_min_size(
            ui.min_rect().min + egui::vec2(x_offset, y_offset),
            egui::vec2(display_width, display_height),
        );
        let display_rect = DisplayRect::new(
            image_rect.min.x,
            image_rect.min.y,
            image_rect.width(),
            image_rect.height(),
        );

        ui.painter().image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let cursor = if view.busy {
            egui::CursorIcon::Wait
        } else {
            egui::CursorIcon::Crosshair
        };
        let response = ui
            .allocate_rect(image_rect, egui::Sense::click())
            .on_hover_cursor(cursor);

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                action = CanvasAction::Click {
                    x: pos.x,
                    y: pos.y,
                    rect: display_rect,
                };
            }
        }

        let painter = ui.painter();
        for point in view.points {
            draw_point(painter, point, &display_rect, volume);
        }

        if view.busy {
            painter.text(
                image_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Processing...",
                egui::FontId::proportional(18.0),
                egui::Color32::WHITE,
            );
        }
    });

    // Status line
    ui.separator();
    ui.horizontal(|ui| {
        let (text, color) = match view.mode {
            InteractionMode::Positive => ("Positive Mode", egui::Color32::from_rgb(60, 170, 90)),
            InteractionMode::Negative => ("Negative Mode", egui::Color32::from_rgb(210, 70, 70)),
        };
        ui.colored_label(color, text);
        ui.separator();
        match (view.case, view.volume) {
            (Some(case), Some(volume)) => {
                ui.label(format!("{}  slice {} / {}", case, view.current_slice, volume.max_slice));
            }
            (Some(case), None) => {
                ui.label(format!("{}  loading volume info...", case));
            }
            _ => {
                ui.label("No case selected");
            }
        }
        if view.loading {
            ui.separator();
            ui.spinner();
        }
    });

    action
}

fn show_placeholder(ui: &mut egui::Ui, view: &CanvasView<'_>) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            if view.case.is_some() {
                if view.loading || view.volume.is_none() {
                    ui.spinner();
                }
                ui.label(
                    egui::RichText::new("Loading CT slice...")
                        .color(egui::Color32::from_gray(200)),
                );
            } else {
                ui.heading(
                    egui::RichText::new("Interactive Segmentation Viewer")
                        .size(28.0)
                        .color(egui::Color32::from_gray(200)),
                );
                ui.add_space(20.0);
                ui.label(
                    egui::RichText::new("Select a case to begin")
                        .color(egui::Color32::from_gray(180)),
                );
                ui.label(
                    egui::RichText::new("Click on organs to add positive or negative points")
                        .weak()
                        .color(egui::Color32::from_gray(130)),
                );
            }
        });
    });
}

/// Draw one interaction point as a cross: red includes, blue excludes.
fn draw_point(
    painter: &egui::Painter,
    point: &InteractionPoint,
    rect: &DisplayRect,
    volume: &VolumeInfo,
) {
    let (x, y) = voxel_to_display(point.x, point.y, rect, volume);
    let center = egui::pos2(x, y);
    let color = if point.positive {
        egui::Color32::from_rgb(230, 50, 50)
    } else {
        egui::Color32::from_rgb(60, 110, 240)
    };
    let r = 5.0;
    let stroke = egui::Stroke::new(2.0, color);
    painter.line_segment([center + egui::vec2(-r, -r), center + egui::vec2(r, r)], stroke);
    painter.line_segment([center + egui::vec2(-r, r), center + egui::vec2(r, -r)], stroke);
}
