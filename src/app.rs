// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the session controller and the request dispatcher. Each
//! frame it feeds finished replies and the clock into the controller, draws
//! the panels, turns their actions into controller calls and hands the
//! queued requests to the worker threads.

use crate::config::AppConfig;
use crate::io::api::HttpApi;
use crate::io::worker::Dispatcher;
use crate::session::controller::{SessionController, View};
use crate::ui::{canvas, cases, notice, properties, results, toolbar};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Main application state.
pub struct SegViewApp {
    controller: SessionController,

    dispatcher: Dispatcher,

    /// Texture of the displayed slice, tagged with the presenter version
    slice_texture: Option<(u64, egui::TextureHandle)>,
}

impl SegViewApp {
    /// Create the application and request the initial case list.
    pub fn new(cc: &eframe::CreationContext<'_>, config: &AppConfig) -> Self {
        log::info!("Using segmentation service at {}{}", config.server_url, config.api_prefix);
        let api = HttpApi::new(&config.server_url, &config.api_prefix, config.request_timeout());
        let dispatcher = Dispatcher::new(Arc::new(api)).with_repaint(cc.egui_ctx.clone());

        let mut controller = SessionController::new(config.timings());
        controller.refresh_cases();

        let mut app = Self {
            controller,
            dispatcher,
            slice_texture: None,
        };
        app.flush_requests();
        app
    }

    fn flush_requests(&mut self) {
        for request in self.controller.take_requests() {
            self.dispatcher.dispatch(request);
        }
    }

    /// Upload the presenter's image when it changed.
    fn sync_texture(&mut self, ctx: &egui::Context) {
        match self.controller.displayed_slice() {
            Some(shown) => {
                let current = self.slice_texture.as_ref().map(|(version, _)| *version);
                if current != Some(shown.version) {
                    let texture = ctx.load_texture(
                        "ct_slice",
                        shown.image.to_color_image(),
                        egui::TextureOptions::LINEAR,
                    );
                    self.slice_texture = Some((shown.version, texture));
                }
            }
            None => self.slice_texture = None,
        }
    }

    /// Export the points of the selected case to a file.
    fn export_points(&mut self, path: PathBuf) {
        if let Err(e) = self.controller.export_points_to(&path, Instant::now()) {
            log::debug!("Export to {} failed: {:#}", path.display(), e);
        }
    }

    fn download_results(&mut self, case: &str) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Zip archive", &["zip"])
            .set_file_name(format!("{}_results.zip", case))
            .save_file()
        {
            self.controller.download_results(case, path);
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let Some(current) = self.controller.session().map(|s| s.current_slice as i64) else {
            return;
        };
        let step = ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowUp) || i.key_pressed(egui::Key::PageUp) {
                1
            } else if i.key_pressed(egui::Key::ArrowDown) || i.key_pressed(egui::Key::PageDown) {
                -1
            } else {
                0
            }
        });
        if step != 0 {
            if let Err(e) = self.controller.change_slice(current + step) {
                log::debug!("Slice change ignored: {}", e);
            }
        }
    }

    fn show_menu(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Refresh Cases").clicked() {
                        self.controller.refresh_cases();
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_case = self.controller.selected_case().is_some();
                    ui.add_enabled_ui(has_case, |ui| {
                        ui.menu_button("Export Points", |ui| {
                            if ui.button("Export as YAML...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("YAML", &["yaml", "yml"])
                                    .set_file_name("points.yaml")
                                    .save_file()
                                {
                                    self.export_points(path);
                                }
                                ui.close_menu();
                            }
                            if ui.button("Export as JSON...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("JSON", &["json"])
                                    .set_file_name("points.json")
                                    .save_file()
                                {
                                    self.export_points(path);
                                }
                                ui.close_menu();
                            }
                        });
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        self.controller.shutdown();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("View", |ui| {
                    let in_results = matches!(self.controller.view(), View::Results(_));
                    if ui.add_enabled(in_results, egui::Button::new("Viewer")).clicked() {
                        self.controller.show_viewer();
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn show_viewer(&mut self, ctx: &egui::Context, now: Instant) {
        // Toolbar
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, self.controller.session(), self.controller.mode()))
            .inner;

        match toolbar_action {
            toolbar::ToolbarAction::SetMode(mode) => self.controller.set_mode(mode),
            toolbar::ToolbarAction::ChangeSlice(index) => {
                if let Err(e) = self.controller.change_slice(index) {
                    log::warn!("Slice change rejected: {}", e);
                }
            }
            toolbar::ToolbarAction::Clear => {
                if let Err(e) = self.controller.clear_segmentation(now) {
                    log::debug!("Clear rejected: {}", e);
                }
            }
            toolbar::ToolbarAction::None => {}
        }

        // Information panel (right side)
        egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| {
                properties::show(ui, self.controller.session(), self.controller.current_points())
            });

        // Main canvas (center)
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let session = self.controller.session();
                let view = canvas::CanvasView {
                    case: self.controller.selected_case(),
                    texture: self.slice_texture.as_ref().map(|(_, t)| t),
                    volume: session.and_then(|s| s.volume.as_ref()),
                    current_slice: session.map(|s| s.current_slice).unwrap_or(0),
                    points: self.controller.current_points(),
                    mode: self.controller.mode(),
                    busy: self.controller.is_busy(),
                    loading: self.controller.image_loading(),
                };
                canvas::show(ui, &view)
            })
            .inner;

        if let canvas::CanvasAction::Click { x, y, rect } = canvas_action {
            match self.controller.click(x, y, &rect, now) {
                Ok(point) => log::debug!("Submitted point {:?}", point),
                Err(e) if e.is_local() => log::debug!("Click rejected: {}", e),
                Err(e) => log::warn!("Click failed: {}", e),
            }
        }
    }

    fn show_results(&mut self, ctx: &egui::Context, case: &str) {
        let action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let status = self
                    .controller
                    .job_status()
                    .filter(|(c, _)| *c == case)
                    .map(|(_, s)| s);
                results::show(ui, case, status)
            })
            .inner;

        match action {
            results::ResultsAction::Download => self.download_results(case),
            results::ResultsAction::Back => self.controller.show_viewer(),
            results::ResultsAction::None => {}
        }
    }
}

impl eframe::App for SegViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // Apply finished requests, then timers
        for reply in self.dispatcher.poll_replies() {
            self.controller.handle(reply, now);
        }
        self.controller.tick(now);
        self.sync_texture(ctx);

        self.show_menu(ctx);

        if let Some(notification) = self.controller.notification() {
            let dismissed = egui::TopBottomPanel::top("notification")
                .show(ctx, |ui| notice::show(ui, notification))
                .inner;
            if dismissed {
                self.controller.dismiss_notification();
            }
        }

        // Case list (left side)
        let cases_action = egui::SidePanel::left("cases")
            .default_width(230.0)
            .show(ctx, |ui| {
                let view = cases::CasesView {
                    cases: self.controller.cases(),
                    selected: self.controller.selected_case(),
                    processing_active: self.controller.processing_active(),
                    job: self.controller.job_status(),
                    logs: self.controller.logs(),
                };
                cases::show(ui, &view)
            })
            .inner;

        match cases_action {
            cases::CasesAction::Refresh => self.controller.refresh_cases(),
            cases::CasesAction::Select(name) => {
                self.controller.show_viewer();
                self.controller.select_case(&name);
            }
            cases::CasesAction::Process(name) => {
                if let Err(e) = self.controller.start_processing(&name, now) {
                    log::warn!("Cannot start processing {}: {}", name, e);
                }
            }
            cases::CasesAction::Delete(name) => self.controller.delete_case(&name),
            cases::CasesAction::FetchLogs(name) => self.controller.fetch_logs(&name),
            cases::CasesAction::None => {}
        }

        match self.controller.view().clone() {
            View::Viewer => {
                self.handle_keyboard(ctx);
                self.show_viewer(ctx, now);
            }
            View::Results(case) => self.show_results(ctx, &case),
        }

        self.flush_requests();

        // Wake up for the next notification expiry or poll
        if let Some(deadline) = self.controller.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
    }
}

impl Drop for SegViewApp {
    fn drop(&mut self) {
        self.controller.shutdown();
        log::info!("Session closed");
    }
}
