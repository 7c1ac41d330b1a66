// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SegView - Interactive CT Segmentation Viewer
//!
//! A desktop client for a remote segmentation service: browse uploaded CT
//! volumes slice by slice, refine the organ mask with positive and negative
//! clicks, and run the batch segmentation job.

mod app;
mod config;
mod error;
mod io;
mod models;
mod session;
mod ui;
mod util;

use anyhow::Result;
use app::SegViewApp;
use config::AppConfig;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Optional config file as first argument
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    // Initialize logging; RUST_LOG still wins over the config file
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("SegView - Interactive Segmentation Viewer"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "SegView",
        options,
        Box::new(move |cc| Ok(Box::new(SegViewApp::new(cc, &config)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
