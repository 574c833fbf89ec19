// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zonewatch - crowd monitoring zone editor
//!
//! A desktop client for drawing rectangular monitoring zones over an
//! uploaded video or the live camera, storing them with the remote zone
//! service and previewing the service's tracking overlay.

mod app;
mod config;
mod error;
mod io;
mod models;
mod state;
mod ui;
mod util;

use anyhow::{Context, Result};
use app::ZoneApp;
use config::AppConfig;
use io::client::ServiceClient;

fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    // RUST_LOG still wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_filter())).init();
    log::info!("Zone service at {}", config.server_url);

    let client = ServiceClient::new(&config).context("Failed to create the service client")?;
    if let Some((username, password)) = config.credentials() {
        if let Err(e) = client.login(username, password) {
            log::warn!("Login failed, continuing without a session: {}", e);
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Zonewatch - Crowd Monitoring Zones"),
        ..Default::default()
    };

    eframe::run_native(
        "Zonewatch",
        options,
        Box::new(move |cc| Ok(Box::new(ZoneApp::new(cc, &config, client)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
