// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SEGTRACK - interactive video object segmentation
//!
//! A desktop client for a segmentation backend: upload a video, mark
//! objects with positive and negative points, preview per-frame masks
//! and track the objects through the whole video.

mod app;
mod config;
mod controller;
mod io;
mod models;
mod ui;
mod util;

use anyhow::{Context, Result};
use app::SegtrackApp;
use clap::Parser;
use config::Config;
use controller::Controller;
use io::api::HttpBackend;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "segtrack", version, about = "Interactive video object segmentation client")]
struct Args {
    /// Video to upload at startup
    video: Option<PathBuf>,

    /// Base URL of the segmentation backend
    #[arg(long)]
    backend_url: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mask opacity (0.0 to 1.0)
    #[arg(long)]
    opacity: Option<f32>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG still wins when set
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(url) = args.backend_url {
        config.backend_url = url;
    }
    if let Some(opacity) = args.opacity {
        config.mask_opacity = opacity;
    }
    let config = config.validated();
    log::info!("Using backend at {}", config.backend_url);

    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .context("Failed to create backend client")?;
    let controller = Controller::new(Arc::new(backend), config.hit_radius);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_drag_and_drop(true)
            .with_title("SEGTRACK - Interactive Video Segmentation"),
        ..Default::default()
    };

    let video = args.video;
    eframe::run_native(
        "SEGTRACK",
        options,
        Box::new(move |_cc| Ok(Box::new(SegtrackApp::new(controller, &config, video)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
