//! Desktop client for the media download service.
//!
//! Looks up video metadata, starts a server-side download job, follows its
//! progress once a second and saves the finished file locally.

// Backend API client
mod api;
// eframe front end
mod app;
// Environment configuration
mod config;
// Page controller: actions, events and the tracked job
mod controller;
// Error types for API calls and file retrieval
mod error;
// Display formatting helpers
mod format;
// Wire data model
mod model;
// Recurring progress poll
mod progress;
// Saving finished files
mod retrieve;
// Thumbnail fetching
mod thumbnail;
// Plain view state
mod view;

use std::sync::Arc;

use eframe::egui::Visuals;
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;

use app::VidgrabApp;
use config::Config;

// Global Tokio runtime; API calls and the poll timer live on it for the
// whole process
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: logging, runtime, then the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidgrab=info".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "using server {} (files go to {})",
        config.server,
        config.download_dir.display()
    );

    let runtime = RUNTIME.get_or_try_init(|| Runtime::new().map(Arc::new))?;
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Descargador de YouTube",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(VidgrabApp::new(config, handle))
        }),
    )?;
    Ok(())
}
