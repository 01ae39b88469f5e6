mod engine;
mod model;
mod ui;

use anyhow::anyhow;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // --- Environment ---
    dotenvy::dotenv().ok();

    // --- Logging ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = ui::settings_io::load_settings();
    info!(provider = settings.provider.label(), model = %settings.model, "settings loaded");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([960.0, 680.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Cafe Trainer"),
        ..Default::default()
    };

    eframe::run_native(
        "Cafe Trainer",
        options,
        Box::new(|cc| Ok(Box::new(ui::app::TutorApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow!("failed to start the window: {e}"))
}
