//! Markshot - Command-line entry point
//!
//! Renders a markdown file with a theme and exports it as an image.
//!
//! ```text
//! markshot <input.md> [theme-id]
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info};

use markshot::config::load_config;
use markshot::export::{
    CaptureTarget, ExportController, ExportStatus, Exporter, SoftwareHost, SystemClipboard,
};
use markshot::preview::render_preview;
use markshot::theme::presets;
use markshot::{Error, Result};

/// Application name constant.
const APP_NAME: &str = "Markshot";

fn usage() -> String {
    let themes: Vec<String> = presets::all().into_iter().map(|t| t.id).collect();
    format!(
        "Usage: markshot <input.md> [theme-id]\nThemes: {}",
        themes.join(", ")
    )
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        eprintln!("{}", usage());
        return ExitCode::FAILURE;
    };

    info!("Starting {}", APP_NAME);
    let settings = load_config();

    let theme_id = args.next().unwrap_or_else(|| settings.default_theme.clone());
    let Some(theme) = presets::find(&theme_id) else {
        eprintln!("Unknown theme '{}'\n{}", theme_id, usage());
        return ExitCode::FAILURE;
    };

    let source = match read_input(&input) {
        Ok(source) => source,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let export = &settings.export;
    let exporter = Exporter::new(SoftwareHost::new(), export.to_pipeline_config());
    let controller = ExportController::new(
        exporter,
        export.to_delivery_config(),
        SystemClipboard,
        settings.status_reset(),
    );

    let live = render_preview(&source, &theme);
    let outcome = controller
        .trigger(&source, &live, &CaptureTarget::preview(), &theme, &export.to_options())
        .await;

    match outcome.map(|o| o.status) {
        Some(ExportStatus::Success(message)) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Some(ExportStatus::Error(message)) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
        Some(ExportStatus::Idle) | None => ExitCode::FAILURE,
    }
}
