//! Musicbox - Single-Screen Music Player
//!
//! This is the main entry point for the Musicbox player application.
//! It initializes logging, loads the user settings and the track list,
//! and starts the Libadwaita main loop.

use {anyhow::Error, libadwaita::glib::ExitCode, tracing::info};

use musicbox::{
    config::{SettingsManager, TrackList, UserSettings},
    error::{ErrorReporter, ResultExt, UiError},
    logging::init_logging,
    ui::MusicboxApplication,
};

/// Main entry point for the Musicbox application.
///
/// Settings or track-list errors abort startup with a failure exit code.
#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let (settings, tracks) = match load_configuration() {
        Ok(configuration) => configuration,
        Err(e) => {
            ErrorReporter::error(&e, "startup");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = libadwaita::init()
        .map_err(|e| UiError::InitializationError(e.to_string()))
        .add_context("Failed to initialize Libadwaita")
    {
        ErrorReporter::error(&e, "startup");
        return ExitCode::FAILURE;
    }

    info!(
        "Starting Musicbox with assets from {}",
        settings.assets_dir.display()
    );
    let app = MusicboxApplication::new(settings, tracks);
    app.run()
}

/// Loads user settings and builds the track list from them.
fn load_configuration() -> Result<(UserSettings, TrackList), Error> {
    let manager = SettingsManager::new().add_context("Failed to load settings")?;
    let settings = manager.get_settings().clone();
    let tracks = TrackList::from_settings(&settings).add_contextf(format!(
        "Failed to build track list from {}",
        manager.get_config_path().display()
    ))?;
    Ok((settings, tracks))
}
