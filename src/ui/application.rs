//! Application lifecycle.
//!
//! This module implements the `MusicboxApplication`, which owns the
//! Libadwaita application and builds the player window on activation.

use {
    anyhow::Error,
    libadwaita::{
        Application,
        glib::ExitCode,
        prelude::{ApplicationExt, ApplicationExtManual},
    },
    tracing::info,
};

use crate::{
    audio::{engine::AudioEngine, output::OutputConfig},
    config::{settings::UserSettings, tracks::TrackList},
    error::{ErrorReporter, UiError},
    transport::TransportController,
    ui::player_screen::PlayerScreen,
};

/// Application identifier registered with the session bus.
pub const APPLICATION_ID: &str = "org.example.Musicbox";

/// Main application class.
///
/// The `MusicboxApplication` manages the application instance and the
/// configuration the player window is built from.
pub struct MusicboxApplication {
    /// The main application instance.
    pub app: Application,
    /// User settings.
    pub settings: UserSettings,
    /// Bundled track list.
    pub tracks: TrackList,
}

impl MusicboxApplication {
    /// Creates a new application instance.
    ///
    /// # Arguments
    ///
    /// * `settings` - Validated user settings
    /// * `tracks` - Track list to play from
    ///
    /// # Returns
    ///
    /// A new `MusicboxApplication`.
    #[must_use]
    pub fn new(settings: UserSettings, tracks: TrackList) -> Self {
        let app = Application::builder()
            .application_id(APPLICATION_ID)
            .build();

        Self {
            app,
            settings,
            tracks,
        }
    }

    /// Runs the application.
    ///
    /// This method starts the GTK main loop and displays the player window.
    ///
    /// # Returns
    ///
    /// The exit code of the main loop.
    pub fn run(&self) -> ExitCode {
        self.app.connect_activate({
            let settings = self.settings.clone();
            let tracks = self.tracks.clone();

            move |app| build_ui(app, &settings, &tracks)
        });

        self.app.run_with_args::<&str>(&[])
    }
}

/// Builds the player window, or quits if the first track cannot be loaded.
fn build_ui(app: &Application, settings: &UserSettings, tracks: &TrackList) {
    let engine = AudioEngine::new(OutputConfig {
        buffer_duration_ms: settings.buffer_duration_ms,
    });

    let controller = match TransportController::new(engine, tracks.clone()) {
        Ok(controller) => controller,
        Err(e) => {
            let context = "Failed to load the first track";
            ErrorReporter::error(&Error::new(UiError::from(e)).context(context), context);
            app.quit();
            return;
        }
    };

    info!(
        "MusicboxApplication: Player ready with {} tracks",
        tracks.len()
    );
    let screen = PlayerScreen::new(app, controller, settings);
    screen.present();
}
