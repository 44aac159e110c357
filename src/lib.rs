//! Musicbox - Single-Screen Music Player
//!
//! Plays a fixed list of bundled tracks with play, pause, stop, next,
//! previous, seek and skip controls. Built with symphonia and cpal for
//! playback and Libadwaita for the user interface.

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod transport;
#[cfg(feature = "gui")]
pub mod ui;

// Re-export key types for convenience
pub use {
    audio::{AudioEngine, MediaPlayer, PlayerState, TrackInfo},
    config::{SettingsManager, TrackList, UserSettings},
    error::{AudioError, UiError},
    transport::{ControlsState, TransportController, TransportState},
};
#[cfg(feature = "gui")]
pub use ui::MusicboxApplication;
