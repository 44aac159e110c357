//! User preferences and the bundled track list.
//!
//! This module provides settings loading with XDG Base Directory compliance
//! and the immutable track list the transport controller plays from.

pub mod settings;
pub mod tracks;

pub use {
    settings::{BUNDLED_TRACKS, SettingsError, SettingsManager, UserSettings, get_config_path},
    tracks::{TrackList, TrackListError},
};
