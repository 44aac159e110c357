//! Immutable bundled track list.
//!
//! The list is built once at startup from `UserSettings` and handed to the
//! transport controller, which only ever reads it.

use std::path::{Path, PathBuf};

use {thiserror::Error, tracing::debug};

use crate::config::settings::UserSettings;

/// Error type for track list construction.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrackListError {
    /// No tracks were supplied.
    #[error("Track list is empty")]
    Empty,
    /// A track identifier is blank.
    #[error("Track identifier at position {index} is blank")]
    BlankIdentifier { index: usize },
}

/// Ordered, fixed sequence of track identifiers resolved against an asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackList {
    /// Directory the identifiers are resolved against.
    assets_dir: PathBuf,
    /// Track file names, in playback order. Never empty.
    names: Vec<String>,
}

impl TrackList {
    /// Creates a track list.
    ///
    /// # Arguments
    ///
    /// * `assets_dir` - Directory containing the track files
    /// * `names` - Track file names in playback order
    ///
    /// # Errors
    ///
    /// Returns `TrackListError` if `names` is empty or contains a blank entry.
    pub fn new(assets_dir: impl Into<PathBuf>, names: Vec<String>) -> Result<Self, TrackListError> {
        if names.is_empty() {
            return Err(TrackListError::Empty);
        }
        if let Some(index) = names.iter().position(|name| name.trim().is_empty()) {
            return Err(TrackListError::BlankIdentifier { index });
        }

        let assets_dir = assets_dir.into();
        debug!(
            "TrackList: {} tracks under {}",
            names.len(),
            assets_dir.display()
        );

        Ok(Self { assets_dir, names })
    }

    /// Builds the track list described by the user settings.
    ///
    /// # Errors
    ///
    /// Returns `TrackListError` if the configured list is empty or has blank entries.
    pub fn from_settings(settings: &UserSettings) -> Result<Self, TrackListError> {
        Self::new(settings.assets_dir.clone(), settings.tracks.clone())
    }

    /// Number of tracks, always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the list is empty. Never true for a constructed list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Asset directory.
    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Display name of the track at `index`, wrapped into range.
    #[must_use]
    pub fn name(&self, index: usize) -> &str {
        &self.names[index % self.len()]
    }

    /// Resolved path of the track at `index`, wrapped into range.
    #[must_use]
    pub fn path(&self, index: usize) -> PathBuf {
        self.assets_dir.join(self.name(index))
    }

    /// Index after `index`, wrapping to 0 past the last track.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.len()
    }

    /// Index before `index`, wrapping to the last track from 0.
    #[must_use]
    pub fn previous_index(&self, index: usize) -> usize {
        if index == 0 {
            self.len() - 1
        } else {
            (index - 1) % self.len()
        }
    }

    /// Iterates over the track names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
