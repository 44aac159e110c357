//! Media player capability consumed by the transport controller.
//!
//! This module defines the `MediaPlayer` trait, the narrow surface the
//! controller needs from a decoding engine, together with the engine-level
//! state machine shared by implementations.

use std::path::Path;

use {
    async_channel::Receiver,
    serde::{Deserialize, Serialize},
};

use crate::error::AudioError;

/// Engine-level state of a media player.
///
/// Mirrors the lifecycle of a platform media player: a source must be bound
/// and prepared before the player can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// No source bound.
    Idle,
    /// Source bound but not prepared.
    Initialized,
    /// Source prepared and ready to start.
    Prepared,
    /// Playing.
    Started,
    /// Paused mid-track.
    Paused,
    /// Stopped; needs `prepare()` before it can start again.
    Stopped,
    /// Reached the end of the source.
    PlaybackCompleted,
}

impl PlayerState {
    /// Returns whether a decodable source is currently prepared.
    #[must_use]
    pub fn is_prepared(self) -> bool {
        matches!(
            self,
            Self::Prepared | Self::Started | Self::Paused | Self::PlaybackCompleted
        )
    }
}

/// Playback capability of a media engine.
///
/// All methods are called from the UI thread. Implementations report
/// natural end-of-track through the receiver returned by
/// [`MediaPlayer::completion_events`].
pub trait MediaPlayer {
    /// Binds the player to an audio source. Only valid from `Idle`.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player is not idle or the source cannot be opened.
    fn set_source(&mut self, path: &Path) -> Result<(), AudioError>;

    /// Prepares the bound source synchronously.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if no source is bound or it cannot be decoded.
    fn prepare(&mut self) -> Result<(), AudioError>;

    /// Starts or resumes playback.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the source is not prepared or the output fails.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Pauses playback.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player is not started or paused.
    fn pause(&mut self) -> Result<(), AudioError>;

    /// Stops playback. The source stays bound but must be prepared again.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player has no bound source.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Seeks to `position_ms`. Out-of-range targets are handled by the engine.
    ///
    /// Seeking without a prepared source is ignored. A pending completion
    /// notification is discarded, since it belongs to the old position.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if seeking fails.
    fn seek_to(&mut self, position_ms: i64) -> Result<(), AudioError>;

    /// Releases the source and returns to `Idle`.
    fn reset(&mut self);

    /// Current playback position in milliseconds.
    fn current_position(&self) -> u64;

    /// Duration of the prepared source in milliseconds, 0 if none.
    fn duration(&self) -> u64;

    /// Whether audio is currently being rendered.
    fn is_playing(&self) -> bool;

    /// Receiver notified once each time a track plays to its end.
    fn completion_events(&self) -> Receiver<()>;
}

#[cfg(test)]
mod tests {
    use crate::audio::player::PlayerState::{
        Idle, Initialized, Paused, PlaybackCompleted, Prepared, Started, Stopped,
    };

    #[test]
    fn test_prepared_states() {
        assert!(!Idle.is_prepared());
        assert!(!Initialized.is_prepared());
        assert!(!Stopped.is_prepared());
        assert!(Prepared.is_prepared());
        assert!(Started.is_prepared());
        assert!(Paused.is_prepared());
        assert!(PlaybackCompleted.is_prepared());
    }
}
