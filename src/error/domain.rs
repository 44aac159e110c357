//! Domain-specific error types using `thiserror`.
//!
//! This module defines the main error enums for the playback and UI layers
//! of the player.

use thiserror::Error;

use crate::audio::{
    decoder::DecoderError, metadata::MetadataError, output::OutputError,
    resampler::ResamplingError,
};

/// Audio-related errors.
///
/// Returned by every `MediaPlayer` operation and propagated unchanged by the
/// transport controller.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Decoder error from the audio decoder module.
    #[error("Decoder error: {0}")]
    DecoderError(#[from] DecoderError),
    /// Output error from the audio output module.
    #[error("Output error: {0}")]
    OutputError(#[from] OutputError),
    /// Metadata error from the metadata extraction module.
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),
    /// Sample rate converter could not be created.
    #[error("Resampling error: {0}")]
    ResamplingError(#[from] ResamplingError),
    /// Invalid operation for current state.
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },
    /// Track not found or not loaded.
    #[error("No track loaded")]
    NoTrackLoaded,
}

/// UI-related errors.
#[derive(Error, Debug)]
pub enum UiError {
    /// GTK/Libadwaita initialization error.
    #[error("UI initialization error: {0}")]
    InitializationError(String),
    /// A transport operation failed and the screen cannot continue.
    #[error("Playback failed: {0}")]
    PlaybackFailed(#[from] AudioError),
}
