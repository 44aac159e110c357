//! Audio playback system.
//!
//! Provides the `MediaPlayer` capability and its desktop implementation
//! built on symphonia, cpal, rtrb and rubato. Includes components for
//! decoding, output, metadata extraction and resampling.

pub mod decoder;
pub mod engine;
pub mod metadata;
pub mod output;
pub mod player;
pub mod resampler;
#[cfg(test)]
pub mod test_fixtures;

pub use {
    engine::{AudioEngine, TrackInfo},
    output::OutputConfig,
    player::{MediaPlayer, PlayerState},
};
