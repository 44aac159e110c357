//! Libadwaita user interface.
//!
//! This module provides the application shell and the single player window
//! that renders the transport controls.

pub mod application;
pub mod player_screen;

pub use {application::MusicboxApplication, player_screen::PlayerScreen};
