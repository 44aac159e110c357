//! Playback transport: the controller and the controls state it drives.
//!
//! The controller is toolkit-independent; the `ui` module renders its
//! `ControlsState` and forwards widget events to it.

pub mod controller;
pub mod controls;

pub use {
    controller::TransportController,
    controls::{ControlsState, TransportState, format_time},
};
