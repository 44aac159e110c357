//! Displayed state of the transport controls.
//!
//! The controller owns a `ControlsState` and mutates it on every transition;
//! the UI layer renders it onto its widgets without further logic.

use serde::{Deserialize, Serialize};

/// Transport state as presented on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// Initial state, or after `stop()`.
    Stopped,
    /// A track was loaded after a track change and has not been started.
    Ready,
    /// The engine is playing.
    Playing,
    /// The engine is paused mid-track.
    Paused,
}

/// Button enablement, track label and seek-bar values shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlsState {
    /// Current transport state.
    pub state: TransportState,
    /// Name of the loaded track.
    pub track_name: String,
    /// Whether the play button accepts clicks.
    pub play_enabled: bool,
    /// Whether the pause button accepts clicks.
    pub pause_enabled: bool,
    /// Whether the stop button accepts clicks.
    pub stop_enabled: bool,
    /// Whether the seek bar accepts drags.
    pub seek_enabled: bool,
    /// Seek-bar upper bound, the loaded track's duration in milliseconds.
    pub seek_max: u64,
    /// Seek-bar value in milliseconds.
    pub progress: u64,
}

impl Default for ControlsState {
    fn default() -> Self {
        Self {
            state: TransportState::Stopped,
            track_name: String::new(),
            play_enabled: true,
            pause_enabled: false,
            stop_enabled: false,
            seek_enabled: true,
            seek_max: 0,
            progress: 0,
        }
    }
}

impl ControlsState {
    /// Applies the button enablement for a transport state.
    ///
    /// `Stopped` also disables the seek bar and resets progress to 0.
    /// `Ready` only records the state.
    pub fn apply(&mut self, state: TransportState) {
        self.state = state;
        match state {
            TransportState::Playing => {
                self.play_enabled = false;
                self.pause_enabled = true;
                self.stop_enabled = true;
                self.seek_enabled = true;
            }
            TransportState::Paused => {
                self.play_enabled = true;
                self.pause_enabled = false;
                self.stop_enabled = true;
            }
            // A track change leaves the buttons as they were.
            TransportState::Ready => {}
            TransportState::Stopped => {
                self.play_enabled = true;
                self.pause_enabled = false;
                self.stop_enabled = false;
                self.seek_enabled = false;
                self.progress = 0;
            }
        }
    }

    /// Shows a freshly loaded track: label, seek-bar bound and zero progress.
    pub fn show_track(&mut self, track_name: &str, duration_ms: u64) {
        track_name.clone_into(&mut self.track_name);
        self.seek_max = duration_ms;
        self.progress = 0;
    }
}

/// Formats milliseconds as `m:ss`.
///
/// # Arguments
///
/// * `ms` - Time in milliseconds
///
/// # Returns
///
/// A string such as `"3:07"`; minutes are not capped at 59.
#[must_use]
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use crate::transport::controls::{
        ControlsState,
        TransportState::{Paused, Playing, Ready, Stopped},
        format_time,
    };

    #[test]
    fn test_default_controls() {
        let controls = ControlsState::default();
        assert_eq!(controls.state, Stopped);
        assert!(controls.play_enabled);
        assert!(!controls.pause_enabled);
        assert!(!controls.stop_enabled);
        assert!(controls.seek_enabled);
    }

    #[test]
    fn test_playing_controls() {
        let mut controls = ControlsState::default();
        controls.apply(Playing);
        assert!(!controls.play_enabled);
        assert!(controls.pause_enabled);
        assert!(controls.stop_enabled);
        assert!(controls.seek_enabled);
    }

    #[test]
    fn test_paused_keeps_seek_bar() {
        let mut controls = ControlsState::default();
        controls.apply(Playing);
        controls.progress = 4200;
        controls.apply(Paused);
        assert!(controls.play_enabled);
        assert!(!controls.pause_enabled);
        assert!(controls.stop_enabled);
        assert!(controls.seek_enabled);
        assert_eq!(controls.progress, 4200);
    }

    #[test]
    fn test_stopped_resets_progress_and_disables_seek() {
        let mut controls = ControlsState::default();
        controls.apply(Playing);
        controls.progress = 4200;
        controls.apply(Stopped);
        assert_eq!(controls.progress, 0);
        assert!(!controls.seek_enabled);
        assert!(controls.play_enabled);
        assert!(!controls.stop_enabled);
    }

    #[test]
    fn test_ready_keeps_buttons() {
        let mut controls = ControlsState::default();
        controls.apply(Stopped);
        controls.apply(Ready);
        assert_eq!(controls.state, Ready);
        assert!(!controls.seek_enabled);
        assert!(controls.play_enabled);

        controls.apply(Playing);
        controls.apply(Paused);
        controls.apply(Ready);
        assert!(controls.stop_enabled);
        assert!(controls.seek_enabled);
        assert!(!controls.pause_enabled);
    }

    #[test]
    fn test_show_track() {
        let mut controls = ControlsState::default();
        controls.progress = 999;
        controls.show_track("02-Narodziny-swiata.mp3", 215_000);
        assert_eq!(controls.track_name, "02-Narodziny-swiata.mp3");
        assert_eq!(controls.seek_max, 215_000);
        assert_eq!(controls.progress, 0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(999), "0:00");
        assert_eq!(format_time(187_000), "3:07");
        assert_eq!(format_time(3_600_000), "60:00");
    }
}
