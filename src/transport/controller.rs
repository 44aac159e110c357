//! Transport controller mediating button, seek-bar and completion events.
//!
//! The controller owns the media player and the current track index. Every
//! operation mutates the player and updates the `ControlsState` the UI
//! renders. All calls happen on the UI thread.

use {async_channel::Receiver, tracing::{debug, info, trace}};

use crate::{
    audio::player::MediaPlayer,
    config::tracks::TrackList,
    error::AudioError,
    transport::controls::{
        ControlsState,
        TransportState::{self, Paused, Playing, Ready, Stopped},
    },
};

/// Single-screen transport controller.
///
/// Generic over the `MediaPlayer` so the transport logic runs unchanged
/// against the desktop engine and against test doubles.
pub struct TransportController<P: MediaPlayer> {
    /// Exclusively owned media player.
    player: P,
    /// Immutable track list.
    tracks: TrackList,
    /// Current track index, always in `[0, tracks.len())`.
    index: usize,
    /// Whether the player holds a prepared source.
    ready: bool,
    /// Displayed controls.
    controls: ControlsState,
}

impl<P: MediaPlayer> TransportController<P> {
    /// Creates a controller and loads the first track without starting it.
    ///
    /// # Arguments
    ///
    /// * `player` - Media player the controller takes ownership of
    /// * `tracks` - Track list to play from
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the first track cannot be opened or prepared.
    pub fn new(player: P, tracks: TrackList) -> Result<Self, AudioError> {
        let mut controller = Self {
            player,
            tracks,
            index: 0,
            ready: false,
            controls: ControlsState::default(),
        };
        controller.load_track(false)?;
        controller.controls.state = Stopped;
        Ok(controller)
    }

    /// Current track index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the player holds a prepared source.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Current transport state.
    #[must_use]
    pub fn state(&self) -> TransportState {
        self.controls.state
    }

    /// Controls to render.
    #[must_use]
    pub fn controls(&self) -> &ControlsState {
        &self.controls
    }

    /// Track list.
    #[must_use]
    pub fn tracks(&self) -> &TrackList {
        &self.tracks
    }

    /// Owned media player.
    #[must_use]
    pub fn player(&self) -> &P {
        &self.player
    }

    /// Mutable access to the owned media player.
    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Current playback position in milliseconds.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.player.current_position()
    }

    /// Receiver for natural end-of-track notifications.
    #[must_use]
    pub fn completion_events(&self) -> Receiver<()> {
        self.player.completion_events()
    }

    /// Starts playback, reloading the current track first if it was stopped.
    ///
    /// Calling `play()` while already prepared only starts the player.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if reloading or starting fails.
    pub fn play(&mut self) -> Result<(), AudioError> {
        if !self.ready {
            debug!("TransportController: Reloading track {} before play", self.index);
            self.bind_current()?;
            self.controls.seek_max = self.player.duration();
            self.ready = true;
        }

        self.player.start()?;
        self.controls.apply(Playing);
        debug!("TransportController: Playing track {}", self.index);
        Ok(())
    }

    /// Pauses playback.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player cannot pause.
    pub fn pause(&mut self) -> Result<(), AudioError> {
        self.player.pause()?;
        self.controls.apply(Paused);
        debug!("TransportController: Paused at {} ms", self.player.current_position());
        Ok(())
    }

    /// Stops playback; the next `play()` reloads the track.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player cannot stop.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.player.stop()?;
        self.ready = false;
        self.controls.apply(Stopped);
        debug!("TransportController: Stopped");
        Ok(())
    }

    /// Advances to the next track, wrapping past the last one.
    ///
    /// # Arguments
    ///
    /// * `force_start` - Start the new track even if nothing was playing
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the new track cannot be loaded or started.
    pub fn next(&mut self, force_start: bool) -> Result<(), AudioError> {
        self.index = self.tracks.next_index(self.index);
        self.change_track(force_start)
    }

    /// Moves to the previous track, wrapping from the first to the last.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the new track cannot be loaded or started.
    pub fn previous(&mut self) -> Result<(), AudioError> {
        self.index = self.tracks.previous_index(self.index);
        self.change_track(false)
    }

    /// Seeks relative to the current position.
    ///
    /// The target is passed to the player unclamped; the player bounds it.
    ///
    /// # Arguments
    ///
    /// * `delta_ms` - Signed offset in milliseconds
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player rejects the seek.
    pub fn jump_by_time(&mut self, delta_ms: i64) -> Result<(), AudioError> {
        let position = i64::try_from(self.player.current_position()).unwrap_or(i64::MAX);
        let target = position.saturating_add(delta_ms);
        debug!("TransportController: Jump {delta_ms} ms from {position} ms to {target} ms");
        self.player.seek_to(target)
    }

    /// Handles a seek-bar value change.
    ///
    /// Only user-originated changes seek; programmatic updates are ignored.
    ///
    /// # Arguments
    ///
    /// * `position_ms` - New seek-bar value
    /// * `from_user` - Whether the change came from a user drag
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the player rejects the seek.
    pub fn on_seek_bar_changed(
        &mut self,
        position_ms: u64,
        from_user: bool,
    ) -> Result<(), AudioError> {
        if !from_user {
            trace!("TransportController: Ignoring programmatic seek-bar change");
            return Ok(());
        }

        debug!("TransportController: Seek bar moved to {position_ms} ms");
        self.controls.progress = position_ms;
        self.player
            .seek_to(i64::try_from(position_ms).unwrap_or(i64::MAX))
    }

    /// Handles natural end of the current track by advancing and playing on.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the next track cannot be loaded or started.
    pub fn on_track_completion(&mut self) -> Result<(), AudioError> {
        debug!("TransportController: Track {} completed", self.index);
        self.next(true)
    }

    /// Copies the player position into the displayed progress while playing.
    ///
    /// # Returns
    ///
    /// `true` if the progress value changed.
    pub fn sync_tick(&mut self) -> bool {
        if !self.player.is_playing() {
            trace!("TransportController: Sync tick skipped, not playing");
            return false;
        }

        let position = self.player.current_position();
        trace!("TransportController: Sync tick at {position} ms");
        let changed = self.controls.progress != position;
        self.controls.progress = position;
        changed
    }

    /// Releases the player's resources.
    pub fn release(&mut self) {
        debug!("TransportController: Releasing player");
        self.player.reset();
        self.ready = false;
    }

    /// Switches to the track at the current index, keeping playback going if it was.
    fn change_track(&mut self, force_start: bool) -> Result<(), AudioError> {
        let was_playing = self.player.is_playing();
        self.load_track(force_start || was_playing)
    }

    /// Load sequence: bind and prepare the current track, refresh the
    /// displayed track, then optionally start.
    fn load_track(&mut self, start: bool) -> Result<(), AudioError> {
        self.bind_current()?;
        self.ready = true;

        let duration = self.player.duration();
        self.controls.show_track(self.tracks.name(self.index), duration);
        info!(
            "TransportController: Loaded track {} ({}), {duration} ms",
            self.index,
            self.tracks.name(self.index)
        );

        if start {
            self.player.start()?;
            self.controls.apply(Playing);
        } else {
            self.controls.apply(Ready);
        }
        Ok(())
    }

    /// Resets the player, binds it to the current track and prepares it.
    fn bind_current(&mut self) -> Result<(), AudioError> {
        self.player.reset();
        self.player.set_source(&self.tracks.path(self.index))?;
        self.player.prepare()
    }
}
