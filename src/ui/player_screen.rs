//! The single player window.
//!
//! This module builds the widgets, renders the controller's `ControlsState`
//! onto them, and forwards button, seek-bar, completion and visibility
//! events to the `TransportController`.

use std::{cell::RefCell, rc::Rc, time::Duration};

use {
    anyhow::Error,
    libadwaita::{
        Application, ApplicationWindow, HeaderBar, WindowTitle,
        glib::{ControlFlow, MainContext, Propagation, SourceId, timeout_add_local},
        gtk::{
            Align::Center,
            Box as GtkBox, Button, Label,
            Orientation::{Horizontal, Vertical},
            Scale,
            pango::EllipsizeMode::End,
        },
        prelude::{
            AdwApplicationWindowExt, ApplicationExt, BoxExt, ButtonExt, GtkWindowExt, RangeExt,
            WidgetExt,
        },
    },
    num_traits::cast::ToPrimitive,
    tracing::{debug, trace},
};

use crate::{
    audio::{engine::AudioEngine, metadata::TrackMetadata},
    config::settings::UserSettings,
    error::{AudioError, ErrorReporter, UiError},
    transport::{TransportController, format_time},
};

/// Controller shared by the window's signal handlers.
type SharedController = Rc<RefCell<TransportController<AudioEngine>>>;

/// Main player window and its widgets.
///
/// Cloning is cheap: widgets are reference-counted GObjects and the
/// controller and sync-loop handle are shared.
#[derive(Clone)]
pub struct PlayerScreen {
    /// The application window.
    pub window: ApplicationWindow,
    /// Header title; the subtitle shows the track's artist and title tags.
    pub window_title: WindowTitle,
    /// Name of the loaded track.
    pub track_label: Label,
    /// Draggable progress bar, in milliseconds.
    pub progress_scale: Scale,
    /// Current position label.
    pub current_time_label: Label,
    /// Track duration label.
    pub total_duration_label: Label,
    /// Play button.
    pub play_button: Button,
    /// Pause button.
    pub pause_button: Button,
    /// Stop button.
    pub stop_button: Button,
    /// Previous track button.
    pub prev_button: Button,
    /// Next track button.
    pub next_button: Button,
    /// Skip backward button.
    pub skip_back_button: Button,
    /// Skip forward button.
    pub skip_forward_button: Button,
    /// Transport controller.
    controller: SharedController,
    /// Active UI-sync timer, if the window is in the foreground.
    sync_loop: Rc<RefCell<Option<SourceId>>>,
    /// Sync timer cadence.
    sync_interval: Duration,
    /// Skip button distance in milliseconds.
    skip_step_ms: i64,
}

impl PlayerScreen {
    /// Builds the player window around a controller.
    ///
    /// # Arguments
    ///
    /// * `app` - Owning application
    /// * `controller` - Controller with the first track already loaded
    /// * `settings` - User settings for sync cadence and skip distance
    ///
    /// # Returns
    ///
    /// A new `PlayerScreen` with all signal handlers connected.
    #[must_use]
    pub fn new(
        app: &Application,
        controller: TransportController<AudioEngine>,
        settings: &UserSettings,
    ) -> Self {
        let window = ApplicationWindow::builder()
            .application(app)
            .title("Musicbox")
            .default_width(480)
            .default_height(240)
            .build();

        let content = GtkBox::builder()
            .orientation(Vertical)
            .spacing(12)
            .build();

        let window_title = WindowTitle::new("Musicbox", "");
        let header_bar = HeaderBar::builder().title_widget(&window_title).build();
        content.append(&header_bar);

        let body = GtkBox::builder()
            .orientation(Vertical)
            .spacing(12)
            .margin_top(12)
            .margin_bottom(18)
            .margin_start(18)
            .margin_end(18)
            .build();

        let track_label = Label::builder()
            .ellipsize(End)
            .css_classes(["title-3"])
            .build();
        body.append(&track_label);

        // Progress row with time indicators
        let progress_row = GtkBox::builder().orientation(Horizontal).spacing(6).build();

        let current_time_label = Label::builder()
            .label("0:00")
            .width_chars(5)
            .xalign(1.0)
            .css_classes(["dim-label", "numeric"])
            .build();
        progress_row.append(&current_time_label);

        let progress_scale = Scale::builder()
            .orientation(Horizontal)
            .hexpand(true)
            .draw_value(false)
            .build();
        progress_row.append(&progress_scale);

        let total_duration_label = Label::builder()
            .label("0:00")
            .width_chars(5)
            .xalign(0.0)
            .css_classes(["dim-label", "numeric"])
            .build();
        progress_row.append(&total_duration_label);

        body.append(&progress_row);

        // Transport buttons
        let controls = GtkBox::builder()
            .orientation(Horizontal)
            .spacing(6)
            .halign(Center)
            .build();

        let prev_button = icon_button("media-skip-backward-symbolic", "Previous track");
        let skip_back_button = icon_button("media-seek-backward-symbolic", "Back 10 seconds");
        let play_button = icon_button("media-playback-start-symbolic", "Play");
        let pause_button = icon_button("media-playback-pause-symbolic", "Pause");
        let stop_button = icon_button("media-playback-stop-symbolic", "Stop");
        let skip_forward_button =
            icon_button("media-seek-forward-symbolic", "Forward 10 seconds");
        let next_button = icon_button("media-skip-forward-symbolic", "Next track");

        for button in [
            &prev_button,
            &skip_back_button,
            &play_button,
            &pause_button,
            &stop_button,
            &skip_forward_button,
            &next_button,
        ] {
            controls.append(button);
        }
        body.append(&controls);

        content.append(&body);
        window.set_content(Some(&content));

        let screen = Self {
            window,
            window_title,
            track_label,
            progress_scale,
            current_time_label,
            total_duration_label,
            play_button,
            pause_button,
            stop_button,
            prev_button,
            next_button,
            skip_back_button,
            skip_forward_button,
            controller: Rc::new(RefCell::new(controller)),
            sync_loop: Rc::new(RefCell::new(None)),
            sync_interval: Duration::from_millis(settings.sync_interval_ms),
            skip_step_ms: settings.skip_step_ms,
        };

        screen.render();
        screen.connect_controls();
        screen.connect_lifecycle();
        screen.forward_completions();

        screen
    }

    /// Shows the window.
    pub fn present(&self) {
        self.window.present();
    }

    /// Renders the controller's controls state onto the widgets.
    pub fn render(&self) {
        let controller = self.controller.borrow();
        let controls = controller.controls();

        self.track_label.set_label(&controls.track_name);
        self.track_label.set_tooltip_text(Some(&controls.track_name));

        let tags = controller
            .player()
            .track_info()
            .and_then(|info| info.metadata.as_ref())
            .and_then(TrackMetadata::display_line)
            .unwrap_or_default();
        self.window_title.set_subtitle(&tags);

        // set_range/set_value never emit change-value, so this cannot seek.
        let seek_max = controls.seek_max.to_f64().unwrap_or(0.0);
        self.progress_scale.set_range(0.0, seek_max);
        self.progress_scale
            .set_value(controls.progress.to_f64().unwrap_or(0.0));
        self.progress_scale.set_sensitive(controls.seek_enabled);

        self.current_time_label
            .set_label(&format_time(controls.progress));
        self.total_duration_label
            .set_label(&format_time(controls.seek_max));

        self.play_button.set_sensitive(controls.play_enabled);
        self.pause_button.set_sensitive(controls.pause_enabled);
        self.stop_button.set_sensitive(controls.stop_enabled);
    }

    /// Starts the periodic progress refresh. Does nothing if already running.
    pub fn start_sync_loop(&self) {
        if self.sync_loop.borrow().is_some() {
            return;
        }

        debug!("PlayerScreen: Starting sync loop every {:?}", self.sync_interval);
        let screen = self.clone();
        let source_id = timeout_add_local(self.sync_interval, move || {
            if screen.controller.borrow_mut().sync_tick() {
                screen.render_progress();
            }
            ControlFlow::Continue
        });
        *self.sync_loop.borrow_mut() = Some(source_id);
    }

    /// Stops the periodic progress refresh.
    pub fn stop_sync_loop(&self) {
        if let Some(source_id) = self.sync_loop.borrow_mut().take() {
            debug!("PlayerScreen: Stopping sync loop");
            source_id.remove();
        }
    }

    /// Updates only the progress value and position label.
    fn render_progress(&self) {
        let progress = self.controller.borrow().controls().progress;
        trace!("PlayerScreen: Progress {progress} ms");
        self.progress_scale
            .set_value(progress.to_f64().unwrap_or(0.0));
        self.current_time_label.set_label(&format_time(progress));
    }

    /// Runs a controller operation, then re-renders or fails the screen.
    fn dispatch<F>(&self, context: &'static str, operation: F)
    where
        F: FnOnce(&mut TransportController<AudioEngine>) -> Result<(), AudioError>,
    {
        let result = operation(&mut self.controller.borrow_mut());
        match result {
            Ok(()) => self.render(),
            Err(e) => self.fail(e, context),
        }
    }

    /// Logs a controller error and quits the application.
    fn fail(&self, error: AudioError, context: &'static str) {
        let error = Error::new(UiError::from(error)).context(context);
        ErrorReporter::error(&error, context);

        self.stop_sync_loop();
        self.controller.borrow_mut().release();
        if let Some(app) = self.window.application() {
            app.quit();
        }
    }

    /// Connects buttons and the seek bar to controller operations.
    fn connect_controls(&self) {
        let screen = self.clone();
        self.play_button.connect_clicked(move |_| {
            screen.dispatch("Failed to start playback", TransportController::play);
        });

        let screen = self.clone();
        self.pause_button.connect_clicked(move |_| {
            screen.dispatch("Failed to pause playback", TransportController::pause);
        });

        let screen = self.clone();
        self.stop_button.connect_clicked(move |_| {
            screen.dispatch("Failed to stop playback", TransportController::stop);
        });

        let screen = self.clone();
        self.next_button.connect_clicked(move |_| {
            screen.dispatch("Failed to load next track", |controller| {
                controller.next(false)
            });
        });

        let screen = self.clone();
        self.prev_button.connect_clicked(move |_| {
            screen.dispatch("Failed to load previous track", TransportController::previous);
        });

        let screen = self.clone();
        let step = self.skip_step_ms;
        self.skip_back_button.connect_clicked(move |_| {
            screen.dispatch("Failed to skip backward", |controller| {
                controller.jump_by_time(-step)
            });
        });

        let screen = self.clone();
        self.skip_forward_button.connect_clicked(move |_| {
            screen.dispatch("Failed to skip forward", |controller| {
                controller.jump_by_time(step)
            });
        });

        // change-value is only emitted for user interaction.
        let screen = self.clone();
        self.progress_scale
            .connect_change_value(move |_, _, value| {
                let position = value.max(0.0).to_u64().unwrap_or(0);
                screen.dispatch("Failed to seek", |controller| {
                    controller.on_seek_bar_changed(position, true)
                });
                Propagation::Proceed
            });
    }

    /// Ties the sync loop to window focus and releases the engine on close.
    fn connect_lifecycle(&self) {
        let screen = self.clone();
        self.window.connect_is_active_notify(move |window| {
            if window.is_active() && window.is_visible() {
                screen.start_sync_loop();
            } else {
                screen.stop_sync_loop();
            }
        });

        let screen = self.clone();
        self.window.connect_visible_notify(move |window| {
            if !window.is_visible() {
                screen.stop_sync_loop();
            }
        });

        let screen = self.clone();
        self.window.connect_close_request(move |_| {
            debug!("PlayerScreen: Window closing, releasing engine");
            screen.stop_sync_loop();
            screen.controller.borrow_mut().release();
            Propagation::Proceed
        });
    }

    /// Forwards engine completion notifications to the controller on the main context.
    fn forward_completions(&self) {
        let completions = self.controller.borrow().completion_events();
        let screen = self.clone();

        MainContext::default().spawn_local(async move {
            while completions.recv().await.is_ok() {
                debug!("PlayerScreen: Track completed");
                screen.dispatch(
                    "Failed to advance after track completion",
                    TransportController::on_track_completion,
                );
            }
            debug!("PlayerScreen: Completion channel closed");
        });
    }
}

/// Creates a flat icon button.
fn icon_button(icon_name: &str, tooltip: &str) -> Button {
    Button::builder()
        .icon_name(icon_name)
        .tooltip_text(tooltip)
        .css_classes(["circular"])
        .build()
}

#[cfg(test)]
mod tests {
    use {
        libadwaita::{Application, init, prelude::WidgetExt},
        tempfile::tempdir,
    };

    use crate::{
        audio::{engine::AudioEngine, test_fixtures::write_silent_wav},
        config::{settings::UserSettings, tracks::TrackList},
        transport::TransportController,
        ui::player_screen::PlayerScreen,
    };

    #[test]
    #[ignore = "Requires GTK display for UI testing"]
    fn test_player_screen_renders_initial_controls() {
        if init().is_err() {
            return;
        }

        let dir = tempdir().unwrap();
        write_silent_wav(&dir.path().join("a.wav"), 8000, 1, 8000);
        let tracks = TrackList::new(dir.path(), vec!["a.wav".to_string()]).unwrap();
        let controller = TransportController::new(AudioEngine::default(), tracks).unwrap();

        let app = Application::builder()
            .application_id("org.example.musicbox.test")
            .build();
        let screen = PlayerScreen::new(&app, controller, &UserSettings::default());

        assert_eq!(screen.track_label.label().as_str(), "a.wav");
        assert!(screen.play_button.is_sensitive());
        assert!(!screen.pause_button.is_sensitive());
        assert!(!screen.stop_button.is_sensitive());
        assert_eq!(screen.total_duration_label.label().as_str(), "0:01");
        assert_eq!(screen.window_title.subtitle().as_str(), "");

        screen.start_sync_loop();
        screen.start_sync_loop();
        assert!(screen.sync_loop.borrow().is_some());
        screen.stop_sync_loop();
        assert!(screen.sync_loop.borrow().is_none());
    }
}
