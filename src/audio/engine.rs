//! Audio playback engine.
//!
//! This module provides the `AudioEngine`, the desktop implementation of the
//! `MediaPlayer` capability. It coordinates the decoder thread, the output
//! stream and the engine state machine.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{JoinHandle, spawn},
};

use {
    async_channel::{Receiver, Sender, unbounded},
    cpal::{Stream, traits::StreamTrait},
    rtrb::RingBuffer,
    tracing::{debug, error, info, warn},
};

use crate::{
    audio::{
        decoder::{AudioDecoder, AudioFormat, AudioProducer, DecoderError},
        metadata::{TagReader, TrackMetadata},
        output::{AudioOutput, OutputConfig, OutputError, PlaybackClock},
        player::{
            MediaPlayer,
            PlayerState::{
                self, Idle, Initialized, Paused, PlaybackCompleted, Prepared, Started, Stopped,
            },
        },
        resampler::AudioResampler,
    },
    error::AudioError,
};

/// Information about the prepared source.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Path to the audio file.
    pub path: PathBuf,
    /// Audio format of the source.
    pub format: AudioFormat,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Tag metadata, when readable.
    pub metadata: Option<TrackMetadata>,
}

/// Handle to a running audio stream.
struct StreamHandle {
    /// The CPAL audio stream.
    stream: Stream,
    /// Position and completion state shared with the callback.
    clock: Arc<PlaybackClock>,
    /// Join handle for the decoder thread.
    decoder_handle: JoinHandle<Result<(), DecoderError>>,
}

/// Desktop media engine built on `symphonia` and `cpal`.
///
/// The engine is owned by a single thread; decoding runs on a worker thread
/// feeding an `rtrb` ring buffer that the output callback drains.
pub struct AudioEngine {
    /// Engine state machine.
    state: PlayerState,
    /// Bound source, if any.
    source: Option<PathBuf>,
    /// Prepared source information.
    track: Option<TrackInfo>,
    /// Active output stream, if any.
    stream: Option<StreamHandle>,
    /// Position used while no stream is active.
    position_ms: u64,
    /// Audio output configuration.
    output_config: OutputConfig,
    /// Sender handed to each stream for completion notifications.
    completion_tx: Sender<()>,
    /// Receiver kept to hand out clones and drain stale notifications.
    completion_rx: Receiver<()>,
}

/// Clamps a requested seek target into `[0, duration_ms]`.
///
/// A zero duration means the duration is unknown and only the lower bound applies.
#[must_use]
pub fn clamp_seek_target(position_ms: i64, duration_ms: u64) -> u64 {
    let lower = u64::try_from(position_ms).unwrap_or(0);
    if duration_ms == 0 {
        lower
    } else {
        lower.min(duration_ms)
    }
}

impl AudioEngine {
    /// Creates a new idle engine.
    #[must_use]
    pub fn new(output_config: OutputConfig) -> Self {
        let (completion_tx, completion_rx) = unbounded();

        Self {
            state: Idle,
            source: None,
            track: None,
            stream: None,
            position_ms: 0,
            output_config,
            completion_tx,
            completion_rx,
        }
    }

    /// Current engine state, accounting for a stream that reached its end.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        if self.state == Started && self.stream_completed() {
            PlaybackCompleted
        } else {
            self.state
        }
    }

    /// Information about the prepared source.
    #[must_use]
    pub fn track_info(&self) -> Option<&TrackInfo> {
        self.track.as_ref()
    }

    /// Whether the active stream has played to the end.
    fn stream_completed(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|handle| handle.clock.is_completed())
    }

    /// Folds a finished stream into the state machine.
    fn sync_completion(&mut self) {
        if self.state == Started && self.stream_completed() {
            debug!("AudioEngine: Playback completed");
            self.position_ms = self.duration();
            self.teardown_stream();
            self.state = PlaybackCompleted;
        }
    }

    /// Builds an invalid-transition error.
    fn invalid(&self, operation: &str) -> AudioError {
        AudioError::InvalidOperation {
            reason: format!("Cannot {operation} in state {:?}", self.state),
        }
    }

    /// Opens an output stream starting at `start_ms`.
    fn open_stream(&mut self, start_ms: u64) -> Result<(), AudioError> {
        let track = self.track.as_ref().ok_or(AudioError::NoTrackLoaded)?;

        let mut decoder = AudioDecoder::new(&track.path)?;
        if start_ms > 0 {
            decoder.seek(start_ms)?;
        }

        let output = AudioOutput::new(self.output_config.clone())?;
        let negotiated = output.negotiate(&decoder.format)?;

        let resampler = if negotiated.sample_rate() == decoder.format.sample_rate {
            None
        } else {
            Some(AudioResampler::new(
                decoder.format.sample_rate,
                negotiated.sample_rate(),
                decoder.signal_spec.channels.count(),
            )?)
        };

        let capacity = negotiated.ring_buffer_capacity(self.output_config.buffer_duration_ms);
        let (producer, consumer) = RingBuffer::<f32>::new(capacity);

        let clock = Arc::new(PlaybackClock::new(
            start_ms,
            negotiated.sample_rate(),
            u32::try_from(negotiated.channels()).unwrap_or(2),
        ));

        let producer = AudioProducer::new(
            decoder,
            producer,
            negotiated.channels(),
            resampler,
            clock.decoder_finished_flag(),
        );
        let decoder_handle = spawn(move || producer.run());

        let stream = output.build_stream(
            &negotiated,
            consumer,
            Arc::clone(&clock),
            self.completion_tx.clone(),
        )?;
        stream.play().map_err(OutputError::from)?;

        self.stream = Some(StreamHandle {
            stream,
            clock,
            decoder_handle,
        });

        Ok(())
    }

    /// Stops the current stream and joins its decoder thread.
    fn teardown_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            debug!("AudioEngine: Stopping audio stream");

            // Dropping the stream drops the consumer, which ends the producer loop.
            drop(handle.stream);
            match handle.decoder_handle.join() {
                Ok(Ok(())) => debug!("Decoder thread stopped successfully"),
                Ok(Err(e)) => error!("Decoder thread stopped with error: {e}"),
                Err(e) => error!("Decoder thread panicked: {e:?}"),
            }
        }
    }

    /// Discards completion notifications that belong to a released stream.
    fn drain_completions(&self) {
        while self.completion_rx.try_recv().is_ok() {
            debug!("AudioEngine: Discarding stale completion notification");
        }
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

impl MediaPlayer for AudioEngine {
    fn set_source(&mut self, path: &Path) -> Result<(), AudioError> {
        if self.state != Idle {
            return Err(self.invalid("set source"));
        }

        File::open(path).map_err(DecoderError::from)?;
        self.source = Some(path.to_path_buf());
        self.state = Initialized;
        debug!("AudioEngine: Source set to {}", path.display());
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), AudioError> {
        if !matches!(self.state, Initialized | Stopped) {
            return Err(self.invalid("prepare"));
        }
        let path = self.source.clone().ok_or(AudioError::NoTrackLoaded)?;

        let decoder = AudioDecoder::new(&path)?;
        let metadata = match TagReader::read_metadata(&path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("AudioEngine: No tag metadata for {}: {e}", path.display());
                None
            }
        };
        let duration_ms = decoder
            .duration_ms()
            .or_else(|| metadata.as_ref().map(|m| m.duration_ms))
            .unwrap_or(0);

        info!(
            "AudioEngine: Prepared {} ({} Hz, {} ch, {} ms)",
            path.display(),
            decoder.format.sample_rate,
            decoder.format.channels,
            duration_ms
        );

        self.track = Some(TrackInfo {
            path,
            format: decoder.format,
            duration_ms,
            metadata,
        });
        self.position_ms = 0;
        self.state = Prepared;
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.sync_completion();

        match self.state {
            Started => return Ok(()),
            Prepared => self.open_stream(self.position_ms)?,
            Paused => match self.stream.as_ref() {
                Some(handle) => handle.stream.play().map_err(OutputError::from)?,
                None => self.open_stream(self.position_ms)?,
            },
            PlaybackCompleted => {
                self.position_ms = 0;
                self.open_stream(0)?;
            }
            Idle | Initialized | Stopped => return Err(self.invalid("start")),
        }

        self.state = Started;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.sync_completion();

        match self.state {
            Started => {
                let paused = self
                    .stream
                    .as_ref()
                    .map(|handle| handle.stream.pause());
                if let Some(Err(e)) = paused {
                    // Backends without pause support: remember the position and rebuild later.
                    warn!("AudioEngine: Stream pause unsupported ({e}), releasing stream");
                    self.position_ms = self.current_position();
                    self.teardown_stream();
                }
                self.state = Paused;
                Ok(())
            }
            Paused => Ok(()),
            PlaybackCompleted => {
                self.state = Paused;
                Ok(())
            }
            Idle | Initialized | Prepared | Stopped => Err(self.invalid("pause")),
        }
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if matches!(self.state, Idle | Initialized) {
            return Err(self.invalid("stop"));
        }

        self.teardown_stream();
        self.drain_completions();
        self.position_ms = 0;
        self.state = Stopped;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: i64) -> Result<(), AudioError> {
        self.sync_completion();
        if !self.state.is_prepared() {
            debug!(
                "AudioEngine: Ignoring seek to {position_ms} ms in state {:?}",
                self.state
            );
            return Ok(());
        }

        let target = clamp_seek_target(position_ms, self.duration());
        debug!("AudioEngine: Seek to {target} ms (requested {position_ms} ms)");

        let was_playing = self.state == Started;
        self.teardown_stream();
        // A completion queued before the seek belongs to the old position.
        self.drain_completions();
        self.position_ms = target;

        if was_playing {
            self.open_stream(target)?;
        } else if self.state == PlaybackCompleted {
            self.state = Paused;
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.teardown_stream();
        self.drain_completions();
        self.source = None;
        self.track = None;
        self.position_ms = 0;
        self.state = Idle;
    }

    fn current_position(&self) -> u64 {
        let position = self
            .stream
            .as_ref()
            .map_or(self.position_ms, |handle| handle.clock.position_ms());
        match self.duration() {
            0 => position,
            duration => position.min(duration),
        }
    }

    fn duration(&self) -> u64 {
        self.track.as_ref().map_or(0, |track| track.duration_ms)
    }

    fn is_playing(&self) -> bool {
        self.state() == Started
    }

    fn completion_events(&self) -> Receiver<()> {
        self.completion_rx.clone()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.teardown_stream();
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use crate::{
        audio::{
            engine::{AudioEngine, clamp_seek_target},
            player::{
                MediaPlayer,
                PlayerState::{Idle, Initialized, Prepared, Stopped},
            },
            test_fixtures::write_silent_wav,
        },
        error::AudioError,
    };

    #[test]
    fn test_clamp_seek_target() {
        assert_eq!(clamp_seek_target(-5000, 60_000), 0);
        assert_eq!(clamp_seek_target(5000, 60_000), 5000);
        assert_eq!(clamp_seek_target(90_000, 60_000), 60_000);
        assert_eq!(clamp_seek_target(90_000, 0), 90_000);
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = AudioEngine::default();
        assert_eq!(engine.state(), Idle);
        assert_eq!(engine.duration(), 0);
        assert_eq!(engine.current_position(), 0);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_start_without_source_is_invalid() {
        let mut engine = AudioEngine::default();
        let result = engine.start();
        assert!(matches!(result, Err(AudioError::InvalidOperation { .. })));
    }

    #[test]
    fn test_set_source_missing_file_fails() {
        let mut engine = AudioEngine::default();
        let result = engine.set_source(Path::new("/nonexistent/01-track.mp3"));
        assert!(matches!(result, Err(AudioError::DecoderError(_))));
        assert_eq!(engine.state(), Idle);
    }

    #[test]
    fn test_prepare_reads_wav_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 44100, 1, 44100);

        let mut engine = AudioEngine::default();
        engine.set_source(&path).unwrap();
        assert_eq!(engine.state(), Initialized);

        engine.prepare().unwrap();
        assert_eq!(engine.state(), Prepared);
        assert_eq!(engine.duration(), 1000);

        let info = engine.track_info().unwrap();
        assert_eq!(info.format.sample_rate, 44100);
        assert_eq!(info.format.channels, 1);
    }

    #[test]
    fn test_seek_while_prepared_is_clamped_by_engine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 8000, 2, 16000);

        let mut engine = AudioEngine::default();
        engine.set_source(&path).unwrap();
        engine.prepare().unwrap();

        engine.seek_to(-5000).unwrap();
        assert_eq!(engine.current_position(), 0);

        engine.seek_to(1500).unwrap();
        assert_eq!(engine.current_position(), 1500);

        engine.seek_to(10_000).unwrap();
        assert_eq!(engine.current_position(), 2000);
    }

    #[test]
    fn test_seek_without_prepared_source_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 8000, 1, 16000);

        let mut engine = AudioEngine::default();
        engine.seek_to(1000).unwrap();
        assert_eq!(engine.state(), Idle);

        engine.set_source(&path).unwrap();
        engine.seek_to(1000).unwrap();
        assert_eq!(engine.state(), Initialized);

        engine.prepare().unwrap();
        engine.stop().unwrap();
        engine.seek_to(10_000).unwrap();
        assert_eq!(engine.state(), Stopped);
        assert_eq!(engine.current_position(), 0);
    }

    #[test]
    fn test_seek_discards_pending_completion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 8000, 1, 16000);

        let mut engine = AudioEngine::default();
        engine.set_source(&path).unwrap();
        engine.prepare().unwrap();

        let completions = engine.completion_events();
        engine.completion_tx.try_send(()).unwrap();
        engine.seek_to(500).unwrap();

        assert!(completions.try_recv().is_err());
        assert_eq!(engine.current_position(), 500);
    }

    #[test]
    fn test_stop_requires_prepare_before_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 8000, 1, 800);

        let mut engine = AudioEngine::default();
        engine.set_source(&path).unwrap();
        engine.prepare().unwrap();
        engine.stop().unwrap();
        assert_eq!(engine.state(), Stopped);

        let result = engine.start();
        assert!(matches!(result, Err(AudioError::InvalidOperation { .. })));

        engine.prepare().unwrap();
        assert_eq!(engine.state(), Prepared);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 8000, 1, 800);

        let mut engine = AudioEngine::default();
        engine.set_source(&path).unwrap();
        engine.prepare().unwrap();
        engine.reset();

        assert_eq!(engine.state(), Idle);
        assert!(engine.track_info().is_none());
        assert_eq!(engine.duration(), 0);
        engine.set_source(&path).unwrap();
    }

    #[test]
    #[ignore = "Requires an audio output device"]
    fn test_start_and_pause_on_device() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 44100, 2, 44100);

        let mut engine = AudioEngine::default();
        engine.set_source(&path).unwrap();
        engine.prepare().unwrap();
        engine.start().unwrap();
        assert!(engine.is_playing());

        engine.pause().unwrap();
        assert!(!engine.is_playing());
    }
}
