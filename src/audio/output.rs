//! Audio output management using the `cpal` crate.
//!
//! This module handles device selection, stream configuration, and the
//! real-time callback that drains the decoder's ring buffer, tracks the
//! playback position, and detects the end of a track.

use std::{
    sync::{
        Arc,
        atomic::{
            AtomicBool, AtomicU64,
            Ordering::{Relaxed, SeqCst},
        },
    },
    time::Duration,
};

use {
    async_channel::Sender,
    cpal::{
        BuildStreamError, Device, FromSample, OutputCallbackInfo, PlayStreamError,
        SampleFormat::{self, F32, I16, I32, U16},
        SizedSample, Stream, StreamConfig,
        BufferSize::Default as CpalDefault,
        default_host,
        traits::{DeviceTrait, HostTrait},
    },
    rtrb::{Consumer, PopError::Empty},
    thiserror::Error,
    tracing::{debug, error},
};

use crate::audio::decoder::AudioFormat;

/// Error type for audio output operations.
#[derive(Error, Debug)]
pub enum OutputError {
    /// CPAL stream construction error.
    #[error("Audio output error: {0}")]
    CpalError(#[from] BuildStreamError),
    /// Failed to start audio stream.
    #[error("Failed to start audio stream: {0}")]
    StreamStartError(#[from] PlayStreamError),
    /// No suitable audio device found.
    #[error("No suitable audio device found")]
    NoDeviceFound,
    /// Unsupported sample format.
    #[error("Unsupported sample format: {format:?}")]
    UnsupportedSampleFormat { format: SampleFormat },
}

/// Audio output configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Latency hint in milliseconds; sizes the ring buffer and the stream timeout.
    pub buffer_duration_ms: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            buffer_duration_ms: 50,
        }
    }
}

/// Stream parameters negotiated with the output device.
#[derive(Debug, Clone)]
pub struct NegotiatedOutput {
    /// Configuration passed to cpal.
    pub stream_config: StreamConfig,
    /// Sample format of the device.
    pub sample_format: SampleFormat,
}

impl NegotiatedOutput {
    /// Output sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate
    }

    /// Output channel count.
    #[must_use]
    pub fn channels(&self) -> usize {
        usize::from(self.stream_config.channels)
    }

    /// Ring buffer capacity in samples for the given latency hint.
    #[must_use]
    pub fn ring_buffer_capacity(&self, buffer_duration_ms: u32) -> usize {
        let samples = u64::from(self.sample_rate())
            * self.channels() as u64
            * u64::from(buffer_duration_ms)
            / 1000;
        usize::try_from(samples).unwrap_or(4096).max(4096)
    }
}

/// Playback position and end-of-track bookkeeping shared with the audio callback.
#[derive(Debug)]
pub struct PlaybackClock {
    /// Position the stream started from, in milliseconds.
    start_ms: u64,
    /// Samples written to the device so far (all channels).
    samples_played: AtomicU64,
    /// Output sample rate in Hz.
    sample_rate: u32,
    /// Output channel count.
    channels: u32,
    /// Raised by the decoder thread once the last sample is queued.
    decoder_finished: Arc<AtomicBool>,
    /// Raised by the callback once the ring buffer drained after the decoder finished.
    completed: AtomicBool,
}

impl PlaybackClock {
    /// Creates a clock for a stream starting at `start_ms`.
    #[must_use]
    pub fn new(start_ms: u64, sample_rate: u32, channels: u32) -> Self {
        Self {
            start_ms,
            samples_played: AtomicU64::new(0),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            decoder_finished: Arc::new(AtomicBool::new(false)),
            completed: AtomicBool::new(false),
        }
    }

    /// Flag the decoder thread raises at end of stream.
    #[must_use]
    pub fn decoder_finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.decoder_finished)
    }

    /// Current position in milliseconds.
    #[must_use]
    pub fn position_ms(&self) -> u64 {
        let frames = self.samples_played.load(Relaxed) / u64::from(self.channels);
        self.start_ms + frames * 1000 / u64::from(self.sample_rate)
    }

    /// Whether the stream has played to the end of the track.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(SeqCst)
    }

    /// Records samples handed to the device.
    fn advance(&self, samples: u64) {
        self.samples_played.fetch_add(samples, Relaxed);
    }

    /// Marks the track complete, returning `true` only on the first call.
    fn try_complete(&self) -> bool {
        self.decoder_finished.load(SeqCst) && !self.completed.swap(true, SeqCst)
    }
}

/// Manages the output device and stream creation.
pub struct AudioOutput {
    /// The selected output device.
    device: Device,
    /// Current output configuration.
    config: OutputConfig,
}

impl AudioOutput {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::NoDeviceFound` if the host has no output device.
    pub fn new(config: OutputConfig) -> Result<Self, OutputError> {
        let device = default_host()
            .default_output_device()
            .ok_or(OutputError::NoDeviceFound)?;

        Ok(Self { device, config })
    }

    /// Chooses stream parameters for a source.
    ///
    /// Keeps the device's default channel count and sample format, and opens
    /// at the source sample rate when the device supports it.
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if device capabilities cannot be queried.
    pub fn negotiate(&self, source_format: &AudioFormat) -> Result<NegotiatedOutput, OutputError> {
        let default_config = self
            .device
            .default_output_config()
            .map_err(|_| OutputError::NoDeviceFound)?;
        let channels = default_config.channels();
        let sample_format = default_config.sample_format();

        let supports_source_rate = self
            .device
            .supported_output_configs()
            .map_err(|_| OutputError::NoDeviceFound)?
            .any(|range| {
                range.channels() == channels
                    && range.sample_format() == sample_format
                    && range.min_sample_rate() <= source_format.sample_rate
                    && source_format.sample_rate <= range.max_sample_rate()
            });

        let sample_rate = if supports_source_rate {
            source_format.sample_rate
        } else {
            default_config.sample_rate()
        };

        debug!(
            "Negotiated output: {} Hz, {} channels, {:?}",
            sample_rate, channels, sample_format
        );

        Ok(NegotiatedOutput {
            stream_config: StreamConfig {
                channels,
                sample_rate,
                buffer_size: CpalDefault,
            },
            sample_format,
        })
    }

    /// Builds an output stream that drains `consumer`.
    ///
    /// The stream is created paused on backends that support it; call
    /// `play()` on the returned stream to start rendering.
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if the sample format is unsupported or the
    /// stream cannot be built.
    pub fn build_stream(
        &self,
        negotiated: &NegotiatedOutput,
        consumer: Consumer<f32>,
        clock: Arc<PlaybackClock>,
        completion_tx: Sender<()>,
    ) -> Result<Stream, OutputError> {
        match negotiated.sample_format {
            F32 => self.build_typed::<f32>(negotiated, consumer, clock, completion_tx),
            I16 => self.build_typed::<i16>(negotiated, consumer, clock, completion_tx),
            I32 => self.build_typed::<i32>(negotiated, consumer, clock, completion_tx),
            U16 => self.build_typed::<u16>(negotiated, consumer, clock, completion_tx),
            format => Err(OutputError::UnsupportedSampleFormat { format }),
        }
    }

    /// Builds the stream for a concrete device sample type.
    fn build_typed<T>(
        &self,
        negotiated: &NegotiatedOutput,
        mut consumer: Consumer<f32>,
        clock: Arc<PlaybackClock>,
        completion_tx: Sender<()>,
    ) -> Result<Stream, OutputError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let timeout = Duration::from_millis(u64::from(self.config.buffer_duration_ms));
        let err_fn = |err| error!("Audio stream error: {err}");

        let stream = self.device.build_output_stream(
            &negotiated.stream_config,
            move |data: &mut [T], _: &OutputCallbackInfo| {
                let mut written = 0_u64;
                for sample in data.iter_mut() {
                    match consumer.pop() {
                        Ok(value) => {
                            *sample = T::from_sample(value.clamp(-1.0, 1.0));
                            written += 1;
                        }
                        Err(Empty) => *sample = T::EQUILIBRIUM,
                    }
                }
                clock.advance(written);

                if consumer.is_empty() && clock.try_complete() {
                    let _ = completion_tx.try_send(());
                }
            },
            err_fn,
            Some(timeout),
        )?;

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering::SeqCst;

    use cpal::{BufferSize::Default as CpalDefault, SampleFormat::F32, StreamConfig};

    use crate::audio::output::{NegotiatedOutput, OutputConfig, OutputError, PlaybackClock};

    #[test]
    fn test_output_config_default() {
        assert_eq!(OutputConfig::default().buffer_duration_ms, 50);
    }

    #[test]
    fn test_output_error_display() {
        assert_eq!(
            OutputError::NoDeviceFound.to_string(),
            "No suitable audio device found"
        );
    }

    #[test]
    fn test_clock_position_accounts_for_start_offset() {
        let clock = PlaybackClock::new(5000, 48000, 2);
        clock.advance(48000 * 2);
        assert_eq!(clock.position_ms(), 6000);
    }

    #[test]
    fn test_clock_completes_once_after_decoder_finished() {
        let clock = PlaybackClock::new(0, 44100, 2);
        assert!(!clock.try_complete());

        clock.decoder_finished_flag().store(true, SeqCst);
        assert!(clock.try_complete());
        assert!(!clock.try_complete());
        assert!(clock.is_completed());
    }

    #[test]
    fn test_ring_buffer_capacity_has_floor() {
        let negotiated = NegotiatedOutput {
            stream_config: StreamConfig {
                channels: 2,
                sample_rate: 44100,
                buffer_size: CpalDefault,
            },
            sample_format: F32,
        };
        assert_eq!(negotiated.ring_buffer_capacity(0), 4096);
        assert_eq!(negotiated.ring_buffer_capacity(1000), 88200);
    }
}
