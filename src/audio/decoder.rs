//! Audio file decoding using the `symphonia` crate.
//!
//! This module handles audio file format detection, decoding, and provides
//! decoded audio samples to the output system via ring buffers.

use std::{
    fs::File,
    io::{Error as StdError, ErrorKind::UnexpectedEof},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering::SeqCst},
    },
    thread::sleep,
    time::Duration,
};

use {
    rtrb::{Producer, PushError::Full},
    serde::{Deserialize, Serialize},
    symphonia::{
        core::{
            audio::{AudioBufferRef, SampleBuffer, SignalSpec},
            codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions},
            errors::Error as SymphoniaError,
            formats::{FormatOptions, FormatReader, SeekMode::Accurate, SeekTo::Time},
            io::{MediaSourceStream, MediaSourceStreamOptions},
            meta::MetadataOptions,
            probe::Hint,
            units::Time as OtherTime,
        },
        default::{get_codecs, get_probe},
    },
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::audio::resampler::{AudioResampler, ResamplingError};

/// Sleep duration when producer buffer is full.
const PRODUCER_SLEEP_DURATION: Duration = Duration::from_micros(100);

/// Error type for audio decoding operations.
#[derive(Error, Debug)]
pub enum DecoderError {
    /// Failed to open or read the audio file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Symphonia decoding error.
    #[error("Decoding error: {0}")]
    SymphoniaError(#[from] SymphoniaError),
    /// No audio track found in file.
    #[error("No audio track found")]
    NoAudioTrack,
    /// Sample rate conversion failed mid-stream.
    #[error("Resampling error: {0}")]
    ResamplingError(#[from] ResamplingError),
}

/// Audio format information extracted during decoding setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u32,
    /// Bits per sample.
    pub bits_per_sample: u32,
}

/// Audio decoder that reads and decodes audio files.
///
/// The decoder is responsible for opening audio files, detecting their format,
/// and providing decoded audio samples to the output system.
pub struct AudioDecoder {
    /// The underlying format reader.
    format_reader: Box<dyn FormatReader>,
    /// The active audio decoder.
    decoder: Box<dyn Decoder>,
    /// Id of the selected audio track within the container.
    track_id: u32,
    /// Audio format information.
    pub format: AudioFormat,
    /// Signal specification from symphonia (sample rate + channel layout).
    pub signal_spec: SignalSpec,
}

impl AudioDecoder {
    /// Creates a new audio decoder for the specified file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the audio file to decode.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AudioDecoder` or a `DecoderError`.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if:
    /// - The file cannot be opened or read
    /// - The file format is unsupported
    /// - No audio track is found in the file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DecoderError> {
        let path = path.as_ref();

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecoderError::NoAudioTrack)?;
        let codec_params = &track.codec_params;

        let signal_spec = SignalSpec::new(
            codec_params.sample_rate.unwrap_or(44100),
            codec_params.channels.ok_or(DecoderError::NoAudioTrack)?,
        );

        let format = AudioFormat {
            sample_rate: signal_spec.rate,
            channels: u32::try_from(signal_spec.channels.count()).unwrap_or(2),
            bits_per_sample: codec_params.bits_per_sample.unwrap_or(16),
        };

        let decoder = get_codecs().make(codec_params, &DecoderOptions::default())?;
        let track_id = track.id;

        Ok(AudioDecoder {
            format_reader,
            decoder,
            track_id,
            format,
            signal_spec,
        })
    }

    /// Decodes the next packet of audio data.
    ///
    /// # Returns
    ///
    /// A `Result` containing an `Option<AudioBufferRef>` or a `DecoderError`.
    /// Returns `None` when the end of the file is reached.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if decoding fails.
    pub fn decode_next_packet(&mut self) -> Result<Option<AudioBufferRef<'_>>, DecoderError> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            // Drop the returned buffer so the decoder can be borrowed again below.
            match self.decoder.decode(&packet).map(|_| ()) {
                Ok(()) => return Ok(Some(self.decoder.last_decoded())),
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupted packet: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Seeks to the specified time position in milliseconds.
    ///
    /// # Arguments
    ///
    /// * `position_ms` - Target position in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if seeking fails.
    pub fn seek(&mut self, position_ms: u64) -> Result<(), DecoderError> {
        let seconds = position_ms / 1000;
        let frac_ms = u32::try_from(position_ms % 1000).unwrap_or(0);
        let time = OtherTime::new(seconds, f64::from(frac_ms) / 1000.0);
        self.format_reader.seek(
            Accurate,
            Time {
                time,
                track_id: Some(self.track_id),
            },
        )?;
        self.decoder.reset();
        Ok(())
    }

    /// Gets the duration of the audio file in milliseconds.
    ///
    /// # Returns
    ///
    /// Duration in milliseconds, or `None` if the container does not declare a frame count.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.format_reader
            .tracks()
            .iter()
            .find(|track| track.id == self.track_id)
            .and_then(|track| track.codec_params.n_frames)
            .map(|frames| {
                let sample_rate = u64::from(self.format.sample_rate);
                (frames * 1000 + sample_rate / 2) / sample_rate
            })
    }
}

/// Duplicates or folds channels so interleaved samples match the output layout.
///
/// Output channel `c` takes source channel `min(c, from - 1)`.
#[must_use]
pub fn remap_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }

    let mut mapped = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        for c in 0..to {
            mapped.push(frame[c.min(from - 1)]);
        }
    }
    mapped
}

/// Audio producer that feeds decoded samples into a ring buffer.
///
/// This struct wraps an `AudioDecoder` and continuously decodes audio,
/// converting it to the output layout and writing the samples to the
/// provided ring buffer producer.
pub struct AudioProducer {
    /// The audio decoder that provides raw audio samples.
    decoder: AudioDecoder,
    /// Ring buffer producer for writing decoded samples.
    producer: Producer<f32>,
    /// Number of channels the output stream expects.
    output_channels: usize,
    /// Sample rate converter, present when the output rate differs from the source.
    resampler: Option<AudioResampler>,
    /// Set once every decoded sample has been pushed.
    finished: Arc<AtomicBool>,
}

impl AudioProducer {
    /// Creates a new audio producer.
    ///
    /// # Arguments
    ///
    /// * `decoder` - The audio decoder to use.
    /// * `producer` - The ring buffer producer to write samples to.
    /// * `output_channels` - Channel count of the output stream.
    /// * `resampler` - Optional converter to the output sample rate.
    /// * `finished` - Flag raised when the decoder reaches the end of the file.
    pub fn new(
        decoder: AudioDecoder,
        producer: Producer<f32>,
        output_channels: usize,
        resampler: Option<AudioResampler>,
        finished: Arc<AtomicBool>,
    ) -> Self {
        Self {
            decoder,
            producer,
            output_channels,
            resampler,
            finished,
        }
    }

    /// Runs the audio production loop.
    ///
    /// This method continuously decodes audio and writes samples to the ring buffer.
    /// It returns early once the consumer side is dropped, and should be run on a
    /// dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if decoding or resampling fails.
    pub fn run(mut self) -> Result<(), DecoderError> {
        let source_channels = self.decoder.signal_spec.channels.count();

        loop {
            let interleaved = {
                let Some(buffer) = self.decoder.decode_next_packet()? else {
                    break;
                };
                let mut sample_buffer =
                    SampleBuffer::<f32>::new(buffer.capacity() as u64, *buffer.spec());
                sample_buffer.copy_interleaved_ref(buffer);
                sample_buffer.samples().to_vec()
            };

            let resampled = match self.resampler.as_mut() {
                Some(resampler) => resampler.resample_block(&interleaved)?,
                None => interleaved,
            };

            let samples = remap_channels(&resampled, source_channels, self.output_channels);
            if !self.push_samples(&samples) {
                debug!("Output dropped, stopping decoder");
                return Ok(());
            }
        }

        if let Some(resampler) = self.resampler.as_mut() {
            let tail = resampler.flush()?;
            let samples = remap_channels(&tail, source_channels, self.output_channels);
            if !self.push_samples(&samples) {
                return Ok(());
            }
        }

        debug!("Decoder reached end of stream");
        self.finished.store(true, SeqCst);
        Ok(())
    }

    /// Pushes samples into the ring buffer, waiting while it is full.
    ///
    /// Returns `false` if the consumer has been dropped.
    fn push_samples(&mut self, samples: &[f32]) -> bool {
        for &sample in samples {
            loop {
                if self.producer.is_abandoned() {
                    return false;
                }
                match self.producer.push(sample) {
                    Ok(()) => break,
                    Err(Full(_)) => sleep(PRODUCER_SLEEP_DURATION),
                }
            }
        }
        true
    }
}
