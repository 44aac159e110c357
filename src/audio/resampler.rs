//! Sample rate conversion for audio playback.
//!
//! This module provides sample rate conversion using the `rubato` crate for
//! output devices that cannot open at the source sample rate.

use {
    rubato::{FftFixedIn, Resampler},
    thiserror::Error,
    tracing::info,
};

/// Error type for resampling operations.
#[derive(Error, Debug)]
pub enum ResamplingError {
    /// Rubato construction or processing error.
    #[error("Rubato error: {0}")]
    RubatoError(String),
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Streaming resampler over interleaved `f32` samples.
///
/// Input of arbitrary length is accumulated until a full rubato chunk is
/// available; [`AudioResampler::flush`] drains whatever remains at end of stream.
pub struct AudioResampler {
    /// Rubato resampler instance.
    resampler: FftFixedIn<f32>,
    /// Number of channels.
    channels: usize,
    /// Fixed input chunk size per channel expected by rubato.
    chunk_size: usize,
    /// Accumulated interleaved input (may hold partial chunks).
    input_buffer: Vec<f32>,
}

impl AudioResampler {
    /// Creates a new audio resampler.
    ///
    /// # Arguments
    ///
    /// * `source_rate` - Source sample rate in Hz.
    /// * `target_rate` - Target sample rate in Hz.
    /// * `channels` - Number of audio channels.
    ///
    /// # Errors
    ///
    /// Returns `ResamplingError` if the rates are invalid or identical, or if
    /// rubato rejects the configuration.
    pub fn new(
        source_rate: u32,
        target_rate: u32,
        channels: usize,
    ) -> Result<Self, ResamplingError> {
        if source_rate == 0 || target_rate == 0 || channels == 0 {
            return Err(ResamplingError::InvalidConfiguration(
                "Sample rates and channel count must be greater than 0".to_string(),
            ));
        }

        if source_rate == target_rate {
            return Err(ResamplingError::InvalidConfiguration(
                "Source and target rates must be different".to_string(),
            ));
        }

        let resampler = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            calculate_chunk_size(source_rate),
            1,
            channels,
        )
        .map_err(|e| ResamplingError::RubatoError(e.to_string()))?;

        // Rubato rounds the requested chunk to its FFT size.
        let chunk_size = resampler.input_frames_next();

        info!(
            "Created resampler: {} Hz -> {} Hz, {} channels, chunk size: {}",
            source_rate, target_rate, channels, chunk_size
        );

        Ok(Self {
            resampler,
            channels,
            chunk_size,
            input_buffer: Vec::with_capacity(chunk_size * channels),
        })
    }

    /// Resamples a block of interleaved samples.
    ///
    /// Returns only the output of complete chunks; leftover input is kept for
    /// the next call.
    ///
    /// # Errors
    ///
    /// Returns `ResamplingError` if rubato fails to process a chunk.
    pub fn resample_block(&mut self, input_samples: &[f32]) -> Result<Vec<f32>, ResamplingError> {
        self.input_buffer.extend_from_slice(input_samples);

        let chunk_len = self.chunk_size * self.channels;
        let mut output = Vec::new();
        while self.input_buffer.len() >= chunk_len {
            let planar_in = deinterleave(&self.input_buffer[..chunk_len], self.channels);
            let planar_out = self
                .resampler
                .process(planar_in.as_slice(), None)
                .map_err(|e| ResamplingError::RubatoError(e.to_string()))?;
            interleave_into(&planar_out, &mut output);
            self.input_buffer.drain(..chunk_len);
        }

        Ok(output)
    }

    /// Drains buffered input, padding the final partial chunk.
    ///
    /// # Errors
    ///
    /// Returns `ResamplingError` if rubato fails to process the final chunk.
    pub fn flush(&mut self) -> Result<Vec<f32>, ResamplingError> {
        let mut output = Vec::new();
        if !self.input_buffer.is_empty() {
            let planar_in = deinterleave(&self.input_buffer, self.channels);
            let planar_out = self
                .resampler
                .process_partial(Some(planar_in.as_slice()), None)
                .map_err(|e| ResamplingError::RubatoError(e.to_string()))?;
            interleave_into(&planar_out, &mut output);
            self.input_buffer.clear();
        }
        Ok(output)
    }
}

/// Picks a rubato input chunk of roughly 20 ms, rounded to a power of two.
fn calculate_chunk_size(source_rate: u32) -> usize {
    let target = (source_rate as usize / 50).max(64);
    target.next_power_of_two().min(8192)
}

/// Splits interleaved samples into one vector per channel.
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar: Vec<Vec<f32>> = (0..channels).map(|_| Vec::with_capacity(frames)).collect();
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planar.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planar
}

/// Appends planar channel data to `output` in interleaved order.
fn interleave_into(planar: &[Vec<f32>], output: &mut Vec<f32>) {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    output.reserve(frames * planar.len());
    for frame in 0..frames {
        for plane in planar {
            output.push(plane[frame]);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::resampler::{AudioResampler, calculate_chunk_size, deinterleave};

    #[test]
    fn test_rejects_identical_rates() {
        let result = AudioResampler::new(44100, 44100, 2);
        assert!(result.is_err());
        assert!(
            result
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default()
                .contains("must be different")
        );
    }

    #[test]
    fn test_rejects_zero_rate() {
        assert!(AudioResampler::new(0, 48000, 2).is_err());
    }

    #[test]
    fn test_chunk_size_is_power_of_two() {
        for rate in [8000, 22050, 44100, 48000, 96000, 192_000] {
            let chunk = calculate_chunk_size(rate);
            assert!(chunk.is_power_of_two());
            assert!(chunk <= 8192);
        }
    }

    #[test]
    fn test_deinterleave_stereo() {
        let planar = deinterleave(&[1.0, -1.0, 2.0, -2.0], 2);
        assert_eq!(planar, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
    }

    #[test]
    fn test_resample_produces_roughly_scaled_output() {
        let mut resampler = AudioResampler::new(44100, 48000, 2).unwrap();
        let input = vec![0.0_f32; 44100 * 2];

        let mut output = resampler.resample_block(&input).unwrap();
        output.extend(resampler.flush().unwrap());

        let frames = output.len() / 2;
        assert_eq!(output.len() % 2, 0);
        assert!(frames > 44100, "upsampling should add frames, got {frames}");
        assert!(frames < 52000, "output frame count out of range: {frames}");
    }
}
