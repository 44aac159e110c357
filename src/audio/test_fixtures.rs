//! Audio fixtures shared by unit tests.

use std::{fs::write, path::Path};

/// Writes a silent 16-bit PCM WAV file.
pub fn write_silent_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
    let block_align = u32::from(channels) * 2;
    let data_len = frames * block_align;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * block_align).to_le_bytes());
    bytes.extend_from_slice(&u16::try_from(block_align).unwrap().to_le_bytes());
    bytes.extend_from_slice(&16_u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    write(path, bytes).unwrap();
}
