//! Audio file loading
//!
//! Decodes a file with symphonia, converts it to the engine rate with rubato
//! and returns a [`Source`] ready for [`Controller::load`](crate::control::Controller::load).
//! Runs on the control side; allocation and blocking I/O are fine here.

mod decode;
mod resample;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::EngineError;
use crate::source::Source;

pub use decode::{decode_file, DecodedAudio};
pub use resample::resample;

/// Errors from decoding or converting an audio file
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read audio file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Audio file contains no samples")]
    Empty,

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error(transparent)]
    InvalidSource(#[from] EngineError),
}

/// Decode `path` and convert it to `target_rate`
pub fn load_source(path: &Path, target_rate: u32) -> Result<Source, DecodeError> {
    let decoded = decode_file(path)?;
    let from_rate = decoded.sample_rate;
    let channels = resample(&decoded.channels, from_rate, target_rate)?;

    let source = Source::new(channels, target_rate)?;
    log::info!(
        "Loaded {}: {} ch, {:.2}s ({}Hz -> {}Hz)",
        path.display(),
        source.channel_count(),
        source.duration_seconds(),
        from_rate,
        target_rate
    );
    Ok(source)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::Path;

    /// Write a 16-bit PCM WAV file
    pub fn write_wav(path: &Path, interleaved: &[f32], channels: u16, sample_rate: u32) {
        let data_len = (interleaved.len() * 2) as u32;
        let block_align = channels * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for &s in interleaved {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }
}
