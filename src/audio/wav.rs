//! In-memory WAV container encoding.
//!
//! The ASR engine expects a self-describing audio container, not bare PCM,
//! so each completed segment is wrapped in a minimal 16-bit WAV before the
//! engine call.

use anyhow::{Context, Result};
use std::io::Cursor;

/// Wrap raw little-endian 16-bit PCM bytes in a WAV container.
pub fn encode(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .context("Failed to create WAV writer")?;
        for bytes in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV")?;
    }

    Ok(cursor.into_inner())
}

/// Decode a WAV container back to normalized f32 samples (for engines that
/// consume float PCM, like whisper.cpp).
pub fn decode_to_f32(wav: &[u8]) -> Result<Vec<f32>> {
    let reader =
        hound::WavReader::new(Cursor::new(wav)).context("Failed to parse WAV container")?;
    let samples: Result<Vec<i16>, _> = reader.into_samples::<i16>().collect();
    let samples = samples.context("Failed to read WAV samples")?;
    Ok(samples.iter().map(|&s| s as f32 / 32768.0).collect())
}
