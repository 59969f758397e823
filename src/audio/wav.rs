//! 16-bit PCM WAV encoding of loop takes, and decoding of raw takes.

use chrono::Local;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use thiserror::Error;
use tracing::debug;

use crate::audio::buffer::{pad_with_silence, SampleBuffer};

/// Size of the canonical RIFF/WAVE header written by [`encode_to_wav`]
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT_TAG: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("audio data is empty")]
    Empty,

    #[error("failed to decode audio: {0}")]
    Decode(#[from] hound::Error),

    #[error("unsupported sample format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },
}

/// A take padded to the cycle length and re-encoded
#[derive(Debug, Clone)]
pub struct ProcessedRecording {
    pub wav: Vec<u8>,
    pub duration_secs: f64,
}

/// Serialize `buffer` as a 16-bit PCM WAV file
pub fn encode_to_wav(buffer: &SampleBuffer) -> Vec<u8> {
    let channels = buffer.num_channels() as u16;
    let sample_rate = buffer.sample_rate();
    let data_len = buffer.len() as u32 * channels as u32 * BYTES_PER_SAMPLE;
    let block_align = channels * BYTES_PER_SAMPLE as u16;
    let byte_rate = sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for sample in buffer.interleaved() {
        out.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    out
}

/// Decode a WAV take into per-channel samples
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }

    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(dequantize))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 17..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(CodecError::UnsupportedFormat {
                bits,
                format: match format {
                    SampleFormat::Float => "float",
                    SampleFormat::Int => "integer",
                },
            })
        }
    };

    let buffer = SampleBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate);
    if buffer.is_empty() {
        return Err(CodecError::Empty);
    }

    Ok(buffer)
}

/// Decode a raw take, pad it with silence to `target_secs` and re-encode it.
///
/// Only decoding can fail; the sync state is never touched.
pub fn process_recording(raw: &[u8], target_secs: f64) -> Result<ProcessedRecording, CodecError> {
    let decoded = decode_wav(raw)?;
    let padded = pad_with_silence(&decoded, target_secs);

    debug!(
        original_secs = decoded.duration_secs(),
        padded_secs = padded.duration_secs(),
        target_secs,
        "processed recording"
    );

    Ok(ProcessedRecording {
        wav: encode_to_wav(&padded),
        duration_secs: padded.duration_secs(),
    })
}

fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Inverse of [`quantize`]. Positive codes map to the middle of their
/// truncation interval so that re-encoding yields the same code.
fn dequantize(value: i16) -> f32 {
    match value {
        0 => 0.0,
        v if v < 0 => v as f32 / 32768.0,
        v => ((v as f32 + 0.5) / 32767.0).min(1.0),
    }
}

/// Generate timestamp string in format: YYYYMMDD-HHMMSS
pub fn generate_timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Output path for a conformed take: `<stem>-conformed-<timestamp>.wav` next to the input
pub fn conformed_path(input: &Path, timestamp: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "take".to_string());
    input.with_file_name(format!("{}-conformed-{}.wav", stem, timestamp))
}
