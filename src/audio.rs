//! Audio chunk type and small PCM/WAV helpers
//!
//! The segmenter consumes opaque 16-bit little-endian mono PCM. Capture is an
//! external collaborator; whatever produces the stream (a WebSocket, a mic
//! thread, a telephony bridge) hands chunks in here exactly once.

use crate::error::{VoiceError, VoiceResult};
use std::path::Path;

/// One chunk of a continuous audio stream.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw PCM bytes (16-bit little-endian, mono).
    pub data: Vec<u8>,

    /// Sample rate in Hz (e.g. 16000).
    pub sample_rate: u32,

    /// Nominal duration of this chunk in milliseconds. Need not be uniform
    /// across chunks, but must be accurate.
    pub duration_ms: u32,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>, sample_rate: u32, duration_ms: u32) -> Self {
        Self {
            data,
            sample_rate,
            duration_ms,
        }
    }

    /// Build a chunk from i16 samples; duration is derived from the sample
    /// count and rate.
    pub fn from_samples(samples: &[i16], sample_rate: u32) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        let duration_ms = (samples.len() as u64 * 1000 / sample_rate as u64) as u32;
        Self {
            data,
            sample_rate,
            duration_ms,
        }
    }
}

/// Decode 16-bit little-endian PCM bytes into samples.
pub fn pcm_to_samples(data: &[u8]) -> VoiceResult<Vec<i16>> {
    if data.len() % 2 != 0 {
        return Err(VoiceError::Audio(format!(
            "PCM byte length {} is not 16-bit aligned",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Probe a WAV file for (duration in seconds, sample rate).
///
/// Used by the engine adapters after synthesis to report the real audio
/// duration instead of an estimate.
pub fn wav_duration(path: &Path) -> VoiceResult<(f64, u32)> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| VoiceError::Audio(format!("cannot read {}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let frames = reader.duration() as f64;
    Ok((frames / spec.sample_rate as f64, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_from_samples_computes_duration() {
        // 1600 samples at 16 kHz = 100ms
        let samples = vec![0i16; 1600];
        let chunk = AudioChunk::from_samples(&samples, 16000);
        assert_eq!(chunk.duration_ms, 100);
        assert_eq!(chunk.data.len(), 3200);
    }

    #[test]
    fn pcm_decode_round_trips() {
        let samples = [0i16, 1, -1, i16::MAX, i16::MIN];
        let chunk = AudioChunk::from_samples(&samples, 16000);
        let decoded = pcm_to_samples(&chunk.data).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn pcm_decode_rejects_odd_length() {
        assert!(pcm_to_samples(&[0u8; 3]).is_err());
    }

    #[test]
    fn wav_probe_reads_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..8000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let (secs, rate) = wav_duration(&path).unwrap();
        assert_eq!(rate, 16000);
        assert!((secs - 0.5).abs() < 1e-6);
    }
}
