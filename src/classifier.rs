//! Binary speech/non-speech classifiers
//!
//! The segmenter only consumes a `bool` per chunk; anything that can judge
//! speech vs silence plugs in behind `SpeechClassifier`. The reference
//! classifier wraps WebRTC VAD. An energy (RMS) classifier is provided for
//! tests and environments without the VAD library.

use crate::audio::pcm_to_samples;
use crate::error::{VoiceError, VoiceResult};
use tracing::{debug, info};
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Binary speech classifier over one chunk of 16-bit PCM bytes.
///
/// Implementations must not retain the chunk. A failed judgment returns an
/// error rather than a silent `false`, so the caller can distinguish real
/// silence from a broken classifier.
pub trait SpeechClassifier {
    fn is_speech(&mut self, chunk: &[u8]) -> VoiceResult<bool>;
}

/// Configuration for the WebRTC VAD classifier
#[derive(Debug, Clone)]
pub struct WebRtcClassifierConfig {
    /// Sample rate (must be 8000, 16000, 32000, or 48000 Hz)
    pub sample_rate: u32,

    /// Detection mode (0-3, where 3 is most aggressive)
    pub mode: u8,
}

impl Default for WebRtcClassifierConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            mode: 3,
        }
    }
}

/// Speech classifier backed by WebRTC VAD.
///
/// WebRTC VAD judges fixed 10/20/30 ms frames; arbitrary-length chunks are
/// split into 30 ms frames and the chunk counts as speech when any frame is
/// voiced.
pub struct WebRtcClassifier {
    vad: Vad,
    config: WebRtcClassifierConfig,
    frame_size: usize,
}

impl WebRtcClassifier {
    pub fn new(config: WebRtcClassifierConfig) -> VoiceResult<Self> {
        if !matches!(config.sample_rate, 8000 | 16000 | 32000 | 48000) {
            return Err(VoiceError::Config(format!(
                "WebRTC VAD only supports 8000, 16000, 32000, or 48000 Hz, got {}",
                config.sample_rate
            )));
        }
        if config.mode > 3 {
            return Err(VoiceError::Config(format!(
                "VAD mode must be 0-3, got {}",
                config.mode
            )));
        }

        // 30ms frames; at 16kHz that is 480 samples
        let frame_size = (config.sample_rate as usize * 30) / 1000;
        let vad = build_vad(&config);

        info!(
            "🎙️ WebRTC VAD ready ({}Hz, mode {}, frame {} samples)",
            config.sample_rate, config.mode, frame_size
        );

        Ok(Self {
            vad,
            config,
            frame_size,
        })
    }

    /// Frame size in samples (30 ms at the configured rate).
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Reset session state. WebRTC VAD has no explicit reset, so the
    /// instance is recreated.
    pub fn reset(&mut self) {
        self.vad = build_vad(&self.config);
    }
}

fn build_vad(config: &WebRtcClassifierConfig) -> Vad {
    let mode = match config.mode {
        0 => VadMode::Quality,
        1 => VadMode::LowBitrate,
        2 => VadMode::Aggressive,
        _ => VadMode::VeryAggressive,
    };
    let rate = match config.sample_rate {
        8000 => SampleRate::Rate8kHz,
        32000 => SampleRate::Rate32kHz,
        48000 => SampleRate::Rate48kHz,
        _ => SampleRate::Rate16kHz,
    };
    let mut vad = Vad::new();
    vad.set_mode(mode);
    vad.set_sample_rate(rate);
    vad
}

impl SpeechClassifier for WebRtcClassifier {
    fn is_speech(&mut self, chunk: &[u8]) -> VoiceResult<bool> {
        let samples = pcm_to_samples(chunk).map_err(|e| VoiceError::Classifier(e.to_string()))?;
        if samples.len() < self.frame_size {
            return Err(VoiceError::Classifier(format!(
                "chunk of {} samples is shorter than one {}-sample frame",
                samples.len(),
                self.frame_size
            )));
        }

        for frame in samples.chunks_exact(self.frame_size) {
            let voiced = self
                .vad
                .is_voice_segment(frame)
                .map_err(|e| VoiceError::Classifier(format!("VAD processing failed: {:?}", e)))?;
            if voiced {
                debug!("VAD result: SPEECH");
                return Ok(true);
            }
        }
        debug!("VAD result: SILENCE");
        Ok(false)
    }
}

/// Dependency-free RMS energy classifier.
///
/// Good enough for scripted tests and as a last-resort judge when no VAD
/// model is present. Threshold is on normalized amplitude (0.0 - 1.0).
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    pub threshold: f32,
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self { threshold: 0.01 }
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn is_speech(&mut self, chunk: &[u8]) -> VoiceResult<bool> {
        let samples = pcm_to_samples(chunk).map_err(|e| VoiceError::Classifier(e.to_string()))?;
        if samples.is_empty() {
            return Err(VoiceError::Classifier("empty audio chunk".to_string()));
        }
        let sum_sq: f64 = samples
            .iter()
            .map(|&s| {
                let norm = s as f64 / 32768.0;
                norm * norm
            })
            .sum();
        let rms = (sum_sq / samples.len() as f64).sqrt();
        Ok(rms > self.threshold as f64)
    }
}
