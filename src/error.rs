//! Error types for the voicekit core

use std::time::Duration;
use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur in segmentation and synthesis
#[derive(Error, Debug)]
pub enum VoiceError {
    /// The speech/silence judgment failed for a chunk. The segmenter treats
    /// the chunk as silence and surfaces this to the caller.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// The requested engine name is absent from the registry.
    #[error("engine '{requested}' not available (available: {available})")]
    EngineNotFound { requested: String, available: String },

    /// A backend raised during synthesis. Carries enough context to
    /// reproduce the call without log correlation.
    #[error("synthesis failed on '{engine}' (voice '{voice}', {text_len} chars): {message}")]
    Synthesis {
        engine: String,
        voice: String,
        text_len: usize,
        message: String,
    },

    /// A backend call exceeded the bounded duration. Eligible for fallback.
    #[error("engine '{engine}' timed out after {elapsed:?}")]
    Timeout { engine: String, elapsed: Duration },

    /// The registry is empty and the degraded stub has no offline synthesis
    /// capability to fall back on.
    #[error("no TTS engines available")]
    NoEnginesAvailable,

    #[error("audio decode error: {0}")]
    Audio(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Build a `Synthesis` error with full call context.
    pub fn synthesis(
        engine: impl Into<String>,
        voice: impl Into<String>,
        text_len: usize,
        message: impl Into<String>,
    ) -> Self {
        VoiceError::Synthesis {
            engine: engine.into(),
            voice: voice.into(),
            text_len,
            message: message.into(),
        }
    }
}
