//! # voicekit - streaming VAD segmentation and multi-engine TTS
//!
//! The two reusable cores of a real-time voice-chat pipeline:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  audio chunks ─→ SpeechClassifier ─→ StreamSegmenter         │
//! │                    (is_speech?)       (start/end events)     │
//! │                                            │                 │
//! │                            external STT / LLM (out of scope) │
//! │                                            │                 │
//! │  response text ─→ EngineManager ─→ audio file + AudioResult  │
//! │                    piper / cloud / coqui / fallback          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The segmenter is a pure synchronous state machine; synthesis is the only
//! suspension point and every backend call is bounded by a timeout. Build
//! one `EngineManager` at startup, initialize its engines before accepting
//! calls, and share it behind an `Arc`.

pub mod audio;
pub mod classifier;
pub mod engine;
pub mod engines;
pub mod error;
pub mod manager;
pub mod segmenter;

pub use audio::AudioChunk;
pub use classifier::{EnergyClassifier, SpeechClassifier, WebRtcClassifier, WebRtcClassifierConfig};
pub use engine::{EngineOutput, EngineTier, SynthesisEngine, Voice};
pub use engines::{CloudEngine, CoquiEngine, FallbackEngine, PiperEngine};
pub use error::{VoiceError, VoiceResult};
pub use manager::{AudioResult, EngineManager, EngineStats, ManagerConfig};
pub use segmenter::{
    speech_spans, trim_silence, ChunkOutcome, SegmenterConfig, SpeechSpan, StreamSegmenter,
};
