//! The synthesis backend contract
//!
//! Every TTS engine, local or networked, sits behind `SynthesisEngine`.
//! Engines declare a capability tier that drives auto selection in the
//! manager; availability is decided at construction time (a missing binary
//! or API key fails the constructor, and the manager skips the engine).

use crate::error::VoiceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Capability tier of an engine, used by the selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineTier {
    /// Lowest-latency local engine; preferred for short utterances.
    Fast,
    /// Local neural engine with the best output quality.
    HighQuality,
    /// General-purpose networked engine (wide language coverage).
    Networked,
    /// Last-resort stub installed when nothing else initialized.
    Degraded,
}

/// A named, language-tagged synthesis persona offered by one engine.
///
/// `engine` is attached by the manager during catalog aggregation; adapters
/// leave it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
    #[serde(default)]
    pub engine: String,
}

impl Voice {
    pub fn new(id: &str, name: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            engine: String::new(),
        }
    }
}

/// What an adapter reports back after writing the audio artifact.
#[derive(Debug, Clone, Copy)]
pub struct EngineOutput {
    pub audio_duration_seconds: f64,
    pub sample_rate: u32,
}

/// One concrete text-to-speech backend.
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Registry key; unique per engine.
    fn name(&self) -> &str;

    /// Capability tier for the selection policy.
    fn tier(&self) -> EngineTier;

    /// Synthesize `text` with `voice_id`, writing exactly one audio file to
    /// `output_path`. A failed call must not leave a partial file that looks
    /// complete; the manager deletes the target on error.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        sample_rate: u32,
    ) -> VoiceResult<EngineOutput>;

    /// Catalog of voices this engine offers. `Voice::engine` is left empty.
    fn voices(&self) -> Vec<Voice>;

    /// Warm up resources for a voice. Best-effort; default is a no-op.
    async fn preload(&self, _voice_id: &str) -> VoiceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_serializes_with_engine_tag() {
        let mut voice = Voice::new("en-US-lessac-medium", "US English Male (Lessac)", "en-US");
        voice.engine = "piper".to_string();
        let json = serde_json::to_string(&voice).unwrap();
        assert!(json.contains("\"engine\":\"piper\""));
    }

    #[test]
    fn tier_snake_case_names() {
        let json = serde_json::to_string(&EngineTier::HighQuality).unwrap();
        assert_eq!(json, "\"high_quality\"");
    }
}
