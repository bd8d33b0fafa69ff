//! Networked adapter - OpenAI-compatible speech API
//!
//! POSTs to `{base_url}/audio/speech` with bearer auth. Works against
//! OpenAI, OpenRouter, or any compatible gateway. This is the
//! general-purpose engine with the widest language coverage, and the
//! default fallback target.

use crate::audio::wav_duration;
use crate::engine::{EngineOutput, EngineTier, SynthesisEngine, Voice};
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Voices exposed by the OpenAI-compatible speech endpoint.
const VOICES: &[(&str, &str, &str)] = &[
    ("alloy", "Alloy (Neutral)", "en-US"),
    ("echo", "Echo (Male)", "en-US"),
    ("fable", "Fable (British Male)", "en-GB"),
    ("onyx", "Onyx (Deep Male)", "en-US"),
    ("nova", "Nova (Female)", "en-US"),
    ("shimmer", "Shimmer (Warm Female)", "en-US"),
];

/// Networked TTS over an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct CloudEngine {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    base_url: String,
    api_key: String,
    /// TTS model: tts-1 (fast) or tts-1-hd (higher quality).
    model: String,
    client: reqwest::Client,
}

impl CloudEngine {
    /// Build from environment: `TTS_API_URL`, `TTS_API_KEY` (or
    /// `OPENAI_API_KEY`), `TTS_MODEL`. Missing key means the engine is
    /// unavailable and gets skipped by the manager.
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("TTS_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                VoiceError::Config("cloud TTS requires TTS_API_KEY or OPENAI_API_KEY".to_string())
            })?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        Self::new(base_url, api_key, model)
    }

    /// Create with explicit config (tests, non-env wiring).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl SynthesisEngine for CloudEngine {
    fn name(&self) -> &str {
        "cloud"
    }

    fn tier(&self) -> EngineTier {
        EngineTier::Networked
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        _sample_rate: u32,
    ) -> VoiceResult<EngineOutput> {
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice_id,
            "response_format": "wav",
        });

        debug!("cloud synthesis: POST {} (voice {})", url, voice_id);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::synthesis("cloud", voice_id, text.len(), e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            return Err(VoiceError::synthesis(
                "cloud",
                voice_id,
                text.len(),
                format!("API error {}: {}", status, detail),
            ));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| VoiceError::synthesis("cloud", voice_id, text.len(), e.to_string()))?;
        tokio::fs::write(output_path, &bytes).await?;

        let (audio_duration_seconds, sample_rate) = wav_duration(output_path)?;
        Ok(EngineOutput {
            audio_duration_seconds,
            sample_rate,
        })
    }

    fn voices(&self) -> Vec<Voice> {
        VOICES
            .iter()
            .map(|(id, name, lang)| Voice::new(id, name, lang))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_constructor_builds() {
        let engine = CloudEngine::new("https://api.openai.com/v1/", "sk-test", "tts-1").unwrap();
        assert_eq!(engine.name(), "cloud");
        assert_eq!(engine.tier(), EngineTier::Networked);
    }

    #[test]
    fn catalog_has_six_voices() {
        let engine = CloudEngine::new("https://api.openai.com/v1", "sk-test", "tts-1").unwrap();
        assert_eq!(engine.voices().len(), 6);
    }
}
