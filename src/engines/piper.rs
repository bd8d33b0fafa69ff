//! Piper adapter - ultra-fast local neural TTS
//!
//! Shells out to the `piper` CLI: text on stdin, WAV to `--output_file`.
//! ONNX voice models live under `<cache_dir>/piper/<voice>.onnx`; fetching
//! them is the operator's job, not this crate's.

use crate::audio::wav_duration;
use crate::engine::{EngineOutput, EngineTier, SynthesisEngine, Voice};
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Known Piper voices: (id, display name, language tag).
const VOICES: &[(&str, &str, &str)] = &[
    ("en-US-lessac-medium", "US English Male (Lessac)", "en-US"),
    ("en-US-lessac-high", "US English Male (Lessac HQ)", "en-US"),
    ("en-US-libritts-high", "US English Female (LibriTTS)", "en-US"),
    ("en-GB-alan-medium", "British English Male (Alan)", "en-GB"),
];

/// Piper TTS behind its CLI. `EngineTier::Fast`: the latency choice for
/// short utterances.
pub struct PiperEngine {
    model_dir: PathBuf,
}

impl PiperEngine {
    /// Fails when the `piper` binary is not on PATH, so the manager skips
    /// this engine instead of failing every synthesis call later.
    pub fn new(cache_dir: &Path) -> VoiceResult<Self> {
        let probe = std::process::Command::new("piper")
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if probe.is_err() {
            return Err(VoiceError::Config(
                "piper binary not found on PATH".to_string(),
            ));
        }

        let model_dir = cache_dir.join("piper");
        std::fs::create_dir_all(&model_dir)?;
        info!("✅ Piper TTS engine initialized (models: {})", model_dir.display());
        Ok(Self { model_dir })
    }

    /// Map a requested voice id onto a known Piper voice. English requests
    /// without an exact match fall back to the default Lessac voice.
    fn map_voice(&self, voice_id: &str) -> VoiceResult<&'static str> {
        if let Some((id, _, _)) = VOICES.iter().find(|(id, _, _)| *id == voice_id) {
            return Ok(id);
        }
        if voice_id.to_ascii_lowercase().starts_with("en") {
            return Ok("en-US-lessac-medium");
        }
        Err(VoiceError::Config(format!(
            "voice '{}' not supported by piper",
            voice_id
        )))
    }

    fn model_path(&self, voice: &str) -> PathBuf {
        self.model_dir.join(format!("{}.onnx", voice))
    }
}

#[async_trait]
impl SynthesisEngine for PiperEngine {
    fn name(&self) -> &str {
        "piper"
    }

    fn tier(&self) -> EngineTier {
        EngineTier::Fast
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        _sample_rate: u32,
    ) -> VoiceResult<EngineOutput> {
        let voice = self.map_voice(voice_id)?;
        let model = self.model_path(voice);
        if !model.exists() {
            return Err(VoiceError::synthesis(
                "piper",
                voice_id,
                text.len(),
                format!("model not downloaded: {}", model.display()),
            ));
        }

        debug!("piper synthesis: voice {} -> {}", voice, output_path.display());
        let mut child = Command::new("piper")
            .arg("--model")
            .arg(&model)
            .arg("--output_file")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The manager drops this future on timeout; the child must not
            // outlive it and write the output after the call reported failure.
            .kill_on_drop(true)
            .spawn()?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                VoiceError::synthesis("piper", voice_id, text.len(), "stdin unavailable")
            })?;
            stdin.write_all(text.as_bytes()).await?;
        }

        let out = child.wait_with_output().await?;
        if !out.status.success() {
            return Err(VoiceError::synthesis(
                "piper",
                voice_id,
                text.len(),
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }

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
