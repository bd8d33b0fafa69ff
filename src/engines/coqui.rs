//! Coqui XTTS adapter - high-quality local neural TTS
//!
//! Drives the `tts` CLI with the multilingual XTTS-v2 model. One model
//! instance backs every call, and XTTS is not proven thread-safe, so
//! synthesis calls are serialized through a mutex.

use crate::audio::wav_duration;
use crate::engine::{EngineOutput, EngineTier, SynthesisEngine, Voice};
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

const XTTS_MODEL: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

/// Languages supported by XTTS-v2.
const LANGUAGES: &[&str] = &[
    "en", "hi", "de", "fr", "es", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar",
];

/// Coqui XTTS behind its CLI. `EngineTier::HighQuality`.
pub struct CoquiEngine {
    cache_dir: PathBuf,
    // XTTS shares one loaded model; concurrent calls must queue.
    model_lock: Mutex<()>,
}

impl CoquiEngine {
    /// Fails when the `tts` CLI is not on PATH.
    pub fn new(cache_dir: &Path) -> VoiceResult<Self> {
        let probe = std::process::Command::new("tts")
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if probe.is_err() {
            return Err(VoiceError::Config(
                "coqui `tts` binary not found on PATH".to_string(),
            ));
        }

        let cache_dir = cache_dir.join("coqui");
        std::fs::create_dir_all(&cache_dir)?;
        info!("✅ Coqui XTTS engine initialized (cache: {})", cache_dir.display());
        Ok(Self {
            cache_dir,
            model_lock: Mutex::new(()),
        })
    }

    /// Extract the XTTS language code from a voice id like `en-XTTS` or
    /// `en-US-whatever`. Unknown languages default to English.
    fn extract_language(voice_id: &str) -> &'static str {
        let prefix = voice_id
            .split('-')
            .next()
            .unwrap_or("en")
            .to_ascii_lowercase();
        LANGUAGES
            .iter()
            .find(|l| **l == prefix)
            .copied()
            .unwrap_or("en")
    }
}

#[async_trait]
impl SynthesisEngine for CoquiEngine {
    fn name(&self) -> &str {
        "coqui"
    }

    fn tier(&self) -> EngineTier {
        EngineTier::HighQuality
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        _sample_rate: u32,
    ) -> VoiceResult<EngineOutput> {
        let language = Self::extract_language(voice_id);

        let _guard = self.model_lock.lock().await;
        debug!("coqui synthesis: language {} -> {}", language, output_path.display());
        let out = Command::new("tts")
            .arg("--text")
            .arg(text)
            .arg("--model_name")
            .arg(XTTS_MODEL)
            .arg("--language_idx")
            .arg(language)
            .arg("--out_path")
            .arg(output_path)
            .env("TTS_HOME", &self.cache_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Do not let the child outlive a timed-out synthesis future
            .kill_on_drop(true)
            .output()
            .await?;

        if !out.status.success() {
            return Err(VoiceError::synthesis(
                "coqui",
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
        LANGUAGES
            .iter()
            .map(|lang| {
                Voice::new(
                    &format!("{}-XTTS", lang),
                    &format!("XTTS ({})", lang),
                    lang,
                )
            })
            .collect()
    }
}
