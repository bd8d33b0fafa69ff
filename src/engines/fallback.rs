//! Degraded fallback adapter
//!
//! Installed by the manager when zero configured engines come up, so
//! `synthesize` never finds an empty registry. Uses system-level espeak
//! when present; otherwise every call fails loudly instead of the process
//! crashing at startup.

use crate::audio::wav_duration;
use crate::engine::{EngineOutput, EngineTier, SynthesisEngine, Voice};
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// System-level synthesis stub. Construction never fails.
pub struct FallbackEngine {
    espeak: Option<&'static str>,
}

impl FallbackEngine {
    pub fn new() -> Self {
        let espeak = ["espeak-ng", "espeak"].into_iter().find(|bin| {
            std::process::Command::new(bin)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok()
        });
        if espeak.is_none() {
            warn!("⚠️ no system TTS found; fallback engine will error if invoked");
        }
        Self { espeak }
    }
}

impl Default for FallbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SynthesisEngine for FallbackEngine {
    fn name(&self) -> &str {
        "fallback"
    }

    fn tier(&self) -> EngineTier {
        EngineTier::Degraded
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        _sample_rate: u32,
    ) -> VoiceResult<EngineOutput> {
        let bin = self.espeak.ok_or(VoiceError::NoEnginesAvailable)?;

        debug!("fallback synthesis via {}", bin);
        let out = Command::new(bin)
            .arg("-w")
            .arg(output_path)
            .arg(text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Do not let the child outlive a timed-out synthesis future
            .kill_on_drop(true)
            .output()
            .await?;

        if !out.status.success() {
            return Err(VoiceError::synthesis(
                "fallback",
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
        vec![Voice::new("system", "System Voice", "en")]
    }
}
