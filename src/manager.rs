//! Multi-engine synthesis manager
//!
//! One uniform `synthesize` over N independently-failing backends, with
//! capability-based auto selection, a bounded per-call timeout, and a
//! single fallback retry. The manager is process-scoped state: build it
//! once at startup (before accepting synthesis calls), then share it
//! read-only behind an `Arc` - there is no global singleton.

use crate::engine::{EngineTier, SynthesisEngine, Voice};
use crate::engines::{CloudEngine, CoquiEngine, FallbackEngine, PiperEngine};
use crate::error::{VoiceError, VoiceResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Manager configuration. The selection thresholds are a default heuristic,
/// not correctness-critical constants.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Engines attempted by `initialize_engines(None)`, in priority order.
    pub default_engines: Vec<String>,

    /// Designated fallback engine for the single retry on failure.
    pub fallback_engine: String,

    /// Texts shorter than this go to the fastest engine (default: 100).
    pub short_text_max_chars: usize,

    /// Bound on each backend invocation; an overrun counts as a failure
    /// eligible for fallback (default: 60s).
    pub engine_timeout: Duration,

    /// Root directory for engine model caches.
    pub cache_dir: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_engines: vec![
                "piper".to_string(),
                "cloud".to_string(),
                "coqui".to_string(),
            ],
            fallback_engine: "cloud".to_string(),
            short_text_max_chars: 100,
            engine_timeout: Duration::from_secs(60),
            cache_dir: PathBuf::from("./models_cache"),
        }
    }
}

/// Result of one successful synthesis call. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct AudioResult {
    pub sample_rate: u32,
    pub audio_duration_seconds: f64,
    pub file_size_bytes: u64,
    pub engine_used: String,
    pub wall_clock_seconds: f64,
}

/// Snapshot of the registry for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub engines_loaded: Vec<String>,
    pub total_engines: usize,
    pub cache_dir: PathBuf,
}

/// Registry of synthesis engines with selection and fallback policy.
///
/// Registration order is priority order: the last selection rule picks the
/// first registered engine.
pub struct EngineManager {
    config: ManagerConfig,
    engines: Vec<(String, Arc<dyn SynthesisEngine>)>,
}

impl EngineManager {
    pub fn new(config: ManagerConfig) -> Self {
        info!("🚀 Initializing TTS engine manager");
        Self {
            config,
            engines: Vec::new(),
        }
    }

    /// Attempt each named engine adapter. Adapters whose runtime dependency
    /// is unavailable are skipped, not fatal. If zero adapters register,
    /// the degraded fallback adapter is installed so `synthesize` never
    /// finds an empty registry.
    pub fn initialize_engines(&mut self, names: Option<&[&str]>) -> VoiceResult<()> {
        std::fs::create_dir_all(&self.config.cache_dir)?;

        let names: Vec<String> = match names {
            Some(names) => names.iter().map(|n| n.to_string()).collect(),
            None => self.config.default_engines.clone(),
        };

        for name in &names {
            match self.build_engine(name) {
                Ok(engine) => self.register(engine),
                Err(e) => warn!("⚠️ engine '{}' unavailable: {}", name, e),
            }
        }

        if self.engines.is_empty() {
            warn!("⚠️ no TTS engines available - installing degraded fallback");
            self.register(Arc::new(FallbackEngine::new()));
        }

        info!("✅ TTS engines ready: [{}]", self.engine_names().join(", "));
        Ok(())
    }

    fn build_engine(&self, name: &str) -> VoiceResult<Arc<dyn SynthesisEngine>> {
        match name {
            "piper" => Ok(Arc::new(PiperEngine::new(&self.config.cache_dir)?)),
            "cloud" => Ok(Arc::new(CloudEngine::from_env()?)),
            "coqui" => Ok(Arc::new(CoquiEngine::new(&self.config.cache_dir)?)),
            "fallback" => Ok(Arc::new(FallbackEngine::new())),
            other => Err(VoiceError::Config(format!("unknown engine '{}'", other))),
        }
    }

    /// Register an engine under its own name, replacing any previous entry
    /// with that name. Also the seam for injecting custom adapters.
    pub fn register(&mut self, engine: Arc<dyn SynthesisEngine>) {
        let name = engine.name().to_string();
        self.engines.retain(|(n, _)| *n != name);
        self.engines.push((name, engine));
    }

    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    fn get(&self, name: &str) -> Option<Arc<dyn SynthesisEngine>> {
        self.engines
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| Arc::clone(e))
    }

    /// Synthesize `text` with `voice_id` into `output_path`.
    ///
    /// `engine = None` applies the auto-selection policy. On failure the
    /// call is retried exactly once on the designated fallback engine (when
    /// registered and distinct from the engine that failed); otherwise the
    /// error propagates with the originating engine name intact.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        engine: Option<&str>,
        sample_rate: u32,
    ) -> VoiceResult<AudioResult> {
        let chosen = match engine {
            Some(name) => name.to_string(),
            None => self.select_engine(text, voice_id)?,
        };
        let adapter = self.get(&chosen).ok_or_else(|| VoiceError::EngineNotFound {
            requested: chosen.clone(),
            available: self.engine_names().join(", "),
        })?;

        match self
            .synthesize_once(&chosen, &adapter, text, voice_id, output_path, sample_rate)
            .await
        {
            Ok(result) => Ok(result),
            Err(err) => {
                let fallback = &self.config.fallback_engine;
                if chosen != *fallback {
                    if let Some(fb) = self.get(fallback) {
                        warn!("🔄 '{}' failed ({}), retrying on '{}'", chosen, err, fallback);
                        return self
                            .synthesize_once(fallback, &fb, text, voice_id, output_path, sample_rate)
                            .await;
                    }
                }
                Err(err)
            }
        }
    }

    async fn synthesize_once(
        &self,
        name: &str,
        adapter: &Arc<dyn SynthesisEngine>,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        sample_rate: u32,
    ) -> VoiceResult<AudioResult> {
        info!(
            "🎙️ synthesizing with '{}' (voice '{}', {} chars)",
            name,
            voice_id,
            text.len()
        );
        let start = Instant::now();

        let call = adapter.synthesize(text, voice_id, output_path, sample_rate);
        let output = match tokio::time::timeout(self.config.engine_timeout, call).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                self.discard_partial(output_path).await;
                return Err(match err {
                    err @ VoiceError::Synthesis { .. } => err,
                    err @ VoiceError::NoEnginesAvailable => err,
                    other => VoiceError::synthesis(name, voice_id, text.len(), other.to_string()),
                });
            }
            Err(_) => {
                self.discard_partial(output_path).await;
                return Err(VoiceError::Timeout {
                    engine: name.to_string(),
                    elapsed: self.config.engine_timeout,
                });
            }
        };

        let wall_clock_seconds = start.elapsed().as_secs_f64();
        let file_size_bytes = tokio::fs::metadata(output_path).await?.len();
        info!(
            "✨ synthesis completed in {:.2}s ({:.1}KB)",
            wall_clock_seconds,
            file_size_bytes as f64 / 1024.0
        );

        Ok(AudioResult {
            sample_rate: output.sample_rate,
            audio_duration_seconds: output.audio_duration_seconds,
            file_size_bytes,
            engine_used: name.to_string(),
            wall_clock_seconds,
        })
    }

    /// A failed engine must not leave a partial artifact that looks
    /// complete.
    async fn discard_partial(&self, output_path: &Path) {
        if tokio::fs::remove_file(output_path).await.is_ok() {
            debug!("removed partial output {}", output_path.display());
        }
    }

    /// Default selection heuristic, first match wins:
    /// 1. short text -> fastest engine
    /// 2. English voice -> fast, else high-quality engine
    /// 3. networked engine
    /// 4. first registered engine
    fn select_engine(&self, text: &str, voice_id: &str) -> VoiceResult<String> {
        if self.engines.is_empty() {
            return Err(VoiceError::NoEnginesAvailable);
        }

        if text.chars().count() < self.config.short_text_max_chars {
            if let Some(name) = self.first_by_tier(EngineTier::Fast) {
                return Ok(name);
            }
        }

        if voice_id.to_ascii_lowercase().starts_with("en-") {
            if let Some(name) = self.first_by_tier(EngineTier::Fast) {
                return Ok(name);
            }
            if let Some(name) = self.first_by_tier(EngineTier::HighQuality) {
                return Ok(name);
            }
        }

        if let Some(name) = self.first_by_tier(EngineTier::Networked) {
            return Ok(name);
        }

        Ok(self.engines[0].0.clone())
    }

    fn first_by_tier(&self, tier: EngineTier) -> Option<String> {
        self.engines
            .iter()
            .find(|(_, e)| e.tier() == tier)
            .map(|(n, _)| n.clone())
    }

    /// Voice catalog: one engine's, or the union across all registered
    /// engines with each voice tagged with its source engine.
    pub fn get_available_voices(&self, engine: Option<&str>) -> VoiceResult<Vec<Voice>> {
        match engine {
            Some(name) => {
                let adapter = self.get(name).ok_or_else(|| VoiceError::EngineNotFound {
                    requested: name.to_string(),
                    available: self.engine_names().join(", "),
                })?;
                Ok(adapter.voices())
            }
            None => {
                let mut all = Vec::new();
                for (name, adapter) in &self.engines {
                    for mut voice in adapter.voices() {
                        voice.engine = name.clone();
                        all.push(voice);
                    }
                }
                Ok(all)
            }
        }
    }

    /// Best-effort warm-up for faster first synthesis. Voices an engine
    /// does not support are skipped.
    pub async fn preload_voices(&self, voice_ids: &[&str]) {
        info!("📦 preloading {} voices", voice_ids.len());
        for voice_id in voice_ids {
            for (name, adapter) in &self.engines {
                if let Err(e) = adapter.preload(voice_id).await {
                    debug!("preload of '{}' on '{}' skipped: {}", voice_id, name, e);
                }
            }
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            engines_loaded: self.engine_names(),
            total_engines: self.engines.len(),
            cache_dir: self.config.cache_dir.clone(),
        }
    }
}
