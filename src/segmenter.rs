//! Streaming voice-activity segmentation
//!
//! Turns a per-chunk speech/silence signal into debounced
//! `speech_started` / `speech_ended` events. A segment only closes after
//! `max_silence_ms` of accumulated silence (hangover), and segments shorter
//! than `min_speech_ms` are discarded without an end event (noise).
//!
//! The segmenter is a pure state-transition function with no suspension
//! points. One instance serves one continuous stream and must not be driven
//! from two threads at once; it is not internally synchronized.

use crate::audio::AudioChunk;
use crate::classifier::SpeechClassifier;
use crate::error::VoiceResult;
use serde::Serialize;
use tracing::debug;

/// Thresholds controlling segment boundaries. These materially change
/// segmentation behavior and are therefore configurable, not hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Accumulated silence required to close an open segment (default: 500ms)
    pub max_silence_ms: u32,

    /// Minimum speech duration for a segment to count (default: 250ms).
    /// Shorter runs are reset without emitting an end event.
    pub min_speech_ms: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_silence_ms: 500,
            min_speech_ms: 250,
        }
    }
}

/// Per-chunk result of `StreamSegmenter::process_chunk`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChunkOutcome {
    /// Classifier judgment for this chunk.
    pub has_speech: bool,

    /// A new segment opened on this chunk.
    pub speech_started: bool,

    /// A valid segment (>= min_speech_ms) closed on this chunk.
    pub speech_ended: bool,

    /// Accumulated speech time of the open segment, or of the segment that
    /// just closed when `speech_ended` is set.
    pub speech_duration_seconds: f64,

    /// Whether a segment is open after this chunk.
    pub is_speaking: bool,
}

/// Causal segmenter: (state, chunk) -> (state', events).
///
/// Owns its classifier; the classifier is the only external judgment it
/// relies on. Created once per stream and reset implicitly whenever a
/// segment closes or is discarded.
pub struct StreamSegmenter {
    classifier: Box<dyn SpeechClassifier>,
    config: SegmenterConfig,

    is_speaking: bool,
    silence_ms: u32,
    speech_ms: u32,
}

impl StreamSegmenter {
    pub fn new(classifier: Box<dyn SpeechClassifier>, config: SegmenterConfig) -> Self {
        Self {
            classifier,
            config,
            is_speaking: false,
            silence_ms: 0,
            speech_ms: 0,
        }
    }

    /// Process one chunk of the stream.
    ///
    /// Chunks must arrive in temporal order from a single stream. On a
    /// classifier error the chunk is treated as silence (state stays
    /// consistent) and the error is returned; it is never swallowed, since
    /// silently treating real audio as silence could hide failures.
    pub fn process_chunk(&mut self, chunk: &AudioChunk) -> VoiceResult<ChunkOutcome> {
        let has_speech = match self.classifier.is_speech(&chunk.data) {
            Ok(v) => v,
            Err(e) => {
                self.transition(false, chunk.duration_ms);
                return Err(e);
            }
        };
        Ok(self.transition(has_speech, chunk.duration_ms))
    }

    fn transition(&mut self, has_speech: bool, duration_ms: u32) -> ChunkOutcome {
        let mut speech_started = false;
        let mut speech_ended = false;
        let mut reported_speech_ms = 0u32;

        if has_speech {
            if !self.is_speaking {
                self.is_speaking = true;
                self.speech_ms = 0;
                speech_started = true;
                debug!("speech started");
            }
            self.silence_ms = 0;
            self.speech_ms += duration_ms;
            reported_speech_ms = self.speech_ms;
        } else if self.is_speaking {
            self.silence_ms += duration_ms;

            if self.silence_ms >= self.config.max_silence_ms {
                if self.speech_ms >= self.config.min_speech_ms {
                    speech_ended = true;
                    reported_speech_ms = self.speech_ms;
                    debug!("speech ended (duration: {}ms)", self.speech_ms);
                } else {
                    debug!("segment too short ({}ms), discarded", self.speech_ms);
                }
                self.reset();
            } else {
                reported_speech_ms = self.speech_ms;
            }
        }

        ChunkOutcome {
            has_speech,
            speech_started,
            speech_ended,
            speech_duration_seconds: reported_speech_ms as f64 / 1000.0,
            is_speaking: self.is_speaking,
        }
    }

    /// Reset to the initial not-speaking state with zeroed counters.
    pub fn reset(&mut self) {
        self.is_speaking = false;
        self.silence_ms = 0;
        self.speech_ms = 0;
    }

    /// Whether a segment is currently open.
    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    /// Accumulated speech time of the open segment in milliseconds.
    pub fn speech_ms(&self) -> u32 {
        self.speech_ms
    }

    /// Accumulated silence since speech was last observed, in milliseconds.
    pub fn silence_ms(&self) -> u32 {
        self.silence_ms
    }
}

/// A speech interval within a fully buffered clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeechSpan {
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Non-causal segment extraction over a complete buffer.
///
/// Applies the same start/end semantics as the streaming path to
/// `window_ms`-sized classifier windows, then pads each span by `pad_ms` on
/// both sides, clipped to the buffer bounds. Used for offline silence
/// trimming rather than live segmentation. A trailing open segment is
/// closed at the end of the buffer.
pub fn speech_spans(
    classifier: &mut dyn SpeechClassifier,
    audio: &[u8],
    sample_rate: u32,
    window_ms: u32,
    config: &SegmenterConfig,
    pad_ms: u32,
) -> VoiceResult<Vec<SpeechSpan>> {
    let window_bytes = (sample_rate as usize * window_ms as usize / 1000) * 2;
    if window_bytes == 0 || audio.len() < window_bytes {
        return Ok(Vec::new());
    }

    let mut flags = Vec::with_capacity(audio.len() / window_bytes);
    for window in audio.chunks_exact(window_bytes) {
        flags.push(classifier.is_speech(window)?);
    }

    let window_secs = window_ms as f64 / 1000.0;
    let total_secs = (audio.len() / 2) as f64 / sample_rate as f64;
    let pad_secs = pad_ms as f64 / 1000.0;

    let mut spans = Vec::new();
    let mut seg_start: Option<usize> = None;
    let mut last_speech_end = 0usize;
    let mut speech_ms = 0u32;
    let mut silence_ms = 0u32;

    let push_span = |start: usize, end: usize, spans: &mut Vec<SpeechSpan>| {
        let start_secs = (start as f64 * window_secs - pad_secs).max(0.0);
        let end_secs = (end as f64 * window_secs + pad_secs).min(total_secs);
        spans.push(SpeechSpan {
            start_secs,
            end_secs,
        });
    };

    for (i, &voiced) in flags.iter().enumerate() {
        if voiced {
            if seg_start.is_none() {
                seg_start = Some(i);
                speech_ms = 0;
            }
            speech_ms += window_ms;
            silence_ms = 0;
            last_speech_end = i + 1;
        } else if let Some(start) = seg_start {
            silence_ms += window_ms;
            if silence_ms >= config.max_silence_ms {
                if speech_ms >= config.min_speech_ms {
                    push_span(start, last_speech_end, &mut spans);
                }
                seg_start = None;
                speech_ms = 0;
                silence_ms = 0;
            }
        }
    }
    if let Some(start) = seg_start {
        if speech_ms >= config.min_speech_ms {
            push_span(start, last_speech_end, &mut spans);
        }
    }

    Ok(spans)
}

/// Remove silence from a buffered clip, keeping only padded speech spans.
///
/// Returns the concatenated 16-bit PCM of all spans, or an empty buffer when
/// no speech is found.
pub fn trim_silence(
    classifier: &mut dyn SpeechClassifier,
    audio: &[u8],
    sample_rate: u32,
    window_ms: u32,
    config: &SegmenterConfig,
    pad_ms: u32,
) -> VoiceResult<Vec<u8>> {
    let spans = speech_spans(classifier, audio, sample_rate, window_ms, config, pad_ms)?;
    if spans.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for span in spans {
        let start = ((span.start_secs * sample_rate as f64) as usize * 2).min(audio.len());
        let end = ((span.end_secs * sample_rate as f64) as usize * 2).min(audio.len());
        if start < end {
            out.extend_from_slice(&audio[start..end]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;

    /// Classifier driven by a fixed script; anything past the script is
    /// silence.
    struct Scripted {
        script: Vec<bool>,
        pos: usize,
    }

    impl Scripted {
        fn new(script: &[bool]) -> Self {
            Self {
                script: script.to_vec(),
                pos: 0,
            }
        }
    }

    impl SpeechClassifier for Scripted {
        fn is_speech(&mut self, _chunk: &[u8]) -> VoiceResult<bool> {
            let v = self.script.get(self.pos).copied().unwrap_or(false);
            self.pos += 1;
            Ok(v)
        }
    }

    fn chunk_100ms() -> AudioChunk {
        AudioChunk::new(vec![0u8; 3200], 16000, 100)
    }

    fn segmenter(script: &[bool]) -> StreamSegmenter {
        StreamSegmenter::new(Box::new(Scripted::new(script)), SegmenterConfig::default())
    }

    #[test]
    fn speech_opens_segment() {
        let mut seg = segmenter(&[true]);
        let out = seg.process_chunk(&chunk_100ms()).unwrap();
        assert!(out.has_speech);
        assert!(out.speech_started);
        assert!(out.is_speaking);
        assert!(!out.speech_ended);
    }

    #[test]
    fn hangover_keeps_segment_open() {
        // 3 speech chunks, one silent chunk: 100ms < 500ms hangover
        let mut seg = segmenter(&[true, true, true, false]);
        for _ in 0..3 {
            seg.process_chunk(&chunk_100ms()).unwrap();
        }
        let out = seg.process_chunk(&chunk_100ms()).unwrap();
        assert!(!out.speech_ended);
        assert!(out.is_speaking);
        assert_eq!(seg.silence_ms(), 100);
    }

    #[test]
    fn short_segment_is_discarded_without_end_event() {
        // 2 speech chunks (200ms < 250ms min), then 5 silence chunks (500ms)
        let mut seg = segmenter(&[true, true]);
        let mut ended = false;
        for _ in 0..7 {
            ended |= seg.process_chunk(&chunk_100ms()).unwrap().speech_ended;
        }
        assert!(!ended);
        assert!(!seg.is_speaking());
        assert_eq!(seg.speech_ms(), 0);
        assert_eq!(seg.silence_ms(), 0);
    }

    #[test]
    fn reset_after_end_is_idempotent() {
        let mut seg = segmenter(&[true, true, true]);
        for _ in 0..3 {
            seg.process_chunk(&chunk_100ms()).unwrap();
        }
        let mut end_outcome = None;
        for _ in 0..5 {
            let out = seg.process_chunk(&chunk_100ms()).unwrap();
            if out.speech_ended {
                end_outcome = Some(out);
            }
        }
        let out = end_outcome.expect("segment should have closed");
        assert!((out.speech_duration_seconds - 0.3).abs() < 1e-9);
        assert!(!seg.is_speaking());
        assert_eq!(seg.speech_ms(), 0);
        assert_eq!(seg.silence_ms(), 0);
    }

    #[test]
    fn silence_while_idle_is_a_noop() {
        let mut seg = segmenter(&[false, false]);
        for _ in 0..2 {
            let out = seg.process_chunk(&chunk_100ms()).unwrap();
            assert!(!out.speech_started);
            assert!(!out.speech_ended);
            assert!(!out.is_speaking);
        }
        assert_eq!(seg.silence_ms(), 0);
    }

    struct FailOnce {
        failed: bool,
    }

    impl SpeechClassifier for FailOnce {
        fn is_speech(&mut self, _chunk: &[u8]) -> VoiceResult<bool> {
            if self.failed {
                Ok(true)
            } else {
                self.failed = true;
                Err(VoiceError::Classifier("malformed chunk".to_string()))
            }
        }
    }

    #[test]
    fn classifier_error_is_surfaced_not_swallowed() {
        let mut seg = StreamSegmenter::new(
            Box::new(FailOnce { failed: false }),
            SegmenterConfig::default(),
        );
        let err = seg.process_chunk(&chunk_100ms()).unwrap_err();
        assert!(matches!(err, VoiceError::Classifier(_)));
        // State took the silence path and stayed consistent
        assert!(!seg.is_speaking());
        assert_eq!(seg.speech_ms(), 0);

        // The stream keeps working after the error
        let out = seg.process_chunk(&chunk_100ms()).unwrap();
        assert!(out.speech_started);
    }

    #[test]
    fn classifier_error_mid_segment_counts_as_silence() {
        struct FailThird {
            calls: usize,
        }
        impl SpeechClassifier for FailThird {
            fn is_speech(&mut self, _chunk: &[u8]) -> VoiceResult<bool> {
                self.calls += 1;
                if self.calls == 3 {
                    Err(VoiceError::Classifier("bad frame".to_string()))
                } else {
                    Ok(true)
                }
            }
        }
        let mut seg = StreamSegmenter::new(
            Box::new(FailThird { calls: 0 }),
            SegmenterConfig::default(),
        );
        seg.process_chunk(&chunk_100ms()).unwrap();
        seg.process_chunk(&chunk_100ms()).unwrap();
        assert!(seg.process_chunk(&chunk_100ms()).is_err());
        // Segment still open, error chunk accumulated as silence
        assert!(seg.is_speaking());
        assert_eq!(seg.silence_ms(), 100);
        assert_eq!(seg.speech_ms(), 200);
    }

    #[test]
    fn batch_spans_pad_and_clip() {
        // 2s of audio in 100ms windows: speech in windows 5..=10
        let mut script = vec![false; 20];
        for flag in script.iter_mut().take(11).skip(5) {
            *flag = true;
        }
        let mut classifier = Scripted::new(&script);
        let audio = vec![0u8; 16000 * 2 * 2]; // 2s at 16kHz
        let spans = speech_spans(
            &mut classifier,
            &audio,
            16000,
            100,
            &SegmenterConfig::default(),
            100,
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        // 0.5s start - 0.1s pad, 1.1s end + 0.1s pad
        assert!((spans[0].start_secs - 0.4).abs() < 1e-9);
        assert!((spans[0].end_secs - 1.2).abs() < 1e-9);
    }

    #[test]
    fn batch_spans_clip_to_buffer_start() {
        // Speech from the very first window; padding must not go negative
        let script = vec![true, true, true, true, false, false];
        let mut classifier = Scripted::new(&script);
        let audio = vec![0u8; 16000 * 2]; // 1s (10 windows, trailing silence)
        let spans = speech_spans(
            &mut classifier,
            &audio,
            16000,
            100,
            &SegmenterConfig::default(),
            200,
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_secs, 0.0);
        assert!((spans[0].end_secs - 0.6).abs() < 1e-9);
    }

    #[test]
    fn batch_interior_silence_below_hangover_merges() {
        // speech, 200ms silence, speech -> one span (200 < 500 hangover)
        let script = vec![true, true, true, false, false, true, true, true];
        let mut classifier = Scripted::new(&script);
        let audio = vec![0u8; 16000 * 2]; // 1s
        let spans = speech_spans(
            &mut classifier,
            &audio,
            16000,
            100,
            &SegmenterConfig::default(),
            0,
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        assert!((spans[0].start_secs - 0.0).abs() < 1e-9);
        assert!((spans[0].end_secs - 0.8).abs() < 1e-9);
    }

    #[test]
    fn trim_silence_keeps_only_speech() {
        let mut script = vec![false; 10];
        for flag in script.iter_mut().take(7).skip(3) {
            *flag = true;
        }
        let mut classifier = Scripted::new(&script);
        let audio: Vec<u8> = (0..16000u32).flat_map(|i| (i as i16).to_le_bytes()).collect(); // 1s
        let trimmed = trim_silence(
            &mut classifier,
            &audio,
            16000,
            100,
            &SegmenterConfig::default(),
            0,
        )
        .unwrap();
        // windows 3..7 = 400ms of audio
        assert_eq!(trimmed.len(), 16000 / 10 * 4 * 2);
        // Content matches the original bytes at the span offset
        let start = (16000 / 10 * 3) * 2;
        assert_eq!(&trimmed[..8], &audio[start..start + 8]);
    }

    #[test]
    fn trim_silence_empty_when_no_speech() {
        let mut classifier = Scripted::new(&[false; 10]);
        let audio = vec![0u8; 16000 * 2];
        let trimmed = trim_silence(
            &mut classifier,
            &audio,
            16000,
            100,
            &SegmenterConfig::default(),
            100,
        )
        .unwrap();
        assert!(trimmed.is_empty());
    }
}
