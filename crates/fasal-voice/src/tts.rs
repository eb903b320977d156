//! **Text-to-speech** — the synthesis provider seam.
//!
//! A [`Synthesizer`] turns prompt text into audible speech; `speak` resolves
//! when playback finishes or the engine reports an error, and `stop` is the
//! hard-stop the coordinator uses for pre-emption. Voice selection is the
//! provider's business — the orchestrator only supplies a language tag.

use crate::error::{VoiceError, VoiceResult};
use crate::language::Language;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Synthesis provider for one session.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text` in `language`. Resolves on playback completion or engine
    /// error; never leaves audio running after returning Ok.
    async fn speak(&self, text: &str, language: Language) -> VoiceResult<()>;
    /// Hard-stop any in-flight playback. Resolves once output is silent.
    async fn stop(&self);
}

/// Placeholder synthesizer: plays nothing, records what would have been
/// spoken. Tests read the log to assert prompt order and language.
#[derive(Debug, Default)]
pub struct SilentSynthesizer {
    spoken: Arc<Mutex<Vec<(Language, String)>>>,
    fail_next: Mutex<Option<String>>,
}

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the spoken-text log.
    pub fn log(&self) -> Arc<Mutex<Vec<(Language, String)>>> {
        Arc::clone(&self.spoken)
    }

    /// Snapshot of everything spoken so far.
    pub fn spoken(&self) -> Vec<(Language, String)> {
        self.spoken.lock().expect("spoken lock").clone()
    }

    /// Make the next `speak` call fail with the given engine message.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock().expect("fail lock") = Some(message.into());
    }
}

#[async_trait::async_trait]
impl Synthesizer for SilentSynthesizer {
    async fn speak(&self, text: &str, language: Language) -> VoiceResult<()> {
        if let Some(msg) = self.fail_next.lock().expect("fail lock").take() {
            return Err(VoiceError::Synthesis(msg));
        }
        debug!(language = %language, "silent synth: {}", text);
        self.spoken
            .lock()
            .expect("spoken lock")
            .push((language, text.to_string()));
        Ok(())
    }

    async fn stop(&self) {}
}

/// Plays synthesized audio bytes on a device. Lives outside this crate in
/// real deployments; [`NullPlayback`] discards audio for headless runs.
#[async_trait::async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Play to completion.
    async fn play(&self, audio: &[u8]) -> VoiceResult<()>;
    /// Cut playback immediately.
    async fn halt(&self);
}

/// Discards audio. Useful when the gateway is exercised without a speaker.
#[derive(Debug, Default)]
pub struct NullPlayback;

#[async_trait::async_trait]
impl PlaybackSink for NullPlayback {
    async fn play(&self, audio: &[u8]) -> VoiceResult<()> {
        debug!(bytes = audio.len(), "null playback: discarding audio");
        Ok(())
    }

    async fn halt(&self) {}
}

/// Map a dialogue language to a synthesis voice.
fn voice_for(language: Language) -> &'static str {
    match language {
        Language::English => "alloy",
        Language::Hindi => "onyx",
        Language::Telugu => "shimmer",
    }
}

/// Production synthesizer: OpenAI-compatible speech API. Uses `TTS_API_URL`
/// (e.g. https://api.openai.com/v1), `TTS_API_KEY` (or `FASAL_API_KEY`), and
/// `TTS_MODEL` (default tts-1).
pub struct SpeechGatewaySynthesizer {
    /// Base URL without trailing slash.
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    sink: Arc<dyn PlaybackSink>,
}

impl SpeechGatewaySynthesizer {
    /// Build from environment: TTS_API_URL, TTS_API_KEY (or FASAL_API_KEY), TTS_MODEL.
    pub fn from_env(sink: Arc<dyn PlaybackSink>) -> VoiceResult<Self> {
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("TTS_API_KEY")
            .or_else(|_| std::env::var("FASAL_API_KEY"))
            .map_err(|_| VoiceError::Config("TTS requires TTS_API_KEY or FASAL_API_KEY".to_string()))?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        Self::new(base_url, api_key, model, sink)
    }

    /// Create with explicit config.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        sink: Arc<dyn PlaybackSink>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
            sink,
        })
    }
}

#[async_trait::async_trait]
impl Synthesizer for SpeechGatewaySynthesizer {
    async fn speak(&self, text: &str, language: Language) -> VoiceResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice_for(language),
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Synthesis(format!(
                "speech API error {}: {}",
                status, body
            )));
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        info!(language = %language, bytes = bytes.len(), "synthesized prompt");
        self.sink.play(&bytes).await
    }

    async fn stop(&self) {
        self.sink.halt().await;
    }
}
