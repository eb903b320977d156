//! **Speech-to-text** — the recognition provider seam.
//!
//! A [`Recognizer`] owns capture and recognition for one listening turn and
//! reports interim results, exactly one final result, or an error, after
//! which its event channel closes. The orchestrator never touches capture
//! primitives directly; the turn coordinator is the only caller.
//!
//! Two implementations: [`ScriptedRecognizer`] replays a deterministic
//! script (tests, demos, offline mode), [`WhisperGatewayRecognizer`] posts
//! captured utterances to an OpenAI-compatible transcription API.

use crate::error::{VoiceError, VoiceResult};
use crate::language::Language;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Error classes a recognition channel can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// The window closed without any speech.
    NoSpeech,
    /// Transport hiccup between capture and the recognition service.
    Network,
    /// Microphone permission denied or device unavailable.
    PermissionDenied,
    /// The channel was stopped from outside mid-turn.
    Aborted,
}

impl RecognitionErrorKind {
    /// Transient errors are retried with backoff inside the turn
    /// coordinator; terminal ones surface immediately.
    pub fn is_transient(self) -> bool {
        matches!(self, RecognitionErrorKind::NoSpeech | RecognitionErrorKind::Network)
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecognitionErrorKind::NoSpeech => "no-speech",
            RecognitionErrorKind::Network => "network",
            RecognitionErrorKind::PermissionDenied => "permission-denied",
            RecognitionErrorKind::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Events emitted during one listening turn.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Non-terminal partial transcript. Logged, never extracted from.
    Interim(String),
    /// The single final transcript; the channel closes after this.
    Final {
        text: String,
        confidence: Option<f32>,
    },
    /// The turn failed; the channel closes after this.
    Error(RecognitionErrorKind),
}

/// A final utterance out of one listening turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Recognition provider for one session. `start` opens a listening turn;
/// `stop` hard-stops capture and resolves once the channel is quiet — that
/// resolution is the stop acknowledgment the coordinator waits on before it
/// lets the synthesizer speak.
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    async fn start(&self, language: Language) -> VoiceResult<mpsc::Receiver<RecognitionEvent>>;
    async fn stop(&self);
}

/// Deterministic recognizer: each `start` replays the next scripted turn.
/// An exhausted script reports no-speech. Never random — a given script
/// always produces the same dialogue.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Vec<RecognitionEvent>>>,
    starts: AtomicU32,
    stops: AtomicU32,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: one final utterance per listening turn, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rec = Self::new();
        for r in replies {
            rec.push_turn(vec![RecognitionEvent::Final {
                text: r.into(),
                confidence: Some(0.95),
            }]);
        }
        rec
    }

    /// Append one scripted listening turn (its full event sequence).
    pub fn push_turn(&self, events: Vec<RecognitionEvent>) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(events);
    }

    /// How many listening turns were started. Lets tests assert retry counts.
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn start(&self, language: Language) -> VoiceResult<mpsc::Receiver<RecognitionEvent>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let events = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| vec![RecognitionEvent::Error(RecognitionErrorKind::NoSpeech)]);
        debug!(language = %language, events = events.len(), "scripted turn");
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for ev in events {
            tx.try_send(ev)
                .map_err(|e| VoiceError::ChannelSend(e.to_string()))?;
        }
        Ok(rx)
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Supplies one captured utterance (WAV bytes) per listening turn. The
/// capture pipeline — microphone, gap detection, wake word — lives outside
/// this crate; this is its narrow seam.
#[async_trait::async_trait]
pub trait UtteranceSource: Send + Sync {
    /// `Ok(None)` means the capture window closed with silence.
    async fn next_utterance(&self) -> VoiceResult<Option<Vec<u8>>>;
}

/// Production recognizer: posts captured audio to an OpenAI-compatible
/// transcription API. Uses `STT_API_URL` (e.g. https://api.openai.com/v1),
/// `STT_API_KEY` (or `FASAL_API_KEY`), and `STT_MODEL` (default whisper-1).
pub struct WhisperGatewayRecognizer {
    /// Base URL without trailing slash.
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    source: Arc<dyn UtteranceSource>,
    inflight: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl WhisperGatewayRecognizer {
    /// Build from environment: STT_API_URL, STT_API_KEY (or FASAL_API_KEY), STT_MODEL.
    pub fn from_env(source: Arc<dyn UtteranceSource>) -> VoiceResult<Self> {
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STT_API_KEY")
            .or_else(|_| std::env::var("FASAL_API_KEY"))
            .map_err(|_| VoiceError::Config("STT requires STT_API_KEY or FASAL_API_KEY".to_string()))?;
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model, source)
    }

    /// Create with explicit config.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        source: Arc<dyn UtteranceSource>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
            source,
            inflight: Mutex::new(None),
        })
    }

    async fn transcribe(
        client: &reqwest::Client,
        base_url: &str,
        api_key: &str,
        model: &str,
        language: Language,
        wav: Vec<u8>,
    ) -> Result<Utterance, RecognitionErrorKind> {
        let url = format!("{}/audio/transcriptions", base_url.trim_end_matches('/'));
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("turn.wav")
            .mime_str("audio/wav")
            .map_err(|_| RecognitionErrorKind::Aborted)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("language", language.code().to_string());
        let res = client
            .post(&url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("transcription request failed: {}", e);
                RecognitionErrorKind::Network
            })?;
        let status = res.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(RecognitionErrorKind::PermissionDenied);
        }
        if !status.is_success() {
            warn!(%status, "transcription API error");
            return Err(RecognitionErrorKind::Network);
        }
        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|_| RecognitionErrorKind::Network)?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(RecognitionErrorKind::NoSpeech);
        }
        let confidence = json
            .get("confidence")
            .and_then(|c| c.as_f64())
            .map(|c| c as f32);
        Ok(Utterance { text, confidence })
    }
}

#[async_trait::async_trait]
impl Recognizer for WhisperGatewayRecognizer {
    async fn start(&self, language: Language) -> VoiceResult<mpsc::Receiver<RecognitionEvent>> {
        let (tx, rx) = mpsc::channel(4);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let source = Arc::clone(&self.source);
        let handle = tokio::spawn(async move {
            let event = match source.next_utterance().await {
                Ok(Some(wav)) => {
                    match Self::transcribe(&client, &base_url, &api_key, &model, language, wav)
                        .await
                    {
                        Ok(utt) => RecognitionEvent::Final {
                            text: utt.text,
                            confidence: utt.confidence,
                        },
                        Err(kind) => RecognitionEvent::Error(kind),
                    }
                }
                Ok(None) => RecognitionEvent::Error(RecognitionErrorKind::NoSpeech),
                Err(e) => {
                    warn!("utterance source failed: {}", e);
                    RecognitionEvent::Error(RecognitionErrorKind::Network)
                }
            };
            let _ = tx.send(event).await;
        });
        *self.inflight.lock().expect("inflight lock") = Some(handle);
        Ok(rx)
    }

    async fn stop(&self) {
        let handle = self.inflight.lock().expect("inflight lock").take();
        if let Some(h) = handle {
            h.abort();
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replays_in_order() {
        let rec = ScriptedRecognizer::with_replies(["english", "Ravi"]);
        let mut rx = rec.start(Language::English).await.unwrap();
        match rx.recv().await.unwrap() {
            RecognitionEvent::Final { text, confidence } => {
                assert_eq!(text, "english");
                assert_eq!(confidence, Some(0.95));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        let mut rx = rec.start(Language::English).await.unwrap();
        match rx.recv().await.unwrap() {
            RecognitionEvent::Final { text, .. } => assert_eq!(text, "Ravi"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(rec.starts(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_reports_no_speech() {
        let rec = ScriptedRecognizer::new();
        let mut rx = rec.start(Language::Hindi).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            RecognitionEvent::Error(RecognitionErrorKind::NoSpeech)
        );
    }

    #[tokio::test]
    async fn interim_events_precede_final() {
        let rec = ScriptedRecognizer::new();
        rec.push_turn(vec![
            RecognitionEvent::Interim("ye".to_string()),
            RecognitionEvent::Final {
                text: "yes".to_string(),
                confidence: None,
            },
        ]);
        let mut rx = rec.start(Language::English).await.unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            RecognitionEvent::Interim(_)
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            RecognitionEvent::Final { .. }
        ));
        // Channel closes after the final event.
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn transient_classification() {
        assert!(RecognitionErrorKind::NoSpeech.is_transient());
        assert!(RecognitionErrorKind::Network.is_transient());
        assert!(!RecognitionErrorKind::PermissionDenied.is_transient());
        assert!(!RecognitionErrorKind::Aborted.is_transient());
    }
}
