//! Turn coordination — half-duplex ownership of the speech channels.
//!
//! Exactly one of {speaking, listening} is ever active. The coordinator is
//! the only component allowed to start or stop a provider; it pre-empts by
//! stopping the other channel before starting its own (never merely
//! asserting), retries transient recognition errors with bounded backoff,
//! and bounds a hung synthesis engine with a watchdog so the dialogue can
//! never block indefinitely.

use crate::error::{VoiceError, VoiceResult};
use crate::language::Language;
use crate::stt::{RecognitionErrorKind, RecognitionEvent, Recognizer, Utterance};
use crate::tts::Synthesizer;
use fasal_core::DialogConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Which channel currently owns the audio path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Speaking,
    Listening,
}

/// Timing and retry knobs for one session's channels.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Bound on the recognizer stop-ack during pre-emption.
    pub stop_ack_timeout: Duration,
    /// Upper bound on one synthesis call.
    pub synthesis_watchdog: Duration,
    /// Window for a final recognition result.
    pub recognition_window: Duration,
    /// Transient-error retries within one `listen`.
    pub channel_retries: u32,
    /// Base backoff between retries; grows linearly per attempt.
    pub backoff: Duration,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self::from(&DialogConfig::default())
    }
}

impl From<&DialogConfig> for TurnConfig {
    fn from(c: &DialogConfig) -> Self {
        Self {
            stop_ack_timeout: Duration::from_millis(c.stop_ack_timeout_ms),
            synthesis_watchdog: Duration::from_secs(c.synthesis_watchdog_secs),
            recognition_window: Duration::from_secs(c.recognition_window_secs),
            channel_retries: c.channel_retries,
            backoff: Duration::from_millis(c.backoff_ms),
        }
    }
}

/// How one `speak` call ended. All variants leave the channel idle; a failed
/// or hung engine never blocks the dialogue.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakOutcome {
    /// Synthesis completed normally.
    Done,
    /// The engine reported an error; the prompt may not have been heard.
    EngineError(String),
    /// The watchdog fired; the channel was forced idle.
    TimedOut,
}

/// Sole owner of the speech channels for one session.
pub struct TurnCoordinator {
    recognizer: Arc<dyn Recognizer>,
    synthesizer: Arc<dyn Synthesizer>,
    config: TurnConfig,
    state: ChannelState,
    cancelled: bool,
}

impl TurnCoordinator {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        synthesizer: Arc<dyn Synthesizer>,
        config: TurnConfig,
    ) -> Self {
        Self {
            recognizer,
            synthesizer,
            config,
            state: ChannelState::Idle,
            cancelled: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Speak one prompt. If the recognizer is live it is hard-stopped first
    /// and its stop-ack awaited (bounded) so synthesized audio cannot be
    /// captured as input.
    pub async fn speak(&mut self, text: &str, language: Language) -> VoiceResult<SpeakOutcome> {
        if self.cancelled {
            return Err(VoiceError::SessionStopped);
        }
        if self.state == ChannelState::Listening {
            debug!("pre-empting listener before speaking");
            if timeout(self.config.stop_ack_timeout, self.recognizer.stop())
                .await
                .is_err()
            {
                warn!("recognizer stop-ack timed out; proceeding to speak");
            }
            self.state = ChannelState::Idle;
        }
        if self.state == ChannelState::Speaking {
            // A second speak while one is active pre-empts the first.
            self.synthesizer.stop().await;
            self.state = ChannelState::Idle;
        }
        self.state = ChannelState::Speaking;
        let outcome = match timeout(
            self.config.synthesis_watchdog,
            self.synthesizer.speak(text, language),
        )
        .await
        {
            Ok(Ok(())) => SpeakOutcome::Done,
            Ok(Err(e)) => {
                warn!("synthesis failed: {}", e);
                SpeakOutcome::EngineError(e.to_string())
            }
            Err(_) => {
                warn!(
                    "synthesis exceeded {:?}; forcing channel idle",
                    self.config.synthesis_watchdog
                );
                self.synthesizer.stop().await;
                SpeakOutcome::TimedOut
            }
        };
        self.state = ChannelState::Idle;
        Ok(outcome)
    }

    /// Listen for one final utterance. Interim results are logged and
    /// discarded. Transient errors (no-speech, network) are retried here
    /// with backoff; only terminal errors or exhausted retries surface.
    pub async fn listen(&mut self, language: Language) -> VoiceResult<Utterance> {
        if self.cancelled {
            return Err(VoiceError::SessionStopped);
        }
        if self.state == ChannelState::Speaking {
            self.synthesizer.stop().await;
            self.state = ChannelState::Idle;
        }
        let attempts = self.config.channel_retries + 1;
        let mut last_transient = RecognitionErrorKind::NoSpeech;
        for attempt in 1..=attempts {
            if attempt > 1 {
                let backoff = self.config.backoff * (attempt - 1);
                debug!(attempt, ?backoff, "retrying listen after {}", last_transient);
                sleep(backoff).await;
            }
            self.state = ChannelState::Listening;
            let mut rx = match self.recognizer.start(language).await {
                Ok(rx) => rx,
                Err(e) => {
                    self.state = ChannelState::Idle;
                    return Err(e);
                }
            };
            let turn = timeout(self.config.recognition_window, async {
                while let Some(ev) = rx.recv().await {
                    match ev {
                        RecognitionEvent::Interim(t) => debug!("interim: {}", t),
                        RecognitionEvent::Final { text, confidence } => {
                            return Some(Ok(Utterance { text, confidence }))
                        }
                        RecognitionEvent::Error(kind) => return Some(Err(kind)),
                    }
                }
                None
            })
            .await;
            self.state = ChannelState::Idle;
            match turn {
                Ok(Some(Ok(utterance))) => return Ok(utterance),
                Ok(Some(Err(kind))) if kind.is_transient() => {
                    last_transient = kind;
                }
                Ok(Some(Err(kind))) => {
                    return Err(VoiceError::recognition(kind, "terminal recognition error"))
                }
                // Channel closed or window elapsed without a final result.
                Ok(None) => last_transient = RecognitionErrorKind::NoSpeech,
                Err(_) => {
                    self.recognizer.stop().await;
                    last_transient = RecognitionErrorKind::NoSpeech;
                }
            }
        }
        Err(VoiceError::recognition(
            last_transient,
            format!("no final result after {} attempts", attempts),
        ))
    }

    /// Force both channels idle and invalidate further use. Idempotent.
    pub async fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.recognizer.stop().await;
        self.synthesizer.stop().await;
        self.state = ChannelState::Idle;
        info!("turn coordinator cancelled; channels idle");
    }

    #[cfg(test)]
    fn force_state(&mut self, state: ChannelState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::ScriptedRecognizer;
    use crate::tts::SilentSynthesizer;

    fn quick_config() -> TurnConfig {
        TurnConfig {
            stop_ack_timeout: Duration::from_millis(50),
            synthesis_watchdog: Duration::from_millis(100),
            recognition_window: Duration::from_millis(100),
            channel_retries: 2,
            backoff: Duration::from_millis(5),
        }
    }

    fn coordinator(
        recognizer: Arc<ScriptedRecognizer>,
        synthesizer: Arc<SilentSynthesizer>,
    ) -> TurnCoordinator {
        TurnCoordinator::new(recognizer, synthesizer, quick_config())
    }

    #[tokio::test]
    async fn speak_then_listen_round_trip() {
        let rec = Arc::new(ScriptedRecognizer::with_replies(["yes"]));
        let synth = Arc::new(SilentSynthesizer::new());
        let mut tc = coordinator(Arc::clone(&rec), Arc::clone(&synth));

        let outcome = tc.speak("May I?", Language::English).await.unwrap();
        assert_eq!(outcome, SpeakOutcome::Done);
        assert_eq!(tc.state(), ChannelState::Idle);

        let utt = tc.listen(Language::English).await.unwrap();
        assert_eq!(utt.text, "yes");
        assert_eq!(tc.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn speaking_preempts_a_live_listener() {
        let rec = Arc::new(ScriptedRecognizer::new());
        let synth = Arc::new(SilentSynthesizer::new());
        let mut tc = coordinator(Arc::clone(&rec), Arc::clone(&synth));

        tc.force_state(ChannelState::Listening);
        tc.speak("hello", Language::English).await.unwrap();
        // The recognizer was hard-stopped before synthesis started.
        assert_eq!(rec.stops(), 1);
        assert_eq!(tc.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn transient_error_retries_once_then_succeeds() {
        let rec = Arc::new(ScriptedRecognizer::new());
        rec.push_turn(vec![RecognitionEvent::Error(RecognitionErrorKind::NoSpeech)]);
        rec.push_turn(vec![RecognitionEvent::Final {
            text: "2.5".to_string(),
            confidence: None,
        }]);
        let synth = Arc::new(SilentSynthesizer::new());
        let mut tc = coordinator(Arc::clone(&rec), synth);

        let utt = tc.listen(Language::English).await.unwrap();
        assert_eq!(utt.text, "2.5");
        // Exactly one retry-level backoff occurred.
        assert_eq!(rec.starts(), 2);
    }

    #[tokio::test]
    async fn terminal_error_surfaces_immediately() {
        let rec = Arc::new(ScriptedRecognizer::new());
        rec.push_turn(vec![RecognitionEvent::Error(
            RecognitionErrorKind::PermissionDenied,
        )]);
        let synth = Arc::new(SilentSynthesizer::new());
        let mut tc = coordinator(Arc::clone(&rec), synth);

        let err = tc.listen(Language::English).await.unwrap_err();
        match err {
            VoiceError::Recognition { kind, .. } => {
                assert_eq!(kind, RecognitionErrorKind::PermissionDenied)
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(rec.starts(), 1);
        assert_eq!(tc.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_transient_kind() {
        // Empty script: every start reports no-speech.
        let rec = Arc::new(ScriptedRecognizer::new());
        let synth = Arc::new(SilentSynthesizer::new());
        let mut tc = coordinator(Arc::clone(&rec), synth);

        let err = tc.listen(Language::Telugu).await.unwrap_err();
        match err {
            VoiceError::Recognition { kind, .. } => {
                assert_eq!(kind, RecognitionErrorKind::NoSpeech)
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(rec.starts(), 3); // 1 attempt + 2 retries
    }

    #[tokio::test]
    async fn watchdog_bounds_a_hung_engine() {
        struct HangingSynth;
        #[async_trait::async_trait]
        impl Synthesizer for HangingSynth {
            async fn speak(&self, _text: &str, _language: Language) -> VoiceResult<()> {
                sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            async fn stop(&self) {}
        }

        let rec = Arc::new(ScriptedRecognizer::new());
        let mut tc = TurnCoordinator::new(rec, Arc::new(HangingSynth), quick_config());

        let outcome = tc.speak("hang", Language::English).await.unwrap();
        assert_eq!(outcome, SpeakOutcome::TimedOut);
        assert_eq!(tc.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_blocks_further_turns() {
        let rec = Arc::new(ScriptedRecognizer::with_replies(["ignored"]));
        let synth = Arc::new(SilentSynthesizer::new());
        let mut tc = coordinator(Arc::clone(&rec), Arc::clone(&synth));

        tc.cancel().await;
        let stops_after_first = rec.stops();
        tc.cancel().await;
        assert_eq!(rec.stops(), stops_after_first);

        assert!(matches!(
            tc.speak("late", Language::English).await,
            Err(VoiceError::SessionStopped)
        ));
        assert!(matches!(
            tc.listen(Language::English).await,
            Err(VoiceError::SessionStopped)
        ));
    }

    #[tokio::test]
    async fn engine_error_resolves_and_returns_idle() {
        let rec = Arc::new(ScriptedRecognizer::new());
        let synth = Arc::new(SilentSynthesizer::new());
        synth.fail_next("device lost");
        let mut tc = coordinator(rec, Arc::clone(&synth));

        let outcome = tc.speak("prompt", Language::Hindi).await.unwrap();
        assert!(matches!(outcome, SpeakOutcome::EngineError(_)));
        assert_eq!(tc.state(), ChannelState::Idle);
    }
}
