//! The driving loop: speak → listen → advance, until emit or abort.
//!
//! One orchestrator per session. Every channel operation is an awaited
//! future consumed here, in order — there are no completion callbacks and no
//! second authority over the channels. A stop request is observed at every
//! suspension point, forces the channels closed, and is idempotent.

use crate::dialog::{AbortReason, Action, DialogEvent, DialogMachine};
use crate::error::{VoiceError, VoiceResult};
use crate::language::Language;
use crate::session::{DialogSession, Speaker};
use crate::stt::Recognizer;
use crate::tts::Synthesizer;
use crate::turn::{SpeakOutcome, TurnConfig, TurnCoordinator};
use fasal_core::{DialogConfig, FarmProfile, GeoPoint, Geocoder};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Receives the completed profile. Delivery happens at most once per
/// session and is not retried — failure past this seam is the consumer's
/// concern.
#[async_trait::async_trait]
pub trait AnalysisConsumer: Send + Sync {
    async fn deliver(&self, profile: FarmProfile);
}

/// Forwards profiles into an mpsc channel. The receiving half is the
/// analysis pipeline's intake (or a test's).
pub struct ChannelConsumer {
    tx: mpsc::Sender<FarmProfile>,
}

impl ChannelConsumer {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<FarmProfile>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait::async_trait]
impl AnalysisConsumer for ChannelConsumer {
    async fn deliver(&self, profile: FarmProfile) {
        if let Err(e) = self.tx.send(profile).await {
            warn!("profile delivery failed (consumer gone): {}", e);
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Terminal step reached; the profile was emitted.
    Completed(FarmProfile),
    /// The state machine gave up; the user heard a farewell first.
    Aborted(AbortReason),
    /// An external stop request ended the session.
    Stopped,
}

/// Outcome plus the (destroyed) session, for transcript viewers.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub session: DialogSession,
}

/// Requests a stop from outside the loop. Cloneable; stopping twice is a
/// no-op.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        // Repeat sends and sends after the session ended are both fine.
        let _ = self.tx.send(true);
    }
}

/// Owns one session end to end.
pub struct DialogOrchestrator {
    machine: DialogMachine,
    coordinator: TurnCoordinator,
    consumer: Arc<dyn AnalysisConsumer>,
    session: DialogSession,
    stop_rx: watch::Receiver<bool>,
}

impl DialogOrchestrator {
    /// Wire up a session. `device_location` is the coordinate the host
    /// application read from the device, if consent can make use of one.
    pub fn new(
        config: &DialogConfig,
        recognizer: Arc<dyn Recognizer>,
        synthesizer: Arc<dyn Synthesizer>,
        geocoder: Arc<dyn Geocoder>,
        consumer: Arc<dyn AnalysisConsumer>,
        device_location: Option<GeoPoint>,
    ) -> (Self, StopHandle) {
        let initial = Language::from_code(&config.default_language).unwrap_or(Language::English);
        let session = DialogSession::new(initial, device_location);
        let coordinator = TurnCoordinator::new(recognizer, synthesizer, TurnConfig::from(config));
        let machine = DialogMachine::new(config, geocoder);
        let (tx, stop_rx) = watch::channel(false);
        (
            Self {
                machine,
                coordinator,
                consumer,
                session,
                stop_rx,
            },
            StopHandle { tx },
        )
    }

    pub fn session(&self) -> &DialogSession {
        &self.session
    }

    /// Drive the dialogue to its end. Consumes the orchestrator; the session
    /// comes back in the report with its transcript intact.
    pub async fn run(mut self) -> VoiceResult<SessionReport> {
        info!(session = %self.session.id(), "dialogue started");
        let mut action = self
            .machine
            .advance(&mut self.session, DialogEvent::StartDialogue)?;
        loop {
            if *self.stop_rx.borrow() {
                return self.finish_stopped().await;
            }
            match action {
                Action::Speak(text) => {
                    self.session.record(Speaker::System, text.as_str());
                    let lang = self.session.language();
                    let waited = tokio::select! {
                        res = self.coordinator.speak(&text, lang) => Some(res),
                        _ = stop_signal(&mut self.stop_rx) => None,
                    };
                    let outcome = match waited {
                        Some(res) => res?,
                        None => return self.finish_stopped().await,
                    };
                    action = match outcome {
                        SpeakOutcome::Done | SpeakOutcome::TimedOut => Action::Listen,
                        SpeakOutcome::EngineError(detail) => self
                            .machine
                            .advance(&mut self.session, DialogEvent::SynthesisFailed(detail))?,
                    };
                }
                Action::Listen => {
                    let lang = self.session.language();
                    let waited = tokio::select! {
                        res = self.coordinator.listen(lang) => Some(res),
                        _ = stop_signal(&mut self.stop_rx) => None,
                    };
                    let listened = match waited {
                        Some(res) => res,
                        None => return self.finish_stopped().await,
                    };
                    action = match listened {
                        Ok(utterance) => {
                            tracing::debug!(
                                confidence = ?utterance.confidence,
                                "final utterance: {:?}",
                                utterance.text
                            );
                            self.session.record(Speaker::User, utterance.text.as_str());
                            self.machine.advance(
                                &mut self.session,
                                DialogEvent::UtteranceReceived(utterance.text),
                            )?
                        }
                        Err(VoiceError::Recognition { kind, .. }) => self
                            .machine
                            .advance(&mut self.session, DialogEvent::RecognitionFailed(kind))?,
                        Err(VoiceError::SessionStopped) => return self.finish_stopped().await,
                        Err(other) => return Err(other),
                    };
                }
                Action::Emit { farewell, profile } => {
                    self.say_farewell(&farewell).await;
                    self.consumer.deliver(profile.clone()).await;
                    self.coordinator.cancel().await;
                    self.session.destroy();
                    info!(session = %self.session.id(), "profile emitted; session destroyed");
                    return Ok(SessionReport {
                        outcome: SessionOutcome::Completed(profile),
                        session: self.session,
                    });
                }
                Action::Abort { farewell, reason } => {
                    self.say_farewell(&farewell).await;
                    self.coordinator.cancel().await;
                    self.session.destroy();
                    warn!(session = %self.session.id(), ?reason, "session aborted");
                    return Ok(SessionReport {
                        outcome: SessionOutcome::Aborted(reason),
                        session: self.session,
                    });
                }
            }
        }
    }

    /// Final spoken explanation before teardown; the user is never left
    /// mid-conversation without feedback. Best effort: a dead engine cannot
    /// hold the teardown hostage.
    async fn say_farewell(&mut self, text: &str) {
        self.session.record(Speaker::System, text);
        let lang = self.session.language();
        match self.coordinator.speak(text, lang).await {
            Ok(SpeakOutcome::Done) => {}
            Ok(other) => warn!("farewell may not have been heard: {:?}", other),
            Err(e) => warn!("farewell not spoken: {}", e),
        }
    }

    async fn finish_stopped(mut self) -> VoiceResult<SessionReport> {
        self.coordinator.cancel().await;
        self.session.destroy();
        info!(session = %self.session.id(), "session stopped");
        Ok(SessionReport {
            outcome: SessionOutcome::Stopped,
            session: self.session,
        })
    }
}

/// Resolves once a stop has been requested; pends forever if the handle is
/// gone (no stop can ever arrive then).
async fn stop_signal(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::ScriptedRecognizer;
    use crate::tts::SilentSynthesizer;
    use fasal_core::StaticGazetteer;

    fn quick_config() -> DialogConfig {
        DialogConfig {
            backoff_ms: 5,
            recognition_window_secs: 1,
            synthesis_watchdog_secs: 1,
            stop_ack_timeout_ms: 50,
            ..DialogConfig::default()
        }
    }

    fn orchestrator_with(
        recognizer: ScriptedRecognizer,
        device: Option<GeoPoint>,
    ) -> (DialogOrchestrator, StopHandle, mpsc::Receiver<FarmProfile>) {
        let (consumer, rx) = ChannelConsumer::new(4);
        let (orch, stop) = DialogOrchestrator::new(
            &quick_config(),
            Arc::new(recognizer),
            Arc::new(SilentSynthesizer::new()),
            Arc::new(StaticGazetteer::telangana()),
            Arc::new(consumer),
            device,
        );
        (orch, stop, rx)
    }

    #[tokio::test]
    async fn happy_path_emits_exactly_one_profile() {
        let recognizer = ScriptedRecognizer::with_replies([
            "english",
            "My name is Ravi",
            "yes",
            "2.5 hectares",
        ]);
        let (orch, _stop, mut rx) =
            orchestrator_with(recognizer, Some(GeoPoint::new(17.9, 79.6)));

        let report = orch.run().await.unwrap();
        match report.outcome {
            SessionOutcome::Completed(profile) => {
                assert_eq!(profile.user_name, "Ravi");
                assert!((profile.field_area_hectares - 2.5).abs() < f64::EPSILON);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(report.session.is_destroyed());
        // Exactly one delivery.
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_before_start_is_a_clean_stop() {
        let recognizer = ScriptedRecognizer::with_replies(["english"]);
        let (orch, stop, mut rx) = orchestrator_with(recognizer, None);
        stop.stop();
        stop.stop(); // idempotent

        let report = orch.run().await.unwrap();
        assert!(matches!(report.outcome, SessionOutcome::Stopped));
        assert!(report.session.is_destroyed());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn transcript_records_both_speakers() {
        let recognizer = ScriptedRecognizer::with_replies([
            "english",
            "Anjali",
            "no",
            "Warangal",
            "Hanamkonda",
            "3",
        ]);
        let (orch, _stop, _rx) = orchestrator_with(recognizer, None);

        let report = orch.run().await.unwrap();
        let entries = report.session.transcript().entries();
        assert!(entries.len() >= 12); // 6 prompts + 6 replies, plus farewell
        assert!(entries.iter().any(|e| e.speaker == Speaker::User));
        assert!(entries.iter().any(|e| e.speaker == Speaker::System));
        // First line is the system's opening prompt.
        assert_eq!(entries[0].speaker, Speaker::System);
    }
}
