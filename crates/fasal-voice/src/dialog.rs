//! The dialogue state machine.
//!
//! `advance` is the single mutation point for session state: it maps an
//! event onto the next action, fills slots write-once, and decides retry
//! versus advance versus abort. It never touches a channel — speaking and
//! listening are the turn coordinator's monopoly.

use crate::error::VoiceResult;
use crate::language::{
    self, confirm_consent_accepted, confirm_consent_declined, confirm_district,
    confirm_language, confirm_location_fallback, confirm_location_found, confirm_name,
    consent_without_location,
};
use crate::session::DialogSession;
use crate::slots::{self, Extraction};
use crate::steps::{self, RetryPolicy, SlotName, StepId};
use crate::stt::RecognitionErrorKind;
use chrono::Utc;
use fasal_core::{DialogConfig, FarmProfile, Geocoder, LocationSource, REGION_FALLBACK};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Events delivered to the state machine by the orchestrator loop.
#[derive(Debug, Clone)]
pub enum DialogEvent {
    StartDialogue,
    UtteranceReceived(String),
    RecognitionFailed(RecognitionErrorKind),
    SynthesisFailed(String),
}

/// Why a session was aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Retries at a step were exhausted without a usable reply.
    RetriesExhausted(StepId),
    /// The recognition channel failed terminally.
    ChannelUnavailable(RecognitionErrorKind),
}

/// What the orchestrator should do next.
#[derive(Debug, Clone)]
pub enum Action {
    /// Speak this text, then listen (the dialogue is still open).
    Speak(String),
    /// Open the input channel for one reply.
    Listen,
    /// Speak the farewell, deliver the payload once, destroy the session.
    Emit {
        farewell: String,
        profile: FarmProfile,
    },
    /// Speak the farewell, destroy the session.
    Abort {
        farewell: String,
        reason: AbortReason,
    },
}

/// The transition table plus the injected geocoding collaborator.
pub struct DialogMachine {
    geocoder: Arc<dyn Geocoder>,
    retry: RetryPolicy,
}

impl DialogMachine {
    pub fn new(config: &DialogConfig, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            retry: RetryPolicy {
                max_attempts: config.extraction_retries.max(1),
            },
        }
    }

    /// Feed one event through the machine.
    pub fn advance(&self, session: &mut DialogSession, event: DialogEvent) -> VoiceResult<Action> {
        match event {
            DialogEvent::StartDialogue => {
                let step = session.step();
                debug!(session = %session.id(), ?step, "dialogue opening");
                Ok(Action::Speak(
                    language::prompt(session.language(), step).to_string(),
                ))
            }
            DialogEvent::UtteranceReceived(text) => self.handle_utterance(session, &text),
            DialogEvent::RecognitionFailed(kind) if kind.is_transient() => {
                // The coordinator already burned its channel retries; from
                // here a silent window counts like an unusable reply.
                debug!(%kind, "transient recognition failure surfaced; step retry");
                self.register_failure(session)
            }
            DialogEvent::RecognitionFailed(kind) => {
                warn!(%kind, "terminal recognition failure; aborting session");
                Ok(Action::Abort {
                    farewell: language::abort_channel_unavailable(session.language()).to_string(),
                    reason: AbortReason::ChannelUnavailable(kind),
                })
            }
            DialogEvent::SynthesisFailed(detail) => {
                // The prompt may not have been heard; listening anyway beats
                // stalling the conversation.
                warn!("synthesis failed mid-dialogue: {}", detail);
                Ok(Action::Listen)
            }
        }
    }

    fn handle_utterance(&self, session: &mut DialogSession, text: &str) -> VoiceResult<Action> {
        let step = session.step();
        let spec = steps::spec(step, self.retry);
        debug!(?step, "utterance received: {:?}", text);
        match spec.slot {
            SlotName::Language => match slots::extract_language(text) {
                Extraction::Matched(lang) => {
                    session.switch_language(lang);
                    session.collected_mut().set_language(lang)?;
                    session.advance_to(spec.next);
                    // Confirmation and next prompt both come from the newly
                    // negotiated language.
                    Ok(Action::Speak(format!(
                        "{} {}",
                        confirm_language(lang),
                        language::prompt(lang, spec.next)
                    )))
                }
                _ => self.register_failure(session),
            },
            SlotName::UserName => match slots::extract_name(text) {
                Extraction::Matched(name) => {
                    session.collected_mut().set_user_name(name.clone())?;
                    session.advance_to(spec.next);
                    let lang = session.language();
                    Ok(Action::Speak(format!(
                        "{} {}",
                        confirm_name(lang, &name),
                        language::prompt(lang, spec.next)
                    )))
                }
                _ => self.register_failure(session),
            },
            SlotName::LocationConsent => {
                match slots::extract_yes_no(text, session.language()) {
                    Extraction::Matched(true) => {
                        session.collected_mut().set_location_consent(true)?;
                        let lang = session.language();
                        match session.device_location() {
                            Some(point) => {
                                session
                                    .collected_mut()
                                    .set_location(point, LocationSource::Device)?;
                                session.advance_to(spec.next);
                                Ok(Action::Speak(format!(
                                    "{} {}",
                                    confirm_consent_accepted(lang),
                                    language::prompt(lang, spec.next)
                                )))
                            }
                            None => {
                                // Consent given but the device had nothing to
                                // offer; fall through to manual entry.
                                session.advance_to(StepId::AskDistrict);
                                Ok(Action::Speak(format!(
                                    "{} {}",
                                    consent_without_location(lang),
                                    language::prompt(lang, StepId::AskDistrict)
                                )))
                            }
                        }
                    }
                    Extraction::Matched(false) => {
                        // Decline is a branch, not a failure.
                        session.collected_mut().set_location_consent(false)?;
                        session.advance_to(StepId::AskDistrict);
                        let lang = session.language();
                        Ok(Action::Speak(format!(
                            "{} {}",
                            confirm_consent_declined(lang),
                            language::prompt(lang, StepId::AskDistrict)
                        )))
                    }
                    _ => self.register_failure(session),
                }
            }
            SlotName::District => match slots::extract_place(text) {
                Extraction::Matched(place) => {
                    session.collected_mut().set_district(place)?;
                    session.advance_to(spec.next);
                    let lang = session.language();
                    Ok(Action::Speak(format!(
                        "{} {}",
                        confirm_district(lang),
                        language::prompt(lang, spec.next)
                    )))
                }
                _ => self.register_failure(session),
            },
            SlotName::Mandal => match slots::extract_place(text) {
                Extraction::Matched(place) => {
                    session.collected_mut().set_mandal(place.clone())?;
                    let district = session
                        .collected()
                        .district()
                        .unwrap_or_default()
                        .to_string();
                    let lang = session.language();
                    let (point, source, confirmation) =
                        match self.geocoder.lookup(&district, &place) {
                            Ok(Some(p)) => {
                                (p, LocationSource::Gazetteer, confirm_location_found(lang))
                            }
                            Ok(None) => {
                                info!(%district, mandal = %place, "gazetteer miss; using region fallback");
                                (
                                    REGION_FALLBACK,
                                    LocationSource::RegionFallback,
                                    confirm_location_fallback(lang),
                                )
                            }
                            Err(e) => {
                                warn!("geocoder unavailable: {}; using region fallback", e);
                                (
                                    REGION_FALLBACK,
                                    LocationSource::RegionFallback,
                                    confirm_location_fallback(lang),
                                )
                            }
                        };
                    session.collected_mut().set_location(point, source)?;
                    session.advance_to(spec.next);
                    Ok(Action::Speak(format!(
                        "{} {}",
                        confirmation,
                        language::prompt(lang, spec.next)
                    )))
                }
                _ => self.register_failure(session),
            },
            SlotName::FieldArea => match slots::extract_area(text) {
                Extraction::Matched(hectares) => {
                    session.collected_mut().set_field_area(hectares)?;
                    session.advance_to(spec.next);
                    let profile = build_profile(session);
                    info!(session = %session.id(), "dialogue complete; emitting profile");
                    Ok(Action::Emit {
                        farewell: language::completion(session.language()).to_string(),
                        profile,
                    })
                }
                _ => self.register_failure(session),
            },
        }
    }

    /// One more failed extraction at the current step: retry with a
    /// clarifying prompt, or abort when the policy's cap is reached. Abort
    /// fires on the Nth failure, never after an (N+1)-th retry.
    fn register_failure(&self, session: &mut DialogSession) -> VoiceResult<Action> {
        let step = session.step();
        let spec = steps::spec(step, self.retry);
        let failures = session.note_failure();
        if failures >= spec.retry.max_attempts {
            warn!(
                ?step,
                failures, "retries exhausted; aborting session"
            );
            Ok(Action::Abort {
                farewell: language::abort_not_understood(session.language()).to_string(),
                reason: AbortReason::RetriesExhausted(step),
            })
        } else {
            debug!(?step, failures, "retrying step");
            Ok(Action::Speak(
                language::retry_prompt(session.language(), step).to_string(),
            ))
        }
    }
}

/// Assemble the payload from the collected slots. Called only after the
/// terminal step is reached, when every required slot is filled.
fn build_profile(session: &DialogSession) -> FarmProfile {
    let collected = session.collected();
    FarmProfile {
        session_id: session.id(),
        user_name: collected.user_name().unwrap_or_default().to_string(),
        location: collected.location().unwrap_or(REGION_FALLBACK),
        location_source: collected
            .location_source()
            .unwrap_or(LocationSource::RegionFallback),
        district: collected.district().map(str::to_string),
        mandal: collected.mandal().map(str::to_string),
        field_area_hectares: collected.field_area_hectares().unwrap_or_default(),
        language: session.language().code().to_string(),
        collected_at: Utc::now(),
    }
}
