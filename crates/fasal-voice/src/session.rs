//! Per-conversation state: one farmer, one dialogue, one session.
//!
//! All mutation happens through the state machine; nothing here is shared
//! across sessions. Slots are write-once — a value, once collected, is never
//! overwritten within the same session. The transcript is an append-only
//! sink for a viewer; the state machine never reads it back.

use crate::error::{VoiceError, VoiceResult};
use crate::language::{Language, LanguageNegotiator};
use crate::steps::StepId;
use chrono::{DateTime, Utc};
use fasal_core::{GeoPoint, LocationSource};
use serde::Serialize;
use uuid::Uuid;

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Ordered record of everything said, for audit and replay.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn record(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            speaker,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The collected slots. Every setter enforces write-once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SlotValues {
    language: Option<Language>,
    user_name: Option<String>,
    location_consent: Option<bool>,
    district: Option<String>,
    mandal: Option<String>,
    location: Option<GeoPoint>,
    location_source: Option<LocationSource>,
    field_area_hectares: Option<f64>,
}

impl SlotValues {
    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn location_consent(&self) -> Option<bool> {
        self.location_consent
    }

    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    pub fn mandal(&self) -> Option<&str> {
        self.mandal.as_deref()
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    pub fn location_source(&self) -> Option<LocationSource> {
        self.location_source
    }

    pub fn field_area_hectares(&self) -> Option<f64> {
        self.field_area_hectares
    }

    pub fn set_language(&mut self, v: Language) -> VoiceResult<()> {
        if self.language.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("language"));
        }
        self.language = Some(v);
        Ok(())
    }

    pub fn set_user_name(&mut self, v: String) -> VoiceResult<()> {
        if self.user_name.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("user_name"));
        }
        self.user_name = Some(v);
        Ok(())
    }

    pub fn set_location_consent(&mut self, v: bool) -> VoiceResult<()> {
        if self.location_consent.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("location_consent"));
        }
        self.location_consent = Some(v);
        Ok(())
    }

    pub fn set_district(&mut self, v: String) -> VoiceResult<()> {
        if self.district.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("district"));
        }
        self.district = Some(v);
        Ok(())
    }

    pub fn set_mandal(&mut self, v: String) -> VoiceResult<()> {
        if self.mandal.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("mandal"));
        }
        self.mandal = Some(v);
        Ok(())
    }

    pub fn set_location(&mut self, point: GeoPoint, source: LocationSource) -> VoiceResult<()> {
        if self.location.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("location"));
        }
        self.location = Some(point);
        self.location_source = Some(source);
        Ok(())
    }

    pub fn set_field_area(&mut self, v: f64) -> VoiceResult<()> {
        if self.field_area_hectares.is_some() {
            return Err(VoiceError::SlotAlreadyFilled("field_area"));
        }
        self.field_area_hectares = Some(v);
        Ok(())
    }
}

/// One conversation's state. Created on start, destroyed on completion,
/// stop, or unrecoverable channel failure.
#[derive(Debug)]
pub struct DialogSession {
    id: Uuid,
    language: LanguageNegotiator,
    current_step: StepId,
    failures_at_step: u32,
    device_location: Option<GeoPoint>,
    collected: SlotValues,
    transcript: Transcript,
    destroyed: bool,
}

impl DialogSession {
    pub fn new(initial_language: Language, device_location: Option<GeoPoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            language: LanguageNegotiator::new(initial_language),
            current_step: StepId::first(),
            failures_at_step: 0,
            device_location,
            collected: SlotValues::default(),
            transcript: Transcript::default(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The active dialogue language.
    pub fn language(&self) -> Language {
        self.language.active()
    }

    pub(crate) fn switch_language(&mut self, lang: Language) {
        self.language.set_language(lang);
    }

    pub fn step(&self) -> StepId {
        self.current_step
    }

    /// Move to `next` and reset the per-step failure counter.
    pub(crate) fn advance_to(&mut self, next: StepId) {
        self.current_step = next;
        self.failures_at_step = 0;
    }

    /// Count one failed extraction at the current step; returns the total so
    /// far.
    pub(crate) fn note_failure(&mut self) -> u32 {
        self.failures_at_step += 1;
        self.failures_at_step
    }

    pub fn failures_at_step(&self) -> u32 {
        self.failures_at_step
    }

    pub fn device_location(&self) -> Option<GeoPoint> {
        self.device_location
    }

    pub fn collected(&self) -> &SlotValues {
        &self.collected
    }

    pub(crate) fn collected_mut(&mut self) -> &mut SlotValues {
        &mut self.collected
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn record(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.transcript.record(speaker, text);
    }

    pub(crate) fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
