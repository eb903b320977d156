//! The static step graph of the setup dialogue.
//!
//! Acyclic except for the implicit self-loop a retry takes. The consent step
//! branches: accepted continues to the field-area request, declined routes
//! through manual district/mandal entry. Routing itself lives in the state
//! machine; this module only declares the steps and their successors.

use serde::{Deserialize, Serialize};

/// One step of the dialogue. `Done` is the terminal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    LanguageSelect,
    AskName,
    LocationConsent,
    AskDistrict,
    AskMandal,
    AskFieldArea,
    Done,
}

impl StepId {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepId::Done)
    }

    /// First step of every session.
    pub fn first() -> Self {
        StepId::LanguageSelect
    }

    /// All non-terminal steps, in walk order.
    pub fn all_prompting() -> [StepId; 6] {
        [
            StepId::LanguageSelect,
            StepId::AskName,
            StepId::LocationConsent,
            StepId::AskDistrict,
            StepId::AskMandal,
            StepId::AskFieldArea,
        ]
    }
}

/// The slot a step fills. Slots are write-once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotName {
    Language,
    UserName,
    LocationConsent,
    District,
    Mandal,
    FieldArea,
}

impl SlotName {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotName::Language => "language",
            SlotName::UserName => "user_name",
            SlotName::LocationConsent => "location_consent",
            SlotName::District => "district",
            SlotName::Mandal => "mandal",
            SlotName::FieldArea => "field_area",
        }
    }
}

/// Per-step retry policy. Abort fires on the `max_attempts`-th consecutive
/// failed extraction, never on an (N+1)-th retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

/// Static definition of a non-terminal step. The retry cap is injected by the
/// state machine from configuration; the graph itself never changes.
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub id: StepId,
    pub slot: SlotName,
    pub retry: RetryPolicy,
    /// Successor on extraction success. The consent step's declined branch
    /// overrides this in the state machine.
    pub next: StepId,
}

/// Build the definition of a step with the given retry policy. Panics on
/// `Done`, which has no spec — callers check `is_terminal` first.
pub fn spec(id: StepId, retry: RetryPolicy) -> StepSpec {
    let (slot, next) = match id {
        StepId::LanguageSelect => (SlotName::Language, StepId::AskName),
        StepId::AskName => (SlotName::UserName, StepId::LocationConsent),
        StepId::LocationConsent => (SlotName::LocationConsent, StepId::AskFieldArea),
        StepId::AskDistrict => (SlotName::District, StepId::AskMandal),
        StepId::AskMandal => (SlotName::Mandal, StepId::AskFieldArea),
        StepId::AskFieldArea => (SlotName::FieldArea, StepId::Done),
        StepId::Done => panic!("terminal step has no spec"),
    };
    StepSpec {
        id,
        slot,
        retry,
        next,
    }
}
