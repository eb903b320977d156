//! Languages of the dialogue and the localized prompt book.
//!
//! Three languages, matching the recognition service's language keys: en, hi,
//! te. The negotiator holds the session's active language; it is switched at
//! most once, when the language-selection step resolves, and every prompt
//! spoken after that — including the confirmation of the selection itself —
//! comes from the new language's templates.

use crate::steps::StepId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// A supported dialogue language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Telugu,
}

impl Language {
    /// Short code used by the recognition service (en | hi | te).
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Telugu => "te",
        }
    }

    /// BCP-47 tag handed to speech providers.
    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
            Language::Telugu => "te-IN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" | "en-in" | "en-us" => Some(Language::English),
            "hi" | "hi-in" => Some(Language::Hindi),
            "te" | "te-in" => Some(Language::Telugu),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Holds the active language for one session. Switched at most once; a second
/// switch attempt is ignored with a warning.
#[derive(Debug, Clone)]
pub struct LanguageNegotiator {
    active: Language,
    switched: bool,
}

impl LanguageNegotiator {
    pub fn new(initial: Language) -> Self {
        Self {
            active: initial,
            switched: false,
        }
    }

    pub fn active(&self) -> Language {
        self.active
    }

    /// Switch the session language. Idempotent: re-setting the same language
    /// is a no-op; a different language after the one allowed switch is
    /// ignored.
    pub fn set_language(&mut self, lang: Language) {
        if lang == self.active {
            return;
        }
        if self.switched {
            warn!(
                current = %self.active,
                requested = %lang,
                "language already negotiated; ignoring switch"
            );
            return;
        }
        debug!(from = %self.active, to = %lang, "language negotiated");
        self.active = lang;
        self.switched = true;
    }

    /// Localized prompt for a step, in the active language.
    pub fn prompt(&self, step: StepId) -> &'static str {
        prompt(self.active, step)
    }

    /// Localized clarifying prompt for a retry of `step`.
    pub fn retry_prompt(&self, step: StepId) -> &'static str {
        retry_prompt(self.active, step)
    }
}

/// Main prompt for a step. Panics on the terminal step, which is never spoken.
pub fn prompt(lang: Language, step: StepId) -> &'static str {
    use Language::*;
    use StepId::*;
    match (step, lang) {
        (LanguageSelect, English) => {
            "Welcome to Fasal Vaani. Which language shall we speak — English, Hindi, or Telugu?"
        }
        (LanguageSelect, Hindi) => {
            "फसल वाणी में आपका स्वागत है। हम किस भाषा में बात करें — अंग्रेज़ी, हिंदी या तेलुगु?"
        }
        (LanguageSelect, Telugu) => {
            "ఫసల్ వాణికి స్వాగతం. మనం ఏ భాషలో మాట్లాడుకుందాం — ఇంగ్లీష్, హిందీ లేదా తెలుగు?"
        }
        (AskName, English) => "What is your name?",
        (AskName, Hindi) => "आपका नाम क्या है?",
        (AskName, Telugu) => "మీ పేరు ఏమిటి?",
        (LocationConsent, English) => "May I use your device location to find your field?",
        (LocationConsent, Hindi) => {
            "क्या मैं आपके खेत का पता लगाने के लिए आपके फ़ोन की लोकेशन इस्तेमाल कर सकती हूँ?"
        }
        (LocationConsent, Telugu) => "మీ పొలాన్ని కనుగొనడానికి మీ ఫోన్ లొకేషన్ వాడవచ్చా?",
        (AskDistrict, English) => "Please tell me your district.",
        (AskDistrict, Hindi) => "कृपया अपना ज़िला बताइए।",
        (AskDistrict, Telugu) => "దయచేసి మీ జిల్లా చెప్పండి.",
        (AskMandal, English) => "And your mandal?",
        (AskMandal, Hindi) => "और आपका मंडल?",
        (AskMandal, Telugu) => "మరి మీ మండలం?",
        (AskFieldArea, English) => "How large is your field, in hectares?",
        (AskFieldArea, Hindi) => "आपका खेत कितने हेक्टेयर का है?",
        (AskFieldArea, Telugu) => "మీ పొలం ఎన్ని హెక్టార్లు?",
        (Done, _) => panic!("terminal step has no prompt"),
    }
}

/// Clarifying prompt spoken when a reply could not be understood.
pub fn retry_prompt(lang: Language, step: StepId) -> &'static str {
    use Language::*;
    use StepId::*;
    match (step, lang) {
        (LanguageSelect, English) => "Please say English, Hindi, or Telugu.",
        (LanguageSelect, Hindi) => "कृपया अंग्रेज़ी, हिंदी या तेलुगु में से एक कहिए।",
        (LanguageSelect, Telugu) => "దయచేసి ఇంగ్లీష్, హిందీ లేదా తెలుగు అని చెప్పండి.",
        (AskName, English) => "Sorry, I didn't catch your name. Please say it again.",
        (AskName, Hindi) => "माफ़ कीजिए, मैं आपका नाम समझ नहीं पाई। कृपया फिर से बताइए।",
        (AskName, Telugu) => "క్షమించండి, మీ పేరు అర్థం కాలేదు. మళ్ళీ చెప్పండి.",
        (LocationConsent, English) => {
            "Please answer yes or no — may I use your device location?"
        }
        (LocationConsent, Hindi) => {
            "कृपया हाँ या नहीं में जवाब दीजिए — क्या मैं आपकी लोकेशन इस्तेमाल करूँ?"
        }
        (LocationConsent, Telugu) => {
            "దయచేసి అవును లేదా కాదు అని చెప్పండి — మీ లొకేషన్ వాడవచ్చా?"
        }
        (AskDistrict, English) => "Sorry, which district is your field in?",
        (AskDistrict, Hindi) => "माफ़ कीजिए, आपका खेत किस ज़िले में है?",
        (AskDistrict, Telugu) => "క్షమించండి, మీ పొలం ఏ జిల్లాలో ఉంది?",
        (AskMandal, English) => "Sorry, which mandal is your field in?",
        (AskMandal, Hindi) => "माफ़ कीजिए, आपका खेत किस मंडल में है?",
        (AskMandal, Telugu) => "క్షమించండి, మీ పొలం ఏ మండలంలో ఉంది?",
        (AskFieldArea, English) => "Please say the area as a number, for example 2.5.",
        (AskFieldArea, Hindi) => "कृपया क्षेत्रफल संख्या में बताइए, जैसे 2.5।",
        (AskFieldArea, Telugu) => "దయచేసి విస్తీర్ణాన్ని సంఖ్యగా చెప్పండి, ఉదాహరణకు 2.5.",
        (Done, _) => panic!("terminal step has no retry prompt"),
    }
}

/// Confirmation of the language choice, spoken in the newly chosen language.
pub fn confirm_language(lang: Language) -> &'static str {
    match lang {
        Language::English => "We will continue in English.",
        Language::Hindi => "हम हिंदी में बात करेंगे।",
        Language::Telugu => "మనం తెలుగులో మాట్లాడుకుందాం.",
    }
}

pub fn confirm_name(lang: Language, name: &str) -> String {
    match lang {
        Language::English => format!("Thank you, {name}."),
        Language::Hindi => format!("धन्यवाद, {name}।"),
        Language::Telugu => format!("ధన్యవాదాలు, {name}."),
    }
}

pub fn confirm_consent_accepted(lang: Language) -> &'static str {
    match lang {
        Language::English => "Great, I will use your device location.",
        Language::Hindi => "ठीक है, मैं आपके फ़ोन की लोकेशन इस्तेमाल करूँगी।",
        Language::Telugu => "సరే, మీ ఫోన్ లొకేషన్ వాడతాను.",
    }
}

/// Consent was given but the device reported no coordinate; the dialogue
/// falls through to manual entry.
pub fn consent_without_location(lang: Language) -> &'static str {
    match lang {
        Language::English => {
            "I could not read your device location, so let us enter it by hand."
        }
        Language::Hindi => "मैं आपकी लोकेशन नहीं पढ़ पाई, चलिए इसे हाथ से दर्ज करते हैं।",
        Language::Telugu => "మీ లొకేషన్ చదవలేకపోయాను, దాన్ని చేతితో నమోదు చేద్దాం.",
    }
}

pub fn confirm_consent_declined(lang: Language) -> &'static str {
    match lang {
        Language::English => "No problem, let us enter your location by hand.",
        Language::Hindi => "कोई बात नहीं, चलिए आपकी लोकेशन हाथ से दर्ज करते हैं।",
        Language::Telugu => "పర్వాలేదు, మీ లొకేషన్ చేతితో నమోదు చేద్దాం.",
    }
}

pub fn confirm_district(lang: Language) -> &'static str {
    match lang {
        Language::English => "Noted.",
        Language::Hindi => "ठीक है।",
        Language::Telugu => "సరే.",
    }
}

pub fn confirm_location_found(lang: Language) -> &'static str {
    match lang {
        Language::English => "Thank you, I have located your mandal.",
        Language::Hindi => "धन्यवाद, आपका मंडल मिल गया।",
        Language::Telugu => "ధన్యవాదాలు, మీ మండలం దొరికింది.",
    }
}

/// The mandal was not in the gazetteer; the regional fallback coordinate is
/// used and the dialogue continues.
pub fn confirm_location_fallback(lang: Language) -> &'static str {
    match lang {
        Language::English => {
            "I could not find that mandal, so I will use the regional centre for now."
        }
        Language::Hindi => {
            "वह मंडल नहीं मिला, फ़िलहाल मैं क्षेत्रीय केंद्र की लोकेशन इस्तेमाल करूँगी।"
        }
        Language::Telugu => "ఆ మండలం దొరకలేదు, ప్రస్తుతానికి ప్రాంతీయ కేంద్రాన్ని వాడతాను.",
    }
}

/// Spoken once after the last slot is filled, before the payload is emitted.
pub fn completion(lang: Language) -> &'static str {
    match lang {
        Language::English => {
            "Your farm profile is ready. We will analyse your field and send you the crop report. Goodbye!"
        }
        Language::Hindi => {
            "आपकी फ़सल प्रोफ़ाइल तैयार है। हम आपके खेत का विश्लेषण करके रिपोर्ट भेजेंगे। धन्यवाद!"
        }
        Language::Telugu => {
            "మీ పంట ప్రొఫైల్ సిద్ధమైంది. మీ పొలాన్ని విశ్లేషించి నివేదిక పంపుతాము. ధన్యవాదాలు!"
        }
    }
}

/// Farewell after retries at a step were exhausted.
pub fn abort_not_understood(lang: Language) -> &'static str {
    match lang {
        Language::English => {
            "Sorry, I am unable to understand. Please try again later from the app. Goodbye."
        }
        Language::Hindi => {
            "माफ़ कीजिए, मैं समझ नहीं पा रही हूँ। कृपया बाद में ऐप से फिर कोशिश कीजिए। धन्यवाद।"
        }
        Language::Telugu => {
            "క్షమించండి, నేను అర్థం చేసుకోలేకపోతున్నాను. దయచేసి తరువాత యాప్ నుండి మళ్ళీ ప్రయత్నించండి. ధన్యవాదాలు."
        }
    }
}

/// Farewell after a terminal channel error (microphone unavailable, permission denied).
pub fn abort_channel_unavailable(lang: Language) -> &'static str {
    match lang {
        Language::English => {
            "Sorry, I cannot access the microphone right now. Please try again later. Goodbye."
        }
        Language::Hindi => {
            "माफ़ कीजिए, अभी माइक्रोफ़ोन उपलब्ध नहीं है। कृपया बाद में फिर कोशिश कीजिए। धन्यवाद।"
        }
        Language::Telugu => {
            "క్షమించండి, ప్రస్తుతం మైక్రోఫోన్ అందుబాటులో లేదు. దయచేసి తరువాత మళ్ళీ ప్రయత్నించండి. ధన్యవాదాలు."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepId;

    const ALL: [Language; 3] = [Language::English, Language::Hindi, Language::Telugu];

    #[test]
    fn every_step_has_a_prompt_in_every_language() {
        for lang in ALL {
            for step in StepId::all_prompting() {
                assert!(!prompt(lang, step).is_empty());
                assert!(!retry_prompt(lang, step).is_empty());
            }
        }
    }

    #[test]
    fn codes_round_trip() {
        for lang in ALL {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
            assert_eq!(Language::from_code(lang.tag()), Some(lang));
        }
        assert_eq!(Language::from_code("fr"), None);
    }

    #[test]
    fn negotiator_switches_at_most_once() {
        let mut n = LanguageNegotiator::new(Language::English);
        n.set_language(Language::Telugu);
        assert_eq!(n.active(), Language::Telugu);
        // Same language again: idempotent.
        n.set_language(Language::Telugu);
        assert_eq!(n.active(), Language::Telugu);
        // A different language after the switch is ignored.
        n.set_language(Language::Hindi);
        assert_eq!(n.active(), Language::Telugu);
    }

    #[test]
    fn staying_on_the_default_does_not_consume_the_switch() {
        let mut n = LanguageNegotiator::new(Language::English);
        n.set_language(Language::English);
        n.set_language(Language::Hindi);
        assert_eq!(n.active(), Language::Hindi);
    }
}
