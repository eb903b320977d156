//! Slot extraction — typed values out of free-text utterances.
//!
//! Pure functions over per-language word lists and pattern matchers. No
//! channel access, no state: everything here is unit-testable with plain
//! strings. An utterance either yields `Matched`, is `Ambiguous` (markers for
//! more than one reading), or is `NoMatch`; the state machine never guesses a
//! default.

use crate::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Outcome of running an extractor against one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Matched(T),
    Ambiguous,
    NoMatch,
}

impl<T> Extraction<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Extraction::Matched(_))
    }
}

/// First decimal-looking token: digits with an optional decimal part.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid regex"));

/// Punctuation stripped from token edges. Explicit rather than
/// "not alphanumeric": Indic combining signs (viramas, vowel marks) are not
/// alphanumeric to Unicode but are very much part of the word.
fn is_edge_punct(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '।' | '॥' | '…' | '‘' | '’' | '“' | '”')
}

/// Whole-word tokens: lowercased, punctuation trimmed from the edges.
fn tokens(utterance: &str) -> Vec<String> {
    utterance
        .split_whitespace()
        .map(|w| w.trim_matches(is_edge_punct).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

const ENGLISH_MARKERS: &[&str] = &[
    "english", "inglish", "angrezi", "अंग्रेज़ी", "अंग्रेजी", "इंग्लिश", "ఇంగ్లీష్", "ఆంగ్లం",
];
const HINDI_MARKERS: &[&str] = &["hindi", "हिंदी", "हिन्दी", "హిందీ"];
const TELUGU_MARKERS: &[&str] = &["telugu", "तेलुगु", "తెలుగు"];

/// Detect the requested dialogue language. Naming two different languages in
/// one breath is ambiguous, not a guess.
pub fn extract_language(utterance: &str) -> Extraction<Language> {
    let toks = tokens(utterance);
    let mut found: Vec<Language> = Vec::new();
    let mut note = |lang: Language, hit: bool| {
        if hit && !found.contains(&lang) {
            found.push(lang);
        }
    };
    note(
        Language::English,
        toks.iter().any(|t| ENGLISH_MARKERS.contains(&t.as_str())),
    );
    note(
        Language::Hindi,
        toks.iter().any(|t| HINDI_MARKERS.contains(&t.as_str())),
    );
    note(
        Language::Telugu,
        toks.iter().any(|t| TELUGU_MARKERS.contains(&t.as_str())),
    );
    match found.as_slice() {
        [one] => Extraction::Matched(*one),
        [] => Extraction::NoMatch,
        _ => Extraction::Ambiguous,
    }
}

/// Affirmative/negative markers per language. English markers are kept in the
/// Hindi and Telugu lists: replies in this region are routinely code-mixed.
fn yes_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::English => &["yes", "yeah", "yep", "sure", "ok", "okay", "correct", "right"],
        Language::Hindi => &[
            "हाँ", "हां", "जी", "ठीक", "बिलकुल", "ज़रूर", "haan", "ji", "yes", "ok", "okay",
        ],
        Language::Telugu => &[
            "అవును", "సరే", "ఓకే", "తప్పకుండా", "avunu", "sare", "yes", "ok", "okay",
        ],
    }
}

fn no_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::English => &["no", "nope", "nah", "never", "don't", "dont"],
        Language::Hindi => &["नहीं", "नही", "ना", "मत", "nahi", "no"],
        Language::Telugu => &["కాదు", "వద్దు", "లేదు", "kaadu", "vaddu", "ledu", "no"],
    }
}

/// Yes/no on whole-word boundaries. A reply carrying markers for both sides,
/// or for neither, triggers a retry upstream — never a default.
pub fn extract_yes_no(utterance: &str, lang: Language) -> Extraction<bool> {
    let toks = tokens(utterance);
    let yes = toks.iter().any(|t| yes_words(lang).contains(&t.as_str()));
    let no = toks.iter().any(|t| no_words(lang).contains(&t.as_str()));
    match (yes, no) {
        (true, false) => Extraction::Matched(true),
        (false, true) => Extraction::Matched(false),
        (true, true) => Extraction::Ambiguous,
        (false, false) => Extraction::NoMatch,
    }
}

/// Politeness prefixes stripped before taking the remainder as a name. All
/// entries are ASCII or scripts whose lowercase mapping is byte-stable, so the
/// prefix length indexes the original string safely.
const NAME_PREFIXES: &[&str] = &[
    "my name is",
    "the name is",
    "i am",
    "i'm",
    "this is",
    "मेरा नाम",
    "नाम",
    "నా పేరు",
    "పేరు",
];

/// Trailing copula in Hindi name replies ("मेरा नाम X है").
const NAME_SUFFIXES: &[&str] = &["है", "hai", "andi", "అండి"];

pub fn extract_name(utterance: &str) -> Extraction<String> {
    let trimmed = utterance.trim();
    let lower = trimmed.to_lowercase();
    let mut rest = trimmed;
    for prefix in NAME_PREFIXES {
        let boundary_ok = match lower.as_bytes().get(prefix.len()) {
            Some(b) => b.is_ascii_whitespace(),
            None => true,
        };
        if lower.starts_with(prefix) && boundary_ok {
            rest = trimmed[prefix.len()..].trim_start();
            break;
        }
    }
    let mut words: Vec<&str> = rest.split_whitespace().collect();
    if let Some(last) = words.last() {
        let bare = last.trim_matches(is_edge_punct).to_lowercase();
        if NAME_SUFFIXES.contains(&bare.as_str()) {
            words.pop();
        }
    }
    let name = words.join(" ").trim_matches(is_edge_punct).trim().to_string();
    if name.is_empty() {
        Extraction::NoMatch
    } else if name.chars().count() > 60 {
        Extraction::Ambiguous
    } else {
        Extraction::Matched(name)
    }
}

/// Positive decimal for the field area, in hectares. The first
/// decimal-looking token wins; no numeric token is a failed extraction, not
/// zero. Spelled-out numbers are not parsed.
pub fn extract_area(utterance: &str) -> Extraction<f64> {
    let normalized = normalize_digits(utterance);
    let m = match NUMBER_RE.find(&normalized) {
        Some(m) => m,
        None => return Extraction::NoMatch,
    };
    let token = m.as_str().replace(',', ".");
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 && v <= 10_000.0 => Extraction::Matched(v),
        // A numeric token was present but unusable as an area (zero, absurd).
        Ok(_) => Extraction::Ambiguous,
        Err(_) => Extraction::NoMatch,
    }
}

/// Trailing place-kind words that farmers often append ("Warangal district").
const PLACE_SUFFIXES: &[&str] = &[
    "district", "mandal", "ज़िला", "जिला", "मंडल", "జిల్లా", "మండలం",
];

/// Free-text place name for district/mandal entry.
pub fn extract_place(utterance: &str) -> Extraction<String> {
    let mut words: Vec<&str> = utterance.split_whitespace().collect();
    if let Some(last) = words.last() {
        let bare = last.trim_matches(is_edge_punct).to_lowercase();
        if PLACE_SUFFIXES.contains(&bare.as_str()) {
            words.pop();
        }
    }
    let place = words.join(" ").trim_matches(is_edge_punct).trim().to_string();
    if place.is_empty() {
        Extraction::NoMatch
    } else if place.chars().count() > 80 {
        Extraction::Ambiguous
    } else {
        Extraction::Matched(place)
    }
}

/// Map Devanagari and Telugu digits to ASCII so the numeric matcher sees them.
fn normalize_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '०'..='९' => char::from(b'0' + (c as u32 - '०' as u32) as u8),
            '౦'..='౯' => char::from(b'0' + (c as u32 - '౦' as u32) as u8),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod language {
        use super::*;

        #[test]
        fn matches_plain_names() {
            assert_eq!(
                extract_language("telugu please"),
                Extraction::Matched(Language::Telugu)
            );
            assert_eq!(
                extract_language("हिंदी"),
                Extraction::Matched(Language::Hindi)
            );
            assert_eq!(
                extract_language("English."),
                Extraction::Matched(Language::English)
            );
        }

        #[test]
        fn matches_native_script_for_english() {
            assert_eq!(
                extract_language("అండి ఇంగ్లీష్"),
                Extraction::Matched(Language::English)
            );
        }

        #[test]
        fn two_languages_is_ambiguous() {
            assert_eq!(extract_language("hindi or telugu"), Extraction::Ambiguous);
        }

        #[test]
        fn unrelated_reply_is_no_match() {
            assert_eq!(extract_language("good morning"), Extraction::NoMatch);
        }
    }

    mod yes_no {
        use super::*;

        #[test]
        fn whole_word_only() {
            // "yesterday" must not read as "yes".
            assert_eq!(
                extract_yes_no("yesterday", Language::English),
                Extraction::NoMatch
            );
            assert_eq!(
                extract_yes_no("yes please", Language::English),
                Extraction::Matched(true)
            );
        }

        #[test]
        fn negative_markers() {
            assert_eq!(
                extract_yes_no("no, not now", Language::English),
                Extraction::Matched(false)
            );
            assert_eq!(
                extract_yes_no("వద్దు", Language::Telugu),
                Extraction::Matched(false)
            );
        }

        #[test]
        fn both_sides_is_ambiguous() {
            assert_eq!(
                extract_yes_no("yes no maybe", Language::English),
                Extraction::Ambiguous
            );
        }

        #[test]
        fn neither_side_is_no_match_never_a_default() {
            assert_eq!(
                extract_yes_no("the weather is fine", Language::English),
                Extraction::NoMatch
            );
        }

        #[test]
        fn code_mixed_replies() {
            assert_eq!(
                extract_yes_no("haan ji", Language::Hindi),
                Extraction::Matched(true)
            );
            assert_eq!(
                extract_yes_no("ok sare", Language::Telugu),
                Extraction::Matched(true)
            );
        }
    }

    mod name {
        use super::*;

        #[test]
        fn strips_politeness_prefix() {
            assert_eq!(
                extract_name("My name is Ravi Kumar"),
                Extraction::Matched("Ravi Kumar".to_string())
            );
            assert_eq!(
                extract_name("i am Lakshmi"),
                Extraction::Matched("Lakshmi".to_string())
            );
        }

        #[test]
        fn strips_hindi_copula() {
            assert_eq!(
                extract_name("मेरा नाम रवि है"),
                Extraction::Matched("रवि".to_string())
            );
        }

        #[test]
        fn bare_name_passes_through() {
            assert_eq!(extract_name("Anjali"), Extraction::Matched("Anjali".to_string()));
        }

        #[test]
        fn empty_reply_is_no_match() {
            assert_eq!(extract_name("   "), Extraction::NoMatch);
            assert_eq!(extract_name("my name is"), Extraction::NoMatch);
        }

        #[test]
        fn overlong_reply_is_ambiguous() {
            let long = "a ".repeat(50);
            assert_eq!(extract_name(&long), Extraction::Ambiguous);
        }
    }

    mod area {
        use super::*;

        #[test]
        fn first_decimal_token_wins() {
            assert_eq!(extract_area("about 2.5 hectares"), Extraction::Matched(2.5));
            assert_eq!(
                extract_area("3 acres or maybe 4"),
                Extraction::Matched(3.0)
            );
        }

        #[test]
        fn comma_decimal_separator() {
            assert_eq!(extract_area("1,5"), Extraction::Matched(1.5));
        }

        #[test]
        fn devanagari_digits() {
            assert_eq!(extract_area("२.५ हेक्टेयर"), Extraction::Matched(2.5));
        }

        #[test]
        fn spelled_out_number_is_no_match_not_zero() {
            // "two point five" carries no decimal-looking token.
            assert_eq!(extract_area("two point five"), Extraction::NoMatch);
        }

        #[test]
        fn zero_is_not_a_valid_area() {
            assert_eq!(extract_area("0 hectares"), Extraction::Ambiguous);
        }

        #[test]
        fn absurd_area_is_ambiguous() {
            assert_eq!(extract_area("50000"), Extraction::Ambiguous);
        }
    }

    mod place {
        use super::*;

        #[test]
        fn plain_place_name() {
            assert_eq!(
                extract_place("Warangal"),
                Extraction::Matched("Warangal".to_string())
            );
        }

        #[test]
        fn strips_place_kind_suffix() {
            assert_eq!(
                extract_place("Warangal district"),
                Extraction::Matched("Warangal".to_string())
            );
            assert_eq!(
                extract_place("Hanamkonda mandal"),
                Extraction::Matched("Hanamkonda".to_string())
            );
        }

        #[test]
        fn multiword_place_survives() {
            assert_eq!(
                extract_place("Warangal Rural district"),
                Extraction::Matched("Warangal Rural".to_string())
            );
        }

        #[test]
        fn empty_is_no_match() {
            assert_eq!(extract_place(""), Extraction::NoMatch);
        }
    }
}
