//! Dialogue configuration loaded from `.env`.
//!
//! Retry caps, backoff, and channel timeouts for the setup dialogue. The
//! shape of the retry/backoff policy is fixed in code; the numbers are
//! deployment choices. Change behavior without code edits.

use serde::{Deserialize, Serialize};

fn default_extraction_retries() -> u32 {
    3
}

fn default_channel_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    400
}

fn default_recognition_window_secs() -> u64 {
    8
}

fn default_synthesis_watchdog_secs() -> u64 {
    15
}

fn default_stop_ack_timeout_ms() -> u64 {
    500
}

fn default_language_code() -> String {
    "en".to_string()
}

/// Dialogue configuration loaded from environment.
///
/// | Env | Default | Description |
/// |-----|---------|--------------|
/// | FASAL_EXTRACTION_RETRIES | 3 | Failed/ambiguous replies allowed per step before abort. |
/// | FASAL_CHANNEL_RETRIES | 2 | Transient recognizer errors (no-speech, network) retried inside one listen. |
/// | FASAL_BACKOFF_MS | 400 | Base backoff between channel retries. |
/// | FASAL_RECOGNITION_WINDOW_SECS | 8 | No final result within this window counts as no-speech. |
/// | FASAL_SYNTHESIS_WATCHDOG_SECS | 15 | A synthesis call that never completes is forced idle after this. |
/// | FASAL_STOP_ACK_TIMEOUT_MS | 500 | Wait for recognizer stop-ack before synthesis starts. |
/// | FASAL_DEFAULT_LANGUAGE | en | Language of the opening prompt (en \| hi \| te). |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    /// FASAL_EXTRACTION_RETRIES: abort fires on the Nth consecutive failed extraction at a step.
    #[serde(default = "default_extraction_retries")]
    pub extraction_retries: u32,
    /// FASAL_CHANNEL_RETRIES: bounded retries for transient recognizer errors within one listen.
    #[serde(default = "default_channel_retries")]
    pub channel_retries: u32,
    /// FASAL_BACKOFF_MS: base delay between channel retries; grows linearly per attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// FASAL_RECOGNITION_WINDOW_SECS: window for a final recognition result.
    #[serde(default = "default_recognition_window_secs")]
    pub recognition_window_secs: u64,
    /// FASAL_SYNTHESIS_WATCHDOG_SECS: upper bound on one synthesis call (engine hang guard).
    #[serde(default = "default_synthesis_watchdog_secs")]
    pub synthesis_watchdog_secs: u64,
    /// FASAL_STOP_ACK_TIMEOUT_MS: bound on the recognizer stop-ack during pre-emption.
    #[serde(default = "default_stop_ack_timeout_ms")]
    pub stop_ack_timeout_ms: u64,
    /// FASAL_DEFAULT_LANGUAGE: code of the language the dialogue opens in.
    #[serde(default = "default_language_code")]
    pub default_language: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            extraction_retries: default_extraction_retries(),
            channel_retries: default_channel_retries(),
            backoff_ms: default_backoff_ms(),
            recognition_window_secs: default_recognition_window_secs(),
            synthesis_watchdog_secs: default_synthesis_watchdog_secs(),
            stop_ack_timeout_ms: default_stop_ack_timeout_ms(),
            default_language: default_language_code(),
        }
    }
}

impl DialogConfig {
    /// Load from environment. Unset or invalid => defaults (see struct field docs).
    pub fn from_env() -> Self {
        Self {
            extraction_retries: env_u32("FASAL_EXTRACTION_RETRIES", default_extraction_retries()),
            channel_retries: env_u32("FASAL_CHANNEL_RETRIES", default_channel_retries()),
            backoff_ms: env_u64("FASAL_BACKOFF_MS", default_backoff_ms()),
            recognition_window_secs: env_u64(
                "FASAL_RECOGNITION_WINDOW_SECS",
                default_recognition_window_secs(),
            ),
            synthesis_watchdog_secs: env_u64(
                "FASAL_SYNTHESIS_WATCHDOG_SECS",
                default_synthesis_watchdog_secs(),
            ),
            stop_ack_timeout_ms: env_u64("FASAL_STOP_ACK_TIMEOUT_MS", default_stop_ack_timeout_ms()),
            default_language: std::env::var("FASAL_DEFAULT_LANGUAGE")
                .ok()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_language_code),
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = DialogConfig::default();
        assert_eq!(c.extraction_retries, 3);
        assert_eq!(c.channel_retries, 2);
        assert_eq!(c.backoff_ms, 400);
        assert_eq!(c.default_language, "en");
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let c: DialogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c.recognition_window_secs, 8);
        assert_eq!(c.synthesis_watchdog_secs, 15);
    }
}
