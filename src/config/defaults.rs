use super::models::{HostRule, LogLevel, SiteRule};
use crate::speech::Voice;

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Debug
}

pub(crate) fn default_speech_endpoint() -> String {
    "https://api.openai.com/v1/audio/speech".to_string()
}

pub(crate) fn default_speech_model() -> String {
    "tts-1".to_string()
}

pub(crate) fn default_response_format() -> String {
    "mp3".to_string()
}

pub(crate) fn default_chunk_target_chars() -> usize {
    800
}

pub(crate) fn default_storage_path() -> String {
    ".cache/storage.json".to_string()
}

pub(crate) fn default_voice() -> Voice {
    Voice::Alloy
}

pub(crate) fn default_speed() -> f32 {
    1.0
}

pub(crate) fn default_subdomains() -> bool {
    true
}

pub(crate) fn default_supported_sites() -> Vec<HostRule> {
    vec![
        HostRule::with_subdomains("medium.com"),
        HostRule::with_subdomains("substack.com"),
        HostRule::exact("x.com"),
        HostRule::exact("twitter.com"),
    ]
}

pub(crate) fn default_site_rules() -> Vec<SiteRule> {
    vec![SiteRule {
        host: "substack.com".to_string(),
        subdomains: true,
        strip_selectors: vec![
            ".footnote-anchor".to_string(),
            "[data-component-name=\"FootnoteAnchorToDOM\"]".to_string(),
        ],
    }]
}

pub(crate) fn default_key_toggle_play_pause() -> String {
    "p".to_string()
}

pub(crate) fn default_key_next_chunk() -> String {
    "n".to_string()
}

pub(crate) fn default_key_prev_chunk() -> String {
    "b".to_string()
}

pub(crate) fn default_key_stop() -> String {
    "s".to_string()
}

pub(crate) fn default_key_safe_quit() -> String {
    "q".to_string()
}
