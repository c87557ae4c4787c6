use super::defaults;
use super::models::{AppConfig, HostRule, LogLevel, SiteRule};
use crate::speech::Voice;
use serde::Deserialize;

/// On-disk layout of `conf/config.toml`.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    speech: SpeechConfig,
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    preferences: PreferencesConfig,
    #[serde(default)]
    overlay: OverlayConfig,
    #[serde(default = "defaults::default_site_rules")]
    site_rules: Vec<SiteRule>,
    #[serde(default)]
    keys: KeysConfig,
}

impl Default for ConfigTables {
    fn default() -> Self {
        ConfigTables::from(&AppConfig::default())
    }
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            speech_endpoint: tables.speech.endpoint,
            speech_model: tables.speech.model,
            response_format: tables.speech.response_format,
            request_timeout_secs: tables.speech.request_timeout_secs,
            chunk_target_chars: tables.reading.chunk_target_chars,
            storage_path: tables.reading.storage_path,
            default_voice: tables.preferences.default_voice,
            default_speed: tables.preferences.default_speed,
            always_show_overlay: tables.overlay.always_visible,
            supported_sites: tables.overlay.supported_sites,
            site_rules: tables.site_rules,
            key_toggle_play_pause: tables.keys.toggle_play_pause,
            key_next_chunk: tables.keys.next_chunk,
            key_prev_chunk: tables.keys.prev_chunk,
            key_stop: tables.keys.stop,
            key_safe_quit: tables.keys.safe_quit,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            speech: SpeechConfig {
                endpoint: config.speech_endpoint.clone(),
                model: config.speech_model.clone(),
                response_format: config.response_format.clone(),
                request_timeout_secs: config.request_timeout_secs,
            },
            reading: ReadingConfig {
                chunk_target_chars: config.chunk_target_chars,
                storage_path: config.storage_path.clone(),
            },
            preferences: PreferencesConfig {
                default_voice: config.default_voice,
                default_speed: config.default_speed,
            },
            overlay: OverlayConfig {
                always_visible: config.always_show_overlay,
                supported_sites: config.supported_sites.clone(),
            },
            site_rules: config.site_rules.clone(),
            keys: KeysConfig {
                toggle_play_pause: config.key_toggle_play_pause.clone(),
                next_chunk: config.key_next_chunk.clone(),
                prev_chunk: config.key_prev_chunk.clone(),
                stop: config.key_stop.clone(),
                safe_quit: config.key_safe_quit.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct SpeechConfig {
    #[serde(default = "defaults::default_speech_endpoint")]
    endpoint: String,
    #[serde(default = "defaults::default_speech_model")]
    model: String,
    #[serde(default = "defaults::default_response_format")]
    response_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            endpoint: defaults::default_speech_endpoint(),
            model: defaults::default_speech_model(),
            response_format: defaults::default_response_format(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_chunk_target_chars")]
    chunk_target_chars: usize,
    #[serde(default = "defaults::default_storage_path")]
    storage_path: String,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            chunk_target_chars: defaults::default_chunk_target_chars(),
            storage_path: defaults::default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PreferencesConfig {
    #[serde(default = "defaults::default_voice")]
    default_voice: Voice,
    #[serde(default = "defaults::default_speed")]
    default_speed: f32,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        PreferencesConfig {
            default_voice: defaults::default_voice(),
            default_speed: defaults::default_speed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct OverlayConfig {
    #[serde(default)]
    always_visible: bool,
    #[serde(default = "defaults::default_supported_sites")]
    supported_sites: Vec<HostRule>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            always_visible: false,
            supported_sites: defaults::default_supported_sites(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct KeysConfig {
    #[serde(default = "defaults::default_key_toggle_play_pause")]
    toggle_play_pause: String,
    #[serde(default = "defaults::default_key_next_chunk")]
    next_chunk: String,
    #[serde(default = "defaults::default_key_prev_chunk")]
    prev_chunk: String,
    #[serde(default = "defaults::default_key_stop")]
    stop: String,
    #[serde(default = "defaults::default_key_safe_quit")]
    safe_quit: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        KeysConfig {
            toggle_play_pause: defaults::default_key_toggle_play_pause(),
            next_chunk: defaults::default_key_next_chunk(),
            prev_chunk: defaults::default_key_prev_chunk(),
            stop: defaults::default_key_stop(),
            safe_quit: defaults::default_key_safe_quit(),
        }
    }
}
