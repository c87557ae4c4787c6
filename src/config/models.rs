use crate::speech::Voice;
use serde::Deserialize;

/// Flattened runtime configuration; the on-disk layout lives in `tables`.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_speech_endpoint")]
    pub speech_endpoint: String,
    #[serde(default = "crate::config::defaults::default_speech_model")]
    pub speech_model: String,
    #[serde(default = "crate::config::defaults::default_response_format")]
    pub response_format: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "crate::config::defaults::default_chunk_target_chars")]
    pub chunk_target_chars: usize,
    #[serde(default = "crate::config::defaults::default_storage_path")]
    pub storage_path: String,
    #[serde(default = "crate::config::defaults::default_voice")]
    pub default_voice: Voice,
    #[serde(default = "crate::config::defaults::default_speed")]
    pub default_speed: f32,
    #[serde(default)]
    pub always_show_overlay: bool,
    #[serde(default = "crate::config::defaults::default_supported_sites")]
    pub supported_sites: Vec<HostRule>,
    #[serde(default = "crate::config::defaults::default_site_rules")]
    pub site_rules: Vec<SiteRule>,
    #[serde(default = "crate::config::defaults::default_key_toggle_play_pause")]
    pub key_toggle_play_pause: String,
    #[serde(default = "crate::config::defaults::default_key_next_chunk")]
    pub key_next_chunk: String,
    #[serde(default = "crate::config::defaults::default_key_prev_chunk")]
    pub key_prev_chunk: String,
    #[serde(default = "crate::config::defaults::default_key_stop")]
    pub key_stop: String,
    #[serde(default = "crate::config::defaults::default_key_safe_quit")]
    pub key_safe_quit: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            speech_endpoint: crate::config::defaults::default_speech_endpoint(),
            speech_model: crate::config::defaults::default_speech_model(),
            response_format: crate::config::defaults::default_response_format(),
            request_timeout_secs: None,
            chunk_target_chars: crate::config::defaults::default_chunk_target_chars(),
            storage_path: crate::config::defaults::default_storage_path(),
            default_voice: crate::config::defaults::default_voice(),
            default_speed: crate::config::defaults::default_speed(),
            always_show_overlay: false,
            supported_sites: crate::config::defaults::default_supported_sites(),
            site_rules: crate::config::defaults::default_site_rules(),
            key_toggle_play_pause: crate::config::defaults::default_key_toggle_play_pause(),
            key_next_chunk: crate::config::defaults::default_key_next_chunk(),
            key_prev_chunk: crate::config::defaults::default_key_prev_chunk(),
            key_stop: crate::config::defaults::default_key_stop(),
            key_safe_quit: crate::config::defaults::default_key_safe_quit(),
        }
    }
}

impl AppConfig {
    /// Clamp values that would otherwise break chunking or playback.
    pub fn sanitized(mut self) -> Self {
        self.chunk_target_chars = self.chunk_target_chars.max(1);
        self.default_speed = crate::preferences::clamp_speed(self.default_speed);
        self
    }
}

/// Host matcher used for overlay visibility and per-site cleanup.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq, Eq)]
pub struct HostRule {
    pub host: String,
    #[serde(default)]
    pub subdomains: bool,
}

impl HostRule {
    pub fn exact(host: &str) -> Self {
        HostRule {
            host: host.to_string(),
            subdomains: false,
        }
    }

    pub fn with_subdomains(host: &str) -> Self {
        HostRule {
            host: host.to_string(),
            subdomains: true,
        }
    }

    pub fn matches(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        let rule = self.host.to_ascii_lowercase();
        if hostname == rule {
            return true;
        }
        self.subdomains
            && hostname
                .strip_suffix(rule.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// Selectors removed from block text before it is read on a matching host.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq, Eq)]
pub struct SiteRule {
    pub host: String,
    #[serde(default = "crate::config::defaults::default_subdomains")]
    pub subdomains: bool,
    #[serde(default)]
    pub strip_selectors: Vec<String>,
}

impl SiteRule {
    pub fn matches(&self, hostname: &str) -> bool {
        HostRule {
            host: self.host.clone(),
            subdomains: self.subdomains,
        }
        .matches(hostname)
    }
}

/// Logging verbosity.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
