use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the config file, falling back to defaults when it is missing or invalid.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    let tables: ConfigTables = toml::from_str(contents)?;
    Ok(AppConfig::from(tables).sanitized())
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostRule;
    use crate::speech::Voice;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").expect("parse");
        assert_eq!(config.chunk_target_chars, 800);
        assert_eq!(config.speech_model, "tts-1");
        assert_eq!(config.default_voice, Voice::Alloy);
        assert!(config.request_timeout_secs.is_none());
        assert_eq!(config.site_rules.len(), 1);
        assert!(config.supported_sites.contains(&HostRule::exact("x.com")));
    }

    #[test]
    fn grouped_tables_override_defaults() {
        let config = parse_config(
            r#"
[logging]
log_level = "warn"

[speech]
model = "tts-1-hd"
request_timeout_secs = 45

[reading]
chunk_target_chars = 0

[preferences]
default_voice = "nova"
default_speed = 9.0

[[site_rules]]
host = "example.org"
strip_selectors = [".ad"]
"#,
        )
        .expect("parse");
        assert_eq!(config.log_level.as_filter_str(), "warn");
        assert_eq!(config.speech_model, "tts-1-hd");
        assert_eq!(config.request_timeout_secs, Some(45));
        assert_eq!(config.chunk_target_chars, 1);
        assert_eq!(config.default_voice, Voice::Nova);
        assert_eq!(config.default_speed, 4.0);
        assert_eq!(config.site_rules.len(), 1);
        assert!(config.site_rules[0].subdomains);
        assert!(config.site_rules[0].matches("blog.example.org"));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("announce-config-{nonce}.toml"));
        fs::write(&path, "[reading\nchunk_target_chars = ").expect("write config");
        let config = load_config(&path);
        assert_eq!(config.chunk_target_chars, 800);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = AppConfig::default();
        config.always_show_overlay = true;
        config.key_safe_quit = "x".to_string();
        let text = serialize_config(&config).expect("serialize");
        let parsed = parse_config(&text).expect("parse");
        assert!(parsed.always_show_overlay);
        assert_eq!(parsed.key_safe_quit, "x");
        assert_eq!(parsed.supported_sites, config.supported_sites);
    }

    #[test]
    fn host_rules_match_subdomains_only_when_enabled() {
        let medium = HostRule::with_subdomains("medium.com");
        assert!(medium.matches("medium.com"));
        assert!(medium.matches("blog.medium.com"));
        assert!(!medium.matches("notmedium.com"));
        let x = HostRule::exact("x.com");
        assert!(x.matches("X.com"));
        assert!(!x.matches("api.x.com"));
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let shipped = parse_config(include_str!("../../conf/config.toml")).expect("parse");
        let defaults = AppConfig::default();
        assert_eq!(shipped.log_level, crate::config::LogLevel::Info);
        assert_eq!(shipped.supported_sites, defaults.supported_sites);
        assert_eq!(shipped.site_rules, defaults.site_rules);
        assert_eq!(shipped.key_stop, defaults.key_stop);
        assert_eq!(shipped.chunk_target_chars, defaults.chunk_target_chars);
    }
}
