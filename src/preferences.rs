//! Typed access to the process-wide preferences kept in the key-value store.

use crate::speech::Voice;
use crate::storage::{KeyValueStore, StorageError};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub const API_KEY_KEY: &str = "openai-api-key";
pub const VOICE_KEY: &str = "tts-voice";
pub const SPEED_KEY: &str = "tts-speed";

pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;

pub fn clamp_speed(speed: f32) -> f32 {
    if speed.is_finite() {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        1.0
    }
}

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    default_voice: Voice,
    default_speed: f32,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>, default_voice: Voice, default_speed: f32) -> Self {
        Self {
            store,
            default_voice,
            default_speed: clamp_speed(default_speed),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn api_key(&self) -> String {
        self.store
            .get(API_KEY_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key().trim().is_empty()
    }

    pub fn set_api_key(&self, key: &str) -> Result<(), StorageError> {
        self.store.set(API_KEY_KEY, Value::from(key.trim()))
    }

    pub fn voice(&self) -> Voice {
        match self.store.get(VOICE_KEY) {
            Some(Value::String(raw)) => raw.parse().unwrap_or_else(|err| {
                warn!("Stored voice is invalid, using default: {err}");
                self.default_voice
            }),
            _ => self.default_voice,
        }
    }

    pub fn set_voice(&self, voice: Voice) -> Result<(), StorageError> {
        self.store.set(VOICE_KEY, Value::from(voice.as_str()))
    }

    pub fn speed(&self) -> f32 {
        self.store
            .get(SPEED_KEY)
            .and_then(|value| value.as_f64())
            .map(|speed| clamp_speed(speed as f32))
            .unwrap_or(self.default_speed)
    }

    /// Store the clamped speed and return what was stored.
    pub fn set_speed(&self, speed: f32) -> Result<f32, StorageError> {
        let speed = clamp_speed(speed);
        self.store.set(SPEED_KEY, Value::from(f64::from(speed)))?;
        Ok(speed)
    }

    /// Call `on_change(present)` whenever the credential is rewritten.
    pub fn watch_api_key(&self, on_change: impl Fn(bool) + Send + Sync + 'static) {
        self.store.watch(
            API_KEY_KEY,
            Arc::new(move |value| {
                let present = value.as_str().is_some_and(|key| !key.trim().is_empty());
                on_change(present);
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Mutex;

    fn prefs() -> Preferences {
        Preferences::new(Arc::new(MemoryStore::new()), Voice::Alloy, 1.0)
    }

    #[test]
    fn defaults_apply_when_nothing_is_stored() {
        let prefs = prefs();
        assert_eq!(prefs.api_key(), "");
        assert!(!prefs.has_api_key());
        assert_eq!(prefs.voice(), Voice::Alloy);
        assert_eq!(prefs.speed(), 1.0);
    }

    #[test]
    fn speed_is_clamped_to_supported_range() {
        let prefs = prefs();
        assert_eq!(prefs.set_speed(7.5).expect("set"), MAX_SPEED);
        assert_eq!(prefs.speed(), MAX_SPEED);
        assert_eq!(prefs.set_speed(0.1).expect("set"), MIN_SPEED);
        assert_eq!(clamp_speed(f32::NAN), 1.0);
    }

    #[test]
    fn invalid_stored_voice_falls_back() {
        let prefs = prefs();
        prefs
            .store()
            .set(VOICE_KEY, Value::from("robot"))
            .expect("set");
        assert_eq!(prefs.voice(), Voice::Alloy);
        prefs.set_voice(Voice::Sage).expect("set");
        assert_eq!(prefs.voice(), Voice::Sage);
    }

    #[test]
    fn credential_watch_reports_presence() {
        let prefs = prefs();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        prefs.watch_api_key(move |present| sink.lock().expect("lock").push(present));
        prefs.set_api_key("sk-123").expect("set");
        prefs.set_api_key("   ").expect("set");
        assert_eq!(*seen.lock().expect("lock"), vec![true, false]);
        assert!(!prefs.has_api_key());
    }
}
