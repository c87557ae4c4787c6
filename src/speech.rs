//! Client for the remote speech-synthesis endpoint.
//!
//! One blocking HTTP request per chunk: the text is truncated to the service
//! ceiling, sent with model/voice/speed/format, and the raw audio bytes come
//! back. Non-success responses are turned into a readable message taken from
//! the JSON error body. There is no retry here.

use crate::config::AppConfig;
use crate::preferences::Preferences;
use crate::text_utils::{char_len, truncate_chars};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;

/// Longest input the synthesis service accepts, in characters.
pub const MAX_INPUT_CHARS: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Voice {
    #[default]
    Alloy,
    Ash,
    Coral,
    Echo,
    Fable,
    Onyx,
    Nova,
    Sage,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 9] = [
        Voice::Alloy,
        Voice::Ash,
        Voice::Coral,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Sage,
        Voice::Shimmer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Ash => "ash",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Sage => "sage",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str() == wanted)
            .ok_or_else(|| format!("unknown voice '{value}'"))
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("OpenAI API key not set. Add one in the settings to start reading.")]
    MissingCredential,
    #[error("{message}")]
    Service { status: u16, message: String },
    #[error("Speech generation failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Endpoint parameters that stay fixed for the life of the client.
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub endpoint: String,
    pub model: String,
    pub response_format: String,
    pub timeout: Option<Duration>,
}

impl SpeechSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        SpeechSettings {
            endpoint: config.speech_endpoint.clone(),
            model: config.speech_model.clone(),
            response_format: config.response_format.clone(),
            timeout: config.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: Voice,
    speed: f32,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

pub struct SpeechClient {
    http: reqwest::blocking::Client,
    settings: SpeechSettings,
}

impl SpeechClient {
    pub fn new(settings: SpeechSettings) -> Result<Self, SpeechError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    /// Synthesize `text` and return the encoded audio bytes.
    pub fn synthesize(
        &self,
        api_key: &str,
        text: &str,
        voice: Voice,
        speed: f32,
    ) -> Result<Vec<u8>, SpeechError> {
        if api_key.trim().is_empty() {
            return Err(SpeechError::MissingCredential);
        }
        let input = truncate_chars(text, MAX_INPUT_CHARS);
        if input.len() < text.len() {
            debug!(
                original_chars = char_len(text),
                max = MAX_INPUT_CHARS,
                "Truncated speech input"
            );
        }
        let body = SpeechRequest {
            model: &self.settings.model,
            input,
            voice,
            speed,
            response_format: &self.settings.response_format,
        };
        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = service_error_message(status, &body);
            warn!(status = status.as_u16(), %message, "Speech request rejected");
            return Err(SpeechError::Service {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = response.bytes()?;
        debug!(bytes = bytes.len(), %voice, speed, "Received synthesized audio");
        Ok(bytes.to_vec())
    }
}

/// Readable message for a non-success response.
///
/// Prefers `error.message` from a JSON body. A body that is not JSON yields
/// the status phrase; JSON without a message yields a generic text with the
/// status code.
pub fn service_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .and_then(|detail| detail.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("Speech request failed ({})", status.as_u16())),
        Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Speech request failed ({})", status.as_u16())),
    }
}

/// Audio bytes plus the speed they were synthesized at.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub speed: f32,
}

/// Synthesis backed by stored preferences: credential, voice and speed are
/// read at request time, so a voice change only affects later requests.
pub struct SpeechService {
    client: SpeechClient,
    prefs: Preferences,
}

impl SpeechService {
    pub fn new(client: SpeechClient, prefs: Preferences) -> Self {
        Self { client, prefs }
    }

    pub fn response_format(&self) -> &str {
        &self.client.settings.response_format
    }

    pub fn speak(&self, text: &str) -> Result<AudioClip, SpeechError> {
        let api_key = self.prefs.api_key();
        if api_key.trim().is_empty() {
            return Err(SpeechError::MissingCredential);
        }
        let voice = self.prefs.voice();
        let speed = self.prefs.speed();
        info!(%voice, speed, chars = char_len(text), "Requesting speech");
        let bytes = self.client.synthesize(&api_key, text, voice, speed)?;
        Ok(AudioClip { bytes, speed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use reqwest::StatusCode;

    fn client_for(endpoint: String) -> SpeechClient {
        SpeechClient::new(SpeechSettings {
            endpoint,
            model: "tts-1".to_string(),
            response_format: "mp3".to_string(),
            timeout: Some(Duration::from_secs(10)),
        })
        .expect("client")
    }

    #[test]
    fn error_message_prefers_json_message() {
        let message = service_error_message(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"invalid key"}}"#,
        );
        assert_eq!(message, "invalid key");
    }

    #[test]
    fn error_message_falls_back_to_status_phrase() {
        assert_eq!(
            service_error_message(StatusCode::TOO_MANY_REQUESTS, "<html>busy</html>"),
            "Too Many Requests"
        );
        assert_eq!(
            service_error_message(StatusCode::BAD_REQUEST, r#"{"error":{}}"#),
            "Speech request failed (400)"
        );
    }

    #[test]
    fn voices_parse_case_insensitively() {
        assert_eq!("Nova".parse::<Voice>(), Ok(Voice::Nova));
        assert!("robot".parse::<Voice>().is_err());
        assert_eq!(Voice::Shimmer.to_string(), "shimmer");
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let client = client_for("http://127.0.0.1:9/unused".to_string());
        let err = client
            .synthesize("  ", "hello", Voice::Alloy, 1.0)
            .expect_err("missing key");
        assert!(matches!(err, SpeechError::MissingCredential));
    }

    #[test]
    fn rejected_request_surfaces_service_message() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/audio/speech")
                .header("Authorization", "Bearer sk-test")
                .json_body_partial(
                    r#"{"model":"tts-1","voice":"echo","response_format":"mp3","input":"Hello there."}"#,
                );
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"{"error":{"message":"invalid key"}}"#);
        });

        let client = client_for(server.url("/v1/audio/speech"));
        let err = client
            .synthesize("sk-test", "Hello there.", Voice::Echo, 1.25)
            .expect_err("401");
        match &err {
            SpeechError::Service { status, message } => {
                assert_eq!(*status, 401);
                assert_eq!(message, "invalid key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "invalid key");
        mock.assert();
    }

    #[test]
    fn long_input_is_truncated_not_rejected() {
        let server = MockServer::start();
        let expected_input = "z".repeat(MAX_INPUT_CHARS);
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/audio/speech")
                .json_body_partial(format!(r#"{{"input":"{expected_input}"}}"#));
            then.status(200).body("ID3-audio");
        });

        let client = client_for(server.url("/v1/audio/speech"));
        let text = "z".repeat(MAX_INPUT_CHARS + 500);
        let bytes = client
            .synthesize("sk-test", &text, Voice::Alloy, 1.0)
            .expect("audio");
        assert_eq!(bytes, b"ID3-audio");
        mock.assert();
    }
}
