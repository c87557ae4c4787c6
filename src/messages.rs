//! Messages exchanged with the host that embeds the reader.
//!
//! Requests are a closed set tagged by `type`; replies are plain JSON
//! objects whose shape depends on the request.

use crate::controller::PlaybackStatus;
use crate::speech::AudioClip;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum HostMessage {
    /// Synthesize `text` and answer with the audio or an error string.
    TtsSpeak { text: String },
    GetStatus,
    StartReading,
    StopReading,
    ShowOverlay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusReply {
    pub playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub current_chunk: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub total_chunks: Option<usize>,
}

impl From<PlaybackStatus> for StatusReply {
    fn from(status: PlaybackStatus) -> Self {
        Self {
            playing: status.playing,
            current_chunk: status.current_chunk,
            total_chunks: status.total_chunks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum HostResponse {
    Audio {
        #[serde(rename = "audioDataUri")]
        audio_data_uri: String,
    },
    Error {
        error: String,
    },
    Status(StatusReply),
    Ack {
        ok: bool,
    },
}

impl HostResponse {
    pub fn audio(clip: &AudioClip, response_format: &str) -> Self {
        let encoded = general_purpose::STANDARD.encode(&clip.bytes);
        HostResponse::Audio {
            audio_data_uri: format!("data:{};base64,{encoded}", audio_mime(response_format)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HostResponse::Error {
            error: message.into(),
        }
    }

    pub fn ack() -> Self {
        HostResponse::Ack { ok: true }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"error":"failed to encode reply: {err}"}}"#)
        })
    }
}

fn audio_mime(response_format: &str) -> &'static str {
    match response_format.to_ascii_lowercase().as_str() {
        "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "pcm" => "audio/pcm",
        _ => "audio/mpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_by_type() {
        assert_eq!(
            serde_json::from_str::<HostMessage>(r#"{"type":"GET_STATUS"}"#).expect("parse"),
            HostMessage::GetStatus
        );
        assert_eq!(
            serde_json::from_str::<HostMessage>(r#"{"type":"TTS_SPEAK","text":"Hello there."}"#)
                .expect("parse"),
            HostMessage::TtsSpeak {
                text: "Hello there.".to_string()
            }
        );
        assert_eq!(
            serde_json::to_string(&HostMessage::ShowOverlay).expect("encode"),
            r#"{"type":"SHOW_OVERLAY"}"#
        );
        assert!(serde_json::from_str::<HostMessage>(r#"{"type":"PAUSE"}"#).is_err());
        assert!(serde_json::from_str::<HostMessage>(r#"{"type":"TTS_SPEAK"}"#).is_err());
    }

    #[test]
    fn status_reply_omits_chunks_when_idle() {
        let idle = HostResponse::Status(PlaybackStatus::idle().into());
        assert_eq!(idle.to_json(), r#"{"playing":false}"#);

        let active = HostResponse::Status(StatusReply {
            playing: true,
            current_chunk: Some(3),
            total_chunks: Some(5),
        });
        assert_eq!(
            active.to_json(),
            r#"{"playing":true,"currentChunk":3,"totalChunks":5}"#
        );
    }

    #[test]
    fn audio_reply_is_a_data_uri() {
        let clip = AudioClip {
            bytes: vec![1, 2, 3],
            speed: 1.0,
        };
        assert_eq!(
            HostResponse::audio(&clip, "mp3").to_json(),
            r#"{"audioDataUri":"data:audio/mpeg;base64,AQID"}"#
        );
        assert_eq!(
            HostResponse::error("invalid key").to_json(),
            r#"{"error":"invalid key"}"#
        );
        assert_eq!(HostResponse::ack().to_json(), r#"{"ok":true}"#);
    }
}
