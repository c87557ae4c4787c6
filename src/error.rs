use crate::speech::SpeechError;
use thiserror::Error;

/// Everything that can interrupt reading. `Display` is the status text shown
/// to the listener.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("OpenAI API key not set. Add one in the settings to start reading.")]
    Configuration,
    #[error("No text found on page")]
    Extraction,
    #[error(transparent)]
    SpeechService(#[from] SpeechError),
    #[error("Audio playback failed")]
    PlaybackEngine { detail: String },
}

impl PlaybackError {
    pub fn engine(detail: impl std::fmt::Display) -> Self {
        PlaybackError::PlaybackEngine {
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_hides_engine_details() {
        let err = PlaybackError::engine("device busy");
        assert_eq!(err.to_string(), "Audio playback failed");
        assert!(matches!(
            err,
            PlaybackError::PlaybackEngine { ref detail } if detail == "device busy"
        ));
    }

    #[test]
    fn service_errors_show_their_message() {
        let err = PlaybackError::from(SpeechError::Service {
            status: 401,
            message: "invalid key".to_string(),
        });
        assert_eq!(err.to_string(), "invalid key");
        assert_eq!(PlaybackError::Extraction.to_string(), "No text found on page");
    }
}
