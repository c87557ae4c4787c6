//! Chunked playback controller.
//!
//! Owns the live session (chunk queue, position, look-ahead audio cache and
//! the single active audio handle) and drives fetch-then-play transitions.
//! Everything runs on one thread: fetch results and audio-end notifications
//! arrive as `ControllerEvent`s carrying the `SessionToken` they were issued
//! under, and are dropped unless that token still names the live session.

mod state;
mod transitions;

use crate::audio::AudioEngine;
use crate::cancellation::SessionToken;
use crate::chunker::{Chunk, ElementId};
use crate::positions::ReadingPositions;
use crate::preferences::Preferences;
use crate::speech::{AudioClip, SpeechError, Voice};
use crate::surface::{Highlighter, PresentationSurface};
use state::PlaybackSession;

pub use state::{Phase, PlaybackStatus};

/// Produces the chunk list for the page as it currently is.
pub trait ChunkSource {
    fn build_chunks(&self) -> Vec<Chunk>;
}

/// Starts synthesis for one chunk. The outcome must come back as
/// `ControllerEvent::AudioFetched` with the same token and index.
pub trait SpeechFetcher {
    fn fetch(&mut self, token: SessionToken, index: usize, text: String);
}

/// The signals a presentation surface sends back.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    TogglePlay,
    Prev,
    Next,
    VoiceChanged(Voice),
    SpeedChanged(f32),
}

#[derive(Debug)]
pub enum ControllerEvent {
    Intent(UserIntent),
    /// Start (or restart) reading, resuming where the page was left.
    StartReading,
    StopReading,
    ShowOverlay,
    AudioFetched {
        token: SessionToken,
        index: usize,
        result: Result<AudioClip, SpeechError>,
    },
    AudioEnded {
        token: SessionToken,
        index: usize,
    },
    CredentialChanged {
        present: bool,
    },
}

/// Everything the controller talks to.
pub struct Collaborators {
    pub page_url: String,
    pub prefs: Preferences,
    pub positions: ReadingPositions,
    pub source: Box<dyn ChunkSource>,
    pub fetcher: Box<dyn SpeechFetcher>,
    pub audio: Box<dyn AudioEngine>,
    pub surface: Box<dyn PresentationSurface>,
    pub highlighter: Box<dyn Highlighter>,
}

pub struct PlaybackController {
    page_url: String,
    prefs: Preferences,
    positions: ReadingPositions,
    source: Box<dyn ChunkSource>,
    fetcher: Box<dyn SpeechFetcher>,
    audio: Box<dyn AudioEngine>,
    surface: Box<dyn PresentationSurface>,
    highlighter: Box<dyn Highlighter>,
    session: Option<PlaybackSession>,
    next_session_id: u64,
    highlighted: Vec<ElementId>,
    surface_playing: bool,
}

impl PlaybackController {
    pub fn new(parts: Collaborators) -> Self {
        Self {
            page_url: parts.page_url,
            prefs: parts.prefs,
            positions: parts.positions,
            source: parts.source,
            fetcher: parts.fetcher,
            audio: parts.audio,
            surface: parts.surface,
            highlighter: parts.highlighter,
            session: None,
            next_session_id: 1,
            highlighted: Vec::new(),
            surface_playing: false,
        }
    }

    pub fn dispatch(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Intent(intent) => self.handle_intent(intent),
            ControllerEvent::StartReading => self.start_reading(),
            ControllerEvent::StopReading => self.stop(),
            ControllerEvent::ShowOverlay => self.surface.set_visible(true),
            ControllerEvent::AudioFetched {
                token,
                index,
                result,
            } => self.on_audio_fetched(token, index, result),
            ControllerEvent::AudioEnded { token, index } => self.on_audio_ended(token, index),
            ControllerEvent::CredentialChanged { present } => {
                self.on_credential_changed(present)
            }
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .filter(|session| !session.token.is_stopped())
            .map(PlaybackSession::status)
            .unwrap_or_else(PlaybackStatus::idle)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.session.as_ref().map(|session| session.phase)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.session.as_ref().map(|session| session.current_index)
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }
}
