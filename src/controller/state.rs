use crate::audio::AudioHandle;
use crate::cancellation::SessionToken;
use crate::chunker::Chunk;
use crate::speech::AudioClip;
use std::collections::{HashMap, HashSet};

/// Where the live session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for this chunk's audio; nothing audible.
    Loading(usize),
    Playing(usize),
    /// A fetch or the audio engine failed; only a user action moves on.
    Halted,
}

/// Snapshot answered to status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub playing: bool,
    /// 1-based.
    pub current_chunk: Option<usize>,
    pub total_chunks: Option<usize>,
}

impl PlaybackStatus {
    pub fn idle() -> Self {
        PlaybackStatus {
            playing: false,
            current_chunk: None,
            total_chunks: None,
        }
    }
}

pub(super) struct ActiveAudio {
    pub(super) handle: Box<dyn AudioHandle>,
    /// Speed the clip was synthesized at; playback rate is relative to it.
    pub(super) synthesized_speed: f32,
}

/// State of one read-aloud invocation. Dropped on stop, completion or replacement.
pub(super) struct PlaybackSession {
    pub(super) token: SessionToken,
    pub(super) chunks: Vec<Chunk>,
    /// Last chunk that started playing (the start index before that).
    pub(super) current_index: usize,
    pub(super) phase: Phase,
    /// One-shot: entries are removed when played.
    pub(super) audio_cache: HashMap<usize, AudioClip>,
    pub(super) in_flight: HashSet<usize>,
    /// Failed fetches with their status text; automatic advance stops here.
    pub(super) failed: HashMap<usize, String>,
    pub(super) active_audio: Option<ActiveAudio>,
    /// Some chunk of this session has started playing.
    pub(super) played_any: bool,
}

impl PlaybackSession {
    pub(super) fn new(token: SessionToken, chunks: Vec<Chunk>, start: usize) -> Self {
        Self {
            token,
            chunks,
            current_index: start,
            phase: Phase::Loading(start),
            audio_cache: HashMap::new(),
            in_flight: HashSet::new(),
            failed: HashMap::new(),
            active_audio: None,
            played_any: false,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(super) fn admits(&self, token: &SessionToken) -> bool {
        self.token.admits(token)
    }

    /// A fetch for `index` would be new work: in range, not cached, not
    /// already running and not known to fail.
    pub(super) fn needs_fetch(&self, index: usize) -> bool {
        index < self.chunks.len()
            && !self.audio_cache.contains_key(&index)
            && !self.in_flight.contains(&index)
            && !self.failed.contains_key(&index)
    }

    /// Stop and detach whatever is audible.
    pub(super) fn halt_audio(&mut self) {
        if let Some(active) = self.active_audio.take() {
            active.handle.stop();
        }
    }

    pub(super) fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            playing: true,
            current_chunk: Some(self.current_index + 1),
            total_chunks: Some(self.chunks.len()),
        }
    }
}

pub(super) fn playback_rate(current_speed: f32, synthesized_speed: f32) -> f32 {
    if synthesized_speed > 0.0 {
        current_speed / synthesized_speed
    } else {
        1.0
    }
}
