use super::state::{ActiveAudio, Phase, PlaybackSession, playback_rate};
use super::{PlaybackController, UserIntent};
use crate::cancellation::SessionToken;
use crate::chunker::{Chunk, ElementId};
use crate::error::PlaybackError;
use crate::positions::resume_index;
use crate::preferences::clamp_speed;
use crate::speech::{AudioClip, SpeechError, Voice};
use crate::surface::{READ_ALOUD_LABEL, RESUME_LABEL, Severity};
use tracing::{debug, info, warn};

impl PlaybackController {
    /// Push the initial surface state for this page.
    pub fn attach(&mut self, visible: bool) {
        self.surface.set_visible(visible);
        let label = if self.positions.load(&self.page_url).is_some() {
            RESUME_LABEL
        } else {
            READ_ALOUD_LABEL
        };
        self.surface.set_idle_label(label);
        if self.prefs.has_api_key() {
            self.surface.hide_missing_credential();
        } else {
            self.surface.show_missing_credential();
        }
    }

    pub(super) fn handle_intent(&mut self, intent: UserIntent) {
        match intent {
            UserIntent::TogglePlay => {
                if self.surface_playing {
                    self.stop();
                } else {
                    self.start_reading();
                }
            }
            UserIntent::Prev => self.prev(),
            UserIntent::Next => self.next(),
            UserIntent::VoiceChanged(voice) => self.set_voice(voice),
            UserIntent::SpeedChanged(speed) => self.set_speed(speed),
        }
    }

    /// Rebuild the chunks from the page and start at the saved position.
    pub fn start_reading(&mut self) {
        self.teardown_session();
        if !self.prefs.has_api_key() {
            warn!(url = %self.page_url, "Cannot start reading without an API key");
            self.surface.show_missing_credential();
            self.set_surface_playing(false);
            self.report(&PlaybackError::Configuration);
            return;
        }
        let chunks = self.source.build_chunks();
        let saved = self.positions.load(&self.page_url);
        self.start_session(chunks, saved);
    }

    /// Replace any session with a new one over `chunks`.
    pub fn start_session(&mut self, chunks: Vec<Chunk>, resume: Option<usize>) {
        self.teardown_session();
        if chunks.is_empty() {
            warn!(url = %self.page_url, "Nothing to read");
            self.set_surface_playing(false);
            self.report(&PlaybackError::Extraction);
            return;
        }

        let total = chunks.len();
        let start = resume_index(resume, total);
        let token = SessionToken::new(self.next_session_id);
        self.next_session_id = self.next_session_id.wrapping_add(1);
        info!(
            session = token.id(),
            start,
            chunks = total,
            resumed = resume.is_some_and(|saved| saved == start),
            "Starting reading session"
        );
        self.session = Some(PlaybackSession::new(token, chunks, start));
        self.set_surface_playing(true);
        self.surface.set_idle_label(READ_ALOUD_LABEL);
        self.surface.set_status("Generating speech…", Severity::Info);

        self.request_fetch(start);
        if start + 1 < total {
            self.request_fetch(start + 1);
        }
    }

    /// Stop reading. The saved position is kept. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.teardown_session();
        self.set_surface_playing(false);
        self.surface.set_status("", Severity::Info);
    }

    pub fn skip_to(&mut self, target: usize) {
        let Some(session) = self.live_session_mut() else {
            debug!(target, "Ignoring skip without a live session");
            return;
        };
        if target >= session.len() {
            debug!(target, total = session.len(), "Ignoring skip past the end");
            return;
        }
        session.halt_audio();
        session.failed.remove(&target);
        let cached = session.audio_cache.remove(&target);
        if cached.is_none() {
            session.phase = Phase::Loading(target);
        }
        self.surface
            .set_status(&format!("Loading chunk {}…", target + 1), Severity::Info);
        match cached {
            Some(clip) => self.play_chunk(target, clip),
            None => self.request_fetch(target),
        }
    }

    pub fn prev(&mut self) {
        let Some(current) = self.live_session_mut().map(|session| session.current_index) else {
            return;
        };
        self.skip_to(current.saturating_sub(1));
    }

    pub fn next(&mut self) {
        let Some((current, total)) = self
            .live_session_mut()
            .map(|session| (session.current_index, session.len()))
        else {
            return;
        };
        if current + 1 < total {
            self.skip_to(current + 1);
        } else {
            debug!(current, "Already at the last chunk");
        }
    }

    /// Only chunks fetched after this call use the new voice.
    pub fn set_voice(&mut self, voice: Voice) {
        if let Err(err) = self.prefs.set_voice(voice) {
            warn!(%voice, "Failed to store voice: {err}");
            return;
        }
        info!(%voice, "Voice changed");
    }

    pub fn set_speed(&mut self, speed: f32) {
        let speed = match self.prefs.set_speed(speed) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(speed, "Failed to store speed: {err}");
                clamp_speed(speed)
            }
        };
        if let Some(active) = self
            .session
            .as_ref()
            .and_then(|session| session.active_audio.as_ref())
        {
            active
                .handle
                .set_rate(playback_rate(speed, active.synthesized_speed));
        }
        info!(speed, "Speed changed");
    }

    pub(super) fn on_audio_fetched(
        &mut self,
        token: SessionToken,
        index: usize,
        result: Result<AudioClip, SpeechError>,
    ) {
        let Some(session) = self.live_session_for(&token) else {
            return;
        };
        session.in_flight.remove(&index);
        let awaited = session.phase == Phase::Loading(index);
        match result {
            Ok(clip) => {
                if awaited {
                    self.play_chunk(index, clip);
                } else {
                    debug!(session = token.id(), index, "Buffered prefetched audio");
                    session.audio_cache.insert(index, clip);
                }
            }
            Err(err) => {
                let error = PlaybackError::from(err);
                let message = error.to_string();
                warn!(session = token.id(), index, "Speech fetch failed: {message}");
                session.failed.insert(index, message);
                let nothing_played = !session.played_any;
                if awaited {
                    session.phase = Phase::Halted;
                }
                if awaited && nothing_played {
                    self.set_surface_playing(false);
                }
                self.report(&error);
            }
        }
    }

    pub(super) fn on_audio_ended(&mut self, token: SessionToken, index: usize) {
        let Some(session) = self.live_session_for(&token) else {
            return;
        };
        if session.phase != Phase::Playing(index) {
            debug!(
                session = token.id(),
                index,
                phase = ?session.phase,
                "Ignoring end of audio that is no longer current"
            );
            return;
        }
        session.active_audio = None;

        let next = index + 1;
        if next >= session.len() {
            self.finish();
            return;
        }
        if let Some(clip) = session.audio_cache.remove(&next) {
            self.play_chunk(next, clip);
            return;
        }
        if let Some(message) = session.failed.get(&next).cloned() {
            warn!(session = token.id(), index = next, "Not advancing into a failed chunk");
            session.phase = Phase::Halted;
            self.surface.set_status(&message, Severity::Error);
            return;
        }
        session.phase = Phase::Loading(next);
        self.surface
            .set_status(&format!("Loading chunk {}…", next + 1), Severity::Info);
        self.request_fetch(next);
    }

    pub(super) fn on_credential_changed(&mut self, present: bool) {
        if present {
            self.surface.hide_missing_credential();
        } else {
            self.surface.show_missing_credential();
        }
    }

    fn play_chunk(&mut self, index: usize, clip: AudioClip) {
        let speed = self.prefs.speed();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.halt_audio();
        let synthesized_speed = clip.speed;
        let token = session.token.clone();
        let total = session.len();

        match self
            .audio
            .play(&token, index, clip, playback_rate(speed, synthesized_speed))
        {
            Ok(handle) => {
                session.active_audio = Some(ActiveAudio {
                    handle,
                    synthesized_speed,
                });
                session.current_index = index;
                session.phase = Phase::Playing(index);
                session.played_any = true;
                let elements = session.chunks[index].source_elements.clone();
                info!(session = token.id(), index, total, "Playing chunk");

                if !self.surface_playing {
                    self.set_surface_playing(true);
                }
                self.surface.set_status(
                    &format!("Playing {} / {}", index + 1, total),
                    Severity::Success,
                );
                self.positions.save(&self.page_url, index);
                self.highlight(elements);
                if index + 2 < total {
                    self.request_fetch(index + 2);
                }
            }
            Err(err) => {
                warn!(session = token.id(), index, "Audio engine refused chunk: {err:?}");
                session.current_index = index;
                session.phase = Phase::Halted;
                self.set_surface_playing(false);
                self.report(&err);
            }
        }
    }

    fn finish(&mut self) {
        info!(url = %self.page_url, "Finished reading page");
        self.positions.clear(&self.page_url);
        self.teardown_session();
        self.set_surface_playing(false);
        self.surface.set_status("Done", Severity::Success);
    }

    fn request_fetch(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.needs_fetch(index) {
            debug!(
                session = session.token.id(),
                index,
                "Skipping fetch; audio cached, pending or failed"
            );
            return;
        }
        session.in_flight.insert(index);
        let token = session.token.clone();
        let text = session.chunks[index].text.clone();
        debug!(session = token.id(), index, "Fetching chunk audio");
        self.fetcher.fetch(token, index, text);
    }

    fn teardown_session(&mut self) {
        self.clear_highlight();
        if let Some(mut session) = self.session.take() {
            session.token.stop();
            session.halt_audio();
            info!(
                session = session.token.id(),
                index = session.current_index,
                "Stopped reading session"
            );
        }
    }

    fn live_session_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.session
            .as_mut()
            .filter(|session| !session.token.is_stopped())
    }

    fn live_session_for(&mut self, token: &SessionToken) -> Option<&mut PlaybackSession> {
        match self.session.as_mut() {
            Some(session) if session.admits(token) => Some(session),
            Some(session) => {
                debug!(
                    session = token.id(),
                    current = session.token.id(),
                    "Ignoring stale session event"
                );
                None
            }
            None => {
                debug!(session = token.id(), "Ignoring event with no live session");
                None
            }
        }
    }

    fn highlight(&mut self, elements: Vec<ElementId>) {
        self.clear_highlight();
        if elements.is_empty() {
            return;
        }
        self.highlighter.highlight(&elements);
        self.highlighted = elements;
    }

    fn clear_highlight(&mut self) {
        if self.highlighted.is_empty() {
            return;
        }
        let elements = std::mem::take(&mut self.highlighted);
        self.highlighter.clear(&elements);
    }

    fn set_surface_playing(&mut self, playing: bool) {
        self.surface_playing = playing;
        self.surface.set_playing(playing);
    }

    fn report(&mut self, error: &PlaybackError) {
        self.surface.set_status(&error.to_string(), Severity::Error);
    }
}
