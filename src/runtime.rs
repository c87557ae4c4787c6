//! Event loop that owns the controller.
//!
//! Worker threads (speech fetches, audio watchers, the console reader, the
//! host bridge) never touch the controller; they post `RuntimeEvent`s and
//! the loop applies them one at a time on the thread that owns the page.

use crate::cancellation::SessionToken;
use crate::controller::{ControllerEvent, PlaybackController, SpeechFetcher};
use crate::messages::{HostMessage, HostResponse};
use crate::speech::SpeechService;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::thread;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum RuntimeEvent {
    Controller(ControllerEvent),
    Host {
        message: HostMessage,
        reply: Option<Sender<HostResponse>>,
    },
    Shutdown,
}

impl From<ControllerEvent> for RuntimeEvent {
    fn from(event: ControllerEvent) -> Self {
        RuntimeEvent::Controller(event)
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<RuntimeEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: impl Into<RuntimeEvent>) -> Result<(), SendError<RuntimeEvent>> {
        self.tx.send(event.into())
    }

    /// Post a host message and return the receiver its reply arrives on.
    pub fn request(
        &self,
        message: HostMessage,
    ) -> Result<Receiver<HostResponse>, SendError<RuntimeEvent>> {
        let (reply, rx) = mpsc::channel();
        self.send(RuntimeEvent::Host {
            message,
            reply: Some(reply),
        })?;
        Ok(rx)
    }
}

/// Runs each synthesis request on its own thread.
pub struct ThreadedFetcher {
    service: Arc<SpeechService>,
    events: EventSender,
}

impl ThreadedFetcher {
    pub fn new(service: Arc<SpeechService>, events: EventSender) -> Self {
        Self { service, events }
    }
}

impl SpeechFetcher for ThreadedFetcher {
    fn fetch(&mut self, token: SessionToken, index: usize, text: String) {
        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        thread::spawn(move || {
            if let Err(err) = token.check_cancelled("before speech request") {
                debug!(index, "Skipping speech request: {err}");
                return;
            }
            let result = service.speak(&text);
            if let Err(err) = token.check_cancelled("after speech request") {
                debug!(index, "Dropping speech result: {err}");
                return;
            }
            if events
                .send(ControllerEvent::AudioFetched {
                    token,
                    index,
                    result,
                })
                .is_err()
            {
                warn!(index, "Event loop gone; dropping speech result");
            }
        });
    }
}

pub struct Runtime {
    controller: PlaybackController,
    speech: Arc<SpeechService>,
    events: Receiver<RuntimeEvent>,
}

impl Runtime {
    pub fn new(
        controller: PlaybackController,
        speech: Arc<SpeechService>,
        events: Receiver<RuntimeEvent>,
    ) -> Self {
        Self {
            controller,
            speech,
            events,
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Process events until shutdown or until every sender is gone.
    pub fn run(mut self) {
        info!(url = %self.controller.page_url(), "Event loop running");
        while let Ok(event) = self.events.recv() {
            if !self.handle(event) {
                break;
            }
        }
        self.controller.stop();
        info!("Event loop stopped");
    }

    /// Apply one event. Returns false once the loop should exit.
    pub fn handle(&mut self, event: RuntimeEvent) -> bool {
        match event {
            RuntimeEvent::Controller(event) => self.controller.dispatch(event),
            RuntimeEvent::Host { message, reply } => self.handle_host(message, reply),
            RuntimeEvent::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    fn handle_host(&mut self, message: HostMessage, reply: Option<Sender<HostResponse>>) {
        debug!(?message, "Host message");
        let response = match message {
            HostMessage::TtsSpeak { text } => {
                self.speak_for_host(text, reply);
                return;
            }
            HostMessage::GetStatus => HostResponse::Status(self.controller.status().into()),
            HostMessage::StartReading => {
                self.controller.dispatch(ControllerEvent::StartReading);
                HostResponse::ack()
            }
            HostMessage::StopReading => {
                self.controller.dispatch(ControllerEvent::StopReading);
                HostResponse::ack()
            }
            HostMessage::ShowOverlay => {
                self.controller.dispatch(ControllerEvent::ShowOverlay);
                HostResponse::ack()
            }
        };
        send_reply(reply, response);
    }

    /// Synthesis for the host runs off the loop; the reply goes straight back.
    fn speak_for_host(&self, text: String, reply: Option<Sender<HostResponse>>) {
        let service = Arc::clone(&self.speech);
        thread::spawn(move || {
            let response = match service.speak(&text) {
                Ok(clip) => HostResponse::audio(&clip, service.response_format()),
                Err(err) => {
                    warn!("Host speech request failed: {err}");
                    HostResponse::error(err.to_string())
                }
            };
            send_reply(reply, response);
        });
    }
}

fn send_reply(reply: Option<Sender<HostResponse>>, response: HostResponse) {
    let Some(reply) = reply else {
        return;
    };
    if reply.send(response).is_err() {
        debug!("Host stopped waiting for the reply");
    }
}
