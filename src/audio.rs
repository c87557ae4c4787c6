//! Local audio output.
//!
//! `play` either starts the clip and returns a handle, or refuses with a
//! playback error. Completion is reported asynchronously as
//! `ControllerEvent::AudioEnded`, tagged with the session token and index.

use crate::cancellation::SessionToken;
use crate::error::PlaybackError;
use crate::speech::AudioClip;

pub trait AudioHandle {
    fn set_rate(&self, rate: f32);
    fn stop(&self);
}

pub trait AudioEngine {
    fn play(
        &mut self,
        token: &SessionToken,
        index: usize,
        clip: AudioClip,
        rate: f32,
    ) -> Result<Box<dyn AudioHandle>, PlaybackError>;
}

#[cfg(feature = "audio")]
pub use rodio_engine::RodioEngine;

#[cfg(feature = "audio")]
mod rodio_engine {
    use super::{AudioEngine, AudioHandle};
    use crate::cancellation::SessionToken;
    use crate::controller::ControllerEvent;
    use crate::error::PlaybackError;
    use crate::runtime::EventSender;
    use crate::speech::AudioClip;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use tracing::{debug, warn};

    /// Plays clips on the default output device.
    pub struct RodioEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        events: EventSender,
    }

    impl RodioEngine {
        pub fn new(events: EventSender) -> Result<Self, PlaybackError> {
            let (stream, handle) = OutputStream::try_default().map_err(PlaybackError::engine)?;
            Ok(Self {
                _stream: stream,
                handle,
                events,
            })
        }
    }

    impl AudioEngine for RodioEngine {
        fn play(
            &mut self,
            token: &SessionToken,
            index: usize,
            clip: AudioClip,
            rate: f32,
        ) -> Result<Box<dyn AudioHandle>, PlaybackError> {
            let source = Decoder::new(Cursor::new(clip.bytes)).map_err(PlaybackError::engine)?;
            let sink = Sink::try_new(&self.handle).map_err(PlaybackError::engine)?;
            sink.set_speed(rate);
            sink.append(source);

            let sink = Arc::new(sink);
            let stopped = Arc::new(AtomicBool::new(false));
            let watch_sink = Arc::clone(&sink);
            let watch_stopped = Arc::clone(&stopped);
            let token = token.clone();
            let events = self.events.clone();
            thread::spawn(move || {
                watch_sink.sleep_until_end();
                if watch_stopped.load(Ordering::Acquire) || token.is_stopped() {
                    debug!(index, "Audio stopped before the end");
                    return;
                }
                if events
                    .send(ControllerEvent::AudioEnded { token, index })
                    .is_err()
                {
                    warn!(index, "Event loop gone; dropping audio end");
                }
            });
            Ok(Box::new(RodioHandle { sink, stopped }))
        }
    }

    struct RodioHandle {
        sink: Arc<Sink>,
        stopped: Arc<AtomicBool>,
    }

    impl AudioHandle for RodioHandle {
        fn set_rate(&self, rate: f32) {
            self.sink.set_speed(rate);
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::Release);
            self.sink.stop();
        }
    }

    impl Drop for RodioHandle {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
