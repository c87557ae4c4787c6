//! Line-oriented terminal front end: a presentation surface on stdout and a
//! stdin reader that turns typed commands into runtime events.

use crate::chunker::ElementId;
use crate::config::AppConfig;
use crate::controller::{ControllerEvent, UserIntent};
use crate::messages::{HostMessage, HostResponse};
use crate::page::Page;
use crate::preferences::Preferences;
use crate::runtime::{EventSender, RuntimeEvent};
use crate::speech::Voice;
use crate::surface::{Highlighter, PresentationSurface, Severity};
use crate::text_utils::{normalize_rendered_text, truncate_chars};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const SNIPPET_CHARS: usize = 160;
const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Intent(UserIntent),
    Start,
    Stop,
    SetKey(String),
    Status,
    Show,
    Say(String),
    Help,
    Quit,
}

/// Single-word commands bound in the `[keys]` table.
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub toggle_play_pause: String,
    pub next_chunk: String,
    pub prev_chunk: String,
    pub stop: String,
    pub safe_quit: String,
}

impl KeyMap {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            toggle_play_pause: config.key_toggle_play_pause.clone(),
            next_chunk: config.key_next_chunk.clone(),
            prev_chunk: config.key_prev_chunk.clone(),
            stop: config.key_stop.clone(),
            safe_quit: config.key_safe_quit.clone(),
        }
    }

    pub fn help(&self) -> String {
        format!(
            "{} play/pause, {} next, {} previous, {} stop, {} quit; \
             also: start, voice <name>, speed <x>, key <api key>, status, show, say <text>",
            self.toggle_play_pause, self.next_chunk, self.prev_chunk, self.stop, self.safe_quit
        )
    }
}

pub fn parse_command(line: &str, keys: &KeyMap) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    if word.is_empty() {
        return Err("Empty command".to_string());
    }

    if rest.is_empty() {
        if word == keys.toggle_play_pause {
            return Ok(ConsoleCommand::Intent(UserIntent::TogglePlay));
        }
        if word == keys.next_chunk {
            return Ok(ConsoleCommand::Intent(UserIntent::Next));
        }
        if word == keys.prev_chunk {
            return Ok(ConsoleCommand::Intent(UserIntent::Prev));
        }
        if word == keys.stop {
            return Ok(ConsoleCommand::Stop);
        }
        if word == keys.safe_quit {
            return Ok(ConsoleCommand::Quit);
        }
    }

    match (word.to_ascii_lowercase().as_str(), rest) {
        ("start", "") => Ok(ConsoleCommand::Start),
        ("stop", "") => Ok(ConsoleCommand::Stop),
        ("status", "") => Ok(ConsoleCommand::Status),
        ("show", "") => Ok(ConsoleCommand::Show),
        ("help" | "?", "") => Ok(ConsoleCommand::Help),
        ("quit" | "exit", "") => Ok(ConsoleCommand::Quit),
        ("voice", name) => name
            .parse::<Voice>()
            .map(|voice| ConsoleCommand::Intent(UserIntent::VoiceChanged(voice))),
        ("speed", value) => value
            .parse::<f32>()
            .ok()
            .filter(|speed| speed.is_finite())
            .map(|speed| ConsoleCommand::Intent(UserIntent::SpeedChanged(speed)))
            .ok_or_else(|| format!("Invalid speed: {value:?}")),
        ("key", credential) => Ok(ConsoleCommand::SetKey(credential.to_string())),
        ("say", text) if !text.is_empty() => Ok(ConsoleCommand::Say(text.to_string())),
        _ => Err(format!("Unknown command: {line}")),
    }
}

/// Read commands from stdin until quit or end of input.
pub fn spawn_console_reader(
    events: EventSender,
    prefs: Preferences,
    keys: KeyMap,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            println!("{}", keys.help());
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("Failed to read console input: {err}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line, &keys) {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => {
                        if !apply_command(command, &events, &prefs, &keys) {
                            return;
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
            info!("Console input closed");
            if events.send(RuntimeEvent::Shutdown).is_err() {
                debug!("Event loop already gone");
            }
        })
}

/// Returns false once the event loop is gone.
fn apply_command(
    command: ConsoleCommand,
    events: &EventSender,
    prefs: &Preferences,
    keys: &KeyMap,
) -> bool {
    let sent = match command {
        ConsoleCommand::Intent(intent) => events.send(ControllerEvent::Intent(intent)),
        ConsoleCommand::Start => events.send(ControllerEvent::StartReading),
        ConsoleCommand::Stop => events.send(ControllerEvent::StopReading),
        ConsoleCommand::Show => events.send(RuntimeEvent::Host {
            message: HostMessage::ShowOverlay,
            reply: None,
        }),
        ConsoleCommand::SetKey(credential) => {
            match prefs.set_api_key(&credential) {
                Ok(()) if credential.trim().is_empty() => println!("API key cleared"),
                Ok(()) => println!("API key saved"),
                Err(err) => println!("Failed to save API key: {err}"),
            }
            Ok(())
        }
        ConsoleCommand::Status => ask(events, HostMessage::GetStatus),
        ConsoleCommand::Say(text) => ask(events, HostMessage::TtsSpeak { text }),
        ConsoleCommand::Help => {
            println!("{}", keys.help());
            Ok(())
        }
        ConsoleCommand::Quit => return true,
    };
    sent.is_ok()
}

fn ask(
    events: &EventSender,
    message: HostMessage,
) -> Result<(), std::sync::mpsc::SendError<RuntimeEvent>> {
    let reply = events.request(message)?;
    match reply.recv_timeout(REPLY_TIMEOUT) {
        Ok(response) => println!("{}", describe_reply(&response)),
        Err(err) => println!("No reply: {err}"),
    }
    Ok(())
}

fn describe_reply(response: &HostResponse) -> String {
    match response {
        HostResponse::Audio { audio_data_uri } => {
            format!("Synthesized audio ({} characters of data URI)", audio_data_uri.len())
        }
        other => other.to_json(),
    }
}

/// Prints every surface notification as one line.
pub struct TerminalSurface<W: Write> {
    out: W,
    playing: bool,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            playing: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{args}").and_then(|()| self.out.flush()) {
            warn!("Failed to write to console: {err}");
        }
    }
}

impl<W: Write> PresentationSurface for TerminalSurface<W> {
    fn set_status(&mut self, message: &str, severity: Severity) {
        if message.is_empty() {
            return;
        }
        let tag = match severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Error => "error",
        };
        self.line(format_args!("[{tag}] {message}"));
    }

    fn set_playing(&mut self, playing: bool) {
        if playing == self.playing {
            return;
        }
        self.playing = playing;
        if playing {
            self.line(format_args!("▶ reading (prev/next available)"));
        } else {
            self.line(format_args!("■ stopped"));
        }
    }

    fn set_idle_label(&mut self, label: &str) {
        self.line(format_args!("Play button: {label}"));
    }

    fn show_missing_credential(&mut self) {
        self.line(format_args!("! No API key set. Use `key <api key>` to add one."));
    }

    fn hide_missing_credential(&mut self) {
        self.line(format_args!("API key available"));
    }

    fn set_visible(&mut self, visible: bool) {
        if visible {
            self.line(format_args!("Overlay shown"));
        } else {
            self.line(format_args!("Overlay hidden (use `show` to reveal it)"));
        }
    }
}

/// Prints the passage behind the highlighted elements.
pub struct TerminalHighlighter<W: Write> {
    page: Rc<Page>,
    out: W,
}

impl<W: Write> TerminalHighlighter<W> {
    pub fn new(page: Rc<Page>, out: W) -> Self {
        Self { page, out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Highlighter for TerminalHighlighter<W> {
    fn highlight(&mut self, elements: &[ElementId]) {
        let Some(first) = elements.first() else {
            return;
        };
        let Some(element) = self.page.element(*first) else {
            warn!(element = first.0, "Highlighted element not in page");
            return;
        };
        let text = normalize_rendered_text(&element.text().collect::<String>());
        let snippet = truncate_chars(&text, SNIPPET_CHARS);
        let ellipsis = if snippet.len() < text.len() { "…" } else { "" };
        let more = match elements.len() {
            1 => String::new(),
            n => format!(" (+{} more)", n - 1),
        };
        if let Err(err) = writeln!(self.out, "» {snippet}{ellipsis}{more}") {
            warn!("Failed to write to console: {err}");
        }
    }

    fn clear(&mut self, elements: &[ElementId]) {
        debug!(count = elements.len(), "Cleared highlight");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeyMap {
        KeyMap::from_config(&AppConfig::default())
    }

    fn output(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn configured_keys_map_to_intents() {
        let keys = keys();
        assert_eq!(
            parse_command("p", &keys),
            Ok(ConsoleCommand::Intent(UserIntent::TogglePlay))
        );
        assert_eq!(
            parse_command(" n ", &keys),
            Ok(ConsoleCommand::Intent(UserIntent::Next))
        );
        assert_eq!(
            parse_command("b", &keys),
            Ok(ConsoleCommand::Intent(UserIntent::Prev))
        );
        assert_eq!(parse_command("s", &keys), Ok(ConsoleCommand::Stop));
        assert_eq!(parse_command("q", &keys), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn custom_keys_are_honored() {
        let mut keys = keys();
        keys.toggle_play_pause = "space".to_string();
        assert_eq!(
            parse_command("space", &keys),
            Ok(ConsoleCommand::Intent(UserIntent::TogglePlay))
        );
        assert!(parse_command("p", &keys).is_err());
    }

    #[test]
    fn argument_commands_parse_values() {
        let keys = keys();
        assert_eq!(
            parse_command("voice nova", &keys),
            Ok(ConsoleCommand::Intent(UserIntent::VoiceChanged(Voice::Nova)))
        );
        assert_eq!(
            parse_command("speed 1.5", &keys),
            Ok(ConsoleCommand::Intent(UserIntent::SpeedChanged(1.5)))
        );
        assert_eq!(
            parse_command("key  sk-abc ", &keys),
            Ok(ConsoleCommand::SetKey("sk-abc".to_string()))
        );
        assert_eq!(
            parse_command("say Hello there.", &keys),
            Ok(ConsoleCommand::Say("Hello there.".to_string()))
        );
        assert_eq!(parse_command("STATUS", &keys), Ok(ConsoleCommand::Status));
        assert!(parse_command("voice robot", &keys).is_err());
        assert!(parse_command("speed fast", &keys).is_err());
        assert!(parse_command("speed NaN", &keys).is_err());
        assert!(parse_command("say", &keys).is_err());
        assert!(parse_command("dance", &keys).is_err());
    }

    #[test]
    fn surface_prints_changes_only() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_playing(true);
        surface.set_playing(true);
        surface.set_status("Playing 1 / 3", Severity::Success);
        surface.set_status("", Severity::Info);
        surface.set_status("invalid key", Severity::Error);
        surface.set_playing(false);
        assert_eq!(
            output(surface.get_ref()),
            "▶ reading (prev/next available)\n[ok] Playing 1 / 3\n[error] invalid key\n■ stopped\n"
        );
    }

    #[test]
    fn highlighter_prints_first_element_text() {
        let page = Rc::new(Page::parse(
            "https://blog.test/post",
            "<body><p>First   paragraph.</p><p>Second.</p></body>",
        ));
        let ids: Vec<ElementId> = page
            .elements()
            .filter(|(_, element)| element.value().name() == "p")
            .map(|(id, _)| id)
            .collect();
        let mut highlighter = TerminalHighlighter::new(Rc::clone(&page), Vec::new());
        highlighter.highlight(&ids);
        highlighter.highlight(&[ElementId(999)]);
        highlighter.clear(&ids);
        assert_eq!(
            output(highlighter.get_ref()),
            "» First paragraph. (+1 more)\n"
        );
    }
}
