//! Entry point for the read-aloud console.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load configuration and the page to read.
//! - Wire the controller to the speech service, audio output and terminal.
//! - Run the event loop until the user quits.

use announce::audio::RodioEngine;
use announce::config::load_config;
use announce::console::{KeyMap, TerminalHighlighter, TerminalSurface, spawn_console_reader};
use announce::controller::{Collaborators, ControllerEvent, PlaybackController};
use announce::page::{Page, overlay_visible_by_default};
use announce::positions::ReadingPositions;
use announce::preferences::Preferences;
use announce::runtime::{EventSender, Runtime, RuntimeEvent, ThreadedFetcher};
use announce::segmenter::{PageChunks, Segmenter};
use announce::speech::{SpeechClient, SpeechService, SpeechSettings};
use announce::storage::FileStore;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";
const USAGE: &str =
    "Usage: announce <page.html|http(s)://url> [--url <page url>] [--selection <file>] [--config <path>]";

struct Args {
    source: String,
    url: Option<String>,
    selection: Option<PathBuf>,
    config: PathBuf,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(&args.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        source = %args.source,
        level = %config.log_level,
        "Starting read-aloud console"
    );

    let page = Rc::new(load_page(&args)?);
    info!(url = %page.url(), "Loaded page");

    let store = Arc::new(FileStore::open(Path::new(&config.storage_path)));
    let prefs = Preferences::new(store.clone(), config.default_voice, config.default_speed);
    let positions = ReadingPositions::new(store);
    let (events, receiver) = EventSender::channel();

    let client = SpeechClient::new(SpeechSettings::from_config(&config))
        .context("Failed to build the speech client")?;
    let speech = Arc::new(SpeechService::new(client, prefs.clone()));
    info!(
        endpoint = %config.speech_endpoint,
        model = %config.speech_model,
        voice = %prefs.voice(),
        speed = prefs.speed(),
        "Active speech configuration"
    );

    let credential_events = events.clone();
    prefs.watch_api_key(move |present| {
        if credential_events
            .send(ControllerEvent::CredentialChanged { present })
            .is_err()
        {
            warn!("Event loop gone; dropping credential change");
        }
    });

    let audio = RodioEngine::new(events.clone()).context("Failed to open audio output")?;
    let mut controller = PlaybackController::new(Collaborators {
        page_url: page.url().to_string(),
        prefs: prefs.clone(),
        positions,
        source: Box::new(PageChunks::new(Rc::clone(&page), Segmenter::from_config(&config))),
        fetcher: Box::new(ThreadedFetcher::new(Arc::clone(&speech), events.clone())),
        audio: Box::new(audio),
        surface: Box::new(TerminalSurface::new(io::stdout())),
        highlighter: Box::new(TerminalHighlighter::new(Rc::clone(&page), io::stdout())),
    });
    controller.attach(overlay_visible_by_default(
        page.url(),
        &config.supported_sites,
        config.always_show_overlay,
    ));

    let interrupt_events = events.clone();
    ctrlc::set_handler(move || {
        if interrupt_events.send(RuntimeEvent::Shutdown).is_err() {
            std::process::exit(130);
        }
    })
    .context("Failed to install the Ctrl-C handler")?;

    spawn_console_reader(events, prefs, KeyMap::from_config(&config))
        .context("Failed to start the console reader")?;

    Runtime::new(controller, speech, receiver).run();
    Ok(())
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut source = None;
    let mut url = None;
    let mut selection = None;
    let mut config = PathBuf::from(DEFAULT_CONFIG_PATH);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--url" => url = Some(next_value(&mut args, "--url")?),
            "--selection" => selection = Some(PathBuf::from(next_value(&mut args, "--selection")?)),
            "--config" => config = PathBuf::from(next_value(&mut args, "--config")?),
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            flag if flag.starts_with("--") => {
                return Err(anyhow!("Unknown option {flag}\n{USAGE}"));
            }
            _ if source.is_none() => source = Some(arg),
            _ => return Err(anyhow!("Unexpected argument {arg}\n{USAGE}")),
        }
    }

    let source = source.ok_or_else(|| anyhow!(USAGE))?;
    Ok(Args {
        source,
        url,
        selection,
        config,
    })
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} needs a value\n{USAGE}"))
}

fn load_page(args: &Args) -> Result<Page> {
    let is_remote = args.source.starts_with("http://") || args.source.starts_with("https://");
    let (html, source_url) = if is_remote {
        info!(url = %args.source, "Fetching page");
        let html = reqwest::blocking::get(args.source.as_str())
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .with_context(|| format!("Failed to fetch {}", args.source))?;
        (html, args.source.clone())
    } else {
        let path = PathBuf::from(&args.source);
        if !path.exists() {
            return Err(anyhow!("File not found: {}", path.display()));
        }
        let html = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let absolute = fs::canonicalize(&path).unwrap_or(path);
        (html, format!("file://{}", absolute.display()))
    };

    let selection = match &args.selection {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read selection {}", path.display()))?,
        ),
        None => None,
    };
    let url = args.url.clone().unwrap_or(source_url);
    Ok(Page::parse(&url, &html).with_selection(selection))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with logging.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
