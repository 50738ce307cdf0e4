mod config;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use droidscope_adb::{AdbBridge, DeviceBridge};
use droidscope_logs::{Dispatcher, SessionController, SessionOptions, SubscriptionHandle};
use droidscope_tui::{
    Action, AppState, Event, EventHandler, KeyBindings, KeyContext, PaneState, PanesScreen, Tui,
};
use droidscope_types::StatusEvent;

use config::Settings;

/// Droidscope - watch Android logcat output in keyword-filtered panes
#[derive(Parser, Debug)]
#[command(name = "droidscope")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Pane keywords; each one gets its own pane (overrides configured panes)
    #[arg(value_name = "KEYWORD")]
    pub keywords: Vec<String>,

    /// TOML config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the adb executable
    #[arg(long, value_name = "PATH")]
    pub adb: Option<String>,

    /// Device serial, when more than one device is attached
    #[arg(short, long, value_name = "SERIAL")]
    pub serial: Option<String>,

    /// Scrollback per pane
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Interval between process table refreshes, in milliseconds
    #[arg(long, value_name = "MS")]
    pub pid_refresh_ms: Option<u64>,

    /// Wait for `s` instead of reading the log on startup
    #[arg(long)]
    pub no_auto_start: bool,

    /// Write diagnostics to this file (RUST_LOG controls the level)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Diagnostics go to the log file when one is given. On stderr they would
/// draw over the TUI, so stderr logging stays off unless RUST_LOG asks for it.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn run_app(args: Args) -> Result<()> {
    let settings = Settings::load(&args)?;
    tracing::info!(?settings, "starting");

    // Subscribe every pane before the session can publish
    let dispatcher = Dispatcher::new();
    let mut panes = Vec::with_capacity(settings.panes.len());
    let mut feeds: Vec<SubscriptionHandle> = Vec::with_capacity(settings.panes.len());
    for pane in &settings.panes {
        let filter = pane.filter()?;
        let predicate = filter.clone();
        feeds.push(dispatcher.subscribe(pane.title(), move |record| predicate.matches(record)));
        panes.push(PaneState::new(pane.title(), filter, settings.buffer_size));
    }

    let bridge = Arc::new(AdbBridge::new(settings.adb.clone(), settings.serial.clone()));
    let device = bridge.serial().unwrap_or("default device").to_string();

    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<StatusEvent>();
    let options = SessionOptions {
        pid_refresh_interval: settings.pid_refresh,
        auto_start: settings.auto_start,
        skip_prefixes: settings.skip_prefixes.clone(),
    };
    let mut session = SessionController::with_dispatcher(bridge, options, dispatcher, status_tx);

    let mut state = AppState::new(device, panes);
    if !settings.auto_start {
        state.set_status(StatusEvent::Stopped);
    }

    // Initialize TUI
    let mut tui = Tui::new()?;

    // Initialize event handler
    let mut events = EventHandler::new(Duration::from_millis(100));

    // Initialize keybindings
    let keybindings = KeyBindings::new();

    let result = event_loop(
        &mut tui,
        &mut events,
        &keybindings,
        &mut session,
        &mut state,
        &mut feeds,
        &mut status_rx,
    )
    .await;

    // Cleanup runs whether or not the loop failed
    session.shutdown().await;
    events.shutdown();
    tui.restore()?;

    result
}

async fn event_loop<B: DeviceBridge>(
    tui: &mut Tui,
    events: &mut EventHandler,
    keybindings: &KeyBindings,
    session: &mut SessionController<B>,
    state: &mut AppState,
    feeds: &mut [SubscriptionHandle],
    status_rx: &mut mpsc::UnboundedReceiver<StatusEvent>,
) -> Result<()> {
    loop {
        // Move delivered records into the pane buffers
        for (pane, feed) in state.panes.iter_mut().zip(feeds.iter_mut()) {
            pane.append(feed.drain());
        }
        state.session_state = session.state();

        tui.terminal()
            .draw(|frame| PanesScreen::render(frame, state))?;

        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let context = if state.help_visible {
                            KeyContext::Help
                        } else {
                            KeyContext::Panes
                        };
                        if let Some(action) = keybindings.get_action(context, &key) {
                            handle_action(session, state, action).await;
                        }
                    }
                    Event::Error(e) => {
                        tracing::warn!(error = %e, "terminal input error");
                    }
                    Event::Tick | Event::Resize(..) => {}
                }
            }

            Some(status) = status_rx.recv() => {
                state.set_status(status);
            }

            else => return Ok(()),
        }

        if state.should_quit {
            return Ok(());
        }
    }
}

/// Session controls go to the session, everything else to the UI state
async fn handle_action<B: DeviceBridge>(
    session: &mut SessionController<B>,
    state: &mut AppState,
    action: Action,
) {
    match action {
        Action::StartLogging => {
            if !session.start() {
                tracing::debug!("start ignored, already running");
            }
        }
        Action::StopLogging => {
            if !session.stop().await {
                tracing::debug!("stop ignored, not running");
            }
        }
        Action::ClearDeviceLog => session.clear().await,
        other => state.apply(&other),
    }
}
