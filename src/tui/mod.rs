//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the session and
//! translates keys into session operations.
//!
//! This is the only module that knows about ratatui and crossterm. The core
//! only emits `SessionEvent`s; this adapter turns them into redraws, notices
//! and the terminal bell.
//!
//! ## Event Loop
//!
//! ```text
//!            ┌──────────── terminal events (keys, focus) ────────────┐
//!            ▼                                                       │
//!   ┌─────────────────┐   handle_timers()    ┌────────────────┐      │
//!   │ ScannerSession  │ ◀─────────────────── │ TokioScheduler │      │
//!   └────────┬────────┘  mpsc<(id, kind)>    └────────────────┘      │
//!            │ take_events()                                         │
//!            ▼                                                       │
//!        TuiState ──────────────▶ draw_ui ───────────────────────────┘
//! ```
//!
//! The loop polls at a short interval so timer ids are delivered close to
//! their deadline. Async session calls (start, camera switch, torch) are
//! driven to completion in place with `futures::executor::block_on`.

mod component;
mod components;
mod event;
mod ui;

use log::{debug, info, warn};
use std::io::{Write, stdout};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableFocusChange, EnableFocusChange};
use crossterm::execute;
use futures::executor::block_on;

use crate::capture::ImageDirSource;
use crate::core::config::ResolvedConfig;
use crate::core::opener::SystemOpener;
use crate::core::scheduler::{FiredTimer, TokioScheduler};
use crate::core::session::{ChimeKind, ScannerSession, SessionEvent, SessionParts};
use crate::core::storage::{FileStore, MemoryStore, SharedStore};
use crate::decode::QrDecoder;
use crate::tui::component::EventHandler;
use crate::tui::components::HistoryListState;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// TUI-specific presentation state (not part of the session)
pub struct TuiState {
    pub history: HistoryListState,
    notice: Option<(String, Instant)>,
    /// Set by the first `x`; a second `x` clears history.
    clear_armed: bool,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            history: HistoryListState::new(),
            notice: None,
            clear_armed: false,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|(text, _)| text.as_str())
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
    }

    /// Drops the notice once it has been visible long enough. Returns true
    /// when something was removed.
    fn expire_notice(&mut self, now: Instant) -> bool {
        match &self.notice {
            Some((_, shown)) if now.duration_since(*shown) >= NOTICE_TTL => {
                self.notice = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Focus reporting drives scan suspension; terminals without it just
        // never send the events.
        execute!(stdout(), EnableFocusChange, Hide)?;
        info!("Terminal modes enabled (focus change, hidden cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableFocusChange, Show);
    }
}

fn open_store(config: &ResolvedConfig) -> SharedStore {
    let dir = config.store_dir.clone().or_else(FileStore::default_dir);
    match dir.map(FileStore::open) {
        Some(Ok(store)) => {
            info!("Using store at {}", store.dir().display());
            Rc::new(store)
        }
        Some(Err(e)) => {
            warn!("Could not open store, history will not persist: {}", e);
            Rc::new(MemoryStore::new())
        }
        None => {
            warn!("Could not determine home directory, history will not persist");
            Rc::new(MemoryStore::new())
        }
    }
}

/// Builds a session over the real camera, decoder, timers and browser.
pub fn build_session(config: &ResolvedConfig, timer_tx: mpsc::Sender<FiredTimer>) -> ScannerSession {
    let parts = SessionParts {
        source: Box::new(ImageDirSource::new(config.sources.clone())),
        decoder: Box::new(QrDecoder::new()),
        scheduler: Box::new(TokioScheduler::new(timer_tx)),
        opener: Box::new(SystemOpener),
        store: open_store(config),
    };
    ScannerSession::new(parts, config.session_settings())
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let (timer_tx, timer_rx) = mpsc::channel();
    let mut session = build_session(&config, timer_tx);
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    prepare(&mut session);
    let mut needs_redraw = true;

    loop {
        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, &session, &mut tui))?;
            needs_redraw = false;
        }

        let first_event = poll_event_timeout(POLL_INTERVAL);
        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            needs_redraw = true;
            if apply_event(&mut session, &mut tui, event) {
                should_quit = true;
            }
        }
        if should_quit {
            break;
        }

        let fired: Vec<FiredTimer> = timer_rx.try_iter().collect();
        if !fired.is_empty() {
            session.handle_timers(fired);
        }

        for event in session.take_events() {
            needs_redraw = true;
            present(&mut tui, event);
        }

        if tui.expire_notice(Instant::now()) {
            needs_redraw = true;
        }
    }

    session.stop();
    info!("qrscan shutting down");
    ratatui::restore();
    Ok(())
}

/// Lists the cameras without opening one. Scanning waits for Space.
fn prepare(session: &mut ScannerSession) {
    let found = block_on(session.refresh_devices()).len();
    info!("{} camera(s) available, press Space to start", found);
}

/// Applies one terminal event to the session. Returns true to quit.
fn apply_event(session: &mut ScannerSession, tui: &mut TuiState, event: TuiEvent) -> bool {
    if event != TuiEvent::ClearHistory {
        tui.clear_armed = false;
    }

    match event {
        TuiEvent::Quit | TuiEvent::ForceQuit => return true,
        TuiEvent::ToggleScan => {
            if session.is_running() {
                session.stop();
            } else if block_on(session.start()).is_err() {
                debug!("Start failed, error shown in status line");
            }
        }
        TuiEvent::OpenNow => session.open_now(),
        TuiEvent::Cancel => session.cancel_pending(),
        TuiEvent::NextCamera => {
            if block_on(session.next_camera()).is_err() {
                debug!("Camera switch failed");
            }
        }
        TuiEvent::ToggleTorch => block_on(session.toggle_torch()),
        TuiEvent::ToggleAutoOpen => {
            let on = session.toggle_auto_open();
            tui.set_notice(if on { "Auto-open on" } else { "Auto-open off" });
        }
        TuiEvent::DelayUp | TuiEvent::DelayDown => {
            let current = session.preferences().delay_secs;
            let wanted = if event == TuiEvent::DelayUp {
                current.saturating_add(1)
            } else {
                current.saturating_sub(1)
            };
            let delay = session.set_delay(wanted);
            tui.set_notice(format!("Auto-open delay {delay}s"));
        }
        TuiEvent::ToggleSound => {
            let on = session.toggle_sound();
            tui.set_notice(if on { "Sound on" } else { "Sound off" });
        }
        TuiEvent::TestSound => session.test_sound(),
        TuiEvent::ClearHistory => {
            if tui.clear_armed {
                session.clear_history();
                tui.clear_armed = false;
                tui.set_notice("History cleared");
            } else {
                tui.clear_armed = true;
                tui.set_notice("Press x again to clear history");
            }
        }
        TuiEvent::SwitchView | TuiEvent::CursorUp | TuiEvent::CursorDown => {
            tui.history.handle_event(&event);
        }
        TuiEvent::FocusLost => session.set_visible(false),
        TuiEvent::FocusGained => session.set_visible(true),
        TuiEvent::Resize => {}
    }
    false
}

/// Reflects a session event in presentation state.
fn present(tui: &mut TuiState, event: SessionEvent) {
    debug!("Session event: {:?}", event);
    match event {
        SessionEvent::Chime(kind) => ring_bell(kind),
        SessionEvent::Notice(text) => tui.set_notice(text),
        SessionEvent::Error(e) => tui.set_notice(format!("Camera error: {e}. Press Space to retry")),
        SessionEvent::LinkCancelled(_) => tui.set_notice("Auto-open cancelled"),
        SessionEvent::HistoryChanged => tui.history.reset(),
        SessionEvent::Started
        | SessionEvent::Stopped
        | SessionEvent::Detected(_)
        | SessionEvent::Countdown { .. }
        | SessionEvent::LinkOpened(_) => {}
    }
}

/// The terminal bell is the only sound a TUI has. Links ring twice.
fn ring_bell(kind: ChimeKind) {
    let bell: &[u8] = match kind {
        ChimeKind::Scan => b"\x07",
        ChimeKind::Link => b"\x07\x07",
    };
    let mut out = stdout();
    if let Err(e) = out.write_all(bell).and_then(|_| out.flush()) {
        debug!("Bell failed: {}", e);
    }
}
