use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, warn};
use std::time::Duration;

/// TUI-specific input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiEvent {
    Quit,
    ForceQuit, // Ctrl+C, always quits

    // Scanner controls
    ToggleScan, // Space
    OpenNow,    // Enter
    Cancel,     // Esc
    NextCamera,
    ToggleTorch,
    ToggleAutoOpen,
    DelayUp,
    DelayDown,
    ToggleSound,
    TestSound,
    ClearHistory,

    // TUI-local
    SwitchView, // Tab: scans <-> links
    CursorUp,
    CursorDown,
    FocusGained,
    FocusLost,
    Resize,
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(Duration::ZERO)
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => match event::read() {
            Ok(ev) => map_event(ev),
            Err(e) => {
                warn!("Failed to read terminal event: {}", e);
                None
            }
        },
        Ok(false) => None,
        Err(e) => {
            warn!("Failed to poll terminal events: {}", e);
            None
        }
    }
}

/// Translates a raw crossterm event. Unmapped input yields `None`.
pub fn map_event(ev: Event) -> Option<TuiEvent> {
    match ev {
        Event::Key(key) if key.kind != KeyEventKind::Release => map_key(key),
        Event::FocusGained => Some(TuiEvent::FocusGained),
        Event::FocusLost => Some(TuiEvent::FocusLost),
        Event::Resize(_, _) => Some(TuiEvent::Resize),
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<TuiEvent> {
    debug!("Key event: {:?} with modifiers {:?}", key.code, key.modifiers);
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::ForceQuit),
        (_, KeyCode::Char(' ')) => Some(TuiEvent::ToggleScan),
        (_, KeyCode::Enter) => Some(TuiEvent::OpenNow),
        (_, KeyCode::Esc) => Some(TuiEvent::Cancel),
        (_, KeyCode::Tab) => Some(TuiEvent::SwitchView),
        (_, KeyCode::Up) => Some(TuiEvent::CursorUp),
        (_, KeyCode::Down) => Some(TuiEvent::CursorDown),
        (_, KeyCode::Char(c)) => match c.to_ascii_lowercase() {
            'q' => Some(TuiEvent::Quit),
            'c' => Some(TuiEvent::NextCamera),
            'f' => Some(TuiEvent::ToggleTorch),
            'a' => Some(TuiEvent::ToggleAutoOpen),
            '+' | '=' => Some(TuiEvent::DelayUp),
            '-' | '_' => Some(TuiEvent::DelayDown),
            's' => Some(TuiEvent::ToggleSound),
            't' => Some(TuiEvent::TestSound),
            'x' => Some(TuiEvent::ClearHistory),
            _ => None,
        },
        _ => None,
    }
}
