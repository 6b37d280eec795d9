//! # Scanner Session
//!
//! One `ScannerSession` owns everything a running scanner needs. There is no
//! process-wide state: build a session at startup, drop it at exit.
//!
//! ```text
//! ScannerSession
//! ├── source: Box<dyn FrameSource>   // camera, exclusively owned
//! ├── decoder: Box<dyn Decoder>      // opaque QR capability
//! ├── scheduler: Box<dyn Scheduler>  // scan + countdown timers
//! ├── opener: Box<dyn UrlOpener>     // open-url-safely
//! ├── scan_loop: ScanLoop
//! ├── auto_open: AutoOpen
//! ├── scan_history / link_history: HistoryStore
//! ├── preferences: Preferences       // persisted toggles
//! └── events: Vec<SessionEvent>      // drained by the presentation layer
//! ```
//!
//! Data flow for one detection:
//!
//! ```text
//! timer ─▶ ScanLoop::tick ─▶ payload ─▶ ScanRecord ─┬─▶ scan history
//!                                                   ├─▶ link history (links)
//!                                                   └─▶ AutoOpen::begin (links, if enabled)
//! ```
//!
//! Only `start`, camera switching and torch changes await anything; all other
//! transitions are synchronous.

use std::time::Duration;

use log::{debug, info, warn};

use crate::capture::{
    CameraError, DeviceInfo, DeviceSelector, FrameSource, StreamConstraints, StreamHandle,
    display_label,
};
use crate::core::auto_open::{AutoOpen, AutoOpenState, AutoOpenTransition};
use crate::core::history::{DEFAULT_LINK_CAP, DEFAULT_SCAN_CAP, HistoryPolicy, HistoryStore};
use crate::core::opener::UrlOpener;
use crate::core::preferences::{Preferences, clamp_delay};
use crate::core::record::ScanRecord;
use crate::core::scan_loop::{DEFAULT_SCAN_INTERVAL, ScanLoop};
use crate::core::scheduler::{FiredTimer, Scheduler, TimerId, firing_order};
use crate::core::storage::{LINK_HISTORY_KEY, SCAN_HISTORY_KEY, SharedStore};
use crate::decode::{DecodeOptions, Decoder};

// ============================================================================
// Settings, status, events
// ============================================================================

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub scan_interval: Duration,
    pub scan_policy: HistoryPolicy,
    pub link_policy: HistoryPolicy,
    pub constraints: StreamConstraints,
    pub camera_index: usize,
    /// Used when nothing has been persisted yet.
    pub preferences: Preferences,
    pub decode: DecodeOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            scan_policy: HistoryPolicy::new(DEFAULT_SCAN_CAP, false),
            link_policy: HistoryPolicy::new(DEFAULT_LINK_CAP, false),
            constraints: StreamConstraints::default(),
            camera_index: 0,
            preferences: Preferences::default(),
            decode: DecodeOptions::default(),
        }
    }
}

/// The capabilities a session is built from.
pub struct SessionParts {
    pub source: Box<dyn FrameSource>,
    pub decoder: Box<dyn Decoder>,
    pub scheduler: Box<dyn Scheduler>,
    pub opener: Box<dyn UrlOpener>,
    pub store: SharedStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerStatus {
    Stopped,
    Scanning,
    TextDetected,
    LinkDetected,
    LinkOpened,
    /// Start failed; stays here until the user retries.
    Failed(String),
}

impl ScannerStatus {
    pub fn label(&self) -> String {
        match self {
            ScannerStatus::Stopped => "Camera stopped".to_string(),
            ScannerStatus::Scanning => "Scanning...".to_string(),
            ScannerStatus::TextDetected => "Text detected".to_string(),
            ScannerStatus::LinkDetected => "Link detected!".to_string(),
            ScannerStatus::LinkOpened => "Link opened!".to_string(),
            ScannerStatus::Failed(msg) => format!("Start failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChimeKind {
    Scan,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Stopped,
    Error(CameraError),
    Detected(ScanRecord),
    Countdown { url: String, remaining: u8 },
    LinkOpened(String),
    LinkCancelled(String),
    HistoryChanged,
    Chime(ChimeKind),
    /// Transient, non-fatal message for the user.
    Notice(String),
}

// ============================================================================
// Session
// ============================================================================

pub struct ScannerSession {
    source: Box<dyn FrameSource>,
    decoder: Box<dyn Decoder>,
    scheduler: Box<dyn Scheduler>,
    opener: Box<dyn UrlOpener>,
    store: SharedStore,
    scan_loop: ScanLoop,
    auto_open: AutoOpen,
    scan_history: HistoryStore,
    link_history: HistoryStore,
    preferences: Preferences,
    constraints: StreamConstraints,
    camera_index: usize,
    devices: Vec<DeviceInfo>,
    stream: Option<StreamHandle>,
    torch: bool,
    status: ScannerStatus,
    last_result: Option<ScanRecord>,
    events: Vec<SessionEvent>,
}

impl ScannerSession {
    /// Builds a session and loads persisted history and preferences.
    pub fn new(parts: SessionParts, settings: SessionSettings) -> Self {
        let mut scan_history =
            HistoryStore::new(parts.store.clone(), SCAN_HISTORY_KEY, settings.scan_policy);
        let mut link_history =
            HistoryStore::new(parts.store.clone(), LINK_HISTORY_KEY, settings.link_policy);
        scan_history.load();
        link_history.load();
        let preferences = Preferences::load(&parts.store, settings.preferences);

        Self {
            source: parts.source,
            decoder: parts.decoder,
            scheduler: parts.scheduler,
            opener: parts.opener,
            store: parts.store,
            scan_loop: ScanLoop::new(settings.scan_interval, settings.decode),
            auto_open: AutoOpen::new(),
            scan_history,
            link_history,
            preferences,
            constraints: settings.constraints,
            camera_index: settings.camera_index,
            devices: Vec::new(),
            stream: None,
            torch: false,
            status: ScannerStatus::Stopped,
            last_result: None,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn status(&self) -> &ScannerStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some() && self.scan_loop.is_active()
    }

    pub fn scan_history(&self) -> &[ScanRecord] {
        self.scan_history.list()
    }

    pub fn link_history(&self) -> &[ScanRecord] {
        self.link_history.list()
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn pending(&self) -> &AutoOpenState {
        self.auto_open.state()
    }

    pub fn last_result(&self) -> Option<&ScanRecord> {
        self.last_result.as_ref()
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn camera_index(&self) -> usize {
        self.camera_index
    }

    /// Picker label for the selected camera, if devices are known.
    pub fn camera_label(&self) -> Option<String> {
        self.devices
            .get(self.camera_index)
            .map(|d| display_label(&d.label, self.camera_index))
    }

    pub fn torch(&self) -> bool {
        self.torch
    }

    /// Drains events produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Camera lifecycle
    // ------------------------------------------------------------------

    /// Re-enumerates capture devices. Failures leave the old list in place.
    pub async fn refresh_devices(&mut self) -> &[DeviceInfo] {
        match self.source.devices().await {
            Ok(devices) => {
                debug!("Found {} capture devices", devices.len());
                self.devices = devices;
            }
            Err(e) => warn!("Failed to enumerate capture devices: {}", e),
        }
        &self.devices
    }

    /// Opens the selected camera and starts scanning. Any stream already held
    /// is released first.
    ///
    /// On failure the session is torn down into `Failed` and the error is
    /// both returned and emitted as [`SessionEvent::Error`].
    pub async fn start(&mut self) -> Result<(), CameraError> {
        self.scan_loop.stop(&mut *self.scheduler);
        if let Some(previous) = self.stream.take() {
            self.source.close(previous);
        }

        if self.devices.is_empty() {
            self.refresh_devices().await;
        }
        let selector = if self.devices.is_empty() {
            DeviceSelector::Any
        } else {
            DeviceSelector::Index(self.camera_index)
        };

        let handle = match self.source.open(selector, &self.constraints).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Camera start failed: {}", e);
                self.fail(e.clone());
                return Err(e);
            }
        };
        self.stream = Some(handle);

        if self.torch
            && let Err(e) = self.source.set_torch(handle, true).await
        {
            info!("Torch not applied on start: {}", e);
        }

        self.scan_loop.start(&mut *self.scheduler);
        self.status = ScannerStatus::Scanning;
        self.events.push(SessionEvent::Started);
        info!("Scanning started on camera {}", self.camera_index);
        Ok(())
    }

    /// Stops the scan ticks, cancels any countdown and closes the camera, in
    /// that order. Calling it again does nothing.
    pub fn stop(&mut self) {
        if self.teardown() {
            self.status = ScannerStatus::Stopped;
            self.events.push(SessionEvent::Stopped);
            info!("Scanning stopped");
        }
    }

    fn teardown(&mut self) -> bool {
        let was_active = self.scan_loop.is_active();
        self.scan_loop.stop(&mut *self.scheduler);

        let cancelled = self.auto_open.cancel(&mut *self.scheduler);
        let had_countdown = cancelled.is_some();
        if let Some(transition) = cancelled {
            self.apply(transition);
        }

        let had_stream = match self.stream.take() {
            Some(handle) => {
                self.source.close(handle);
                true
            }
            None => false,
        };

        was_active || had_countdown || had_stream
    }

    fn fail(&mut self, error: CameraError) {
        self.teardown();
        self.status = ScannerStatus::Failed(error.to_string());
        self.events.push(SessionEvent::Error(error));
    }

    /// Switches to the camera at `index` and restarts the stream.
    pub async fn select_camera(&mut self, index: usize) -> Result<(), CameraError> {
        if self.devices.is_empty() {
            self.refresh_devices().await;
        }
        if index >= self.devices.len() {
            self.events
                .push(SessionEvent::Notice(format!("No camera #{}", index + 1)));
            return Err(CameraError::DeviceNotFound);
        }
        self.camera_index = index;
        self.start().await
    }

    /// Cycles to the next camera and restarts the stream.
    pub async fn next_camera(&mut self) -> Result<(), CameraError> {
        if self.devices.is_empty() {
            self.refresh_devices().await;
        }
        if self.devices.is_empty() {
            self.events
                .push(SessionEvent::Notice("No camera available".to_string()));
            return Err(CameraError::DeviceNotFound);
        }
        let next = (self.camera_index + 1) % self.devices.len();
        self.select_camera(next).await
    }

    /// Flips the torch. Unsupported devices produce a notice; scanning is
    /// unaffected either way.
    pub async fn toggle_torch(&mut self) {
        let Some(handle) = self.stream else {
            return;
        };
        let wanted = !self.torch;
        match self.source.set_torch(handle, wanted).await {
            Ok(()) => self.torch = wanted,
            Err(e) => {
                info!("Torch toggle failed: {}", e);
                self.events.push(SessionEvent::Notice(e.to_string()));
            }
        }
    }

    /// Suspends scan ticks while the host surface is hidden.
    pub fn set_visible(&mut self, visible: bool) {
        self.scan_loop.set_visible(visible, &mut *self.scheduler);
    }

    // ------------------------------------------------------------------
    // Timers and detections
    // ------------------------------------------------------------------

    /// Handles timers that fired together. Scan ticks go first, so a
    /// detection in this batch supersedes a countdown due alongside it.
    pub fn handle_timers(&mut self, mut batch: Vec<FiredTimer>) {
        firing_order(&mut batch);
        for (id, _) in batch {
            self.handle_timer(id);
        }
    }

    /// Routes a fired timer to whichever component armed it.
    pub fn handle_timer(&mut self, id: TimerId) {
        if self.scan_loop.owns(id) {
            let payload = self.scan_loop.tick(
                id,
                &mut *self.scheduler,
                &mut *self.source,
                self.stream,
                &*self.decoder,
            );
            if let Some(payload) = payload {
                self.detect(payload);
            }
        } else if self.auto_open.owns(id) {
            if let Some(transition) = self.auto_open.on_tick(id, &mut *self.scheduler) {
                self.apply(transition);
            }
        } else {
            debug!("Ignoring stale timer {:?}", id);
        }
    }

    /// Records a decoded payload and, for links, starts the auto-open
    /// countdown when enabled.
    pub fn detect(&mut self, payload: String) {
        let record = ScanRecord::now(payload);
        info!("Detected {}: {}", record.kind.label(), record.payload);

        if self.preferences.sound {
            self.events.push(SessionEvent::Chime(ChimeKind::Scan));
        }
        self.last_result = Some(record.clone());
        self.scan_history.record(record.clone());
        self.events.push(SessionEvent::Detected(record.clone()));

        if record.is_link() {
            self.link_history.record(record.clone());
            if self.preferences.sound {
                self.events.push(SessionEvent::Chime(ChimeKind::Link));
            }
            self.status = ScannerStatus::LinkDetected;
            if self.preferences.auto_open {
                let transitions = self.auto_open.begin(
                    record.payload,
                    self.preferences.delay_secs,
                    &mut *self.scheduler,
                );
                for transition in transitions {
                    self.apply(transition);
                }
            }
        } else {
            self.status = ScannerStatus::TextDetected;
        }
        self.events.push(SessionEvent::HistoryChanged);
    }

    /// Opens the pending link immediately.
    pub fn open_now(&mut self) {
        if let Some(transition) = self.auto_open.open_now(&mut *self.scheduler) {
            self.apply(transition);
        }
    }

    pub fn cancel_pending(&mut self) {
        if let Some(transition) = self.auto_open.cancel(&mut *self.scheduler) {
            self.apply(transition);
        }
    }

    fn apply(&mut self, transition: AutoOpenTransition) {
        match transition {
            AutoOpenTransition::Started { url, remaining }
            | AutoOpenTransition::Ticked { url, remaining } => {
                self.events.push(SessionEvent::Countdown { url, remaining });
            }
            AutoOpenTransition::Opened(url) => match self.opener.open(&url) {
                Ok(()) => {
                    self.status = ScannerStatus::LinkOpened;
                    self.events.push(SessionEvent::LinkOpened(url));
                }
                Err(e) => {
                    warn!("Could not open {}: {}", url, e);
                    self.events
                        .push(SessionEvent::Notice(format!("Could not open link: {e}")));
                }
            },
            AutoOpenTransition::Cancelled(url) => {
                if self.is_running() {
                    self.status = ScannerStatus::Scanning;
                }
                self.events.push(SessionEvent::LinkCancelled(url));
            }
        }
    }

    // ------------------------------------------------------------------
    // Preferences and history
    // ------------------------------------------------------------------

    /// Flips auto-open. Turning it off also cancels a running countdown.
    pub fn toggle_auto_open(&mut self) -> bool {
        self.preferences.auto_open = !self.preferences.auto_open;
        self.preferences.save(&self.store);
        if !self.preferences.auto_open {
            self.cancel_pending();
        }
        info!("Auto-open {}", if self.preferences.auto_open { "enabled" } else { "disabled" });
        self.preferences.auto_open
    }

    /// Sets the countdown length for future links (clamped to 1..=10).
    pub fn set_delay(&mut self, secs: u8) -> u8 {
        self.preferences.delay_secs = clamp_delay(secs);
        self.preferences.save(&self.store);
        self.preferences.delay_secs
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.preferences.sound = !self.preferences.sound;
        self.preferences.save(&self.store);
        self.preferences.sound
    }

    /// Plays the scan chime on demand, whether or not sound is enabled.
    pub fn test_sound(&mut self) {
        self.events.push(SessionEvent::Chime(ChimeKind::Scan));
    }

    /// Empties both histories, in memory and in storage.
    pub fn clear_history(&mut self) {
        self.scan_history.clear();
        self.link_history.clear();
        self.events.push(SessionEvent::HistoryChanged);
        info!("History cleared");
    }
}
