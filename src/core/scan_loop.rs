//! # Scan Loop
//!
//! Drives periodic decode attempts while scanning is active.
//!
//! ```text
//!            start()                    tick (own timer)
//!   Idle ─────────────▶ Active ──┐  ┌──────────────────────┐
//!     ▲                   │      │  │ re-arm, grab frame,  │
//!     └─────── stop() ────┘      └─▶│ decode once          │
//!                                   └──────────────────────┘
//! ```
//!
//! At most one tick timer is armed at any time. Hiding the host surface
//! disarms it without leaving the active state; showing it re-arms.

use std::time::Duration;

use log::{debug, warn};

use crate::capture::{FrameSource, StreamHandle};
use crate::core::scheduler::{Scheduler, TimerId, TimerKind};
use crate::decode::{DecodeOptions, Decoder};

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(300);

pub struct ScanLoop {
    period: Duration,
    options: DecodeOptions,
    active: bool,
    visible: bool,
    timer: Option<TimerId>,
}

impl ScanLoop {
    pub fn new(period: Duration, options: DecodeOptions) -> Self {
        Self {
            period,
            options,
            active: false,
            visible: true,
            timer: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True while a tick timer is armed.
    pub fn is_ticking(&self) -> bool {
        self.timer.is_some()
    }

    pub fn owns(&self, id: TimerId) -> bool {
        self.timer == Some(id)
    }

    /// Starts ticking, replacing any schedule already in place.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        self.active = true;
        self.arm(scheduler);
        debug!("Scan loop started ({:?} period)", self.period);
    }

    /// Stops ticking. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        self.disarm(scheduler);
        if self.active {
            debug!("Scan loop stopped");
        }
        self.active = false;
    }

    pub fn set_visible(&mut self, visible: bool, scheduler: &mut dyn Scheduler) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            debug!("Host visible again, resuming scan ticks");
            self.arm(scheduler);
        } else {
            debug!("Host hidden, suspending scan ticks");
            self.disarm(scheduler);
        }
    }

    /// Handles a fired timer. Returns the decoded payload when this tick
    /// found a code.
    ///
    /// Ticks that are stale, inactive, or have no frame yet do nothing. A
    /// failing decode is logged and counts as "no code".
    pub fn tick(
        &mut self,
        id: TimerId,
        scheduler: &mut dyn Scheduler,
        source: &mut dyn FrameSource,
        stream: Option<StreamHandle>,
        decoder: &dyn Decoder,
    ) -> Option<String> {
        if !self.owns(id) {
            return None;
        }
        self.timer = None;
        self.arm(scheduler);

        let frame = source.current_frame(stream?)?;
        match decoder.decode(&frame, &self.options) {
            Ok(Some(payload)) if !payload.is_empty() => Some(payload),
            Ok(_) => None,
            Err(e) => {
                warn!("Scan tick decode failed: {}", e);
                None
            }
        }
    }

    fn arm(&mut self, scheduler: &mut dyn Scheduler) {
        self.disarm(scheduler);
        if self.active && self.visible {
            self.timer = Some(scheduler.after(self.period, TimerKind::ScanTick));
        }
    }

    fn disarm(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
    }
}
