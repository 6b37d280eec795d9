//! # Auto-Open Countdown
//!
//! When a link is detected with auto-open on, the user gets a short countdown
//! to cancel before it opens.
//!
//! ```text
//!            begin(url)                 tick, remaining > 1
//!   Idle ──────────────▶ Pending(url, n) ◀────────────────┐
//!    ▲                     │    │    │                    │
//!    │   tick, remaining 1 │    │    └────────────────────┘
//!    ├──── Opened(url) ◀───┘    │ cancel() / begin(other)
//!    │     open_now() ──────────┤
//!    └──── Cancelled(url) ◀─────┘
//! ```
//!
//! `Opened` and `Cancelled` are reported as transitions; the machine itself
//! is already back in `Idle` when they are returned. Performing the actual
//! open is the caller's job.

use std::time::Duration;

use log::debug;

use crate::core::preferences::clamp_delay;
use crate::core::scheduler::{Scheduler, TimerId, TimerKind};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AutoOpenState {
    #[default]
    Idle,
    Pending { url: String, remaining: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoOpenTransition {
    /// Entered `Pending` with a full countdown.
    Started { url: String, remaining: u8 },
    Ticked { url: String, remaining: u8 },
    Opened(String),
    Cancelled(String),
}

#[derive(Debug, Default)]
pub struct AutoOpen {
    state: AutoOpenState,
    timer: Option<TimerId>,
}

impl AutoOpen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AutoOpenState {
        &self.state
    }

    pub fn owns(&self, id: TimerId) -> bool {
        self.timer == Some(id)
    }

    /// Starts a countdown for `url`. A countdown already running is cancelled
    /// first and reported, so the last detected link wins.
    pub fn begin(
        &mut self,
        url: String,
        delay_secs: u8,
        scheduler: &mut dyn Scheduler,
    ) -> Vec<AutoOpenTransition> {
        let mut transitions = Vec::with_capacity(2);
        if let Some(cancelled) = self.cancel(scheduler) {
            transitions.push(cancelled);
        }

        let remaining = clamp_delay(delay_secs);
        self.timer = Some(scheduler.after(COUNTDOWN_STEP, TimerKind::Countdown));
        self.state = AutoOpenState::Pending {
            url: url.clone(),
            remaining,
        };
        debug!("Auto-open pending for {} ({}s)", url, remaining);
        transitions.push(AutoOpenTransition::Started { url, remaining });
        transitions
    }

    /// Handles a fired countdown timer. Timers this machine no longer holds
    /// are ignored.
    pub fn on_tick(
        &mut self,
        id: TimerId,
        scheduler: &mut dyn Scheduler,
    ) -> Option<AutoOpenTransition> {
        if !self.owns(id) {
            return None;
        }
        self.timer = None;

        match std::mem::take(&mut self.state) {
            AutoOpenState::Pending { url, remaining } if remaining > 1 => {
                let remaining = remaining - 1;
                self.timer = Some(scheduler.after(COUNTDOWN_STEP, TimerKind::Countdown));
                self.state = AutoOpenState::Pending {
                    url: url.clone(),
                    remaining,
                };
                Some(AutoOpenTransition::Ticked { url, remaining })
            }
            AutoOpenState::Pending { url, .. } => Some(AutoOpenTransition::Opened(url)),
            AutoOpenState::Idle => None,
        }
    }

    /// Skips the rest of the countdown.
    pub fn open_now(&mut self, scheduler: &mut dyn Scheduler) -> Option<AutoOpenTransition> {
        self.disarm(scheduler);
        match std::mem::take(&mut self.state) {
            AutoOpenState::Pending { url, .. } => Some(AutoOpenTransition::Opened(url)),
            AutoOpenState::Idle => None,
        }
    }

    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) -> Option<AutoOpenTransition> {
        self.disarm(scheduler);
        match std::mem::take(&mut self.state) {
            AutoOpenState::Pending { url, .. } => {
                debug!("Auto-open cancelled for {}", url);
                Some(AutoOpenTransition::Cancelled(url))
            }
            AutoOpenState::Idle => None,
        }
    }

    fn disarm(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
    }
}
