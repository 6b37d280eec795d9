//! # Timers
//!
//! The scan tick and the countdown tick are the only clocks in the system.
//! Both go through a `Scheduler` so the core never sleeps on its own:
//!
//! ```text
//! session ──after(300ms, ScanTick)──▶ Scheduler ──(time passes)──▶ TimerId
//!    ▲                                                                │
//!    └──────────────────── handle_timer(id) ◀─────────────────────────┘
//! ```
//!
//! A fired `TimerId` is only acted on if its owner still holds it, so a
//! cancelled or superseded timer can never take effect even if its delivery
//! was already in flight.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer is for. Also the tie-break when two timers are due at the
/// same instant: scan ticks run first, so a fresh detection supersedes a
/// countdown that would otherwise have fired in the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    ScanTick,
    Countdown,
}

/// A timer that has fired, as delivered by a real-time scheduler.
pub type FiredTimer = (TimerId, TimerKind);

/// Puts a batch of timers that fired together into dispatch order: scan
/// ticks first, arrival order otherwise.
pub fn firing_order(batch: &mut [FiredTimer]) {
    batch.sort_by_key(|(_, kind)| *kind);
}

pub trait Scheduler {
    /// Arms a one-shot timer.
    fn after(&mut self, delay: Duration, kind: TimerKind) -> TimerId;
    /// Disarms a timer. Unknown or already-fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

// ============================================================================
// Manual (virtual clock) scheduler
// ============================================================================

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    /// Keyed by (due, kind, id) so iteration order is firing order.
    pending: BTreeSet<(Duration, TimerKind, TimerId)>,
}

impl ManualClock {
    fn pop_due(&mut self, until: Duration) -> Option<TimerId> {
        let key = *self.pending.iter().next()?;
        if key.0 > until {
            return None;
        }
        self.pending.remove(&key);
        self.now = key.0;
        Some(key.2)
    }
}

/// Deterministic scheduler driven by [`ManualScheduler::advance`].
///
/// Clones share one clock: hand one clone to the session and keep another
/// to move time forward.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    pub fn pending_count(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    /// Armed timers in firing order.
    pub fn pending_timers(&self) -> Vec<FiredTimer> {
        self.clock
            .borrow()
            .pending
            .iter()
            .map(|(_, kind, id)| (*id, *kind))
            .collect()
    }

    pub fn pending_of(&self, kind: TimerKind) -> usize {
        self.clock
            .borrow()
            .pending
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// Moves the clock forward by `by`, firing every timer that comes due in
    /// order. Timers armed by `on_fire` are eligible if they fall inside the
    /// window.
    pub fn advance(&self, by: Duration, mut on_fire: impl FnMut(TimerId)) {
        let until = self.now() + by;
        loop {
            let next = self.clock.borrow_mut().pop_due(until);
            match next {
                Some(id) => on_fire(id),
                None => break,
            }
        }
        self.clock.borrow_mut().now = until;
    }
}

impl Scheduler for ManualScheduler {
    fn after(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        let mut clock = self.clock.borrow_mut();
        clock.next_id += 1;
        let id = TimerId(clock.next_id);
        let due = clock.now + delay;
        clock.pending.insert((due, kind, id));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.clock.borrow_mut().pending.retain(|(_, _, t)| *t != id);
    }
}

// ============================================================================
// Tokio scheduler
// ============================================================================

/// Real-time scheduler: each timer is a sleeping tokio task that sends its
/// id and kind down `tx` when it wakes. Must be used inside a tokio runtime.
///
/// Timers due at the same instant can arrive in any order, so the receiver
/// drains what is ready and applies [`firing_order`] before dispatching.
pub struct TokioScheduler {
    tx: mpsc::Sender<FiredTimer>,
    next_id: u64,
    handles: HashMap<TimerId, tokio::task::AbortHandle>,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::Sender<FiredTimer>) -> Self {
        Self {
            tx,
            next_id: 0,
            handles: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn after(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        self.handles.retain(|_, h| !h.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send((id, kind)).is_err() {
                debug!("Timer {:?} ({:?}) fired after receiver dropped", id, kind);
            }
        });
        self.handles.insert(id, handle.abort_handle());
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.handles.remove(&id) {
            handle.abort();
        }
    }
}
