//! # Core Scanner Logic
//!
//! Everything between "a frame exists" and "a link was opened". It knows
//! nothing about any specific UI technology: the presentation layer drives a
//! [`session::ScannerSession`] and renders the events it emits.
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!                    │            CORE              │
//!                    │                              │
//!                    │  scan_loop ─▶ classify       │
//!                    │      │           │           │
//!                    │      ▼           ▼           │
//!                    │  history     auto_open       │
//!                    │      │           │           │
//!                    │   storage      opener        │
//!                    └──────────────┬───────────────┘
//!                                   │ SessionEvent
//!                    ┌──────────────┴───────────────┐
//!                    ▼                              ▼
//!             ┌────────────┐                 ┌────────────┐
//!             │    TUI     │                 │   tests    │
//!             │ (ratatui)  │                 │ (fakes +   │
//!             │            │                 │  manual    │
//!             └────────────┘                 │  clock)    │
//!                                            └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`classify`]: link vs text rule
//! - [`record`]: `ScanRecord`, one detection
//! - [`storage`]: key-value persistence
//! - [`history`]: capped, optionally deduplicated scan lists
//! - [`preferences`]: persisted toggles
//! - [`scheduler`]: injectable timers (virtual and tokio)
//! - [`scan_loop`]: periodic decode attempts
//! - [`auto_open`]: countdown state machine
//! - [`opener`]: hands links to the browser
//! - [`session`]: owns and wires all of the above
//! - [`config`]: `~/.qrscan/config.toml` and overrides

pub mod auto_open;
pub mod classify;
pub mod config;
pub mod history;
pub mod opener;
pub mod preferences;
pub mod record;
pub mod scan_loop;
pub mod scheduler;
pub mod session;
pub mod storage;
