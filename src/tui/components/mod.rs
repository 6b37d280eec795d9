//! # TUI Components
//!
//! All UI components for the terminal interface.
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as props:
//! - `StatusBar`: scanner status, camera and toggles
//! - `ResultPanel`: latest detection plus transient notices
//! - `CountdownPopup`: auto-open overlay
//!
//! ### Stateful Components (Event-Driven)
//!
//! - `HistoryList`: tabbed scan/link history with selection
//!
//! Components never reach into the session. The draw pass copies what each
//! one needs into its props:
//!
//! ```rust,ignore
//! // Good: dependencies are explicit
//! StatusBar::new(session.status().clone(), session.camera_label(), prefs, torch)
//!     .render(frame, area);
//!
//! // Bad: hidden dependency on the session
//! StatusBar::from_session(&session).render(frame, area);
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs              (this file)
//! ├── status_bar.rs       (Top line)
//! ├── result_panel.rs     (Latest result)
//! ├── history_list.rs     (Scan/link history)
//! └── countdown_popup.rs  (Auto-open overlay)
//! ```

pub mod countdown_popup;
pub mod history_list;
pub mod result_panel;
pub mod status_bar;

pub use countdown_popup::CountdownPopup;
pub use history_list::{HistoryList, HistoryListState, HistoryView};
pub use result_panel::ResultPanel;
pub use status_bar::StatusBar;
