//! # StatusBar Component
//!
//! Top line: scanner status on the left, camera and toggles on the right.
//!
//! ```text
//! ● Scanning...                     Back Camera │ auto 3s │ sound │ torch
//! ```
//!
//! Purely presentational: every field is a prop copied from the session.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::core::preferences::Preferences;
use crate::core::session::ScannerStatus;
use crate::tui::component::Component;

pub struct StatusBar {
    pub status: ScannerStatus,
    pub camera: Option<String>,
    pub preferences: Preferences,
    pub torch: bool,
}

impl StatusBar {
    pub fn new(
        status: ScannerStatus,
        camera: Option<String>,
        preferences: Preferences,
        torch: bool,
    ) -> Self {
        Self {
            status,
            camera,
            preferences,
            torch,
        }
    }

    /// Right-hand summary of camera and toggles.
    fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if let Some(camera) = &self.camera {
            parts.push(camera.clone());
        }
        if self.preferences.auto_open {
            parts.push(format!("auto {}s", self.preferences.delay_secs));
        } else {
            parts.push("auto off".to_string());
        }
        parts.push(if self.preferences.sound { "sound" } else { "muted" }.to_string());
        if self.torch {
            parts.push("torch".to_string());
        }
        parts.join(" │ ")
    }
}

/// Status colors follow the usual traffic-light reading.
pub fn status_color(status: &ScannerStatus) -> Color {
    match status {
        ScannerStatus::Stopped => Color::DarkGray,
        ScannerStatus::Scanning => Color::Cyan,
        ScannerStatus::TextDetected => Color::Yellow,
        ScannerStatus::LinkDetected | ScannerStatus::LinkOpened => Color::Green,
        ScannerStatus::Failed(_) => Color::Red,
    }
}

impl Component for StatusBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let summary = self.summary();
        let [left, right] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(summary.chars().count() as u16 + 1),
        ])
        .areas(area);

        let color = status_color(&self.status);
        let status = Line::from(vec![
            Span::styled("● ", Style::default().fg(color)),
            Span::styled(
                self.status.label(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]);
        frame.render_widget(Paragraph::new(status), left);
        frame.render_widget(
            Paragraph::new(Line::from(summary).right_aligned())
                .style(Style::default().fg(Color::Gray)),
            right,
        );
    }
}
