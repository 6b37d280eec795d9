//! # ResultPanel Component
//!
//! Shows the most recent detection (payload, kind, time) and any transient
//! notice underneath it.

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::core::record::{ScanKind, ScanRecord};
use crate::tui::component::Component;

pub struct ResultPanel<'a> {
    pub result: Option<&'a ScanRecord>,
    pub notice: Option<&'a str>,
}

impl<'a> ResultPanel<'a> {
    pub fn new(result: Option<&'a ScanRecord>, notice: Option<&'a str>) -> Self {
        Self { result, notice }
    }
}

pub fn kind_style(kind: ScanKind) -> Style {
    match kind {
        ScanKind::Link => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::UNDERLINED),
        ScanKind::Text => Style::default().fg(Color::White),
    }
}

impl Component for ResultPanel<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        let mut block = Block::bordered()
            .title(" Result ")
            .border_style(Style::default().fg(Color::DarkGray));

        match self.result {
            Some(record) => {
                let time = record.captured_at.with_timezone(&Local).format("%H:%M:%S");
                block = block.title_bottom(
                    Line::from(format!(" {} · {} ", record.kind.label(), time)).right_aligned(),
                );
                lines.push(Line::from(Span::styled(
                    record.payload.clone(),
                    kind_style(record.kind),
                )));
            }
            None => lines.push(Line::from(Span::styled(
                "Point the camera at a QR code",
                Style::default().fg(Color::DarkGray),
            ))),
        }

        if let Some(notice) = self.notice {
            lines.push(Line::from(Span::styled(
                notice.to_string(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}
