//! # Countdown Popup
//!
//! Centered overlay while a link is about to open. Drawn on top of
//! everything else, cleared underneath.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::tui::component::Component;

pub struct CountdownPopup<'a> {
    pub url: &'a str,
    pub remaining: u8,
}

impl<'a> CountdownPopup<'a> {
    pub fn new(url: &'a str, remaining: u8) -> Self {
        Self { url, remaining }
    }
}

impl Component for CountdownPopup<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(60, 7, area);
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" Link detected ")
            .title_bottom(Line::from(" Enter Open now  Esc Cancel ").centered());

        let lines = vec![
            Line::from(Span::styled(
                self.url.to_string(),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::UNDERLINED),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Opening in {}...", self.remaining),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .centered()
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, overlay);
    }
}

/// A rect `percent_x` wide and `height` rows tall, centered in `outer`.
fn centered_rect(percent_x: u16, height: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(outer.height)),
        Constraint::Fill(1),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}
