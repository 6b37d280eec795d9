//! # History List Component
//!
//! Tabbed list of past scans, most recent first. `Tab` flips between all
//! scans and links only; arrows move the selection.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `HistoryListState` lives in `TuiState`
//! - `HistoryList` is created each frame with borrowed state and records

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph};

use crate::core::record::ScanRecord;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::result_panel::kind_style;
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryView {
    #[default]
    Scans,
    Links,
}

impl HistoryView {
    fn toggled(self) -> Self {
        match self {
            HistoryView::Scans => HistoryView::Links,
            HistoryView::Links => HistoryView::Scans,
        }
    }
}

#[derive(Default)]
pub struct HistoryListState {
    pub view: HistoryView,
    pub list_state: ListState,
}

impl HistoryListState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the selection, e.g. after history changed underneath it.
    pub fn reset(&mut self) {
        self.list_state.select(None);
    }
}

impl EventHandler for HistoryListState {
    type Event = HistoryView;

    /// Returns the new view when it changed.
    fn handle_event(&mut self, event: &TuiEvent) -> Option<HistoryView> {
        match event {
            TuiEvent::SwitchView => {
                self.view = self.view.toggled();
                self.reset();
                Some(self.view)
            }
            TuiEvent::CursorUp => {
                let next = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
                self.list_state.select(Some(next));
                None
            }
            TuiEvent::CursorDown => {
                let next = self.list_state.selected().map_or(0, |i| i + 1);
                self.list_state.select(Some(next));
                None
            }
            _ => None,
        }
    }
}

pub struct HistoryList<'a> {
    state: &'a mut HistoryListState,
    scans: &'a [ScanRecord],
    links: &'a [ScanRecord],
}

impl<'a> HistoryList<'a> {
    pub fn new(
        state: &'a mut HistoryListState,
        scans: &'a [ScanRecord],
        links: &'a [ScanRecord],
    ) -> Self {
        Self {
            state,
            scans,
            links,
        }
    }

    fn title(&self) -> Line<'static> {
        let tab = |label: String, active: bool| {
            if active {
                Span::styled(
                    label,
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(label, Style::default().fg(Color::DarkGray))
            }
        };
        Line::from(vec![
            Span::raw(" "),
            tab(
                format!("{} scans", self.scans.len()),
                self.state.view == HistoryView::Scans,
            ),
            Span::raw(" │ "),
            tab(
                format!("{} links", self.links.len()),
                self.state.view == HistoryView::Links,
            ),
            Span::raw(" "),
        ])
    }
}

impl Component for HistoryList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let records = match self.state.view {
            HistoryView::Scans => self.scans,
            HistoryView::Links => self.links,
        };
        let block = Block::bordered()
            .title(self.title())
            .border_style(Style::default().fg(Color::DarkGray));

        if records.is_empty() {
            let empty = Paragraph::new("No scans yet")
                .style(Style::default().fg(Color::DarkGray))
                .centered()
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        if let Some(i) = self.state.list_state.selected()
            && i >= records.len()
        {
            self.state.list_state.select(Some(records.len() - 1));
        }

        let items: Vec<ListItem> = records
            .iter()
            .map(|record| {
                let time = record.captured_at.with_timezone(&Local).format("%H:%M:%S");
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{time}  "), Style::default().fg(Color::DarkGray)),
                    Span::styled(record.payload.replace('\n', " "), kind_style(record.kind)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(list, area, &mut self.state.list_state);
    }
}
