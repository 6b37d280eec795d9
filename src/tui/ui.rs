use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use crate::core::auto_open::AutoOpenState;
use crate::core::session::ScannerSession;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{CountdownPopup, HistoryList, ResultPanel, StatusBar};

const HELP: &str = " Space Start/Stop  Enter Open  Esc Cancel  c Camera  f Torch  a Auto  +/- Delay  s Sound  t Test  x Clear  Tab View  q Quit ";

pub fn draw_ui(frame: &mut Frame, session: &ScannerSession, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Length(5), Min(0), Length(1)]);
    let [status_area, result_area, history_area, help_area] = layout.areas(frame.area());

    StatusBar::new(
        session.status().clone(),
        session.camera_label(),
        session.preferences(),
        session.torch(),
    )
    .render(frame, status_area);

    ResultPanel::new(session.last_result(), tui.notice()).render(frame, result_area);

    HistoryList::new(
        &mut tui.history,
        session.scan_history(),
        session.link_history(),
    )
    .render(frame, history_area);

    frame.render_widget(
        Paragraph::new(Line::from(HELP)).style(Style::default().fg(Color::DarkGray)),
        help_area,
    );

    if let AutoOpenState::Pending { url, remaining } = session.pending() {
        CountdownPopup::new(url, *remaining).render(frame, frame.area());
    }
}
