use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use droidscope_logs::KeywordFilter;
use droidscope_types::{LogRecord, SessionState};

use crate::app::{AppState, PaneState};
use crate::ui::components::{HelpOverlay, StatusBar, pane_hints};
use crate::ui::{Layout, Theme};

/// Main screen: one bordered pane per subscription
pub struct PanesScreen;

impl PanesScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let (header, content, status) = Layout::main(frame.area());

        Self::render_header(frame, header, state);

        let cells = Layout::pane_grid(content, state.panes.len());
        let focused = state.focused;
        for (i, (pane, area)) in state.panes.iter_mut().zip(cells).enumerate() {
            Self::render_pane(frame, area, pane, i == focused);
        }

        Self::render_status_bar(frame, status, state);

        if state.help_visible {
            HelpOverlay::render(frame);
        }
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let session_style = match state.session_state {
            SessionState::Running => Theme::running(),
            SessionState::Idle => Theme::idle(),
        };

        let title = Line::from(vec![
            Span::styled("droidscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.device.as_str(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.session_state.label(), session_style),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(format!("{} panes", state.panes.len()), Theme::text()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_pane(frame: &mut Frame, area: Rect, pane: &mut PaneState, focused: bool) {
        let title = Span::styled(
            pane_title(pane),
            if focused { Theme::title() } else { Theme::text() },
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if focused {
                Theme::border_focused()
            } else {
                Theme::border()
            })
            .title(title);

        let inner = block.inner(area);
        pane.viewport = inner.height as usize;

        let start = pane.visible_start();
        let lines: Vec<Line> = pane
            .buffer
            .range(start, pane.viewport)
            .map(|record| record_line(record, &pane.filter))
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);

        let total = pane.buffer.len();
        if total > pane.viewport {
            let mut scrollbar_state = ScrollbarState::new(pane.max_scroll()).position(start);
            frame.render_stateful_widget(
                Scrollbar::new(ScrollbarOrientation::VerticalRight),
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let (text, style) = match &state.status {
            Some(status) if status.is_error() => (status.to_string(), Theme::error()),
            Some(status) => (status.to_string(), Theme::text()),
            None => (String::new(), Theme::text()),
        };

        let bar = StatusBar::new().hints(pane_hints()).right(text, style);
        frame.render_widget(bar, area);
    }
}

/// Border title: name, record count, warning-and-worse counts, follow marker
fn pane_title(pane: &PaneState) -> String {
    let counts = pane.buffer.level_counts();
    let mut summary = pane.buffer.len().to_string();
    for (count, code) in [(counts.fatal, 'F'), (counts.error, 'E'), (counts.warn, 'W')] {
        if count > 0 {
            summary.push_str(&format!(" {}{}", count, code));
        }
    }
    let follow = if pane.follow { " ▼" } else { "" };
    format!(" {} ({}){} ", pane.title, summary, follow)
}

/// Render a record as `time pid tid L [process] message`, highlighting matches
fn record_line<'a>(record: &'a LogRecord, filter: &KeywordFilter) -> Line<'a> {
    let level_style = Style::default().fg(record.severity().color());

    let mut spans = vec![
        Span::styled(record.time.as_str(), Theme::text_dim()),
        Span::raw(" "),
        Span::styled(format!("{:>5} {:>5}", record.pid, record.tid), Theme::text_dim()),
        Span::raw(" "),
        Span::styled(record.level.as_str(), level_style),
        Span::raw(" "),
    ];

    if let Some(name) = &record.process_name {
        spans.push(Span::styled(format!("[{}] ", name), Theme::process_name()));
    }

    spans.extend(highlight(&record.message, filter, level_style));
    Line::from(spans)
}

/// Split `text` into spans with filter matches highlighted
fn highlight<'a>(text: &'a str, filter: &KeywordFilter, base: Style) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    for (start, end) in filter.find_matches(text) {
        if start < pos || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }
        if start > pos {
            spans.push(Span::styled(&text[pos..start], base));
        }
        spans.push(Span::styled(&text[start..end], Theme::text_match()));
        pos = end;
    }

    if pos < text.len() {
        spans.push(Span::styled(&text[pos..], base));
    }
    spans
}
