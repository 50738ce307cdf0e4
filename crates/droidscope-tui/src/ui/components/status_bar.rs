use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// Status bar showing keyboard shortcuts and the session status
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<(String, Style)>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right_text: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        self.right_text = Some((text.into(), style));
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
            spans.push(Span::styled(format!(" {}", desc), Theme::status_bar()));
        }

        // Right text wins over hints when space is short
        let right_width = self
            .right_text
            .as_ref()
            .map(|(text, _)| text.width() as u16)
            .unwrap_or(0);

        let line = Line::from(spans);
        let hints_width = area.width.saturating_sub(right_width + 3);
        buf.set_line(area.x + 1, area.y, &line, hints_width);

        if let Some((right, style)) = self.right_text {
            let right_x = area.x + area.width.saturating_sub(right_width + 1);
            let span = Span::styled(right, Theme::status_bar().patch(style));
            buf.set_span(right_x, area.y, &span, right_width);
        }
    }
}

/// Default hints for the pane screen
pub fn pane_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("s", "Start"),
        ("x", "Stop"),
        ("c", "Clear"),
        ("Tab", "Pane"),
        ("G", "Bottom"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}
