use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Create the main layout with header, content, and status bar
    pub fn main(area: Rect) -> (Rect, Rect, Rect) {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        (chunks[0], chunks[1], chunks[2])
    }

    /// Split the content area into a near-square grid of `count` panes,
    /// filled row by row
    pub fn pane_grid(area: Rect, count: usize) -> Vec<Rect> {
        if count == 0 {
            return Vec::new();
        }

        let (cols, rows) = Self::grid_shape(count);
        let row_areas = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(area);

        let mut cells = Vec::with_capacity(count);
        for (row, row_area) in row_areas.iter().enumerate() {
            let in_row = (count - row * cols).min(cols);
            let col_areas = RatatuiLayout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, in_row as u32); in_row])
                .split(*row_area);
            cells.extend(col_areas.iter().copied());
        }
        cells
    }

    /// Columns and rows for `count` panes
    fn grid_shape(count: usize) -> (usize, usize) {
        let mut cols = 1;
        while cols * cols < count {
            cols += 1;
        }
        let rows = count.div_ceil(cols);
        (cols, rows)
    }

    /// Center a popup of the given size inside `area`
    pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        Rect::new(x, y, width, height)
    }
}
