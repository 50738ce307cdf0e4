use droidscope_logs::{ArcLogRecord, KeywordFilter, PaneBuffer};
use droidscope_types::{SessionState, StatusEvent};

use super::Action;

/// One keyword pane
pub struct PaneState {
    /// Title shown on the pane border
    pub title: String,

    /// The pane's filter, kept for match highlighting
    pub filter: KeywordFilter,

    /// Records received by this pane
    pub buffer: PaneBuffer,

    /// First visible line when not following
    pub scroll: usize,

    /// Follow mode (stick to the newest line)?
    pub follow: bool,

    /// Rows available at last render
    pub viewport: usize,
}

impl PaneState {
    pub fn new(title: impl Into<String>, filter: KeywordFilter, capacity: usize) -> Self {
        Self {
            title: title.into(),
            filter,
            buffer: PaneBuffer::new(capacity),
            scroll: 0,
            follow: true,
            viewport: 1,
        }
    }

    /// Append newly delivered records
    pub fn append<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ArcLogRecord>,
    {
        let mut evicted = 0;
        for record in records {
            if self.buffer.push(record) {
                evicted += 1;
            }
        }

        // Keep the view anchored when the ring buffer evicts while scrolled back
        if !self.follow {
            self.scroll = self.scroll.saturating_sub(evicted);
        }
    }

    /// Largest valid scroll offset
    pub fn max_scroll(&self) -> usize {
        self.buffer.len().saturating_sub(self.viewport.max(1))
    }

    /// Offset of the first visible line
    pub fn visible_start(&self) -> usize {
        if self.follow {
            self.max_scroll()
        } else {
            self.scroll.min(self.max_scroll())
        }
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.visible_start().saturating_sub(n);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, n: usize) {
        let target = self.visible_start() + n;
        if target >= self.max_scroll() {
            self.scroll_to_bottom();
        } else {
            self.scroll = target;
            self.follow = false;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow = true;
    }

    /// Drop the pane's scrollback
    pub fn wipe(&mut self) {
        self.buffer.clear();
        self.scroll = 0;
        self.follow = true;
    }
}

/// Global application state
pub struct AppState {
    /// Panes in subscription order
    pub panes: Vec<PaneState>,

    /// Index of the focused pane
    pub focused: usize,

    /// Session state at last update
    pub session_state: SessionState,

    /// Last status reported by the session
    pub status: Option<StatusEvent>,

    /// Device label for the header
    pub device: String,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Should the application quit?
    pub should_quit: bool,
}

impl AppState {
    pub fn new(device: impl Into<String>, panes: Vec<PaneState>) -> Self {
        Self {
            panes,
            focused: 0,
            session_state: SessionState::Idle,
            status: None,
            device: device.into(),
            help_visible: false,
            should_quit: false,
        }
    }

    pub fn focused_pane(&self) -> Option<&PaneState> {
        self.panes.get(self.focused)
    }

    pub fn focused_pane_mut(&mut self) -> Option<&mut PaneState> {
        self.panes.get_mut(self.focused)
    }

    /// Record a status update from the session
    pub fn set_status(&mut self, status: StatusEvent) {
        self.status = Some(status);
    }

    /// Apply a UI action. Start, stop and clear belong to the session and are ignored here.
    pub fn apply(&mut self, action: &Action) {
        let pane_count = self.panes.len();
        match action {
            Action::FocusNext if pane_count > 0 => {
                self.focused = (self.focused + 1) % pane_count;
            }
            Action::FocusPrev if pane_count > 0 => {
                self.focused = (self.focused + pane_count - 1) % pane_count;
            }
            Action::ToggleHelp => self.help_visible = !self.help_visible,
            Action::Quit => self.should_quit = true,
            _ => {
                let Some(pane) = self.focused_pane_mut() else {
                    return;
                };
                match action {
                    Action::WipePane => pane.wipe(),
                    Action::ScrollUp(n) => pane.scroll_up(*n),
                    Action::ScrollDown(n) => pane.scroll_down(*n),
                    Action::PageUp => {
                        let page = pane.viewport.max(1);
                        pane.scroll_up(page);
                    }
                    Action::PageDown => {
                        let page = pane.viewport.max(1);
                        pane.scroll_down(page);
                    }
                    Action::ScrollToTop => pane.scroll_to_top(),
                    Action::ScrollToBottom => pane.scroll_to_bottom(),
                    Action::ToggleFollow => {
                        if pane.follow {
                            pane.scroll = pane.visible_start();
                            pane.follow = false;
                        } else {
                            pane.scroll_to_bottom();
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
