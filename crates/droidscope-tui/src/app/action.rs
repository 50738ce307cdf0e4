/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    // Session control
    StartLogging,
    StopLogging,
    ClearDeviceLog,
    Quit,

    // Panes
    FocusNext,
    FocusPrev,
    WipePane,

    // Scrolling in the focused pane
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleFollow,

    // UI toggles
    ToggleHelp,

    // Render request
    Render,
}
