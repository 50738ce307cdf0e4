//! TUI components for droidscope
//!
//! This crate provides the terminal front-end for droidscope: one pane per
//! keyword subscription, a status bar, keybindings, and event handling.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, PaneState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar, pane_hints};
pub use ui::screens::PanesScreen;
pub use ui::{Layout, Theme};
