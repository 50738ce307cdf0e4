use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::app::Action;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn shift(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Context for keybindings
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    Panes,
    Help,
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        // Global bindings
        let mut global = HashMap::new();
        global.insert(KeyBinding::new(KeyCode::Char('?')), Action::ToggleHelp);
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::Char('q')), Action::Quit);
        bindings.insert(KeyContext::Global, global);

        // Pane bindings
        let mut panes = HashMap::new();
        // Session
        panes.insert(KeyBinding::new(KeyCode::Char('s')), Action::StartLogging);
        panes.insert(KeyBinding::new(KeyCode::Char('x')), Action::StopLogging);
        panes.insert(KeyBinding::new(KeyCode::Char('c')), Action::ClearDeviceLog);
        panes.insert(KeyBinding::new(KeyCode::Char('w')), Action::WipePane);
        // Focus
        panes.insert(KeyBinding::new(KeyCode::Tab), Action::FocusNext);
        panes.insert(KeyBinding::shift(KeyCode::BackTab), Action::FocusPrev);
        panes.insert(KeyBinding::new(KeyCode::BackTab), Action::FocusPrev);
        // Line navigation
        panes.insert(KeyBinding::new(KeyCode::Char('j')), Action::ScrollDown(1));
        panes.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        panes.insert(KeyBinding::new(KeyCode::Char('k')), Action::ScrollUp(1));
        panes.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));
        // Page navigation (less-style)
        panes.insert(KeyBinding::ctrl(KeyCode::Char('d')), Action::PageDown);
        panes.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::PageUp);
        panes.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        panes.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        // Top/bottom navigation
        panes.insert(KeyBinding::new(KeyCode::Char('g')), Action::ScrollToTop);
        panes.insert(KeyBinding::shift(KeyCode::Char('G')), Action::ScrollToBottom);
        panes.insert(KeyBinding::new(KeyCode::Home), Action::ScrollToTop);
        panes.insert(KeyBinding::new(KeyCode::End), Action::ScrollToBottom);
        panes.insert(KeyBinding::new(KeyCode::Char('f')), Action::ToggleFollow);
        bindings.insert(KeyContext::Panes, panes);

        // Help overlay swallows everything but close/quit
        let mut help = HashMap::new();
        help.insert(KeyBinding::new(KeyCode::Esc), Action::ToggleHelp);
        bindings.insert(KeyContext::Help, help);

        Self { bindings }
    }

    /// Look up the action for a key in a context, falling back to global bindings
    pub fn get_action(&self, context: KeyContext, event: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(event);

        // Some terminals report uppercase letters without SHIFT
        let shifted = match binding.code {
            KeyCode::Char(c) if c.is_ascii_uppercase() => Some(KeyBinding::shift(binding.code)),
            _ => None,
        };

        let lookup = |ctx: &KeyContext| -> Option<Action> {
            let map = self.bindings.get(ctx)?;
            map.get(&binding)
                .or_else(|| shifted.as_ref().and_then(|b| map.get(b)))
                .cloned()
        };

        lookup(&context).or_else(|| lookup(&KeyContext::Global))
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_session_keys() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_action(KeyContext::Panes, &key(KeyCode::Char('s'), KeyModifiers::NONE)),
            Some(Action::StartLogging)
        );
        assert_eq!(
            kb.get_action(KeyContext::Panes, &key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some(Action::StopLogging)
        );
        assert_eq!(
            kb.get_action(KeyContext::Panes, &key(KeyCode::Char('c'), KeyModifiers::NONE)),
            Some(Action::ClearDeviceLog)
        );
    }

    #[test]
    fn test_global_fallback() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_action(KeyContext::Panes, &key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(
            kb.get_action(KeyContext::Help, &key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Action::Quit)
        );
        // Pane keys are not active under the help overlay
        assert_eq!(
            kb.get_action(KeyContext::Help, &key(KeyCode::Char('s'), KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn test_uppercase_without_shift() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_action(KeyContext::Panes, &key(KeyCode::Char('G'), KeyModifiers::NONE)),
            Some(Action::ScrollToBottom)
        );
        assert_eq!(
            kb.get_action(KeyContext::Panes, &key(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            Some(Action::ScrollToBottom)
        );
    }
}
