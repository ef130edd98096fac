//! Input dispatcher
//!
//! Maps raw key and paste events onto editor actions:
//! - Enter submits, arrows navigate history or move the cursor
//! - Tab inserts two spaces and never moves focus
//! - Ctrl/Cmd+C copies when text is selected and interrupts otherwise
//! - Ctrl/Cmd+L clears the screen
//!
//! The only state kept is the current text selection.

use serde::{Deserialize, Serialize};

use crate::terminal::buffer::{CursorMove, DeleteDirection};

/// Text inserted for the Tab key
pub const TAB_INSERT: &str = "  ";

/// Key identity, following DOM `KeyboardEvent.key` names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Enter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Backspace,
    Delete,
    Tab,
    Char(char),
    Other,
}

impl Key {
    /// Parse a key name (`"Enter"`, `"ArrowUp"`, `"a"`)
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Tab" => Key::Tab,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }
}

/// Modifier keys held during a key event
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyModifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub super_: bool, // Cmd on macOS, Win on Windows
}

impl KeyModifiers {
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Default::default()
        }
    }

    /// Ctrl on Linux/Windows or Cmd on macOS
    pub fn command(&self) -> bool {
        self.ctrl || self.super_
    }
}

/// Raw event from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key { key: Key, modifiers: KeyModifiers },
    Paste(String),
    /// Selected text in the output area, `None` when the selection is cleared
    SelectionChanged(Option<String>),
}

impl InputEvent {
    pub fn key(key: Key) -> Self {
        InputEvent::Key {
            key,
            modifiers: KeyModifiers::default(),
        }
    }

    pub fn ctrl(c: char) -> Self {
        InputEvent::Key {
            key: Key::Char(c),
            modifiers: KeyModifiers::ctrl(),
        }
    }
}

/// What an input event asks the terminal to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InsertText(String),
    MoveCursor(CursorMove),
    Delete(DeleteDirection),
    Submit,
    HistoryUp,
    HistoryDown,
    Interrupt,
    ClearScreen,
    /// Copy the given text to the clipboard
    Copy(String),
    None,
}

/// Replace line breaks with spaces and drop other control characters
pub fn sanitize_paste(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\r' | '\n' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Routes input events to actions, tracking the active selection
#[derive(Debug, Clone, Default)]
pub struct InputDispatcher {
    selection: Option<String>,
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn has_selection(&self) -> bool {
        self.selection.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn dispatch(&mut self, event: &InputEvent) -> Action {
        match event {
            InputEvent::Key { key, modifiers } => self.dispatch_key(*key, *modifiers),
            InputEvent::Paste(text) => {
                let clean = sanitize_paste(text);
                if clean.is_empty() {
                    Action::None
                } else {
                    Action::InsertText(clean)
                }
            }
            InputEvent::SelectionChanged(selection) => {
                self.selection = selection.clone().filter(|s| !s.is_empty());
                Action::None
            }
        }
    }

    fn dispatch_key(&self, key: Key, modifiers: KeyModifiers) -> Action {
        match key {
            Key::Enter => Action::Submit,
            Key::ArrowUp => Action::HistoryUp,
            Key::ArrowDown => Action::HistoryDown,
            Key::ArrowLeft => Action::MoveCursor(CursorMove::Left),
            Key::ArrowRight => Action::MoveCursor(CursorMove::Right),
            Key::Home => Action::MoveCursor(CursorMove::Home),
            Key::End => Action::MoveCursor(CursorMove::End),
            Key::Backspace => Action::Delete(DeleteDirection::Backward),
            Key::Delete => Action::Delete(DeleteDirection::Forward),
            Key::Tab => Action::InsertText(TAB_INSERT.to_string()),
            Key::Char(c) if modifiers.command() => match c.to_ascii_lowercase() {
                'c' => match &self.selection {
                    Some(text) if !text.is_empty() => Action::Copy(text.clone()),
                    _ => Action::Interrupt,
                },
                'l' => Action::ClearScreen,
                _ => Action::None,
            },
            Key::Char(c) if !c.is_control() => Action::InsertText(c.to_string()),
            Key::Char(_) | Key::Other => Action::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(event: InputEvent) -> Action {
        InputDispatcher::new().dispatch(&event)
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("Enter"), Key::Enter);
        assert_eq!(Key::from_name("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::from_name("x"), Key::Char('x'));
        assert_eq!(Key::from_name("한"), Key::Char('한'));
        assert_eq!(Key::from_name("F5"), Key::Other);
        assert_eq!(Key::from_name(""), Key::Other);
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(dispatch(InputEvent::key(Key::Enter)), Action::Submit);
        assert_eq!(dispatch(InputEvent::key(Key::ArrowUp)), Action::HistoryUp);
        assert_eq!(dispatch(InputEvent::key(Key::ArrowDown)), Action::HistoryDown);
        assert_eq!(
            dispatch(InputEvent::key(Key::ArrowLeft)),
            Action::MoveCursor(CursorMove::Left)
        );
        assert_eq!(
            dispatch(InputEvent::key(Key::End)),
            Action::MoveCursor(CursorMove::End)
        );
        assert_eq!(
            dispatch(InputEvent::key(Key::Backspace)),
            Action::Delete(DeleteDirection::Backward)
        );
        assert_eq!(
            dispatch(InputEvent::key(Key::Delete)),
            Action::Delete(DeleteDirection::Forward)
        );
    }

    #[test]
    fn test_tab_inserts_spaces() {
        assert_eq!(
            dispatch(InputEvent::key(Key::Tab)),
            Action::InsertText("  ".to_string())
        );
    }

    #[test]
    fn test_printable_chars() {
        assert_eq!(
            dispatch(InputEvent::key(Key::Char('a'))),
            Action::InsertText("a".to_string())
        );
        let shifted = InputEvent::Key {
            key: Key::Char('A'),
            modifiers: KeyModifiers {
                shift: true,
                ..Default::default()
            },
        };
        assert_eq!(dispatch(shifted), Action::InsertText("A".to_string()));
        assert_eq!(dispatch(InputEvent::ctrl('x')), Action::None);
        assert_eq!(dispatch(InputEvent::key(Key::Char('\u{7f}'))), Action::None);
    }

    #[test]
    fn test_ctrl_c_interrupts_without_selection() {
        assert_eq!(dispatch(InputEvent::ctrl('c')), Action::Interrupt);
    }

    #[test]
    fn test_ctrl_c_copies_selection() {
        let mut dispatcher = InputDispatcher::new();
        dispatcher.dispatch(&InputEvent::SelectionChanged(Some("output".to_string())));
        assert!(dispatcher.has_selection());
        assert_eq!(
            dispatcher.dispatch(&InputEvent::ctrl('c')),
            Action::Copy("output".to_string())
        );

        let cmd_c = InputEvent::Key {
            key: Key::Char('C'),
            modifiers: KeyModifiers {
                super_: true,
                ..Default::default()
            },
        };
        assert_eq!(dispatcher.dispatch(&cmd_c), Action::Copy("output".to_string()));

        dispatcher.dispatch(&InputEvent::SelectionChanged(Some(String::new())));
        assert!(!dispatcher.has_selection());
        assert_eq!(dispatcher.dispatch(&InputEvent::ctrl('c')), Action::Interrupt);
    }

    #[test]
    fn test_ctrl_l_clears() {
        assert_eq!(dispatch(InputEvent::ctrl('l')), Action::ClearScreen);
    }

    #[test]
    fn test_paste_sanitized() {
        assert_eq!(sanitize_paste("line1\r\nline2\n"), "line1  line2 ");
        assert_eq!(sanitize_paste("a\x1b[31mb\x07\x7f"), "a[31mb");
        assert_eq!(
            dispatch(InputEvent::Paste("echo\thi".to_string())),
            Action::InsertText("echohi".to_string())
        );
        assert_eq!(dispatch(InputEvent::Paste("\x00\x01".to_string())), Action::None);
    }
}
