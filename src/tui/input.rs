//! Input dispatch layer.
//!
//! Maps key events to messages based on the current mode. In forwarding mode
//! every key is translated to its tmux key name and sent to the focused
//! pane; Ctrl-S leaves the mode.

use super::{App, Message};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map a key event to a message.
pub fn dispatch(app: &App, key: KeyEvent) -> Message {
    if app.forward_input {
        return dispatch_forward_mode(key);
    }
    dispatch_normal_mode(key)
}

fn dispatch_normal_mode(key: KeyEvent) -> Message {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Message::Quit,
            KeyCode::Char('k') => Message::KillFocused,
            _ => Message::None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Message::Quit,
        KeyCode::Char('r') | KeyCode::Char('R') => Message::Refresh,
        KeyCode::Tab => Message::FocusNext,
        KeyCode::BackTab => Message::FocusPrev,
        KeyCode::Char('n') | KeyCode::Char('N') => Message::FocusNext,
        KeyCode::Char('p') | KeyCode::Char('P') => Message::FocusPrev,
        KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Down => Message::ScrollBy(1),
        KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Up => Message::ScrollBy(-1),
        KeyCode::PageUp => Message::ScrollBy(-5),
        KeyCode::PageDown => Message::ScrollBy(5),
        KeyCode::Home => Message::JumpTop,
        KeyCode::End => Message::JumpBottom,
        KeyCode::Char('+') => Message::LinesUp,
        KeyCode::Char('-') => Message::LinesDown,
        KeyCode::Char('[') => Message::IntervalDown,
        KeyCode::Char(']') => Message::IntervalUp,
        KeyCode::Char('m') | KeyCode::Char('M') => Message::ToggleMouse,
        KeyCode::Char('i') | KeyCode::Char('I') => Message::StartForward,
        KeyCode::Enter => Message::Connect,
        KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
            Message::FocusSet((c as usize) - ('1' as usize))
        }
        _ => Message::None,
    }
}

fn dispatch_forward_mode(key: KeyEvent) -> Message {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('s' | 'S'))
    {
        return Message::StopForward;
    }
    match tmux_key_from_event(key) {
        Some((key, literal)) => Message::ForwardKey { key, literal },
        None => Message::None,
    }
}

/// Translate a key event into the name tmux's `send-keys` expects.
/// Returns `(key, literal)`; literal keys are sent with `-l`.
pub fn tmux_key_from_event(event: KeyEvent) -> Option<(String, bool)> {
    match event.code {
        KeyCode::Esc => Some(("Escape".to_string(), false)),
        KeyCode::Enter => Some(("Enter".to_string(), false)),
        KeyCode::Backspace => Some(("BSpace".to_string(), false)),
        KeyCode::Tab => Some(("Tab".to_string(), false)),
        KeyCode::Up => Some(("Up".to_string(), false)),
        KeyCode::Down => Some(("Down".to_string(), false)),
        KeyCode::Left => Some(("Left".to_string(), false)),
        KeyCode::Right => Some(("Right".to_string(), false)),
        KeyCode::PageUp => Some(("PgUp".to_string(), false)),
        KeyCode::PageDown => Some(("PgDn".to_string(), false)),
        KeyCode::Home => Some(("Home".to_string(), false)),
        KeyCode::End => Some(("End".to_string(), false)),
        KeyCode::Insert => Some(("Insert".to_string(), false)),
        KeyCode::Delete => Some(("DC".to_string(), false)),
        KeyCode::F(n) => Some((format!("F{}", n), false)),
        KeyCode::Char(c) => {
            if event.modifiers.contains(KeyModifiers::CONTROL) {
                if c == ' ' {
                    return Some(("C-Space".to_string(), false));
                }
                if c.is_ascii_alphabetic() {
                    return Some((format!("C-{}", c.to_ascii_lowercase()), false));
                }
            }
            if event.modifiers.contains(KeyModifiers::ALT) {
                return Some((format!("M-{}", c.to_ascii_lowercase()), false));
            }
            Some((c.to_string(), true))
        }
        _ => None,
    }
}
