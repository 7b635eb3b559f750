//! Message enum for the update loop.
//!
//! Key and mouse events are mapped to messages by the input layer and
//! processed by `App::update()`.

/// All user actions in the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Quit the application
    Quit,
    /// Trigger a refresh cycle now
    Refresh,

    /// Focus the next session in display order
    FocusNext,
    /// Focus the previous session in display order
    FocusPrev,
    /// Focus the session at a grid position (mouse click, number keys)
    FocusSet(usize),

    /// Scroll the focused session by a line delta
    ScrollBy(i64),
    /// Jump the focused session to the top of its capture
    JumpTop,
    /// Jump the focused session to the bottom and re-engage follow mode
    JumpBottom,

    /// Capture 50 more lines per session and refresh
    LinesUp,
    /// Capture 50 fewer lines per session (floor 20) and refresh
    LinesDown,
    /// Lengthen the refresh interval by 200 ms
    IntervalUp,
    /// Shorten the refresh interval by 200 ms (floor 200 ms)
    IntervalDown,

    /// Toggle mouse capture
    ToggleMouse,

    /// Kill the focused tmux session
    KillFocused,
    /// Attach or switch-client to the focused session
    Connect,

    /// Enter key-forwarding mode (keystrokes go to the focused pane)
    StartForward,
    /// Leave key-forwarding mode
    StopForward,
    /// Send one key to the focused pane; `literal` uses `send-keys -l`
    ForwardKey { key: String, literal: bool },

    /// No operation
    None,
}
