//! Core data model: per-cycle capture targets, captured session views, and
//! the published state the UI renders from.
//!
//! `SessionRef`s are recomputed fresh every refresh cycle and never persist.
//! `AppState` is the only thing that carries across cycles, and the only
//! pieces that survive a cycle boundary are per-key scroll/follow flags and
//! the focus, and then only when the key reappears in the new result.

use crate::sockets::{socket_key, SocketTarget};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One capturable target on one socket: a session, or a single pane of it
/// when pane granularity is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    /// Globally unique: `socketKey::sessionName[::paneId]`.
    pub key: String,
    /// The tmux session name. Not unique across sockets.
    pub name: String,
    /// Known pane id, or empty to resolve the active pane at capture time.
    pub pane_id: String,
    pub socket: SocketTarget,
}

/// A captured view of one target, or a one-line synthetic error for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub key: String,
    pub name: String,
    pub socket_path: String,
    pub socket_hint: String,
    pub pane_id: String,
    pub lines: Vec<String>,
    pub updated: DateTime<Utc>,
}

impl SessionView {
    pub fn captured(target: &SessionRef, pane_id: String, lines: Vec<String>) -> Self {
        Self {
            key: target.key.clone(),
            name: target.name.clone(),
            socket_path: target.socket.path.clone(),
            socket_hint: target.socket.hint.clone(),
            pane_id,
            lines,
            updated: Utc::now(),
        }
    }

    /// Failed capture: one message line, empty pane id so the next cycle
    /// re-resolves the pane.
    pub fn failed(target: &SessionRef, message: String) -> Self {
        Self {
            key: target.key.clone(),
            name: target.name.clone(),
            socket_path: target.socket.path.clone(),
            socket_hint: target.socket.hint.clone(),
            pane_id: String::new(),
            lines: vec![message],
            updated: Utc::now(),
        }
    }
}

/// Result of one refresh cycle, published atomically.
#[derive(Debug, Clone, Default)]
pub struct RefreshOutcome {
    /// New views keyed by session key. `None` when the cycle failed outright
    /// and the previous views should be retained.
    pub sessions: Option<HashMap<String, SessionView>>,
    /// Number of sockets probed this cycle.
    pub socket_count: usize,
    /// Top-level error string, possibly a joined concatenation of per-socket
    /// messages prefixed by their display hints.
    pub error: Option<String>,
    /// True when zero sockets were reachable and every failure was of the
    /// "socket simply absent" kind.
    pub server_down: bool,
}

/// UI-facing state, replaced wholesale per cycle.
#[derive(Debug, Default)]
pub struct AppState {
    pub sessions: HashMap<String, SessionView>,
    pub socket_count: usize,
    pub last_err: Option<String>,
    pub server_down: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    pub scroll: HashMap<String, usize>,
    pub follow: HashMap<String, bool>,
    pub focus_index: usize,
    pub focus_key: String,
}

/// Display order: by session name, then socket key, then full key.
pub fn ordered_session_keys(state: &AppState) -> Vec<String> {
    let mut keys: Vec<String> = state.sessions.keys().cloned().collect();
    keys.sort_by(|a, b| {
        match (state.sessions.get(a), state.sessions.get(b)) {
            (Some(left), Some(right)) => {
                let left_socket = socket_key(&left.socket_path);
                let right_socket = socket_key(&right.socket_path);
                left.name
                    .cmp(&right.name)
                    .then(left_socket.cmp(&right_socket))
                    .then(a.cmp(b))
            }
            _ => a.cmp(b),
        }
    });
    keys
}

pub fn focus_index_for_key(keys: &[String], key: &str) -> Option<usize> {
    if key.is_empty() {
        return None;
    }
    keys.iter().position(|k| k == key)
}

impl AppState {
    /// Merge one cycle's result into the persisted state.
    pub fn apply_outcome(&mut self, outcome: RefreshOutcome) {
        self.last_refresh = Some(Utc::now());
        self.socket_count = outcome.socket_count;
        self.last_err = outcome.error;
        self.server_down = outcome.server_down;

        if outcome.server_down {
            self.sessions.clear();
            self.scroll.clear();
            self.follow.clear();
            self.focus_index = 0;
            self.focus_key.clear();
            return;
        }

        let Some(new_sessions) = outcome.sessions else {
            // Cycle failed outright; keep showing the previous views.
            return;
        };

        let mut scroll = HashMap::with_capacity(new_sessions.len());
        let mut follow = HashMap::with_capacity(new_sessions.len());
        for key in new_sessions.keys() {
            scroll.insert(key.clone(), self.scroll.get(key).copied().unwrap_or(0));
            follow.insert(key.clone(), self.follow.get(key).copied().unwrap_or(true));
        }
        self.sessions = new_sessions;
        self.scroll = scroll;
        self.follow = follow;

        let keys = ordered_session_keys(self);
        if keys.is_empty() {
            self.focus_index = 0;
            self.focus_key.clear();
            return;
        }
        match focus_index_for_key(&keys, &self.focus_key) {
            Some(idx) => self.focus_index = idx,
            None => {
                self.focus_index = 0;
                self.focus_key = keys[0].clone();
            }
        }
    }

    /// Move focus by delta, wrapping around the ordered key list.
    pub fn move_focus(&mut self, delta: isize) {
        let keys = ordered_session_keys(self);
        if keys.is_empty() {
            self.focus_index = 0;
            self.focus_key.clear();
            return;
        }
        let len = keys.len() as isize;
        let mut idx = self.focus_index as isize;
        if idx < 0 || idx >= len {
            idx = 0;
        }
        let idx = (idx + delta).rem_euclid(len) as usize;
        self.focus_index = idx;
        self.focus_key = keys[idx].clone();
    }

    /// Focus a specific position in the ordered key list, if it exists.
    pub fn set_focus(&mut self, idx: usize) {
        let keys = ordered_session_keys(self);
        if let Some(key) = keys.get(idx) {
            self.focus_index = idx;
            self.focus_key = key.clone();
        }
    }

    /// The currently focused view, clamping a stale index to the start.
    pub fn focused_view(&self) -> Option<&SessionView> {
        let keys = ordered_session_keys(self);
        if keys.is_empty() {
            return None;
        }
        let idx = if self.focus_index < keys.len() {
            self.focus_index
        } else {
            0
        };
        self.sessions.get(&keys[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_view(name: &str, socket_path: &str) -> SessionView {
        SessionView {
            key: crate::sockets::session_qualified_key(socket_path, name),
            name: name.to_string(),
            socket_path: socket_path.to_string(),
            socket_hint: crate::sockets::socket_hint(socket_path),
            pane_id: "%1".to_string(),
            lines: vec!["line".to_string()],
            updated: Utc::now(),
        }
    }

    fn outcome_with(views: Vec<SessionView>) -> RefreshOutcome {
        RefreshOutcome {
            sessions: Some(views.into_iter().map(|v| (v.key.clone(), v)).collect()),
            socket_count: 1,
            error: None,
            server_down: false,
        }
    }

    #[test]
    fn ordering_is_by_name_then_socket() {
        let mut state = AppState::default();
        for view in [
            make_view("beta", ""),
            make_view("alpha", "/tmp/z.sock"),
            make_view("alpha", "/tmp/a.sock"),
        ] {
            state.sessions.insert(view.key.clone(), view);
        }

        let keys = ordered_session_keys(&state);
        assert_eq!(
            keys,
            vec![
                "/tmp/a.sock::alpha".to_string(),
                "/tmp/z.sock::alpha".to_string(),
                "default::beta".to_string(),
            ]
        );
    }

    #[test]
    fn same_name_on_two_sockets_stays_distinct() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![
            make_view("alpha", ""),
            make_view("alpha", "/tmp/a.sock"),
        ]));
        assert_eq!(state.sessions.len(), 2);
        assert!(state.sessions.contains_key("default::alpha"));
        assert!(state.sessions.contains_key("/tmp/a.sock::alpha"));
    }

    #[test]
    fn scroll_and_follow_survive_only_for_reappearing_keys() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![make_view("alpha", ""), make_view("beta", "")]));
        state.scroll.insert("default::alpha".to_string(), 7);
        state.follow.insert("default::alpha".to_string(), false);

        state.apply_outcome(outcome_with(vec![make_view("alpha", ""), make_view("gamma", "")]));

        assert_eq!(state.scroll.get("default::alpha"), Some(&7));
        assert_eq!(state.follow.get("default::alpha"), Some(&false));
        assert!(!state.scroll.contains_key("default::beta"));
        // New keys start in follow mode.
        assert_eq!(state.follow.get("default::gamma"), Some(&true));
        assert_eq!(state.scroll.get("default::gamma"), Some(&0));
    }

    #[test]
    fn focus_relocates_by_key() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![make_view("alpha", ""), make_view("beta", "")]));
        state.move_focus(1);
        assert_eq!(state.focus_key, "default::beta");

        // "alpha" disappears; beta keeps focus at its new position.
        state.apply_outcome(outcome_with(vec![make_view("beta", ""), make_view("zeta", "")]));
        assert_eq!(state.focus_key, "default::beta");
        assert_eq!(state.focus_index, 0);
    }

    #[test]
    fn vanished_focus_falls_back_to_first() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![make_view("alpha", ""), make_view("beta", "")]));
        state.move_focus(1);
        state.apply_outcome(outcome_with(vec![make_view("gamma", "")]));
        assert_eq!(state.focus_key, "default::gamma");
        assert_eq!(state.focus_index, 0);
    }

    #[test]
    fn server_down_clears_everything() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![make_view("alpha", "")]));
        state.apply_outcome(RefreshOutcome {
            sessions: None,
            socket_count: 1,
            error: Some("no server running (default)".to_string()),
            server_down: true,
        });
        assert!(state.sessions.is_empty());
        assert!(state.scroll.is_empty());
        assert!(state.server_down);
        assert_eq!(state.focus_key, "");
    }

    #[test]
    fn outright_failure_retains_previous_views() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![make_view("alpha", "")]));
        state.apply_outcome(RefreshOutcome {
            sessions: None,
            socket_count: 2,
            error: Some("private: permission denied".to_string()),
            server_down: false,
        });
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(
            state.last_err.as_deref(),
            Some("private: permission denied")
        );
        assert!(!state.server_down);
    }

    #[test]
    fn move_focus_wraps() {
        let mut state = AppState::default();
        state.apply_outcome(outcome_with(vec![make_view("alpha", ""), make_view("beta", "")]));
        state.move_focus(-1);
        assert_eq!(state.focus_index, 1);
        state.move_focus(1);
        assert_eq!(state.focus_index, 0);
    }
}
