use crate::config::Config;
use crate::data::{ordered_session_keys, AppState, RefreshOutcome};
use crate::refresh::RefreshEngine;
use crate::tmux::{can_switch_client, TmuxRunner};
use crate::tui::{layout, Message};
use anyhow::Result;
use ratatui::layout::Rect;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

/// What the event loop must do after an update.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
    /// Suspend the terminal and attach to a session interactively.
    Attach {
        socket: String,
        session: String,
        pane_id: String,
    },
    /// Mouse capture was toggled; the loop applies the terminal change.
    MouseToggled(bool),
}

pub struct App {
    pub config: Config,
    pub state: AppState,
    engine: Arc<RefreshEngine>,
    runner: Arc<dyn TmuxRunner>,

    /// Channel receiver for the in-flight background refresh, if any.
    pub refresh_rx: Option<mpsc::Receiver<RefreshOutcome>>,
    refresh_task: Option<JoinHandle<()>>,

    /// Keystrokes are forwarded to the focused pane while set.
    pub forward_input: bool,
    pub mouse_enabled: bool,

    /// The grid area of the last draw, for scroll and mouse math.
    pub grid_area: Rect,
}

impl App {
    pub fn new(config: Config, engine: RefreshEngine) -> Self {
        let engine = Arc::new(engine);
        let runner = engine.runner();
        Self {
            config,
            state: AppState::default(),
            engine,
            runner,
            refresh_rx: None,
            refresh_task: None,
            forward_input: false,
            mouse_enabled: true,
            grid_area: Rect::default(),
        }
    }

    /// Whether a refresh cycle is currently running.
    pub fn refreshing(&self) -> bool {
        self.refresh_rx.is_some()
    }

    /// Start a refresh cycle in the background (non-blocking). A cycle that
    /// is already running is left alone.
    pub fn start_background_refresh(&mut self) {
        if self.refresh_rx.is_some() {
            return;
        }

        let (tx, rx) = mpsc::channel(1);
        self.refresh_rx = Some(rx);

        let engine = Arc::clone(&self.engine);
        let config = self.config.clone();
        self.refresh_task = Some(tokio::spawn(async move {
            let outcome = engine.run_cycle(&config).await;
            let _ = tx.send(outcome).await;
        }));
    }

    /// Poll for a finished refresh (non-blocking, called from the tick).
    /// Returns true when a new outcome was applied.
    pub fn poll_refresh(&mut self) -> bool {
        let Some(mut rx) = self.refresh_rx.take() else {
            return false;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.state.apply_outcome(outcome);
                self.refresh_task = None;
                true
            }
            Err(TryRecvError::Empty) => {
                self.refresh_rx = Some(rx);
                false
            }
            Err(TryRecvError::Disconnected) => {
                self.refresh_task = None;
                false
            }
        }
    }

    /// Abort the in-flight cycle; dropping the task reaps its tmux children.
    pub fn abort_refresh(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        self.refresh_rx = None;
    }

    pub async fn update(&mut self, msg: Message) -> Result<Action> {
        match msg {
            Message::Quit => return Ok(Action::Quit),
            Message::Refresh => self.start_background_refresh(),

            Message::FocusNext => self.state.move_focus(1),
            Message::FocusPrev => self.state.move_focus(-1),
            Message::FocusSet(idx) => self.state.set_focus(idx),

            Message::ScrollBy(delta) => self.scroll_focused(delta),
            Message::JumpTop => self.jump_scroll(true),
            Message::JumpBottom => self.jump_scroll(false),

            Message::LinesUp => {
                self.config.lines += 50;
                self.start_background_refresh();
            }
            Message::LinesDown => {
                self.config.lines = self.config.lines.saturating_sub(50).max(20);
                self.start_background_refresh();
            }
            Message::IntervalUp => {
                self.config.interval_ms += 200;
            }
            Message::IntervalDown => {
                self.config.interval_ms = self.config.interval_ms.saturating_sub(200).max(200);
            }

            Message::ToggleMouse => {
                self.mouse_enabled = !self.mouse_enabled;
                return Ok(Action::MouseToggled(self.mouse_enabled));
            }

            Message::KillFocused => self.kill_focused().await,
            Message::Connect => return self.connect_focused().await,

            Message::StartForward => self.forward_input = true,
            Message::StopForward => self.forward_input = false,
            Message::ForwardKey { key, literal } => self.send_key_to_focused(&key, literal).await,

            Message::None => {}
        }
        Ok(Action::Continue)
    }

    /// Socket path, session name and pane id of the focused session.
    fn focused_target(&mut self) -> Option<(String, String, String)> {
        let keys = ordered_session_keys(&self.state);
        if keys.is_empty() {
            return None;
        }
        if self.state.focus_index >= keys.len() {
            self.state.focus_index = 0;
        }
        let view = self.state.sessions.get(&keys[self.state.focus_index])?;
        Some((
            view.socket_path.clone(),
            view.name.clone(),
            view.pane_id.clone(),
        ))
    }

    /// Pane id of the focused session, resolved on demand when the last
    /// capture failed and left it empty.
    async fn resolve_focused_pane(&mut self) -> Result<(String, String, String)> {
        let Some((socket, name, pane_id)) = self.focused_target() else {
            anyhow::bail!("no tmux sessions");
        };
        if !pane_id.trim().is_empty() {
            return Ok((socket, name, pane_id));
        }
        let pane_id = self.engine.active_pane_id(&socket, &name).await?;
        Ok((socket, name, pane_id))
    }

    async fn send_key_to_focused(&mut self, key: &str, literal: bool) {
        let (socket, _, pane_id) = match self.resolve_focused_pane().await {
            Ok(target) => target,
            Err(e) => {
                self.state.last_err = Some(e.to_string());
                return;
            }
        };
        let result = if literal {
            self.runner
                .run(&socket, &["send-keys", "-t", &pane_id, "-l", key])
                .await
        } else {
            self.runner
                .run(&socket, &["send-keys", "-t", &pane_id, key])
                .await
        };
        if let Err(e) = result {
            self.state.last_err = Some(e.to_string());
        }
    }

    async fn kill_focused(&mut self) {
        let Some((socket, name, _)) = self.focused_target() else {
            self.state.last_err = Some("no tmux sessions".to_string());
            return;
        };
        match self
            .runner
            .run(&socket, &["kill-session", "-t", &name])
            .await
        {
            Ok(_) => {
                self.state.focus_index = 0;
                self.state.focus_key.clear();
                self.start_background_refresh();
            }
            Err(e) => self.state.last_err = Some(e.to_string()),
        }
    }

    /// Switch the surrounding tmux client to the focused session when it is
    /// on the same socket; otherwise ask the loop to suspend and attach.
    async fn connect_focused(&mut self) -> Result<Action> {
        let (socket, name, pane_id) = match self.resolve_focused_pane().await {
            Ok(target) => target,
            Err(e) => {
                self.state.last_err = Some(e.to_string());
                return Ok(Action::Continue);
            }
        };

        if can_switch_client(&socket) {
            if let Err(e) = self
                .runner
                .run(
                    &socket,
                    &["switch-client", "-t", &name, ";", "select-pane", "-t", &pane_id],
                )
                .await
            {
                self.state.last_err = Some(e.to_string());
            }
            return Ok(Action::Continue);
        }

        Ok(Action::Attach {
            socket,
            session: name,
            pane_id,
        })
    }

    /// Attach to a session with the terminal handed over. Called by the
    /// event loop after it has suspended the UI.
    pub fn attach_interactive(&self, socket: &str, session: &str, pane_id: &str) -> Result<()> {
        self.runner.run_interactive(
            socket,
            &["attach-session", "-t", session, ";", "select-pane", "-t", pane_id],
        )
    }

    fn scroll_focused(&mut self, delta: i64) {
        let keys = ordered_session_keys(&self.state);
        if keys.is_empty() {
            return;
        }
        if self.state.focus_index >= keys.len() {
            self.state.focus_index = 0;
            self.state.focus_key = keys[0].clone();
        }
        let key = keys[self.state.focus_index].clone();
        let Some(view) = self.state.sessions.get(&key) else {
            return;
        };
        let content_height = layout::content_height(self.grid_area, keys.len(), self.state.focus_index);
        if content_height == 0 {
            return;
        }
        let max_start = view.lines.len().saturating_sub(content_height);
        let mut current = self.state.scroll.get(&key).copied().unwrap_or(0);
        if self.state.follow.get(&key).copied().unwrap_or(true) {
            current = max_start;
        }
        let next = (current as i64 + delta).clamp(0, max_start as i64) as usize;
        self.state.scroll.insert(key.clone(), next);
        self.state.follow.insert(key, next == max_start);
    }

    fn jump_scroll(&mut self, to_top: bool) {
        let keys = ordered_session_keys(&self.state);
        if keys.is_empty() {
            return;
        }
        if self.state.focus_index >= keys.len() {
            self.state.focus_index = 0;
            self.state.focus_key = keys[0].clone();
        }
        let key = keys[self.state.focus_index].clone();
        let Some(view) = self.state.sessions.get(&key) else {
            return;
        };
        let content_height = layout::content_height(self.grid_area, keys.len(), self.state.focus_index);
        if content_height == 0 {
            return;
        }
        let max_start = view.lines.len().saturating_sub(content_height);
        if to_top {
            self.state.scroll.insert(key.clone(), 0);
            self.state.follow.insert(key, false);
        } else {
            self.state.scroll.insert(key.clone(), max_start);
            self.state.follow.insert(key, true);
        }
    }
}
