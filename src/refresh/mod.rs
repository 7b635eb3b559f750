//! The refresh cycle: resolve sockets, list sessions, capture panes, merge.
//!
//! One cycle produces a [`RefreshOutcome`] that is applied to the UI state
//! atomically; consumers never see a half-filled capture map. Failures are
//! tallied per socket and merged under the policy described on
//! [`RefreshEngine::list_all_sessions`].

use crate::config::Config;
use crate::data::{RefreshOutcome, SessionRef, SessionView};
use crate::sockets::{
    self, lisa::LisaSocketSource, pane_qualified_key, session_qualified_key, SocketTarget,
};
use crate::tmux::{SystemRunner, TmuxRunner};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;

/// Session refs across all sockets, with the per-cycle failure tally merged.
#[derive(Debug, Default)]
pub struct Listing {
    pub refs: Vec<SessionRef>,
    /// Number of sockets probed (discovery errors do not count).
    pub socket_count: usize,
    /// Number of sockets whose listing succeeded.
    pub success_count: usize,
    pub error: Option<String>,
    pub server_down: bool,
}

/// Runs discovery, listing and capture against injected runners.
pub struct RefreshEngine {
    runner: Arc<dyn TmuxRunner>,
    lisa: Arc<LisaSocketSource>,
    /// Snapshot of the `TMUX` variable naming our own client's socket.
    tmux_env: String,
}

impl RefreshEngine {
    pub fn new(runner: Arc<dyn TmuxRunner>, lisa: Arc<LisaSocketSource>) -> Self {
        Self {
            runner,
            lisa,
            tmux_env: std::env::var("TMUX").unwrap_or_default(),
        }
    }

    /// Override the `TMUX` snapshot (tests).
    pub fn with_tmux_env(mut self, tmux_env: &str) -> Self {
        self.tmux_env = tmux_env.to_string();
        self
    }

    /// Engine backed by the real tmux binary and lisa CLI.
    pub fn system(config: &Config) -> Self {
        Self::new(
            Arc::new(SystemRunner::new(config.cmd_timeout())),
            Arc::new(LisaSocketSource::system(config)),
        )
    }

    /// The command runner, shared with the UI's write paths
    /// (`send-keys`, `kill-session`, `switch-client`).
    pub fn runner(&self) -> Arc<dyn TmuxRunner> {
        Arc::clone(&self.runner)
    }

    /// List sessions on one socket, one `SessionRef` per session, or per
    /// pane when pane granularity is enabled.
    pub async fn list_sessions_on_socket(
        &self,
        config: &Config,
        target: &SocketTarget,
    ) -> Result<Vec<SessionRef>> {
        let out = self
            .runner
            .run(&target.path, &["list-sessions", "-F", "#S"])
            .await?;
        let mut names: Vec<String> = out
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();

        if !config.all_panes {
            return Ok(names
                .into_iter()
                .map(|name| SessionRef {
                    key: session_qualified_key(&target.path, &name),
                    name,
                    pane_id: String::new(),
                    socket: target.clone(),
                })
                .collect());
        }

        let mut refs = Vec::new();
        for name in names {
            let out = self
                .runner
                .run(&target.path, &["list-panes", "-t", &name, "-F", "#{pane_id}"])
                .await?;
            for pane in out.lines().map(str::trim).filter(|p| !p.is_empty()) {
                refs.push(SessionRef {
                    key: pane_qualified_key(&target.path, &name, pane),
                    name: name.clone(),
                    pane_id: pane.to_string(),
                    socket: target.clone(),
                });
            }
        }
        Ok(refs)
    }

    /// List sessions across every resolved socket and merge the result.
    ///
    /// Merge policy:
    /// - any socket succeeded: its refs are returned sorted by
    ///   (name, socket key); fatal failures elsewhere become a
    ///   "partial socket failures: …" error beside the data.
    /// - nothing succeeded and a fatal failure exists: the fatal messages
    ///   joined by " | " are the error.
    /// - nothing succeeded and every failure was "socket absent": a pure
    ///   server-down signal listing the unavailable hints.
    /// - no sockets failed at all: an empty, healthy result.
    pub async fn list_all_sessions(&self, config: &Config) -> Listing {
        let (targets, discovery_errors) =
            sockets::discover_socket_targets(config, &self.lisa, &self.tmux_env).await;

        let mut fatal = discovery_errors;
        let mut unavailable: Vec<String> = Vec::new();
        let mut refs: Vec<SessionRef> = Vec::new();
        let mut success_count = 0usize;

        for target in &targets {
            match self.list_sessions_on_socket(config, target).await {
                Ok(socket_refs) => {
                    refs.extend(socket_refs);
                    success_count += 1;
                }
                Err(e) => {
                    let msg = e.to_string();
                    if sockets::is_socket_unavailable_message(&msg) {
                        unavailable.push(target.hint.clone());
                    } else {
                        tracing::debug!("listing failed on {}: {}", target.hint, msg);
                        fatal.push(format!("{}: {}", target.hint, msg));
                    }
                }
            }
        }

        refs.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.socket.key.cmp(&b.socket.key))
                .then_with(|| a.key.cmp(&b.key))
        });

        let socket_count = targets.len();
        if success_count > 0 {
            let error = (!fatal.is_empty())
                .then(|| format!("partial socket failures: {}", fatal.join(" | ")));
            return Listing {
                refs,
                socket_count,
                success_count,
                error,
                server_down: false,
            };
        }
        if !fatal.is_empty() {
            return Listing {
                socket_count,
                error: Some(fatal.join(" | ")),
                ..Listing::default()
            };
        }
        if !unavailable.is_empty() {
            return Listing {
                socket_count,
                error: Some(format!("no server running ({})", unavailable.join(", "))),
                server_down: true,
                ..Listing::default()
            };
        }
        Listing {
            socket_count,
            ..Listing::default()
        }
    }

    /// The active pane of a session, falling back to the first listed pane.
    pub async fn active_pane_id(&self, socket: &str, session: &str) -> Result<String> {
        let out = self
            .runner
            .run(
                socket,
                &["list-panes", "-t", session, "-F", "#{pane_active} #{pane_id}"],
            )
            .await?;
        let mut fallback = String::new();
        for line in out.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                continue;
            }
            if fallback.is_empty() {
                fallback = fields[1].to_string();
            }
            if fields[0] == "1" {
                return Ok(fields[1].to_string());
            }
        }
        if fallback.is_empty() {
            anyhow::bail!("no pane found");
        }
        Ok(fallback)
    }

    /// Capture the last `lines` scrollback lines of a pane, styling escapes
    /// included, with a single trailing blank line stripped.
    pub async fn capture_pane(
        &self,
        socket: &str,
        pane_id: &str,
        lines: usize,
    ) -> Result<Vec<String>> {
        let lines = lines.max(1);
        let range = format!("-{}", lines);
        let out = self
            .runner
            .run(socket, &["capture-pane", "-t", pane_id, "-p", "-e", "-S", &range])
            .await?;
        if out.is_empty() {
            return Ok(vec!["(empty)".to_string()]);
        }
        let mut result: Vec<String> = out.split('\n').map(String::from).collect();
        if result.last().is_some_and(|l| l.is_empty()) {
            result.pop();
        }
        Ok(result)
    }

    /// Resolve and capture one target. Never fails: a resolution or capture
    /// error becomes a synthetic one-line view for that target alone.
    async fn capture_view(&self, config: &Config, target: &SessionRef) -> SessionView {
        let mut pane_id = target.pane_id.trim().to_string();
        if pane_id.is_empty() {
            match self.active_pane_id(&target.socket.path, &target.name).await {
                Ok(pane) => pane_id = pane,
                Err(e) => return SessionView::failed(target, e.to_string()),
            }
        }
        match self
            .capture_pane(&target.socket.path, &pane_id, config.lines)
            .await
        {
            Ok(lines) => SessionView::captured(target, pane_id, lines),
            Err(e) => SessionView::failed(target, e.to_string()),
        }
    }

    /// Run one full cycle: discovery, listing, bounded-concurrency capture.
    /// Blocks until every ref is processed; completion order is unspecified.
    pub async fn run_cycle(&self, config: &Config) -> RefreshOutcome {
        let listing = self.list_all_sessions(config).await;

        if listing.server_down || (listing.success_count == 0 && listing.error.is_some()) {
            return RefreshOutcome {
                sessions: None,
                socket_count: listing.socket_count,
                error: listing.error,
                server_down: listing.server_down,
            };
        }

        let workers = config.max_workers.max(1).min(listing.refs.len().max(1));
        let views: Vec<SessionView> = stream::iter(listing.refs.into_iter())
            .map(|target| async move { self.capture_view(config, &target).await })
            .buffer_unordered(workers)
            .collect()
            .await;

        let sessions: HashMap<String, SessionView> =
            views.into_iter().map(|v| (v.key.clone(), v)).collect();
        RefreshOutcome {
            sessions: Some(sessions),
            socket_count: listing.socket_count,
            error: listing.error,
            server_down: false,
        }
    }
}
